//! Process-wide settings tests
//!
//! These tests mutate global settings and run serially.

use reinhardt_schema_types::{
	ConfigurationError, ExportKwargs, SchemaAdapter, SchemaFieldSettings, SchemaType, configure,
	register_decode_hook, register_encode_hook, reload_settings, settings,
};
use rstest::rstest;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use serial_test::serial;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
struct Flags {
	enabled: bool,
	#[serde(default)]
	label: Option<String>,
}

fn adapter() -> SchemaAdapter {
	SchemaAdapter::from_type(SchemaType::of::<Flags>(), ExportKwargs::new())
}

#[rstest]
#[serial]
fn test_configure_from_toml_applies_defaults() {
	// Arrange
	let parsed = SchemaFieldSettings::from_toml("[schema_field]\nstrict = true\nexclude_none = true\n").unwrap();
	configure(parsed.clone()).unwrap();

	// Act
	let coerced = adapter().validate_python(json!({"enabled": "true"}));
	let value = adapter().validate_python(json!({"enabled": true})).unwrap();

	// Assert
	assert_eq!(settings(), parsed);
	assert!(coerced.is_err());
	assert_eq!(adapter().dump_python(&value), json!({"enabled": true}));

	configure(SchemaFieldSettings::default()).unwrap();
}

#[rstest]
#[serial]
fn test_field_options_override_settings() {
	configure(SchemaFieldSettings {
		strict: Some(true),
		..Default::default()
	})
	.unwrap();
	let lax = SchemaAdapter::from_type(SchemaType::of::<Flags>(), ExportKwargs::new().with_strict(false));

	let value = lax.validate_python(json!({"enabled": "false"})).unwrap();

	assert_eq!(value.as_json(), &json!({"enabled": false, "label": null}));
	configure(SchemaFieldSettings::default()).unwrap();
}

#[rstest]
#[serial]
fn test_hooks_from_settings() {
	// Arrange
	register_decode_hook("settings::wrap_bool", |value| match value {
		Value::Bool(enabled) => Ok(json!({"enabled": enabled})),
		Value::String(text) if text == "broken" => Err("cannot decode".to_string()),
		other => Ok(other),
	});
	register_encode_hook("settings::tag", |mut value| {
		if let Value::Object(object) = &mut value {
			object.insert("encoded".into(), Value::Bool(true));
		}
		value
	});
	configure(SchemaFieldSettings {
		dec_hook: Some("settings::wrap_bool".into()),
		enc_hook: Some("settings::tag".into()),
		..Default::default()
	})
	.unwrap();

	// Act
	let value = adapter().validate_python(json!(true)).unwrap();
	let err = adapter().validate_python("broken").unwrap_err();

	// Assert
	assert_eq!(
		adapter().dump_python(&value),
		json!({"enabled": true, "label": null, "encoded": true})
	);
	assert_eq!(err.to_string(), "cannot decode");
	configure(SchemaFieldSettings::default()).unwrap();
}

#[rstest]
#[serial]
fn test_configure_rejects_unknown_hook() {
	let result = configure(SchemaFieldSettings {
		enc_hook: Some("settings::never_registered".into()),
		..Default::default()
	});

	assert_eq!(
		result,
		Err(ConfigurationError::UnknownHook("settings::never_registered".into()))
	);
	assert_eq!(settings(), SchemaFieldSettings::default());
}

#[rstest]
#[serial]
fn test_reload_picks_up_replaced_hooks() {
	register_encode_hook("settings::swap", |_| json!("first"));
	configure(SchemaFieldSettings {
		enc_hook: Some("settings::swap".into()),
		..Default::default()
	})
	.unwrap();
	let value = adapter().validate_python(json!({"enabled": true})).unwrap();
	assert_eq!(adapter().dump_python(&value), json!("first"));

	register_encode_hook("settings::swap", |_| json!("second"));
	reload_settings().unwrap();

	assert_eq!(adapter().dump_python(&value), json!("second"));
	configure(SchemaFieldSettings::default()).unwrap();
}
