//! Forward reference resolution tests
//!
//! Schemas named before their type is known resolve once the type is
//! registered, and fail with a resolution error until then.

use reinhardt_schema_types::{
	ExportKwargs, ForwardRef, Namespace, Owner, SchemaAdapter, SchemaError, SchemaReference,
	SchemaResolutionError, SchemaType, module_namespace, register_schema,
};
use rstest::rstest;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
struct Registered {
	id: i64,
}

register_schema!(Registered);

#[derive(Debug, Serialize, Deserialize, ToSchema)]
struct Deferred {
	label: String,
}

#[rstest]
fn test_forward_reference_fails_before_definition_then_succeeds() {
	// Arrange
	let module = "forward_references::late";
	let owner = Owner::new(module, "Model").annotate("payload", "Optional['Deferred']");
	let adapter = SchemaAdapter::from_annotation(owner, "payload", ExportKwargs::new());

	// Act
	let before = adapter.validate_python(json!({"label": "x"}));
	module_namespace(module).register("Deferred", SchemaType::of::<Deferred>());
	let after = adapter.validate_python(json!({"label": "x"}));

	// Assert
	assert_eq!(
		before.unwrap_err(),
		SchemaError::Resolution(SchemaResolutionError::Undefined {
			name: "Deferred".into(),
			namespace: module.into(),
		})
	);
	assert_eq!(after.unwrap().as_json(), &json!({"label": "x"}));
}

#[rstest]
fn test_link_time_registration_is_found_in_owner_module() {
	let owner = Owner::new(module_path!(), "Model");
	let adapter = SchemaAdapter::new(
		Some(SchemaReference::list("Registered")),
		Some(owner),
		Some("items".into()),
		None,
		ExportKwargs::new(),
	);

	let value = adapter.validate_python(json!([{"id": "4"}])).unwrap();

	assert_eq!(value.as_json(), &json!([{"id": 4}]));
}

#[rstest]
fn test_qualified_forward_reference() {
	let reference = SchemaReference::forward(ForwardRef::in_module("Registered", module_path!()));

	let resolved = reference.resolve(None).unwrap();

	assert_eq!(resolved.identity(), SchemaType::of::<Registered>().identity());
}

#[rstest]
fn test_local_namespace_takes_precedence() {
	// Arrange
	let module = "forward_references::shadowed";
	module_namespace(module).register("Thing", SchemaType::of::<Registered>());
	let locals = Namespace::new("Model");
	locals.register("Thing", SchemaType::of::<Deferred>());
	let owner = Owner::new(module, "Model").with_locals(locals);
	let mut adapter = SchemaAdapter::from_type("Thing", ExportKwargs::new());

	// Act
	adapter.bind(owner, "thing");

	// Assert
	assert_eq!(
		adapter.resolved_schema().unwrap().identity(),
		SchemaType::of::<Deferred>().identity()
	);
}

#[rstest]
#[case("dict[str, float]", json!({"a": "1.5"}), json!({"a": 1.5}))]
#[case("list[int] | None", json!(null), json!(null))]
#[case("list[bool]", json!(["true", false]), json!([true, false]))]
fn test_builtin_containers(
	#[case] reference: &str,
	#[case] input: serde_json::Value,
	#[case] expected: serde_json::Value,
) {
	let adapter = SchemaAdapter::from_type(reference, ExportKwargs::new());

	let value = adapter.validate_python(input).unwrap();

	assert_eq!(value.as_json(), &expected);
}

#[rstest]
fn test_explicit_schema_wins_over_annotation() {
	let locals = Namespace::new("Model");
	locals.register("Registered", SchemaType::of::<Registered>());
	locals.register("Deferred", SchemaType::of::<Deferred>());
	let owner = Owner::new("forward_references::precedence", "Model")
		.with_locals(locals)
		.annotate("data", "Deferred");
	let mut adapter = SchemaAdapter::from_type("Registered", ExportKwargs::new());

	adapter.bind(owner, "data");

	assert!(adapter.validate_python(json!({"id": 1})).is_ok());
	assert!(adapter.validate_python(json!({"label": "x"})).is_err());
}
