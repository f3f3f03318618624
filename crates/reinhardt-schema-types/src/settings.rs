//! Process-wide defaults for schema fields
//!
//! Settings are read from the `[schema_field]` table of a TOML settings file:
//!
//! ```toml
//! [schema_field]
//! strict = false
//! exclude_none = true
//! enc_hook = "myapp::hooks::encode"
//! dec_hook = "myapp::hooks::decode"
//! ```
//!
//! Hook names refer to functions registered with [`register_encode_hook`] and
//! [`register_decode_hook`]. Every field falls back to these defaults for the
//! export options it leaves unset.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigurationError;
use crate::export::{DecodeHook, EncodeHook, ExportKwargs};

/// Defaults applied to every schema field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaFieldSettings {
	pub strict: Option<bool>,
	pub exclude_none: Option<bool>,
	pub enc_hook: Option<String>,
	pub dec_hook: Option<String>,
}

#[derive(Deserialize)]
struct SettingsFile {
	#[serde(default)]
	schema_field: SchemaFieldSettings,
}

impl SchemaFieldSettings {
	/// Read the `[schema_field]` table of a TOML document. Other tables are
	/// ignored and a missing table yields the defaults.
	pub fn from_toml(source: &str) -> Result<Self, ConfigurationError> {
		toml::from_str::<SettingsFile>(source)
			.map(|file| file.schema_field)
			.map_err(|error| ConfigurationError::Settings(error.to_string()))
	}

	/// Export options these settings stand for, with hooks looked up by name.
	pub fn export_defaults(&self) -> Result<ExportKwargs, ConfigurationError> {
		let mut defaults = ExportKwargs::new();
		if let Some(strict) = self.strict {
			defaults = defaults.with_strict(strict);
		}
		if let Some(exclude_none) = self.exclude_none {
			defaults = defaults.with_exclude_none(exclude_none);
		}
		if let Some(name) = &self.enc_hook {
			defaults = defaults.with_enc_hook(encode_hook(name)?);
		}
		if let Some(name) = &self.dec_hook {
			defaults = defaults.with_dec_hook(decode_hook(name)?);
		}
		Ok(defaults)
	}
}

static ENCODE_HOOKS: Lazy<RwLock<HashMap<String, EncodeHook>>> =
	Lazy::new(|| RwLock::new(HashMap::new()));

static DECODE_HOOKS: Lazy<RwLock<HashMap<String, DecodeHook>>> =
	Lazy::new(|| RwLock::new(HashMap::new()));

struct ActiveSettings {
	settings: SchemaFieldSettings,
	defaults: Option<ExportKwargs>,
}

static ACTIVE: Lazy<RwLock<ActiveSettings>> = Lazy::new(|| {
	RwLock::new(ActiveSettings {
		settings: SchemaFieldSettings::default(),
		defaults: None,
	})
});

/// Register an encode hook under `name`, replacing any previous one.
pub fn register_encode_hook<F>(name: impl Into<String>, hook: F)
where
	F: Fn(Value) -> Value + Send + Sync + 'static,
{
	let name = name.into();
	let hook = EncodeHook::encode(Arc::<str>::from(name.as_str()), hook);
	ENCODE_HOOKS.write().insert(name, hook);
}

/// Register a decode hook under `name`, replacing any previous one.
pub fn register_decode_hook<F>(name: impl Into<String>, hook: F)
where
	F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
{
	let name = name.into();
	let hook = DecodeHook::decode(Arc::<str>::from(name.as_str()), hook);
	DECODE_HOOKS.write().insert(name, hook);
}

pub fn encode_hook(name: &str) -> Result<EncodeHook, ConfigurationError> {
	ENCODE_HOOKS
		.read()
		.get(name)
		.cloned()
		.ok_or_else(|| ConfigurationError::UnknownHook(name.to_string()))
}

pub fn decode_hook(name: &str) -> Result<DecodeHook, ConfigurationError> {
	DECODE_HOOKS
		.read()
		.get(name)
		.cloned()
		.ok_or_else(|| ConfigurationError::UnknownHook(name.to_string()))
}

/// The active settings
pub fn settings() -> SchemaFieldSettings {
	ACTIVE.read().settings.clone()
}

/// Replace the active settings. Hook names are checked right away.
pub fn configure(settings: SchemaFieldSettings) -> Result<(), ConfigurationError> {
	let defaults = settings.export_defaults()?;
	tracing::debug!(?settings, "configured schema field settings");
	*ACTIVE.write() = ActiveSettings {
		settings,
		defaults: Some(defaults),
	};
	Ok(())
}

/// Look hook names up again, picking up hooks registered after `configure`.
pub fn reload_settings() -> Result<(), ConfigurationError> {
	let mut active = ACTIVE.write();
	active.defaults = Some(active.settings.export_defaults()?);
	Ok(())
}

/// Export defaults of the active settings.
///
/// Hooks that vanished from the registry since the settings were applied are
/// skipped with a warning instead of failing every field operation.
pub(crate) fn export_defaults() -> ExportKwargs {
	let cached = ACTIVE.read().defaults.clone();
	if let Some(defaults) = cached {
		return defaults;
	}
	let mut active = ACTIVE.write();
	match active.settings.export_defaults() {
		Ok(defaults) => {
			active.defaults = Some(defaults.clone());
			defaults
		}
		Err(error) => {
			tracing::warn!(%error, "ignoring invalid schema field settings");
			ExportKwargs::new()
		}
	}
}
