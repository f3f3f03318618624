//! Export options controlling how values are validated and dumped

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::ConfigurationError;
use crate::settings;

/// Names accepted by [`ExportKwargs::from_options`]
pub const EXPORT_OPTIONS: &[&str] = &[
	"strict",
	"include",
	"exclude",
	"exclude_none",
	"exclude_defaults",
	"enc_hook",
	"dec_hook",
];

pub type EncodeFn = dyn Fn(Value) -> Value + Send + Sync;
pub type DecodeFn = dyn Fn(Value) -> Result<Value, String> + Send + Sync;

/// A named conversion hook
///
/// Hooks compare equal by name, so options holding them stay comparable.
pub struct Hook<F: ?Sized> {
	name: Arc<str>,
	func: Arc<F>,
}

/// Applied to dumped values before they leave the adapter
pub type EncodeHook = Hook<EncodeFn>;
/// Applied to raw input before validation
pub type DecodeHook = Hook<DecodeFn>;

impl<F: ?Sized> Hook<F> {
	pub fn name(&self) -> &str {
		&self.name
	}
}

impl Hook<EncodeFn> {
	pub fn encode<F>(name: impl Into<Arc<str>>, func: F) -> Self
	where
		F: Fn(Value) -> Value + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			func: Arc::new(func),
		}
	}

	pub fn call(&self, value: Value) -> Value {
		(self.func)(value)
	}
}

impl Hook<DecodeFn> {
	pub fn decode<F>(name: impl Into<Arc<str>>, func: F) -> Self
	where
		F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			func: Arc::new(func),
		}
	}

	pub fn call(&self, value: Value) -> Result<Value, String> {
		(self.func)(value)
	}
}

impl<F: ?Sized> Clone for Hook<F> {
	fn clone(&self) -> Self {
		Self {
			name: Arc::clone(&self.name),
			func: Arc::clone(&self.func),
		}
	}
}

impl<F: ?Sized> PartialEq for Hook<F> {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name
	}
}

impl<F: ?Sized> fmt::Debug for Hook<F> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Hook").field(&self.name).finish()
	}
}

/// Validation and dump options of a field
///
/// Unset options fall back to the process-wide settings at use time.
///
/// # Examples
///
/// ```
/// use reinhardt_schema_types::ExportKwargs;
/// use serde_json::json;
///
/// let options = json!({"strict": true, "exclude": ["secret"]});
/// let kwargs = ExportKwargs::from_options(options.as_object().unwrap()).unwrap();
/// assert_eq!(kwargs.strict(), Some(true));
///
/// let unknown = json!({"by_magic": true});
/// assert!(ExportKwargs::from_options(unknown.as_object().unwrap()).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportKwargs {
	strict: Option<bool>,
	include: Option<BTreeSet<String>>,
	exclude: Option<BTreeSet<String>>,
	exclude_none: Option<bool>,
	exclude_defaults: bool,
	enc_hook: Option<EncodeHook>,
	dec_hook: Option<DecodeHook>,
}

fn expect_bool(option: &str, value: &Value) -> Result<bool, ConfigurationError> {
	value.as_bool().ok_or_else(|| ConfigurationError::InvalidOption {
		option: option.to_string(),
		message: format!("expected a boolean, got {}", value),
	})
}

fn expect_names(option: &str, value: &Value) -> Result<Option<BTreeSet<String>>, ConfigurationError> {
	let invalid = || ConfigurationError::InvalidOption {
		option: option.to_string(),
		message: format!("expected a list of field names, got {}", value),
	};
	match value {
		Value::Null => Ok(None),
		Value::Array(items) => items
			.iter()
			.map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
			.collect::<Result<BTreeSet<_>, _>>()
			.map(Some),
		_ => Err(invalid()),
	}
}

fn expect_hook_name<'v>(option: &str, value: &'v Value) -> Result<Option<&'v str>, ConfigurationError> {
	match value {
		Value::Null => Ok(None),
		Value::String(name) => Ok(Some(name)),
		other => Err(ConfigurationError::InvalidOption {
			option: option.to_string(),
			message: format!("expected a hook name, got {}", other),
		}),
	}
}

impl ExportKwargs {
	pub fn new() -> Self {
		Self::default()
	}

	/// Build from a map of option names to values, rejecting unknown names.
	///
	/// Hooks are given by the name they were registered under.
	pub fn from_options(options: &Map<String, Value>) -> Result<Self, ConfigurationError> {
		let mut kwargs = Self::default();
		for (option, value) in options {
			match option.as_str() {
				"strict" => kwargs.strict = Some(expect_bool(option, value)?),
				"include" => kwargs.include = expect_names(option, value)?,
				"exclude" => kwargs.exclude = expect_names(option, value)?,
				"exclude_none" => kwargs.exclude_none = Some(expect_bool(option, value)?),
				"exclude_defaults" => kwargs.exclude_defaults = expect_bool(option, value)?,
				"enc_hook" => {
					kwargs.enc_hook = expect_hook_name(option, value)?
						.map(settings::encode_hook)
						.transpose()?;
				}
				"dec_hook" => {
					kwargs.dec_hook = expect_hook_name(option, value)?
						.map(settings::decode_hook)
						.transpose()?;
				}
				unknown => return Err(ConfigurationError::UnknownOption(unknown.to_string())),
			}
		}
		Ok(kwargs)
	}

	/// Remove the export options from a field's option map and build from them.
	/// Other options are left in place.
	pub fn extract(options: &mut Map<String, Value>) -> Result<Self, ConfigurationError> {
		let mut extracted = Map::new();
		for option in EXPORT_OPTIONS {
			if let Some(value) = options.remove(*option) {
				extracted.insert((*option).to_string(), value);
			}
		}
		Self::from_options(&extracted)
	}

	/// The explicitly set options, in the form accepted by `from_options`.
	pub fn to_options(&self) -> Map<String, Value> {
		let names = |set: &BTreeSet<String>| Value::from(set.iter().cloned().collect::<Vec<_>>());
		let mut options = Map::new();
		if let Some(strict) = self.strict {
			options.insert("strict".into(), Value::Bool(strict));
		}
		if let Some(include) = &self.include {
			options.insert("include".into(), names(include));
		}
		if let Some(exclude) = &self.exclude {
			options.insert("exclude".into(), names(exclude));
		}
		if let Some(exclude_none) = self.exclude_none {
			options.insert("exclude_none".into(), Value::Bool(exclude_none));
		}
		if self.exclude_defaults {
			options.insert("exclude_defaults".into(), Value::Bool(true));
		}
		if let Some(hook) = &self.enc_hook {
			options.insert("enc_hook".into(), Value::from(hook.name()));
		}
		if let Some(hook) = &self.dec_hook {
			options.insert("dec_hook".into(), Value::from(hook.name()));
		}
		options
	}

	/// Fill unset options from `defaults`.
	pub fn or_defaults(&self, defaults: &ExportKwargs) -> ExportKwargs {
		ExportKwargs {
			strict: self.strict.or(defaults.strict),
			include: self.include.clone(),
			exclude: self.exclude.clone(),
			exclude_none: self.exclude_none.or(defaults.exclude_none),
			exclude_defaults: self.exclude_defaults,
			enc_hook: self.enc_hook.clone().or_else(|| defaults.enc_hook.clone()),
			dec_hook: self.dec_hook.clone().or_else(|| defaults.dec_hook.clone()),
		}
	}

	pub fn with_strict(mut self, strict: bool) -> Self {
		self.strict = Some(strict);
		self
	}

	pub fn with_include<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.include = Some(names.into_iter().map(Into::into).collect());
		self
	}

	pub fn with_exclude<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.exclude = Some(names.into_iter().map(Into::into).collect());
		self
	}

	pub fn with_exclude_none(mut self, exclude_none: bool) -> Self {
		self.exclude_none = Some(exclude_none);
		self
	}

	pub fn with_exclude_defaults(mut self, exclude_defaults: bool) -> Self {
		self.exclude_defaults = exclude_defaults;
		self
	}

	pub fn with_enc_hook(mut self, hook: EncodeHook) -> Self {
		self.enc_hook = Some(hook);
		self
	}

	pub fn with_dec_hook(mut self, hook: DecodeHook) -> Self {
		self.dec_hook = Some(hook);
		self
	}

	pub fn strict(&self) -> Option<bool> {
		self.strict
	}

	pub fn is_strict(&self) -> bool {
		self.strict.unwrap_or(false)
	}

	pub fn include(&self) -> Option<&BTreeSet<String>> {
		self.include.as_ref()
	}

	pub fn exclude(&self) -> Option<&BTreeSet<String>> {
		self.exclude.as_ref()
	}

	pub fn exclude_none(&self) -> bool {
		self.exclude_none.unwrap_or(false)
	}

	pub fn exclude_defaults(&self) -> bool {
		self.exclude_defaults
	}

	pub fn enc_hook(&self) -> Option<&EncodeHook> {
		self.enc_hook.as_ref()
	}

	pub fn dec_hook(&self) -> Option<&DecodeHook> {
		self.dec_hook.as_ref()
	}

	/// Whether dumping may drop keys needed to reconstruct the value.
	pub fn has_filters(&self) -> bool {
		self.include.as_ref().is_some_and(|set| !set.is_empty())
			|| self.exclude.as_ref().is_some_and(|set| !set.is_empty())
			|| self.exclude_none()
			|| self.exclude_defaults
	}

	pub(crate) fn dump_filter<'a>(&'a self, overrides: &'a DumpOverrides) -> DumpFilter<'a> {
		DumpFilter {
			include: match &overrides.include {
				Some(include) => include.as_ref(),
				None => self.include.as_ref(),
			},
			exclude: match &overrides.exclude {
				Some(exclude) => exclude.as_ref(),
				None => self.exclude.as_ref(),
			},
			exclude_none: overrides.exclude_none.unwrap_or_else(|| self.exclude_none()),
			exclude_defaults: overrides.exclude_defaults.unwrap_or(self.exclude_defaults),
		}
	}
}

/// Per-call replacements for the dump filters of an [`ExportKwargs`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DumpOverrides {
	include: Option<Option<BTreeSet<String>>>,
	exclude: Option<Option<BTreeSet<String>>>,
	exclude_none: Option<bool>,
	exclude_defaults: Option<bool>,
}

impl DumpOverrides {
	pub fn new() -> Self {
		Self::default()
	}

	/// Dump every key regardless of the configured filters.
	pub fn unfiltered() -> Self {
		Self {
			include: Some(None),
			exclude: Some(None),
			exclude_none: Some(false),
			exclude_defaults: Some(false),
		}
	}

	pub fn include<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.include = Some(Some(names.into_iter().map(Into::into).collect()));
		self
	}

	pub fn exclude<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.exclude = Some(Some(names.into_iter().map(Into::into).collect()));
		self
	}

	pub fn exclude_none(mut self, exclude_none: bool) -> Self {
		self.exclude_none = Some(exclude_none);
		self
	}

	pub fn exclude_defaults(mut self, exclude_defaults: bool) -> Self {
		self.exclude_defaults = Some(exclude_defaults);
		self
	}
}

pub(crate) struct DumpFilter<'a> {
	include: Option<&'a BTreeSet<String>>,
	exclude: Option<&'a BTreeSet<String>>,
	exclude_none: bool,
	exclude_defaults: bool,
}

impl DumpFilter<'_> {
	/// Filter the keys of a top-level object. Other values pass through.
	pub(crate) fn apply(&self, value: Value, defaults: Option<&Value>) -> Value {
		let Value::Object(object) = value else {
			return value;
		};
		let defaults = defaults
			.filter(|_| self.exclude_defaults)
			.and_then(Value::as_object);

		let filtered = object
			.into_iter()
			.filter(|(key, value)| {
				if self.exclude.is_some_and(|exclude| exclude.contains(key)) {
					return false;
				}
				if self
					.include
					.is_some_and(|include| !include.is_empty() && !include.contains(key))
				{
					return false;
				}
				if self.exclude_none && value.is_null() {
					return false;
				}
				!defaults.and_then(|defaults| defaults.get(key)).is_some_and(|default| default == value)
			})
			.collect();
		Value::Object(filtered)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn options(value: Value) -> Map<String, Value> {
		value.as_object().cloned().unwrap()
	}

	#[rstest]
	#[case(json!({"nope": 1}), ConfigurationError::UnknownOption("nope".into()))]
	#[case(
		json!({"strict": "yes"}),
		ConfigurationError::InvalidOption {
			option: "strict".into(),
			message: "expected a boolean, got \"yes\"".into(),
		}
	)]
	#[case(json!({"enc_hook": "missing::hook"}), ConfigurationError::UnknownHook("missing::hook".into()))]
	fn test_from_options_rejects(#[case] input: Value, #[case] expected: ConfigurationError) {
		assert_eq!(ExportKwargs::from_options(&options(input)).unwrap_err(), expected);
	}

	#[rstest]
	fn test_extract_leaves_framework_options() {
		let mut field_options = options(json!({"null": true, "exclude_none": true, "help_text": "x"}));

		let kwargs = ExportKwargs::extract(&mut field_options).unwrap();

		assert!(kwargs.exclude_none());
		assert_eq!(field_options, options(json!({"null": true, "help_text": "x"})));
	}

	#[rstest]
	fn test_to_options_round_trips() {
		let kwargs = ExportKwargs::new()
			.with_strict(true)
			.with_include(["a", "b"])
			.with_exclude_defaults(true);

		let rebuilt = ExportKwargs::from_options(&kwargs.to_options()).unwrap();

		assert_eq!(rebuilt, kwargs);
	}

	#[rstest]
	fn test_or_defaults_keeps_explicit_values() {
		let defaults = ExportKwargs::new().with_strict(true).with_exclude_none(true);
		let kwargs = ExportKwargs::new().with_strict(false);

		let merged = kwargs.or_defaults(&defaults);

		assert_eq!(merged.strict(), Some(false));
		assert!(merged.exclude_none());
	}

	#[rstest]
	fn test_filter_applies_top_level_only() {
		let kwargs = ExportKwargs::new()
			.with_exclude(["secret"])
			.with_exclude_none(true)
			.with_exclude_defaults(true);
		let overrides = DumpOverrides::new();
		let defaults = json!({"size": 1.0});

		let dumped = kwargs.dump_filter(&overrides).apply(
			json!({"secret": 1, "gone": null, "size": 1.0, "count": 2, "nested": {"secret": 3}}),
			Some(&defaults),
		);

		assert_eq!(dumped, json!({"count": 2, "nested": {"secret": 3}}));
	}

	#[rstest]
	fn test_unfiltered_overrides() {
		let kwargs = ExportKwargs::new().with_include(["a"]).with_exclude_none(true);
		let overrides = DumpOverrides::unfiltered();

		let dumped = kwargs
			.dump_filter(&overrides)
			.apply(json!({"a": 1, "b": null}), None);

		assert_eq!(dumped, json!({"a": 1, "b": null}));
	}

	#[rstest]
	fn test_hooks_compare_by_name() {
		let first = EncodeHook::encode("upper", |value| value);
		let second = EncodeHook::encode("upper", |_| Value::Null);

		assert_eq!(first, second);
		assert_eq!(format!("{:?}", first), "Hook(\"upper\")");
	}
}
