// Model field base attributes and the migration-state form of a field

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A field as migrations record it. Every constructor option is a keyword.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDeconstruction {
	pub name: Option<String>,
	pub path: String,
	pub kwargs: HashMap<String, FieldKwarg>,
}

/// Keyword constructor argument recorded by migrations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldKwarg {
	String(String),
	Int(i64),
	Uint(u64),
	Bool(bool),
	Float(f64),
	/// Name of a registered default factory
	Callable(String),
	Json(Value),
}

impl FieldKwarg {
	/// Pick the narrowest variant holding `value`.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_schema_orm::FieldKwarg;
	/// use serde_json::json;
	///
	/// assert_eq!(FieldKwarg::from_json(json!(3)), FieldKwarg::Int(3));
	/// assert_eq!(FieldKwarg::from_json(json!({"a": 1})), FieldKwarg::Json(json!({"a": 1})));
	/// ```
	pub fn from_json(value: Value) -> Self {
		match value {
			Value::String(text) => FieldKwarg::String(text),
			Value::Bool(flag) => FieldKwarg::Bool(flag),
			Value::Number(number) => {
				if let Some(int) = number.as_i64() {
					FieldKwarg::Int(int)
				} else if let Some(uint) = number.as_u64() {
					FieldKwarg::Uint(uint)
				} else {
					FieldKwarg::Float(number.as_f64().unwrap_or_default())
				}
			}
			other => FieldKwarg::Json(other),
		}
	}

	pub fn to_json(&self) -> Value {
		match self {
			FieldKwarg::String(text) | FieldKwarg::Callable(text) => Value::from(text.as_str()),
			FieldKwarg::Int(int) => Value::from(*int),
			FieldKwarg::Uint(uint) => Value::from(*uint),
			FieldKwarg::Bool(flag) => Value::Bool(*flag),
			FieldKwarg::Float(float) => Value::from(*float),
			FieldKwarg::Json(value) => value.clone(),
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			FieldKwarg::String(text) => Some(text),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			FieldKwarg::Bool(flag) => Some(*flag),
			_ => None,
		}
	}
}

/// A model field that can be recorded in migration state
pub trait Field: Send + Sync {
	/// Migration-state form of the field
	fn deconstruct(&self) -> FieldDeconstruction;

	/// Fill in the name and derived defaults once the attribute name is known
	fn set_attributes_from_name(&mut self, name: &str);

	fn name(&self) -> Option<&str>;

	fn is_null(&self) -> bool {
		false
	}

	fn is_blank(&self) -> bool {
		false
	}
}

/// Options every model field accepts
#[derive(Debug, Clone)]
pub struct BaseField {
	pub name: Option<String>,
	pub verbose_name: Option<String>,
	pub null: bool,
	pub blank: bool,
	pub db_column: Option<String>,
	pub db_comment: Option<String>,
	pub unique: bool,
	pub editable: bool,
	pub help_text: Option<String>,
}

impl BaseField {
	/// Non-null, non-blank, editable and not unique
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_schema_orm::BaseField;
	///
	/// let base = BaseField::new();
	/// assert!(!base.null);
	/// assert!(!base.blank);
	/// assert!(!base.unique);
	/// assert!(base.editable);
	/// ```
	pub fn new() -> Self {
		Self {
			name: None,
			verbose_name: None,
			null: false,
			blank: false,
			db_column: None,
			db_comment: None,
			unique: false,
			editable: true,
			help_text: None,
		}
	}

	/// Column the field is stored in
	pub fn column(&self) -> Option<&str> {
		self.db_column.as_deref().or(self.name.as_deref())
	}

	/// Options differing from [`BaseField::new`], as migration kwargs
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_schema_orm::{BaseField, FieldKwarg};
	///
	/// let mut base = BaseField::new();
	/// base.null = true;
	/// base.editable = false;
	///
	/// let recorded = base.get_kwargs();
	/// assert_eq!(recorded.get("null"), Some(&FieldKwarg::Bool(true)));
	/// assert_eq!(recorded.get("editable"), Some(&FieldKwarg::Bool(false)));
	/// assert!(!recorded.contains_key("blank"));
	/// ```
	pub fn get_kwargs(&self) -> HashMap<String, FieldKwarg> {
		let texts = [
			("verbose_name", &self.verbose_name),
			("db_column", &self.db_column),
			("db_comment", &self.db_comment),
			("help_text", &self.help_text),
		];
		let flags = [
			("null", self.null, true),
			("blank", self.blank, true),
			("unique", self.unique, true),
			("editable", self.editable, false),
		];

		texts
			.into_iter()
			.filter_map(|(key, text)| {
				text.as_ref()
					.map(|text| (key.to_string(), FieldKwarg::String(text.clone())))
			})
			.chain(
				flags
					.into_iter()
					.filter(|(_, value, recorded_when)| value == recorded_when)
					.map(|(key, value, _)| (key.to_string(), FieldKwarg::Bool(value))),
			)
			.collect()
	}

	/// Apply a recognised base kwarg, returning `false` for any other key.
	pub(crate) fn set_kwarg(&mut self, key: &str, value: &FieldKwarg) -> bool {
		match key {
			"verbose_name" => self.verbose_name = value.as_str().map(str::to_string),
			"null" => self.null = value.as_bool().unwrap_or(false),
			"blank" => self.blank = value.as_bool().unwrap_or(false),
			"db_column" => self.db_column = value.as_str().map(str::to_string),
			"db_comment" => self.db_comment = value.as_str().map(str::to_string),
			"unique" => self.unique = value.as_bool().unwrap_or(false),
			"editable" => self.editable = value.as_bool().unwrap_or(true),
			"help_text" => self.help_text = value.as_str().map(str::to_string),
			_ => return false,
		}
		true
	}
}

impl Default for BaseField {
	fn default() -> Self {
		Self::new()
	}
}

/// Backend whose JSON column type a field maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseDialect {
	PostgreSQL,
	MySQL,
	SQLite,
	MSSQL,
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_base_field_defaults_produce_no_kwargs() {
		let field = BaseField::new();

		assert!(field.get_kwargs().is_empty());
	}

	#[rstest]
	fn test_set_kwarg_round_trips_get_kwargs() {
		let mut field = BaseField::new();
		field.blank = true;
		field.db_column = Some("payload".into());
		field.help_text = Some("Stored settings".into());

		let mut restored = BaseField::new();
		for (key, value) in field.get_kwargs() {
			assert!(restored.set_kwarg(&key, &value));
		}

		assert_eq!(restored.get_kwargs(), field.get_kwargs());
		assert!(!restored.set_kwarg("schema", &FieldKwarg::String("int".into())));
	}

	#[rstest]
	fn test_column_falls_back_to_name() {
		let mut field = BaseField::new();
		field.name = Some("data".into());
		assert_eq!(field.column(), Some("data"));

		field.db_column = Some("data_json".into());
		assert_eq!(field.column(), Some("data_json"));
	}

	#[rstest]
	#[case(json!("text"), FieldKwarg::String("text".into()))]
	#[case(json!(true), FieldKwarg::Bool(true))]
	#[case(json!(-4), FieldKwarg::Int(-4))]
	#[case(json!(u64::MAX), FieldKwarg::Uint(u64::MAX))]
	#[case(json!(0.5), FieldKwarg::Float(0.5))]
	#[case(json!([1, 2]), FieldKwarg::Json(json!([1, 2])))]
	fn test_kwarg_from_json(#[case] value: Value, #[case] expected: FieldKwarg) {
		assert_eq!(FieldKwarg::from_json(value.clone()), expected);
		assert_eq!(expected.to_json(), value);
	}

	#[rstest]
	fn test_kwarg_serializes_untagged() {
		let kwarg = FieldKwarg::Json(json!({"count": 1}));

		let text = serde_json::to_string(&kwarg).unwrap();

		assert_eq!(text, r#"{"count":1}"#);
	}
}
