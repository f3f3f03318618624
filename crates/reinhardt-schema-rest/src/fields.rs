//! Serializer field for schema-typed JSON data

use reinhardt_schema_types::{
	ConfigurationError, ExportKwargs, Owner, RawValue, SchemaAdapter, SchemaError, SchemaReference,
	SchemaValue,
};
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Per-field validation messages reported back to the API client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {}", .messages.join(" "))]
pub struct FieldValidationErrors {
	pub field: String,
	pub messages: Vec<String>,
	pub code: &'static str,
}

impl FieldValidationErrors {
	pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			messages: vec![message.into()],
			code: "invalid",
		}
	}

	pub fn required(field: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			messages: vec!["This field is required.".to_string()],
			code: "required",
		}
	}

	pub fn null(field: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			messages: vec!["This field may not be null.".to_string()],
			code: "null",
		}
	}

	/// Error detail in the `{field: [messages]}` shape of API responses
	pub fn detail(&self) -> Value {
		let mut detail = Map::new();
		detail.insert(self.field.clone(), json!(self.messages));
		Value::Object(detail)
	}
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializerFieldError {
	#[error(transparent)]
	Invalid(#[from] FieldValidationErrors),

	/// The field itself is misdeclared
	#[error(transparent)]
	Schema(SchemaError),
}

impl SerializerFieldError {
	pub fn as_validation_errors(&self) -> Option<&FieldValidationErrors> {
		match self {
			SerializerFieldError::Invalid(errors) => Some(errors),
			SerializerFieldError::Schema(_) => None,
		}
	}
}

pub type SerializerFieldResult<T> = Result<T, SerializerFieldError>;

/// Serializer field validating incoming data against a schema and dumping
/// outgoing values with the field's export options.
///
/// The schema is either given explicitly or read from the serializer's
/// annotation of the field once [`bind`](Self::bind) is called.
#[derive(Debug, Clone)]
pub struct SchemaSerializerField {
	field_name: Option<String>,
	required: bool,
	read_only: bool,
	allow_null: bool,
	adapter: SchemaAdapter,
}

impl SchemaSerializerField {
	pub fn new(schema: impl Into<SchemaReference>) -> Self {
		Self::from_adapter(SchemaAdapter::from_type(schema, ExportKwargs::new()))
	}

	/// Build from keyword options. Export options configure the adapter,
	/// `required`, `read_only` and `allow_null` configure the field and any
	/// other key is rejected.
	pub fn with_options(
		schema: Option<SchemaReference>,
		mut options: Map<String, Value>,
	) -> Result<Self, ConfigurationError> {
		let export = ExportKwargs::extract(&mut options)?;
		let mut field = Self::from_adapter(SchemaAdapter::new(schema, None, None, None, export));
		for (option, value) in options {
			let flag = value.as_bool().ok_or_else(|| ConfigurationError::InvalidOption {
				option: option.clone(),
				message: format!("expected a boolean, got {}", value),
			})?;
			match option.as_str() {
				"required" => field.required = flag,
				"read_only" => field.read_only = flag,
				"allow_null" => field.allow_null = flag,
				_ => return Err(ConfigurationError::UnknownOption(option)),
			}
		}
		field.adapter = field.adapter.with_allow_null(field.allow_null.then_some(true));
		Ok(field)
	}

	pub fn from_adapter(adapter: SchemaAdapter) -> Self {
		let allow_null = adapter.allow_null().unwrap_or(false);
		Self {
			field_name: adapter.attname().map(str::to_string),
			required: true,
			read_only: false,
			allow_null,
			adapter,
		}
	}

	pub fn required(mut self, required: bool) -> Self {
		self.required = required;
		self
	}

	pub fn read_only(mut self, read_only: bool) -> Self {
		self.read_only = read_only;
		self
	}

	pub fn allow_null(mut self, allow_null: bool) -> Self {
		self.allow_null = allow_null;
		self.adapter = self.adapter.with_allow_null(allow_null.then_some(true));
		self
	}

	pub fn field_name(&self) -> Option<&str> {
		self.field_name.as_deref()
	}

	pub fn is_required(&self) -> bool {
		self.required && !self.read_only
	}

	pub fn is_read_only(&self) -> bool {
		self.read_only
	}

	pub fn allows_null(&self) -> bool {
		self.allow_null
	}

	pub fn adapter(&self) -> &SchemaAdapter {
		&self.adapter
	}

	/// Attach the field to its serializer. An adapter already bound elsewhere
	/// keeps its owner.
	pub fn bind(&mut self, field_name: impl Into<String>, parent: &Owner) -> &mut Self {
		let field_name = field_name.into();
		if !self.adapter.is_bound() {
			self.adapter.bind(parent.clone(), field_name.clone());
		}
		self.field_name = Some(field_name);
		self
	}

	fn name(&self) -> &str {
		self.field_name.as_deref().unwrap_or("non_field_errors")
	}

	fn to_field_error(&self, error: SchemaError) -> SerializerFieldError {
		if error.is_input_error() {
			FieldValidationErrors::invalid(self.name(), error.to_string()).into()
		} else {
			SerializerFieldError::Schema(error)
		}
	}

	/// Validate incoming data. Strings are decoded as JSON documents.
	pub fn to_internal_value(&self, data: &Value) -> SerializerFieldResult<SchemaValue> {
		let validated = match data {
			Value::String(text) => self.adapter.validate_json(text.as_bytes()),
			other => self.adapter.validate_python(other.clone()),
		};
		validated.map_err(|error| self.to_field_error(error))
	}

	/// Dump a value for the response body.
	pub fn to_representation(&self, value: impl Into<RawValue>) -> SerializerFieldResult<Value> {
		let value = self
			.adapter
			.validate_python(value)
			.map_err(|error| self.to_field_error(error))?;
		Ok(self.adapter.dump_python(&value))
	}

	/// Validate a possibly missing field of incoming data, applying the
	/// `required` and `allow_null` rules first.
	pub fn run_validation(&self, data: Option<&Value>) -> SerializerFieldResult<Option<SchemaValue>> {
		match data {
			None if self.is_required() => Err(FieldValidationErrors::required(self.name()).into()),
			None => Ok(None),
			Some(Value::Null) if self.allow_null => Ok(None),
			Some(Value::Null) => {
				let accepts_null = self
					.adapter
					.accepts_null()
					.map_err(|error| SerializerFieldError::Schema(error.into()))?;
				if accepts_null {
					self.to_internal_value(&Value::Null).map(Some)
				} else {
					Err(FieldValidationErrors::null(self.name()).into())
				}
			}
			Some(value) => self.to_internal_value(value).map(Some),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use reinhardt_schema_types::{Namespace, SchemaType, SchemaResolutionError};
	use rstest::rstest;
	use serde::{Deserialize, Serialize};
	use utoipa::ToSchema;

	#[derive(Debug, Serialize, Deserialize, ToSchema)]
	struct Point {
		x: i64,
		y: i64,
	}

	fn point_field() -> SchemaSerializerField {
		let mut field = SchemaSerializerField::new(SchemaType::of::<Point>());
		field.bind("origin", &Owner::new("geometry", "ShapeSerializer"));
		field
	}

	#[rstest]
	#[case(json!({"x": 1, "y": "2"}))]
	#[case(json!("{\"x\": 1, \"y\": 2}"))]
	fn test_to_internal_value_accepts_data_and_json_text(#[case] data: Value) {
		// Arrange
		let field = point_field();

		// Act
		let value = field.to_internal_value(&data).unwrap();

		// Assert
		assert_eq!(value.as_json(), &json!({"x": 1, "y": 2}));
	}

	#[rstest]
	fn test_invalid_data_reports_field_errors() {
		let field = point_field();

		let error = field.to_internal_value(&json!({"x": 1})).unwrap_err();
		let errors = error.as_validation_errors().unwrap();

		assert_eq!(errors.code, "invalid");
		assert_eq!(errors.field, "origin");
		assert!(errors.messages[0].contains("missing field"));
		assert!(errors.detail()["origin"].is_array());
	}

	#[rstest]
	fn test_malformed_json_text_is_invalid() {
		let field = point_field();

		let error = field.to_internal_value(&json!("{\"x\": ")).unwrap_err();

		assert!(matches!(error, SerializerFieldError::Invalid(_)));
	}

	#[rstest]
	fn test_unbound_annotation_is_a_schema_error() {
		let field = SchemaSerializerField::from_adapter(SchemaAdapter::new(
			None,
			None,
			None,
			None,
			ExportKwargs::new(),
		));

		let error = field.to_internal_value(&json!({})).unwrap_err();

		assert_eq!(
			error,
			SerializerFieldError::Schema(SchemaResolutionError::Unbound.into())
		);
	}

	#[rstest]
	fn test_schema_read_from_serializer_annotation() {
		let locals = Namespace::new("geometry");
		locals.register("Point", SchemaType::of::<Point>());
		let owner = Owner::new("geometry", "ShapeSerializer")
			.with_locals(locals)
			.annotate("corners", "list[Point]");
		let mut field = SchemaSerializerField::with_options(None, Map::new()).unwrap();
		field.bind("corners", &owner);

		let value = field.to_internal_value(&json!([{"x": 0, "y": 0}])).unwrap();

		assert_eq!(value.as_json(), &json!([{"x": 0, "y": 0}]));
	}

	#[rstest]
	fn test_to_representation_applies_export_filters() {
		let mut options = Map::new();
		options.insert("exclude".into(), json!(["y"]));
		let mut field =
			SchemaSerializerField::with_options(Some(SchemaType::of::<Point>().into()), options)
				.unwrap();
		field.bind("origin", &Owner::new("geometry", "ShapeSerializer"));

		let representation = field.to_representation(json!({"x": 3, "y": 4})).unwrap();

		assert_eq!(representation, json!({"x": 3}));
	}

	#[rstest]
	fn test_unknown_option_is_rejected() {
		let mut options = Map::new();
		options.insert("many".into(), json!(true));

		let error = SchemaSerializerField::with_options(None, options).unwrap_err();

		assert_eq!(error, ConfigurationError::UnknownOption("many".into()));
	}

	#[rstest]
	fn test_run_validation_rules() {
		let field = point_field();
		let nullable = point_field().allow_null(true);
		let optional = point_field().required(false);

		assert_eq!(field.run_validation(None).unwrap_err().as_validation_errors().unwrap().code, "required");
		assert_eq!(
			field.run_validation(Some(&Value::Null)).unwrap_err().as_validation_errors().unwrap().code,
			"null"
		);
		assert_eq!(nullable.run_validation(Some(&Value::Null)).unwrap(), None);
		assert_eq!(optional.run_validation(None).unwrap(), None);
	}
}
