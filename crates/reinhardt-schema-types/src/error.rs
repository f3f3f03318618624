//! Error types shared by every schema field adapter

use serde_json::error::Category;
use thiserror::Error;

/// A schema reference could not be evaluated to a concrete schema
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaResolutionError {
	#[error("Name '{name}' is not defined in namespace '{namespace}'")]
	Undefined { name: String, namespace: String },

	#[error("Annotation is not provided for {owner}.{attname}")]
	MissingAnnotation { owner: String, attname: String },

	#[error("Cannot resolve the schema. The adapter is accessed before it was bound.")]
	Unbound,

	#[error("Invalid schema reference '{reference}': {message}")]
	InvalidReference { reference: String, message: String },
}

/// Export options or settings are malformed
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
	#[error("Unknown export option '{0}'")]
	UnknownOption(String),

	#[error("Invalid value for export option '{option}': {message}")]
	InvalidOption { option: String, message: String },

	#[error("Hook '{0}' is not registered")]
	UnknownHook(String),

	#[error("Invalid settings: {0}")]
	Settings(String),
}

/// Broad classification of a validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
	/// Missing or unexpected keys, wrong container shape
	InvalidShape,
	/// A value has the wrong JSON type
	WrongType,
	/// A value has the right type but is rejected by the schema
	ConstraintViolation,
}

/// A value does not conform to its schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SchemaValidationError {
	pub kind: ValidationErrorKind,
	pub message: String,
	/// Identity of the schema the value was validated against
	pub schema: String,
}

impl SchemaValidationError {
	pub fn new(
		kind: ValidationErrorKind,
		message: impl Into<String>,
		schema: impl Into<String>,
	) -> Self {
		Self {
			kind,
			message: message.into(),
			schema: schema.into(),
		}
	}

	/// Classify a serde data error raised while converting into a schema type.
	pub fn from_serde(error: &serde_json::Error, schema: &str) -> Self {
		let message = error.to_string();
		let kind = if message.starts_with("invalid type") {
			ValidationErrorKind::WrongType
		} else if message.starts_with("missing field")
			|| message.starts_with("unknown field")
			|| message.starts_with("unknown variant")
			|| message.starts_with("invalid length")
		{
			ValidationErrorKind::InvalidShape
		} else {
			ValidationErrorKind::ConstraintViolation
		};
		Self::new(kind, message, schema)
	}
}

/// Input is not a well-formed JSON document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("JSON is malformed: {message} (line {line}, column {column})")]
pub struct DecodeError {
	pub message: String,
	pub line: usize,
	pub column: usize,
}

impl From<serde_json::Error> for DecodeError {
	fn from(error: serde_json::Error) -> Self {
		let message = match error.classify() {
			Category::Eof => "unexpected end of input".to_string(),
			_ => error.to_string(),
		};
		Self {
			message,
			line: error.line(),
			column: error.column(),
		}
	}
}

/// Umbrella error returned by adapter operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
	#[error(transparent)]
	Resolution(#[from] SchemaResolutionError),

	#[error(transparent)]
	Configuration(#[from] ConfigurationError),

	#[error(transparent)]
	Validation(#[from] SchemaValidationError),

	#[error(transparent)]
	Decode(#[from] DecodeError),
}

impl SchemaError {
	/// Whether the error describes bad input rather than a bad declaration.
	pub fn is_input_error(&self) -> bool {
		matches!(self, SchemaError::Validation(_) | SchemaError::Decode(_))
	}
}

pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(r#""x""#, ValidationErrorKind::WrongType)]
	#[case("-1", ValidationErrorKind::ConstraintViolation)]
	fn test_from_serde_classifies_u8(#[case] input: &str, #[case] expected: ValidationErrorKind) {
		// Arrange
		let value: serde_json::Value = serde_json::from_str(input).unwrap();

		// Act
		let err = serde_json::from_value::<u8>(value).unwrap_err();
		let classified = SchemaValidationError::from_serde(&err, "u8");

		// Assert
		assert_eq!(classified.kind, expected);
		assert_eq!(classified.schema, "u8");
	}

	#[rstest]
	fn test_missing_field_is_shape_error() {
		#[derive(Debug, serde::Deserialize)]
		#[allow(dead_code)]
		struct Point {
			x: i64,
		}

		let err = serde_json::from_value::<Point>(serde_json::json!({})).unwrap_err();
		let classified = SchemaValidationError::from_serde(&err, "Point");

		assert_eq!(classified.kind, ValidationErrorKind::InvalidShape);
		assert!(classified.message.contains("missing field"));
	}

	#[rstest]
	fn test_decode_error_keeps_position() {
		let err = serde_json::from_str::<serde_json::Value>("{\"a\": }").unwrap_err();
		let decode = DecodeError::from(err);

		assert_eq!(decode.line, 1);
		assert!(decode.column > 0);
		assert!(SchemaError::from(decode).is_input_error());
	}
}
