//! Form field capability and its errors

use serde_json::Value;
use thiserror::Error;

use crate::widget::Widget;

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
	/// Empty input for a required field, carrying the field name
	#[error("This field is required.")]
	Required(String),

	/// Submitted data did not match the field's schema. `title` is `JSON` when
	/// the input could not be decoded and `Schema` when it did not validate.
	#[error("Schema didn't match for {title}.")]
	Schema {
		field: String,
		title: String,
		detail: String,
	},

	/// The field's schema cannot be resolved
	#[error("{0}")]
	ImproperlyConfigured(String),
}

impl FieldError {
	pub fn required(field: &str) -> Self {
		FieldError::Required(field.to_string())
	}

	/// Error code used when reporting the error
	pub fn code(&self) -> &'static str {
		match self {
			FieldError::Required(_) => "required",
			FieldError::ImproperlyConfigured(_) => "improperly_configured",
			_ => "invalid",
		}
	}
}

pub type FieldResult<T> = Result<T, FieldError>;

/// A form field cleaning submitted JSON-compatible data
pub trait FormField: Send + Sync {
	fn name(&self) -> &str;
	fn label(&self) -> Option<&str>;
	fn required(&self) -> bool;
	fn help_text(&self) -> Option<&str>;
	fn widget(&self) -> &dyn Widget;
	fn initial(&self) -> Option<&Value>;
	fn clean(&self, value: Option<&Value>) -> FieldResult<Value>;

	fn has_changed(&self, initial: Option<&Value>, data: Option<&Value>) -> bool {
		match (initial, data) {
			(None, None) => false,
			(Some(initial), Some(data)) => initial != data,
			_ => true,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_schema_error_message() {
		let error = FieldError::Schema {
			field: "config".into(),
			title: "JSON".into(),
			detail: "EOF while parsing".into(),
		};

		assert_eq!(error.to_string(), "Schema didn't match for JSON.");
		assert_eq!(error.code(), "invalid");
	}

	#[rstest]
	#[case(FieldError::required("data"), "required")]
	#[case(FieldError::ImproperlyConfigured("x".into()), "improperly_configured")]
	fn test_codes(#[case] error: FieldError, #[case] code: &str) {
		assert_eq!(error.code(), code);
	}
}
