//! Concrete schemas obtained after evaluating a schema reference

use serde_json::{Value, json};

use crate::error::{SchemaValidationError, ValidationErrorKind};
use crate::json_schema::open_schema;
use crate::reference::SchemaMeta;
use crate::schema::SchemaType;

/// A schema with every forward reference evaluated
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedSchema {
	Type(SchemaType),
	List(Box<ResolvedSchema>),
	Optional(Box<ResolvedSchema>),
	/// Mapping from string keys to values of the inner schema
	Map(Box<ResolvedSchema>),
	Annotated(Box<ResolvedSchema>, SchemaMeta),
}

fn json_type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "bool",
		Value::Number(_) => "number",
		Value::String(_) => "str",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}

impl ResolvedSchema {
	/// Identity used to recognise values already validated by this schema.
	/// Annotation metadata does not take part in it.
	pub fn identity(&self) -> String {
		match self {
			ResolvedSchema::Type(schema) => schema.identity().to_string(),
			ResolvedSchema::List(item) => format!("list[{}]", item.identity()),
			ResolvedSchema::Optional(inner) => format!("Optional[{}]", inner.identity()),
			ResolvedSchema::Map(value) => format!("dict[str, {}]", value.identity()),
			ResolvedSchema::Annotated(inner, _) => inner.identity(),
		}
	}

	/// Textual reference form, parseable by `SchemaReference::parse`.
	pub fn display_name(&self) -> String {
		match self {
			ResolvedSchema::Type(schema) => schema.name().to_string(),
			ResolvedSchema::List(item) => format!("list[{}]", item.display_name()),
			ResolvedSchema::Optional(inner) => format!("Optional[{}]", inner.display_name()),
			ResolvedSchema::Map(value) => format!("dict[str, {}]", value.display_name()),
			ResolvedSchema::Annotated(inner, _) => inner.display_name(),
		}
	}

	/// Validate `value`, returning its canonical form.
	pub fn validate(&self, value: Value) -> Result<Value, SchemaValidationError> {
		match self {
			ResolvedSchema::Type(schema) => schema.validate(value),
			ResolvedSchema::Annotated(inner, _) => inner.validate(value),
			ResolvedSchema::Optional(inner) => match value {
				Value::Null => Ok(Value::Null),
				value => inner.validate(value),
			},
			ResolvedSchema::List(item) => match value {
				Value::Array(items) => items
					.into_iter()
					.map(|value| item.validate(value))
					.collect::<Result<Vec<_>, _>>()
					.map(Value::Array),
				other => Err(self.shape_error("array", &other)),
			},
			ResolvedSchema::Map(inner) => match value {
				Value::Object(object) => object
					.into_iter()
					.map(|(key, value)| inner.validate(value).map(|value| (key, value)))
					.collect::<Result<serde_json::Map<_, _>, _>>()
					.map(Value::Object),
				other => Err(self.shape_error("object", &other)),
			},
		}
	}

	fn shape_error(&self, expected: &str, got: &Value) -> SchemaValidationError {
		SchemaValidationError::new(
			ValidationErrorKind::InvalidShape,
			format!("Expected `{}`, got `{}`", expected, json_type_name(got)),
			self.identity(),
		)
	}

	/// Whether `null` is a valid value for this schema.
	pub fn accepts_null(&self) -> bool {
		match self {
			ResolvedSchema::Optional(_) => true,
			ResolvedSchema::Annotated(inner, _) => inner.accepts_null(),
			ResolvedSchema::Type(schema) => schema.validate(Value::Null).is_ok(),
			ResolvedSchema::List(_) | ResolvedSchema::Map(_) => false,
		}
	}

	/// Wrap into `Optional` unless already nullable.
	pub fn nullable(self) -> Self {
		if matches!(self, ResolvedSchema::Optional(_)) {
			self
		} else {
			ResolvedSchema::Optional(Box::new(self))
		}
	}

	/// Item schema when this is a list schema.
	pub fn item_schema(&self) -> Option<&ResolvedSchema> {
		match self {
			ResolvedSchema::List(item) => Some(item),
			ResolvedSchema::Annotated(inner, _) => inner.item_schema(),
			_ => None,
		}
	}

	/// Canonical default instance declared by the underlying schema type.
	pub fn default_instance(&self) -> Option<Value> {
		match self {
			ResolvedSchema::Type(schema) => schema.default_instance(),
			ResolvedSchema::Annotated(inner, _) | ResolvedSchema::Optional(inner) => {
				inner.default_instance()
			}
			ResolvedSchema::List(_) | ResolvedSchema::Map(_) => None,
		}
	}

	/// Self-contained JSON Schema fragment, with nested component schemas
	/// inlined. Types without a JSON Schema description yield `{}`.
	pub fn json_schema(&self) -> Value {
		match self {
			ResolvedSchema::Type(schema) => schema
				.json_schema_document()
				.map(|document| document.expand())
				.unwrap_or_else(open_schema),
			ResolvedSchema::List(item) => json!({"type": "array", "items": item.json_schema()}),
			ResolvedSchema::Optional(inner) => {
				json!({"anyOf": [inner.json_schema(), {"type": "null"}]})
			}
			ResolvedSchema::Map(value) => {
				json!({"type": "object", "additionalProperties": value.json_schema()})
			}
			ResolvedSchema::Annotated(inner, meta) => meta.apply_to(inner.json_schema()),
		}
	}
}

impl From<SchemaType> for ResolvedSchema {
	fn from(schema: SchemaType) -> Self {
		ResolvedSchema::Type(schema)
	}
}
