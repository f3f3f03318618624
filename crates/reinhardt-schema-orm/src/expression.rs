//! Values exchanged between schema fields and the database layer

use reinhardt_schema_types::{RawValue, SchemaValue};
use serde_json::Value;

/// A query expression assigned to or compared with a schema field
///
/// Expressions are never validated against the schema, except for the inner
/// value of [`QueryExpression::Value`], which is prepared like any plain
/// value of the field.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpression {
	/// SQL fragment or column reference
	Sql(String),
	/// Literal value typed as the schema field
	Value(RawValue),
}

impl QueryExpression {
	pub fn sql(sql: impl Into<String>) -> Self {
		QueryExpression::Sql(sql.into())
	}

	pub fn value(value: impl Into<RawValue>) -> Self {
		QueryExpression::Value(value.into())
	}
}

/// Input accepted when preparing a value for the database
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
	Raw(RawValue),
	Expression(QueryExpression),
}

impl FieldValue {
	pub fn is_null(&self) -> bool {
		matches!(self, FieldValue::Raw(raw) if raw.is_null())
	}
}

impl From<RawValue> for FieldValue {
	fn from(value: RawValue) -> Self {
		FieldValue::Raw(value)
	}
}

impl From<Value> for FieldValue {
	fn from(value: Value) -> Self {
		FieldValue::Raw(RawValue::Json(value))
	}
}

impl From<SchemaValue> for FieldValue {
	fn from(value: SchemaValue) -> Self {
		FieldValue::Raw(RawValue::Instance(value))
	}
}

impl From<&str> for FieldValue {
	fn from(value: &str) -> Self {
		FieldValue::Raw(RawValue::from(value))
	}
}

impl From<String> for FieldValue {
	fn from(value: String) -> Self {
		FieldValue::Raw(RawValue::Text(value))
	}
}

impl From<QueryExpression> for FieldValue {
	fn from(expression: QueryExpression) -> Self {
		FieldValue::Expression(expression)
	}
}

/// A column value read from or written to a JSON column
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
	/// Serialized JSON, as text-based backends return it
	Text(String),
	Bytes(Vec<u8>),
	/// JSON already decoded by the driver
	Json(Value),
	/// Expression to be compiled into the statement
	Expression(QueryExpression),
}

impl DbValue {
	pub fn as_json(&self) -> Option<&Value> {
		match self {
			DbValue::Json(value) => Some(value),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case(FieldValue::from(Value::Null), true)]
	#[case(FieldValue::from(json!({})), false)]
	#[case(FieldValue::from("null"), false)]
	#[case(FieldValue::from(QueryExpression::sql("NULL")), false)]
	fn test_field_value_is_null(#[case] value: FieldValue, #[case] expected: bool) {
		assert_eq!(value.is_null(), expected);
	}

	#[rstest]
	fn test_value_expression_wraps_raw_input() {
		let expression = QueryExpression::value(json!([1]));

		assert_eq!(expression, QueryExpression::Value(RawValue::Json(json!([1]))));
	}
}
