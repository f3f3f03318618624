//! Lax-mode coercion of string scalars guided by an expanded JSON Schema
//!
//! serde rejects `"5"` for an `i64` field. In lax mode the adapter first walks
//! the input alongside the schema and rewrites scalar strings into the number
//! or boolean the schema asks for. Anything the walk does not understand is
//! left as is, so serde remains the only validator.

use serde_json::{Map, Number, Value};

const MAX_DEPTH: usize = 64;

/// Coerce `value` towards `schema`, an already expanded JSON Schema.
///
/// # Examples
///
/// ```
/// use reinhardt_schema_types::coerce_lax;
/// use serde_json::json;
///
/// let schema = json!({
///     "type": "object",
///     "properties": {"count": {"type": "integer"}, "ok": {"type": "boolean"}}
/// });
///
/// let coerced = coerce_lax(json!({"count": "5", "ok": "true"}), &schema);
/// assert_eq!(coerced, json!({"count": 5, "ok": true}));
/// ```
pub fn coerce_lax(value: Value, schema: &Value) -> Value {
	coerce(value, schema, 0)
}

fn coerce(value: Value, schema: &Value, depth: usize) -> Value {
	let Value::Object(schema) = schema else {
		return value;
	};
	if depth > MAX_DEPTH || value.is_null() {
		return value;
	}

	if let Some(Value::Array(parts)) = schema.get("allOf") {
		return parts
			.iter()
			.fold(value, |value, part| coerce(value, part, depth + 1));
	}
	for keyword in ["oneOf", "anyOf"] {
		if let Some(Value::Array(alternatives)) = schema.get(keyword) {
			return coerce_alternatives(value, alternatives, depth);
		}
	}

	let types = declared_types(schema);
	match value {
		Value::String(text) => coerce_string(text, &types),
		Value::Number(number) if wants(&types, "integer") && !wants(&types, "number") => {
			Value::Number(integral(&number).unwrap_or(number))
		}
		Value::Object(object) => Value::Object(coerce_object(object, schema, depth)),
		Value::Array(items) => match schema.get("items") {
			Some(item_schema) => Value::Array(
				items
					.into_iter()
					.map(|item| coerce(item, item_schema, depth + 1))
					.collect(),
			),
			None => Value::Array(items),
		},
		other => other,
	}
}

fn coerce_alternatives(value: Value, alternatives: &[Value], depth: usize) -> Value {
	for alternative in alternatives {
		let coerced = coerce(value.clone(), alternative, depth + 1);
		if coerced != value {
			return coerced;
		}
	}
	value
}

fn coerce_object(
	object: Map<String, Value>,
	schema: &Map<String, Value>,
	depth: usize,
) -> Map<String, Value> {
	let properties = schema.get("properties").and_then(Value::as_object);
	let additional = schema
		.get("additionalProperties")
		.filter(|additional| additional.is_object());

	object
		.into_iter()
		.map(|(key, value)| {
			let property = properties.and_then(|properties| properties.get(&key));
			let value = match property.or(additional) {
				Some(property_schema) => coerce(value, property_schema, depth + 1),
				None => value,
			};
			(key, value)
		})
		.collect()
}

fn coerce_string(text: String, types: &[&str]) -> Value {
	if wants(types, "string") || types.is_empty() {
		return Value::String(text);
	}
	let trimmed = text.trim();
	if wants(types, "integer") {
		if let Ok(integer) = trimmed.parse::<i64>() {
			return Value::from(integer);
		}
		if let Ok(integer) = trimmed.parse::<u64>() {
			return Value::from(integer);
		}
	}
	if wants(types, "number")
		&& let Some(number) = trimmed.parse::<f64>().ok().and_then(Number::from_f64)
	{
		return Value::Number(number);
	}
	if wants(types, "boolean") {
		match trimmed {
			"true" => return Value::Bool(true),
			"false" => return Value::Bool(false),
			_ => {}
		}
	}
	Value::String(text)
}

fn integral(number: &Number) -> Option<Number> {
	let float = number.as_f64()?;
	if number.is_f64() && float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
		Some(Number::from(float as i64))
	} else {
		None
	}
}

fn declared_types(schema: &Map<String, Value>) -> Vec<&str> {
	match schema.get("type") {
		Some(Value::String(single)) => vec![single.as_str()],
		Some(Value::Array(many)) => many.iter().filter_map(Value::as_str).collect(),
		_ => Vec::new(),
	}
}

fn wants(types: &[&str], name: &str) -> bool {
	types.contains(&name)
}
