//! JSON Schema documents derived from utoipa and their `$ref` expansion

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

const COMPONENTS_PREFIX: &str = "#/components/schemas/";

/// An open schema that accepts any value
pub fn open_schema() -> Value {
	Value::Object(Map::new())
}

/// Root schema plus the named component schemas it refers to
#[derive(Debug, Clone, PartialEq)]
pub struct JsonSchemaDocument {
	root: Value,
	definitions: BTreeMap<String, Value>,
}

fn to_json<S: Serialize>(schema: S) -> Value {
	serde_json::to_value(schema).unwrap_or_else(|_| open_schema())
}

impl JsonSchemaDocument {
	pub fn new(root: Value, definitions: BTreeMap<String, Value>) -> Self {
		Self { root, definitions }
	}

	pub(crate) fn from_openapi<S, D>(root: S, dependencies: Vec<(String, D)>) -> Self
	where
		S: Serialize,
		D: Serialize,
	{
		let definitions = dependencies
			.into_iter()
			.map(|(name, schema)| (name, to_json(schema)))
			.collect();
		Self::new(to_json(root), definitions)
	}

	pub fn root(&self) -> &Value {
		&self.root
	}

	pub fn definitions(&self) -> &BTreeMap<String, Value> {
		&self.definitions
	}

	/// Inline every `$ref` into a self-contained schema.
	///
	/// References that cannot be found, and references that would recurse into
	/// a component already being expanded, become open schemas.
	///
	/// # Examples
	///
	/// ```
	/// use std::collections::BTreeMap;
	/// use reinhardt_schema_types::JsonSchemaDocument;
	/// use serde_json::json;
	///
	/// let mut definitions = BTreeMap::new();
	/// definitions.insert("Inner".to_string(), json!({"type": "integer"}));
	/// let document = JsonSchemaDocument::new(
	///     json!({"type": "object", "properties": {"a": {"$ref": "#/components/schemas/Inner"}}}),
	///     definitions,
	/// );
	///
	/// let expanded = document.expand();
	/// assert_eq!(expanded["properties"]["a"], json!({"type": "integer"}));
	/// ```
	pub fn expand(&self) -> Value {
		let mut stack = Vec::new();
		self.expand_value(&self.root, &mut stack)
	}

	fn expand_value(&self, value: &Value, stack: &mut Vec<String>) -> Value {
		match value {
			Value::Object(object) => {
				if let Some(Value::String(reference)) = object.get("$ref") {
					return self.expand_reference(reference, object, stack);
				}
				let expanded = object
					.iter()
					.map(|(key, value)| (key.clone(), self.expand_value(value, stack)))
					.collect();
				Value::Object(expanded)
			}
			Value::Array(items) => Value::Array(
				items
					.iter()
					.map(|item| self.expand_value(item, stack))
					.collect(),
			),
			other => other.clone(),
		}
	}

	fn expand_reference(
		&self,
		reference: &str,
		object: &Map<String, Value>,
		stack: &mut Vec<String>,
	) -> Value {
		let name = reference
			.strip_prefix(COMPONENTS_PREFIX)
			.unwrap_or(reference)
			.to_string();
		let Some(target) = self.definitions.get(&name) else {
			tracing::debug!(reference, "unresolvable $ref, emitting open schema");
			return open_schema();
		};
		if stack.contains(&name) {
			return open_schema();
		}

		stack.push(name);
		let mut expanded = self.expand_value(target, stack);
		stack.pop();

		// Sibling keywords next to a `$ref` (title, description) win.
		if let Value::Object(target) = &mut expanded {
			for (key, value) in object.iter().filter(|(key, _)| key.as_str() != "$ref") {
				target.insert(key.clone(), self.expand_value(value, stack));
			}
		}
		expanded
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_missing_reference_is_open() {
		let document = JsonSchemaDocument::new(
			json!({"$ref": "#/components/schemas/Missing"}),
			BTreeMap::new(),
		);

		assert_eq!(document.expand(), open_schema());
	}

	#[rstest]
	fn test_recursive_reference_stops() {
		let mut definitions = BTreeMap::new();
		definitions.insert(
			"Node".to_string(),
			json!({
				"type": "object",
				"properties": {"next": {"$ref": "#/components/schemas/Node"}}
			}),
		);
		let document = JsonSchemaDocument::new(json!({"$ref": "#/components/schemas/Node"}), definitions);

		let expanded = document.expand();

		assert_eq!(expanded["type"], "object");
		assert_eq!(expanded["properties"]["next"], open_schema());
	}

	#[rstest]
	fn test_sibling_keywords_are_kept() {
		let mut definitions = BTreeMap::new();
		definitions.insert("Inner".to_string(), json!({"type": "string"}));
		let document = JsonSchemaDocument::new(
			json!({"$ref": "#/components/schemas/Inner", "description": "doc"}),
			definitions,
		);

		assert_eq!(
			document.expand(),
			json!({"type": "string", "description": "doc"})
		);
	}
}
