//! OpenAPI introspection of schema-typed fields, parsers and renderers
//!
//! JSON Schema fragments come from the resolved schema with nested component
//! schemas inlined, so each fragment stands on its own. Named fragments can be
//! registered as components and referenced with `$ref`.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use reinhardt_schema_types::{ResolvedSchema, SchemaAdapter, open_schema};
use serde_json::Value;
use utoipa::openapi::{
	Components, ComponentsBuilder, RefOr, Required, Response, ResponseBuilder,
	content::ContentBuilder,
	request_body::{RequestBody, RequestBodyBuilder},
	schema::{ObjectBuilder, Schema},
};

use crate::fields::SchemaSerializerField;

/// Self-contained JSON Schema of `resolved`
pub fn json_schema_fragment(resolved: &ResolvedSchema) -> Value {
	resolved.json_schema()
}

/// JSON Schema of the adapter's schema, or an open schema when it cannot be
/// resolved yet.
pub fn adapter_fragment(adapter: &SchemaAdapter) -> Value {
	match adapter.prepared_schema() {
		Ok(prepared) => prepared.json_schema().clone(),
		Err(error) => {
			tracing::debug!(error = %error, "schema unavailable for introspection");
			open_schema()
		}
	}
}

/// Convert a JSON Schema fragment into an OpenAPI schema object.
pub fn to_openapi_schema(fragment: Value) -> RefOr<Schema> {
	serde_json::from_value::<RefOr<Schema>>(fragment).unwrap_or_else(|error| {
		tracing::debug!(error = %error, "fragment is not representable, using an open schema");
		RefOr::T(Schema::Object(ObjectBuilder::new().build()))
	})
}

/// Builds OpenAPI objects for schema-typed API components and collects named
/// component schemas.
#[derive(Debug, Clone, Default)]
pub struct SchemaIntrospector {
	components: Arc<RwLock<BTreeMap<String, RefOr<Schema>>>>,
}

impl SchemaIntrospector {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn schema(&self, adapter: &SchemaAdapter) -> RefOr<Schema> {
		to_openapi_schema(adapter_fragment(adapter))
	}

	/// Schema of a serializer field. Read-only fields are marked as such.
	pub fn map_field(&self, field: &SchemaSerializerField) -> RefOr<Schema> {
		let mut fragment = adapter_fragment(field.adapter());
		if field.is_read_only()
			&& let Value::Object(object) = &mut fragment
		{
			object.insert("readOnly".to_string(), Value::Bool(true));
		}
		to_openapi_schema(fragment)
	}

	pub fn request_body(&self, adapter: &SchemaAdapter, media_type: &str) -> RequestBody {
		let content = ContentBuilder::new().schema(Some(self.schema(adapter))).build();
		RequestBodyBuilder::new()
			.required(Some(Required::True))
			.content(media_type, content)
			.build()
	}

	pub fn response(&self, adapter: &SchemaAdapter, description: &str) -> Response {
		let content = ContentBuilder::new().schema(Some(self.schema(adapter))).build();
		ResponseBuilder::new()
			.description(description)
			.content("application/json", content)
			.build()
	}

	/// Register the adapter's schema under `name`, replacing any previous
	/// registration.
	pub fn register_component(&self, name: impl Into<String>, adapter: &SchemaAdapter) {
		let name = name.into();
		tracing::debug!(component = %name, "registering schema component");
		self.components.write().insert(name, self.schema(adapter));
	}

	/// `$ref` to a registered component
	pub fn schema_ref(&self, name: &str) -> Option<RefOr<Schema>> {
		self.components.read().contains_key(name).then(|| {
			RefOr::Ref(utoipa::openapi::Ref::new(format!("#/components/schemas/{}", name)))
		})
	}

	pub fn len(&self) -> usize {
		self.components.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.components.read().is_empty()
	}

	pub fn components(&self) -> Components {
		self.components
			.read()
			.iter()
			.fold(ComponentsBuilder::new(), |builder, (name, schema)| {
				builder.schema(name.clone(), schema.clone())
			})
			.build()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use reinhardt_schema_types::{ExportKwargs, SchemaReference, SchemaType};
	use rstest::rstest;
	use serde::{Deserialize, Serialize};
	use serde_json::json;
	use utoipa::ToSchema;

	#[derive(Serialize, Deserialize, ToSchema)]
	struct Pin {
		label: String,
	}

	#[derive(Serialize, Deserialize, ToSchema)]
	struct Board {
		pins: Vec<Pin>,
	}

	fn adapter(reference: impl Into<SchemaReference>) -> SchemaAdapter {
		SchemaAdapter::from_type(reference, ExportKwargs::new())
	}

	#[rstest]
	fn test_nested_schemas_are_inlined() {
		// Arrange
		let adapter = adapter(SchemaType::of::<Board>());

		// Act
		let fragment = adapter_fragment(&adapter);

		// Assert
		assert!(!fragment.to_string().contains("$ref"));
		assert_eq!(fragment["properties"]["pins"]["items"]["properties"]["label"]["type"], "string");
	}

	#[rstest]
	fn test_unresolvable_schema_is_open() {
		let fragment = adapter_fragment(&adapter("Missing"));

		assert_eq!(fragment, json!({}));
	}

	#[rstest]
	fn test_list_fragment() {
		let fragment = json_schema_fragment(adapter(SchemaReference::list("int")).resolved_schema().unwrap());

		assert_eq!(fragment["type"], "array");
		assert_eq!(fragment["items"]["type"], "integer");
	}

	#[rstest]
	fn test_object_fragment_becomes_openapi_object() {
		let schema = to_openapi_schema(adapter_fragment(&adapter(SchemaType::of::<Pin>())));

		assert!(matches!(schema, RefOr::T(Schema::Object(_))));
	}

	#[rstest]
	fn test_read_only_field() {
		let field = SchemaSerializerField::new(SchemaType::of::<Pin>()).read_only(true);

		let schema = SchemaIntrospector::new().map_field(&field);
		let rendered = serde_json::to_value(&schema).unwrap();

		assert_eq!(rendered["readOnly"], true);
	}

	#[rstest]
	fn test_components_and_refs() {
		let introspector = SchemaIntrospector::new();

		introspector.register_component("Pin", &adapter(SchemaType::of::<Pin>()));

		assert_eq!(introspector.len(), 1);
		assert!(introspector.schema_ref("Board").is_none());
		match introspector.schema_ref("Pin") {
			Some(RefOr::Ref(reference)) => assert_eq!(reference.ref_location, "#/components/schemas/Pin"),
			_ => panic!("expected a reference"),
		}
		assert!(introspector.components().schemas.contains_key("Pin"));
	}

	#[rstest]
	fn test_request_body_and_response() {
		let introspector = SchemaIntrospector::new();
		let adapter = adapter(SchemaType::of::<Pin>());

		let body = introspector.request_body(&adapter, "application/json");
		let response = introspector.response(&adapter, "The pin");

		assert!(body.content.contains_key("application/json"));
		assert_eq!(body.required, Some(Required::True));
		assert_eq!(response.description, "The pin");
		assert!(response.content.contains_key("application/json"));
	}
}
