use bytes::Bytes;
use reinhardt_schema_rest::{
	ParseError, Parser, RenderPayload, Renderer, RendererContext, SchemaIntrospector, SchemaParser,
	SchemaRenderer, SchemaSerializerField,
};
use reinhardt_schema_types::{ExportKwargs, Owner, SchemaAdapter, SchemaReference, SchemaType};
use rstest::rstest;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
struct Counter {
	count: i64,
	#[serde(default = "one")]
	size: f64,
}

fn one() -> f64 {
	1.0
}

fn counter() -> SchemaReference {
	SchemaType::of::<Counter>().into()
}

#[tokio::test]
async fn test_parser_accepts_matching_body() {
	// Arrange
	let parser = SchemaParser::new(counter());

	// Act
	let value = parser
		.parse(Some("application/json"), Bytes::from_static(br#"{"count": "5"}"#), None)
		.await
		.unwrap();

	// Assert
	assert_eq!(value.as_json(), &json!({"count": 5, "size": 1.0}));
	assert_eq!(value.to_typed::<Counter>().unwrap().count, 5);
}

#[rstest]
#[case(br#"{"count": "#.as_slice())]
#[case(br#"{"size": 2.0}"#.as_slice())]
#[case(br#"[1, 2]"#.as_slice())]
#[tokio::test]
async fn test_parser_rejects_bad_bodies_with_400(#[case] body: &'static [u8]) {
	let parser = SchemaParser::new(counter());

	let error = parser
		.parse(Some("application/json"), Bytes::from_static(body), None)
		.await
		.unwrap_err();

	assert_eq!(error.status_code(), 400);
	assert!(matches!(error, ParseError::Malformed(_) | ParseError::Invalid(_)));
}

#[tokio::test]
async fn test_renderer_wraps_single_instance_for_list_schema() {
	let item = SchemaAdapter::from_type(counter(), ExportKwargs::new())
		.validate_python(json!({"count": 2}))
		.unwrap();
	let renderer = SchemaRenderer::new(SchemaReference::list(counter()));

	let first = renderer.render(&RenderPayload::from(item.clone()), None).await.unwrap();
	let second = renderer.render(&RenderPayload::from(item), None).await.unwrap();

	assert_eq!(first, second);
	assert_eq!(
		serde_json::from_slice::<Value>(&first).unwrap(),
		json!([{"count": 2, "size": 1.0}])
	);
}

#[tokio::test]
async fn test_renderer_context_export_options() {
	let renderer = SchemaRenderer::new(counter());
	let context = RendererContext::new().with_config(ExportKwargs::new().with_exclude(["size"]));

	let rendered = renderer
		.render(&json!({"count": 4, "size": 3.0}).into(), Some(&context))
		.await
		.unwrap();

	assert_eq!(serde_json::from_slice::<Value>(&rendered).unwrap(), json!({"count": 4}));
}

#[rstest]
fn test_serializer_field_and_introspection_share_the_schema() {
	let mut field = SchemaSerializerField::new(SchemaReference::optional(counter()));
	field.bind("stats", &Owner::new("metrics", "GaugeSerializer"));

	let internal = field.run_validation(Some(&Value::Null)).unwrap();
	let representation = field.to_representation(json!({"count": 1})).unwrap();
	let schema = serde_json::to_value(SchemaIntrospector::new().map_field(&field)).unwrap();

	assert!(internal.unwrap().is_null());
	assert_eq!(representation, json!({"count": 1, "size": 1.0}));
	assert!(schema.to_string().contains("count"));
}
