use std::sync::Arc;

use bytes::Bytes;
use reinhardt_schema_field::orm::DbValue;
use reinhardt_schema_field::prelude::*;
use reinhardt_schema_integration_tests::{Dimensions, product_meta};
use rstest::rstest;
use serde_json::json;

#[rstest]
fn test_model_form_and_serializer_agree() {
	// Arrange
	let meta = product_meta();
	let field = meta.field("dimensions").unwrap();
	let form_field = field.formfield();
	let serializer_field = SchemaSerializerField::from_adapter(field.adapter().clone());

	// Act
	let cleaned = form_field.clean(Some(&json!(r#"{"width": "2", "height": 3}"#))).unwrap();
	let stored = field.get_prep_value(cleaned.clone());
	let represented = serializer_field.to_representation(cleaned).unwrap();

	// Assert
	assert_eq!(stored, Some(DbValue::Json(json!({"width": 2.0, "height": 3.0}))));
	assert_eq!(represented, json!({"width": 2.0, "height": 3.0}));
}

#[rstest]
fn test_row_round_trip_through_instance() {
	let meta = product_meta();
	let mut instance = ModelInstance::new(Arc::clone(&meta)).unwrap();

	instance
		.set("dimensions", json!({"width": 1, "height": 1, "unit": "cm"}))
		.unwrap();
	let row = instance.to_db_row();

	assert_eq!(
		row.get("dimensions"),
		Some(&Some(DbValue::Json(json!({"width": 1.0, "height": 1.0, "unit": "cm"}))))
	);
}

#[tokio::test]
async fn test_parsed_body_renders_back() {
	let schema = SchemaType::of::<Dimensions>();
	let parser = SchemaParser::new(schema.clone());
	let renderer = SchemaRenderer::with_config(schema, ExportKwargs::new().with_exclude_none(true));

	let parsed = parser
		.parse(Some("application/json"), Bytes::from_static(br#"{"width": 4, "height": "5"}"#), None)
		.await
		.unwrap();
	let rendered = renderer.render(&parsed.into(), None).await.unwrap();

	assert_eq!(
		serde_json::from_slice::<serde_json::Value>(&rendered).unwrap(),
		json!({"width": 4.0, "height": 5.0})
	);
}
