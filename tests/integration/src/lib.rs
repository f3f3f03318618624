//! Shared fixtures for cross-crate schema field tests

use std::sync::Arc;

use reinhardt_schema_field::prelude::*;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Dimensions {
	pub width: f64,
	pub height: f64,
	#[serde(default)]
	pub unit: Option<String>,
}

/// `catalog.Product` with a nullable `dimensions` field that drops `None`
/// members when dumped
pub fn product_meta() -> Arc<ModelMeta> {
	let locals = Namespace::new("catalog");
	locals.register("Dimensions", SchemaType::of::<Dimensions>());
	let owner = Owner::new("catalog", "Product").with_locals(locals);
	Arc::new(
		ModelMeta::new(owner).add_field(
			"dimensions",
			SchemaField::new("Dimensions")
				.null(true)
				.export(ExportKwargs::new().with_exclude_none(true)),
		),
	)
}
