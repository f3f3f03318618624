//! Response renderer dumping schema values as JSON

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use reinhardt_schema_types::{
	ExportKwargs, RawValue, SchemaAdapter, SchemaError, SchemaReference, SchemaValue,
};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::warn;

use crate::mixins::AdapterSource;

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
	#[error("SchemaRenderer requires a schema to render raw data.")]
	MissingSchema,

	#[error(transparent)]
	Schema(#[from] SchemaError),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Per-response overrides and flags passed to the renderer
#[derive(Debug, Clone, Default)]
pub struct RendererContext {
	pub renderer_schema: Option<SchemaReference>,
	pub renderer_config: Option<ExportKwargs>,
	/// Error bodies are rendered as they are, bypassing the schema
	pub is_error_response: bool,
}

impl RendererContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_schema(mut self, schema: impl Into<SchemaReference>) -> Self {
		self.renderer_schema = Some(schema.into());
		self
	}

	pub fn with_config(mut self, config: ExportKwargs) -> Self {
		self.renderer_config = Some(config);
		self
	}

	pub fn error_response(mut self) -> Self {
		self.is_error_response = true;
		self
	}
}

/// Data handed to the renderer by a view
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPayload {
	Instance(SchemaValue),
	List(Vec<SchemaValue>),
	Map(BTreeMap<String, SchemaValue>),
	Json(Value),
}

impl RenderPayload {
	fn to_json(&self) -> Value {
		match self {
			RenderPayload::Instance(value) => value.as_json().clone(),
			RenderPayload::List(values) => {
				Value::Array(values.iter().map(|value| value.as_json().clone()).collect())
			}
			RenderPayload::Map(values) => Value::Object(
				values
					.iter()
					.map(|(key, value)| (key.clone(), value.as_json().clone()))
					.collect(),
			),
			RenderPayload::Json(value) => value.clone(),
		}
	}
}

impl From<SchemaValue> for RenderPayload {
	fn from(value: SchemaValue) -> Self {
		RenderPayload::Instance(value)
	}
}

impl From<Vec<SchemaValue>> for RenderPayload {
	fn from(values: Vec<SchemaValue>) -> Self {
		RenderPayload::List(values)
	}
}

impl From<Value> for RenderPayload {
	fn from(value: Value) -> Self {
		RenderPayload::Json(value)
	}
}

#[async_trait]
pub trait Renderer: Send + Sync {
	fn media_type(&self) -> String;

	fn media_types(&self) -> Vec<String> {
		vec![self.media_type()]
	}

	fn format(&self) -> Option<&str> {
		None
	}

	async fn render(&self, data: &RenderPayload, context: Option<&RendererContext>) -> RenderResult<Bytes>;
}

/// Renders response data validated against a schema
#[derive(Debug, Clone, Default)]
pub struct SchemaRenderer {
	adapter: Option<SchemaAdapter>,
}

impl SchemaRenderer {
	pub fn new(schema: impl Into<SchemaReference>) -> Self {
		Self::with_config(schema, ExportKwargs::new())
	}

	pub fn with_config(schema: impl Into<SchemaReference>, config: ExportKwargs) -> Self {
		Self {
			adapter: Some(SchemaAdapter::from_type(schema, config)),
		}
	}

	/// Renderer dumping instances as they are unless a context supplies a
	/// schema
	pub fn unconfigured() -> Self {
		Self::default()
	}

	fn render_with(&self, adapter: &SchemaAdapter, data: &RenderPayload) -> RenderResult<Bytes> {
		let raw = match data {
			RenderPayload::Instance(instance) => wrap_single_item(adapter, instance)?,
			RenderPayload::Json(value) => RawValue::Json(value.clone()),
			other => RawValue::Json(other.to_json()),
		};
		match adapter.validate_python(raw) {
			Ok(value) => Ok(Bytes::from(adapter.dump_json(&value))),
			Err(error) if error.is_input_error() => {
				warn!(error = %error, "response data does not match the renderer schema");
				Ok(Bytes::from(json!({"error": error.to_string()}).to_string()))
			}
			Err(error) => Err(error.into()),
		}
	}
}

// A single instance of the item schema renders as a one-element list.
fn wrap_single_item(adapter: &SchemaAdapter, instance: &SchemaValue) -> RenderResult<RawValue> {
	let resolved = adapter.resolved_schema().map_err(SchemaError::from)?;
	let wraps = resolved
		.item_schema()
		.is_some_and(|item| item.identity() == instance.schema_identity());
	Ok(if wraps {
		RawValue::Json(Value::Array(vec![instance.as_json().clone()]))
	} else {
		RawValue::Instance(instance.clone())
	})
}

impl AdapterSource for SchemaRenderer {
	fn default_adapter(&self) -> Option<&SchemaAdapter> {
		self.adapter.as_ref()
	}
}

#[async_trait]
impl Renderer for SchemaRenderer {
	fn media_type(&self) -> String {
		"application/json".to_string()
	}

	fn format(&self) -> Option<&str> {
		Some("json")
	}

	async fn render(&self, data: &RenderPayload, context: Option<&RendererContext>) -> RenderResult<Bytes> {
		if context.is_some_and(|context| context.is_error_response) {
			return Ok(Bytes::from(data.to_json().to_string()));
		}
		let adapter = self.resolve_adapter(
			context.and_then(|context| context.renderer_schema.as_ref()),
			context.and_then(|context| context.renderer_config.as_ref()),
		);
		match (adapter, data) {
			(Some(adapter), data) => self.render_with(&adapter, data),
			(None, RenderPayload::Json(_)) => Err(RenderError::MissingSchema),
			(None, data) => Ok(Bytes::from(data.to_json().to_string())),
		}
	}
}
