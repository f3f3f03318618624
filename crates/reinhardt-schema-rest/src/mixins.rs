//! Adapter selection shared by the parser and renderer

use std::borrow::Cow;

use reinhardt_schema_types::{ExportKwargs, SchemaAdapter, SchemaReference};

/// A component holding a default adapter that request or response context
/// may override.
pub trait AdapterSource {
	fn default_adapter(&self) -> Option<&SchemaAdapter>;

	/// Adapter to use for one request or response. A schema or export
	/// configuration supplied by the context replaces the configured one.
	fn resolve_adapter(
		&self,
		schema: Option<&SchemaReference>,
		config: Option<&ExportKwargs>,
	) -> Option<Cow<'_, SchemaAdapter>> {
		let default = self.default_adapter();
		if schema.is_none() && config.is_none() {
			return default.map(Cow::Borrowed);
		}

		let reference = schema.cloned().or_else(|| default.and_then(|adapter| adapter.reference().cloned()))?;
		let export = config
			.cloned()
			.or_else(|| default.map(|adapter| adapter.export_kwargs().clone()))
			.unwrap_or_default();
		tracing::debug!(schema = %reference, "using schema adapter from context");
		Some(Cow::Owned(SchemaAdapter::from_type(reference, export)))
	}
}
