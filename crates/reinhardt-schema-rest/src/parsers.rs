//! Request body parser validating JSON against a schema
//!
//! ## Example
//!
//! ```
//! use bytes::Bytes;
//! use reinhardt_schema_rest::{Parser, SchemaParser};
//! use reinhardt_schema_types::SchemaReference;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let parser = SchemaParser::new(SchemaReference::list("int"));
//! let value = parser
//!     .parse(Some("application/json"), Bytes::from("[1, \"2\"]"), None)
//!     .await
//!     .unwrap();
//! assert_eq!(value.as_json(), &json!([1, 2]));
//! # }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use reinhardt_schema_types::{ExportKwargs, SchemaAdapter, SchemaError, SchemaReference, SchemaValue};
use thiserror::Error;

use crate::mixins::AdapterSource;

/// Failure to parse a request body
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
	#[error("JSON parse error - {0}")]
	Malformed(String),

	#[error("{0}")]
	Invalid(String),

	#[error("Unsupported media type \"{0}\" in request.")]
	UnsupportedMediaType(String),

	/// No schema is configured or it cannot be resolved
	#[error("{0}")]
	ImproperlyConfigured(String),
}

impl ParseError {
	/// HTTP status of the error response
	pub fn status_code(&self) -> u16 {
		match self {
			ParseError::Malformed(_) | ParseError::Invalid(_) => 400,
			ParseError::UnsupportedMediaType(_) => 415,
			ParseError::ImproperlyConfigured(_) => 500,
		}
	}

	/// Error message for the response body
	pub fn detail(&self) -> String {
		self.to_string()
	}
}

impl From<SchemaError> for ParseError {
	fn from(error: SchemaError) -> Self {
		match error {
			SchemaError::Decode(error) => ParseError::Malformed(error.to_string()),
			SchemaError::Validation(error) => ParseError::Invalid(error.to_string()),
			other => ParseError::ImproperlyConfigured(other.to_string()),
		}
	}
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Per-request overrides of the parser's schema and export options
#[derive(Debug, Clone, Default)]
pub struct ParserContext {
	pub parser_schema: Option<SchemaReference>,
	pub parser_config: Option<ExportKwargs>,
}

impl ParserContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_schema(mut self, schema: impl Into<SchemaReference>) -> Self {
		self.parser_schema = Some(schema.into());
		self
	}

	pub fn with_config(mut self, config: ExportKwargs) -> Self {
		self.parser_config = Some(config);
		self
	}
}

#[async_trait]
pub trait Parser: Send + Sync {
	fn media_types(&self) -> Vec<String>;

	async fn parse(
		&self,
		content_type: Option<&str>,
		body: Bytes,
		context: Option<&ParserContext>,
	) -> ParseResult<SchemaValue>;

	/// Whether the parser handles `content_type`, ignoring its parameters.
	fn can_parse(&self, content_type: Option<&str>) -> bool {
		let Some(content_type) = content_type else {
			return true;
		};
		let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
		self.media_types().iter().any(|media_type| {
			media_type == &essence
				|| media_type
					.strip_prefix("application/*")
					.is_some_and(|suffix| essence.starts_with("application/") && essence.ends_with(suffix))
		})
	}
}

/// Parses JSON request bodies into values validated by a fixed schema
#[derive(Debug, Clone, Default)]
pub struct SchemaParser {
	adapter: Option<SchemaAdapter>,
}

impl SchemaParser {
	pub fn new(schema: impl Into<SchemaReference>) -> Self {
		Self::with_config(schema, ExportKwargs::new())
	}

	pub fn with_config(schema: impl Into<SchemaReference>, config: ExportKwargs) -> Self {
		Self {
			adapter: Some(SchemaAdapter::from_type(schema, config)),
		}
	}

	/// Parser relying on each request context to supply the schema
	pub fn unconfigured() -> Self {
		Self::default()
	}
}

impl AdapterSource for SchemaParser {
	fn default_adapter(&self) -> Option<&SchemaAdapter> {
		self.adapter.as_ref()
	}
}

#[async_trait]
impl Parser for SchemaParser {
	fn media_types(&self) -> Vec<String> {
		vec!["application/json".to_string(), "application/*+json".to_string()]
	}

	async fn parse(
		&self,
		content_type: Option<&str>,
		body: Bytes,
		context: Option<&ParserContext>,
	) -> ParseResult<SchemaValue> {
		if !self.can_parse(content_type) {
			return Err(ParseError::UnsupportedMediaType(
				content_type.unwrap_or_default().to_string(),
			));
		}
		let adapter = self
			.resolve_adapter(
				context.and_then(|context| context.parser_schema.as_ref()),
				context.and_then(|context| context.parser_config.as_ref()),
			)
			.ok_or_else(|| {
				ParseError::ImproperlyConfigured("SchemaParser requires a schema to be configured.".to_string())
			})?;

		let value = adapter.validate_json(&body)?;
		tracing::debug!(schema = %value.schema_identity(), bytes = body.len(), "parsed request body");
		Ok(value)
	}
}
