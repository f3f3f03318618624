//! # Reinhardt Schema REST
//!
//! REST framework integration for schema-typed JSON data:
//!
//! - [`SchemaSerializerField`]: validates request fields and dumps response
//!   fields with the field's export options
//! - [`SchemaParser`]: parses JSON request bodies into validated values,
//!   failing with status 400 on malformed or mismatching input
//! - [`SchemaRenderer`]: renders instances, lists and mappings of instances
//! - [`SchemaIntrospector`]: OpenAPI schemas, request bodies and responses
//!
//! Parser and renderer take a schema at construction. A [`ParserContext`] or
//! [`RendererContext`] may override it, along with the export options, for a
//! single request or response.

pub mod fields;
pub mod mixins;
pub mod openapi;
pub mod parsers;
pub mod renderers;

pub use fields::{
	FieldValidationErrors, SchemaSerializerField, SerializerFieldError, SerializerFieldResult,
};
pub use mixins::AdapterSource;
pub use openapi::{SchemaIntrospector, adapter_fragment, json_schema_fragment, to_openapi_schema};
pub use parsers::{ParseError, ParseResult, Parser, ParserContext, SchemaParser};
pub use renderers::{
	RenderError, RenderPayload, RenderResult, Renderer, RendererContext, SchemaRenderer,
};
