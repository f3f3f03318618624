//! Serializer field, parser, renderer and OpenAPI introspection.

#[cfg(feature = "rest")]
pub use reinhardt_schema_rest::*;
