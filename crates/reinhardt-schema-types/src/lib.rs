//! # Reinhardt Schema Types
//!
//! Schema references, lazy schema resolution and export options shared by the
//! schema-typed JSON fields of Reinhardt models, forms and REST APIs.
//!
//! ## Overview
//!
//! Structured data is described by plain Rust types deriving `serde` and
//! `utoipa::ToSchema`. A field declares its schema as a [`SchemaReference`],
//! which may name types that are defined later. The [`SchemaAdapter`] resolves
//! the reference on first use and then converts between raw JSON-compatible
//! data and validated [`SchemaValue`]s.
//!
//! ## Example
//!
//! ```
//! use reinhardt_schema_types::{ExportKwargs, SchemaAdapter, SchemaType, SchemaReference};
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//! use utoipa::ToSchema;
//!
//! #[derive(Serialize, Deserialize, ToSchema)]
//! struct Tag {
//!     label: String,
//! }
//!
//! let adapter = SchemaAdapter::from_type(
//!     SchemaReference::list(SchemaType::of::<Tag>()),
//!     ExportKwargs::new().with_strict(true),
//! );
//!
//! let tags = adapter.validate_json(r#"[{"label": "rust"}]"#).unwrap();
//! assert_eq!(adapter.dump_python(&tags), json!([{"label": "rust"}]));
//! ```
//!
//! ## Forward references
//!
//! Schemas named by text are looked up in the owner's local namespace, the
//! owner's module namespace (see [`register_schema!`]), the global namespace
//! and finally among the built-in `int`, `float`, `str`, `bool` and `any`.

pub mod adapter;
mod coerce;
pub mod error;
pub mod export;
mod json_schema;
pub mod namespace;
pub mod reference;
pub mod resolved;
pub mod schema;
pub mod settings;

pub use adapter::{PreparedSchema, SchemaAdapter};
pub use coerce::coerce_lax;
pub use error::{
	ConfigurationError, DecodeError, SchemaError, SchemaResolutionError, SchemaResult,
	SchemaValidationError, ValidationErrorKind,
};
pub use export::{DecodeHook, DumpOverrides, EXPORT_OPTIONS, EncodeHook, ExportKwargs, Hook};
pub use json_schema::{JsonSchemaDocument, open_schema};
pub use namespace::{
	Namespace, Owner, SchemaRegistration, builtin, global_namespace, module_namespace, qualified_path,
};
pub use reference::{ForwardRef, SchemaMeta, SchemaReference};
pub use resolved::ResolvedSchema;
pub use schema::{RawValue, SchemaType, SchemaValue};
pub use settings::{
	SchemaFieldSettings, configure, register_decode_hook, register_encode_hook,
	reload_settings, settings,
};

#[doc(hidden)]
pub use inventory;
