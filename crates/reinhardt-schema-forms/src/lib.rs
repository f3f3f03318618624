//! Form fields for schema-typed JSON data
//!
//! [`SchemaFormField`] decodes submitted JSON text, validates it against a
//! schema and reports mismatches as form errors. Empty submissions clean to
//! `null` when the field is nullable, either explicitly through `allow_null`
//! or because the schema itself accepts `null`.

pub mod field;
pub mod schema_field;
pub mod widget;

pub use field::{FieldError, FieldResult, FormField};
pub use schema_field::{BoundData, SchemaFormField};
pub use widget::{JsonFormSchemaWidget, Textarea, Widget};
