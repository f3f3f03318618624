//! # Reinhardt Schema ORM
//!
//! Model fields storing schema-typed data in JSON columns.
//!
//! A [`SchemaField`] validates every value it reads or writes against its
//! schema and dumps values using its export options. Declaration problems
//! surface through [`SchemaField::check`] rather than at construction:
//!
//! - `schema_field.E001`: the schema cannot be resolved
//! - `schema_field.E002`: the default does not validate
//! - `schema_field.W003`: `include`/`exclude` drop data the default needs
//!
//! ## Feature Flags
//!
//! - `forms`: [`SchemaField::formfield`] building the matching form field

pub mod checks;
pub mod defaults;
pub mod descriptor;
pub mod expression;
pub mod field;
pub mod schema_field;

pub use checks::{Check, CheckLevel, CheckMessage, CheckRegistry};
pub use defaults::{DefaultFactory, FieldDefault, register_default_factory};
pub use descriptor::{ModelError, ModelInstance, ModelMeta, SchemaAttribute};
pub use expression::{DbValue, FieldValue, QueryExpression};
pub use field::{BaseField, DatabaseDialect, Field, FieldDeconstruction, FieldKwarg};
pub use schema_field::{SCHEMA_FIELD_PATH, SchemaField};
