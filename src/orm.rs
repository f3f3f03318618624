//! Model fields storing schema-typed data in JSON columns.
//!
//! # Examples
//!
//! ```rust,no_run
//! # #[cfg(feature = "orm")]
//! use reinhardt_schema_field::orm::{SchemaField, register_default_factory};
//! ```

#[cfg(feature = "orm")]
pub use reinhardt_schema_orm::*;
