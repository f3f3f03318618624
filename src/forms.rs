//! Form fields and widgets for schema-typed JSON data.

#[cfg(feature = "forms")]
pub use reinhardt_schema_forms::*;
