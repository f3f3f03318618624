//! Schema references, adapters and export options.

pub use reinhardt_schema_types::*;
