//! # Reinhardt Schema Field
//!
//! Schema-typed JSON fields for Reinhardt models, forms and REST APIs.
//!
//! Structured data is described by ordinary Rust types deriving `serde` and
//! `utoipa::ToSchema`. The same schema then backs a model field stored in a
//! JSON column, the form field editing it and the REST serializer field,
//! parser and renderer exchanging it over HTTP.
//!
//! ## Feature Flags
//!
//! - `orm` - [`SchemaField`] model field, attribute descriptors and system checks
//! - `forms` - [`SchemaFormField`] and the JSON widgets
//! - `rest` - serializer field, parser, renderer and OpenAPI introspection
//! - `full` (default) - all of the above
//!
//! ## Quick Example
//!
//! ```rust
//! # #[cfg(feature = "orm")]
//! # {
//! use reinhardt_schema_field::prelude::*;
//! use serde_json::json;
//! use utoipa::ToSchema;
//!
//! #[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
//! struct Address {
//!     street: String,
//!     city: String,
//! }
//!
//! let locals = Namespace::new("shop");
//! locals.register("Address", SchemaType::of::<Address>());
//! let meta = ModelMeta::new(Owner::new("shop", "Customer").with_locals(locals))
//!     .add_field("address", SchemaField::new("Address").null(true));
//!
//! let field = meta.field("address").unwrap();
//! assert!(field.check().is_empty());
//! assert_eq!(
//!     field.get_prep_value(json!({"street": "Main St", "city": "Springfield"})),
//!     Some(DbValue::Json(json!({"street": "Main St", "city": "Springfield"}))),
//! );
//! # }
//! ```

pub mod types;

#[cfg(feature = "forms")]
pub mod forms;
#[cfg(feature = "orm")]
pub mod orm;
#[cfg(feature = "rest")]
pub mod rest;

// Re-export schema primitives
pub use reinhardt_schema_types::{
	ExportKwargs, Namespace, Owner, RawValue, SchemaAdapter, SchemaError, SchemaReference,
	SchemaType, SchemaValue, register_schema,
};

// Re-export model fields
#[cfg(feature = "orm")]
pub use reinhardt_schema_orm::{CheckMessage, DbValue, ModelInstance, ModelMeta, SchemaField};

// Re-export form fields
#[cfg(feature = "forms")]
pub use reinhardt_schema_forms::{FormField, SchemaFormField};

// Re-export REST integration
#[cfg(feature = "rest")]
pub use reinhardt_schema_rest::{
	Parser, Renderer, SchemaIntrospector, SchemaParser, SchemaRenderer, SchemaSerializerField,
};

/// Prelude module for convenient imports
pub mod prelude {
	pub use crate::{
		ExportKwargs, Namespace, Owner, SchemaAdapter, SchemaReference, SchemaType, SchemaValue,
	};

	// External
	pub use serde::{Deserialize, Serialize};

	#[cfg(feature = "orm")]
	pub use crate::{DbValue, ModelInstance, ModelMeta, SchemaField};

	#[cfg(feature = "forms")]
	pub use crate::{FormField, SchemaFormField};

	#[cfg(feature = "rest")]
	pub use crate::{
		Parser, Renderer, SchemaIntrospector, SchemaParser, SchemaRenderer, SchemaSerializerField,
	};
}
