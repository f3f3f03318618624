//! Runtime handles to concrete schema types and the values they validate
//!
//! A [`SchemaType`] carries a Rust type as runtime data: the routine that
//! deserializes into it and serializes back out, plus an optional JSON Schema
//! producer derived through utoipa. Fields are parametrized over a
//! `SchemaType` at construction time, which is what makes forward references
//! possible: the concrete type only has to exist once the field is first used.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use utoipa::{PartialSchema, ToSchema};

use crate::error::{SchemaValidationError, ValidationErrorKind};
use crate::json_schema::JsonSchemaDocument;

type ValidateFn = fn(Value) -> Result<Value, serde_json::Error>;
type DocumentFn = fn() -> JsonSchemaDocument;
type DefaultFn = fn() -> Result<Value, serde_json::Error>;

struct SchemaTypeInner {
	identity: &'static str,
	name: Cow<'static, str>,
	validate: ValidateFn,
	document: Option<DocumentFn>,
	default: Option<DefaultFn>,
}

/// A concrete schema type usable directly for validation
///
/// # Examples
///
/// ```
/// use reinhardt_schema_types::SchemaType;
/// use serde::{Deserialize, Serialize};
/// use utoipa::ToSchema;
///
/// #[derive(Serialize, Deserialize, ToSchema)]
/// struct Point {
///     x: i64,
///     y: i64,
/// }
///
/// let schema = SchemaType::of::<Point>();
/// assert_eq!(schema.name(), "Point");
/// assert!(schema.validate(serde_json::json!({"x": 1, "y": 2})).is_ok());
/// assert!(schema.validate(serde_json::json!({"x": 1})).is_err());
/// ```
#[derive(Clone)]
pub struct SchemaType {
	inner: Arc<SchemaTypeInner>,
}

fn validate_as<T>(value: Value) -> Result<Value, serde_json::Error>
where
	T: Serialize + DeserializeOwned,
{
	let typed: T = serde_json::from_value(value)?;
	serde_json::to_value(&typed)
}

fn document_of<T: ToSchema>() -> JsonSchemaDocument {
	let mut dependencies = Vec::new();
	T::schemas(&mut dependencies);
	JsonSchemaDocument::from_openapi(T::schema(), dependencies)
}

fn partial_document_of<T: PartialSchema>() -> JsonSchemaDocument {
	JsonSchemaDocument::from_openapi(T::schema(), Vec::<(String, utoipa::openapi::RefOr<utoipa::openapi::schema::Schema>)>::new())
}

fn default_of<T: Default + Serialize>() -> Result<Value, serde_json::Error> {
	serde_json::to_value(T::default())
}

impl SchemaType {
	/// Schema for a type deriving serde and utoipa's `ToSchema`.
	pub fn of<T>() -> Self
	where
		T: ToSchema + Serialize + DeserializeOwned + 'static,
	{
		Self::build(
			std::any::type_name::<T>(),
			T::name(),
			validate_as::<T>,
			Some(document_of::<T>),
			None,
		)
	}

	/// Like [`SchemaType::of`], also exposing `T::default()` as the schema's
	/// default instance (used by `exclude_defaults` and export checks).
	pub fn with_defaults<T>() -> Self
	where
		T: ToSchema + Serialize + DeserializeOwned + Default + 'static,
	{
		Self::build(
			std::any::type_name::<T>(),
			T::name(),
			validate_as::<T>,
			Some(document_of::<T>),
			Some(default_of::<T>),
		)
	}

	/// Schema for a type that only implements `PartialSchema`, such as
	/// primitives and std containers.
	pub fn partial<T>(name: &'static str) -> Self
	where
		T: PartialSchema + Serialize + DeserializeOwned + 'static,
	{
		Self::build(
			std::any::type_name::<T>(),
			Cow::Borrowed(name),
			validate_as::<T>,
			Some(partial_document_of::<T>),
			None,
		)
	}

	/// Schema for a type with no JSON Schema description. Introspection emits
	/// an open schema for it and lax coercion leaves its input untouched.
	pub fn opaque<T>(name: impl Into<Cow<'static, str>>) -> Self
	where
		T: Serialize + DeserializeOwned + 'static,
	{
		Self::build(
			std::any::type_name::<T>(),
			name.into(),
			validate_as::<T>,
			None,
			None,
		)
	}

	fn build(
		identity: &'static str,
		name: Cow<'static, str>,
		validate: ValidateFn,
		document: Option<DocumentFn>,
		default: Option<DefaultFn>,
	) -> Self {
		Self {
			inner: Arc::new(SchemaTypeInner {
				identity,
				name,
				validate,
				document,
				default,
			}),
		}
	}

	/// Stable identity of the underlying Rust type
	pub fn identity(&self) -> &str {
		self.inner.identity
	}

	/// Short name used in textual schema references
	pub fn name(&self) -> &str {
		&self.inner.name
	}

	/// Convert `value` into the schema type and back, yielding its canonical
	/// JSON form.
	pub fn validate(&self, value: Value) -> Result<Value, SchemaValidationError> {
		(self.inner.validate)(value)
			.map_err(|error| SchemaValidationError::from_serde(&error, self.identity()))
	}

	pub fn json_schema_document(&self) -> Option<JsonSchemaDocument> {
		self.inner.document.map(|document| document())
	}

	/// Canonical JSON of the type's default instance, when one was declared.
	pub fn default_instance(&self) -> Option<Value> {
		self.inner.default.and_then(|default| default().ok())
	}
}

impl PartialEq for SchemaType {
	fn eq(&self, other: &Self) -> bool {
		self.identity() == other.identity()
	}
}

impl Eq for SchemaType {}

impl fmt::Debug for SchemaType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SchemaType")
			.field("name", &self.name())
			.field("identity", &self.identity())
			.finish()
	}
}

/// A value that passed validation against a resolved schema
///
/// Holds the canonical JSON produced by the schema plus the schema's identity.
/// It can only be produced by validation, so code holding a `SchemaValue` never
/// sees unchecked JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaValue {
	schema: Arc<str>,
	value: Value,
}

impl SchemaValue {
	pub(crate) fn new(schema: impl Into<Arc<str>>, value: Value) -> Self {
		Self {
			schema: schema.into(),
			value,
		}
	}

	/// Identity of the schema this value was validated against
	pub fn schema_identity(&self) -> &str {
		&self.schema
	}

	pub fn as_json(&self) -> &Value {
		&self.value
	}

	pub fn into_json(self) -> Value {
		self.value
	}

	pub fn is_null(&self) -> bool {
		self.value.is_null()
	}

	/// Deserialize into the concrete Rust type.
	pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T, SchemaValidationError> {
		serde_json::from_value(self.value.clone())
			.map_err(|error| SchemaValidationError::from_serde(&error, &self.schema))
	}
}

/// Raw input handed to an adapter before validation
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
	/// A value already validated against some schema
	Instance(SchemaValue),
	/// JSON-compatible data
	Json(Value),
	/// Text, treated as a string value unless an operation decodes it as JSON
	Text(String),
	/// Bytes, same treatment as text
	Bytes(Vec<u8>),
}

impl RawValue {
	/// Serialize a typed value into raw JSON input.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_schema_types::RawValue;
	///
	/// let raw = RawValue::from_serialize(&vec![1, 2, 3]).unwrap();
	/// assert_eq!(raw, RawValue::Json(serde_json::json!([1, 2, 3])));
	/// ```
	pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, SchemaValidationError> {
		serde_json::to_value(value).map(RawValue::Json).map_err(|error| {
			SchemaValidationError::new(
				ValidationErrorKind::WrongType,
				error.to_string(),
				std::any::type_name::<T>(),
			)
		})
	}

	pub fn is_null(&self) -> bool {
		match self {
			RawValue::Instance(value) => value.is_null(),
			RawValue::Json(value) => value.is_null(),
			RawValue::Text(_) | RawValue::Bytes(_) => false,
		}
	}

	/// The JSON this raw value stands for, without decoding text.
	pub fn into_json(self) -> Value {
		match self {
			RawValue::Instance(value) => value.into_json(),
			RawValue::Json(value) => value,
			RawValue::Text(text) => Value::String(text),
			RawValue::Bytes(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
		}
	}
}

impl From<SchemaValue> for RawValue {
	fn from(value: SchemaValue) -> Self {
		RawValue::Instance(value)
	}
}

impl From<Value> for RawValue {
	fn from(value: Value) -> Self {
		RawValue::Json(value)
	}
}

impl From<String> for RawValue {
	fn from(value: String) -> Self {
		RawValue::Text(value)
	}
}

impl From<&str> for RawValue {
	fn from(value: &str) -> Self {
		RawValue::Text(value.to_string())
	}
}

impl From<Vec<u8>> for RawValue {
	fn from(value: Vec<u8>) -> Self {
		RawValue::Bytes(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde::Deserialize;
	use serde_json::json;

	#[derive(Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
	struct Counter {
		count: i64,
		#[serde(default = "default_size")]
		size: f64,
	}

	fn default_size() -> f64 {
		1.0
	}

	#[rstest]
	fn test_validate_fills_serde_defaults() {
		let schema = SchemaType::of::<Counter>();

		let canonical = schema.validate(json!({"count": 5})).unwrap();

		assert_eq!(canonical, json!({"count": 5, "size": 1.0}));
	}

	#[rstest]
	fn test_identity_distinguishes_types() {
		let counter = SchemaType::of::<Counter>();
		let opaque = SchemaType::opaque::<Value>("any");

		assert_ne!(counter, opaque);
		assert_eq!(counter, SchemaType::of::<Counter>());
		assert!(counter.identity().ends_with("Counter"));
	}

	#[rstest]
	fn test_default_instance_only_when_declared() {
		assert!(SchemaType::of::<Counter>().default_instance().is_none());

		let defaulted = SchemaType::with_defaults::<Counter>();
		assert_eq!(
			defaulted.default_instance(),
			Some(json!({"count": 0, "size": 0.0}))
		);
	}

	#[rstest]
	fn test_opaque_has_no_document() {
		let schema = SchemaType::opaque::<Vec<String>>("list[str]");

		assert!(schema.json_schema_document().is_none());
		assert_eq!(schema.name(), "list[str]");
	}

	#[rstest]
	fn test_schema_value_to_typed() {
		let schema = SchemaType::of::<Counter>();
		let canonical = schema.validate(json!({"count": 2, "size": 3.5})).unwrap();
		let value = SchemaValue::new(schema.identity(), canonical);

		let typed: Counter = value.to_typed().unwrap();

		assert_eq!(typed, Counter { count: 2, size: 3.5 });
	}

	#[rstest]
	#[case(RawValue::Json(Value::Null), true)]
	#[case(RawValue::Text(String::new()), false)]
	#[case(RawValue::Json(json!({})), false)]
	fn test_raw_value_is_null(#[case] raw: RawValue, #[case] expected: bool) {
		assert_eq!(raw.is_null(), expected);
	}
}
