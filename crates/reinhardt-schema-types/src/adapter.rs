//! The adapter every schema field validates and dumps through

use std::fmt;

use once_cell::sync::OnceCell;
use serde_json::Value;

use crate::coerce::coerce_lax;
use crate::error::{
	DecodeError, SchemaResolutionError, SchemaResult, SchemaValidationError, ValidationErrorKind,
};
use crate::export::{DumpOverrides, ExportKwargs};
use crate::namespace::Owner;
use crate::reference::SchemaReference;
use crate::resolved::ResolvedSchema;
use crate::schema::{RawValue, SchemaValue};
use crate::settings;

/// A resolved schema together with its expanded JSON Schema
#[derive(Debug, Clone)]
pub struct PreparedSchema {
	resolved: ResolvedSchema,
	json_schema: Value,
}

impl PreparedSchema {
	pub fn resolved(&self) -> &ResolvedSchema {
		&self.resolved
	}

	pub fn json_schema(&self) -> &Value {
		&self.json_schema
	}

	pub fn identity(&self) -> String {
		self.resolved.identity()
	}
}

/// Bridges a schema reference with raw JSON-compatible data
///
/// The schema is resolved on first use and cached until the adapter is bound
/// again. Resolution failures are not cached.
///
/// # Examples
///
/// ```
/// use reinhardt_schema_types::{ExportKwargs, SchemaAdapter, SchemaType};
/// use serde::{Deserialize, Serialize};
/// use serde_json::json;
/// use utoipa::ToSchema;
///
/// #[derive(Serialize, Deserialize, ToSchema)]
/// struct Counter {
///     count: i64,
///     #[serde(default = "one")]
///     size: f64,
/// }
///
/// fn one() -> f64 {
///     1.0
/// }
///
/// let adapter = SchemaAdapter::from_type(SchemaType::of::<Counter>(), ExportKwargs::new());
/// let value = adapter.validate_python(json!({"count": "5"})).unwrap();
/// assert_eq!(value.as_json(), &json!({"count": 5, "size": 1.0}));
/// ```
#[derive(Clone)]
pub struct SchemaAdapter {
	reference: Option<SchemaReference>,
	owner: Option<Owner>,
	attname: Option<String>,
	allow_null: Option<bool>,
	export: ExportKwargs,
	prepared: OnceCell<PreparedSchema>,
}

impl SchemaAdapter {
	pub fn new(
		reference: Option<SchemaReference>,
		owner: Option<Owner>,
		attname: Option<String>,
		allow_null: Option<bool>,
		export: ExportKwargs,
	) -> Self {
		Self {
			reference,
			owner,
			attname,
			allow_null,
			export,
			prepared: OnceCell::new(),
		}
	}

	/// Adapter for an explicit schema, not bound to any owner.
	pub fn from_type(reference: impl Into<SchemaReference>, export: ExportKwargs) -> Self {
		Self::new(Some(reference.into()), None, None, None, export)
	}

	/// Adapter taking its schema from the owner's annotation of `attname`.
	pub fn from_annotation(owner: Owner, attname: impl Into<String>, export: ExportKwargs) -> Self {
		Self::new(None, Some(owner), Some(attname.into()), None, export)
	}

	pub fn with_allow_null(mut self, allow_null: Option<bool>) -> Self {
		self.allow_null = allow_null;
		self.prepared = OnceCell::new();
		self
	}

	pub fn reference(&self) -> Option<&SchemaReference> {
		self.reference.as_ref()
	}

	pub fn owner(&self) -> Option<&Owner> {
		self.owner.as_ref()
	}

	pub fn attname(&self) -> Option<&str> {
		self.attname.as_deref()
	}

	pub fn allow_null(&self) -> Option<bool> {
		self.allow_null
	}

	pub fn export_kwargs(&self) -> &ExportKwargs {
		&self.export
	}

	/// Whether the adapter is bound to an attribute of an owner.
	pub fn is_bound(&self) -> bool {
		self.owner.is_some() && self.attname.is_some()
	}

	/// Bind to attribute `attname` of `owner`, dropping the cached schema.
	pub fn bind(&mut self, owner: Owner, attname: impl Into<String>) -> &mut Self {
		let attname = attname.into();
		if let Some(explicit) = &self.reference
			&& let Some(annotated) = owner.annotation(&attname)
			&& disagrees(explicit, annotated, &owner)
		{
			tracing::warn!(
				owner = %owner.qualified_name(),
				attname = %attname,
				explicit = %explicit,
				annotated = %annotated,
				"explicit schema differs from the annotation, using the explicit schema"
			);
		}
		tracing::debug!(owner = %owner.qualified_name(), attname = %attname, "binding schema adapter");
		self.owner = Some(owner);
		self.attname = Some(attname);
		self.prepared = OnceCell::new();
		self
	}

	/// Resolve the schema, failing if it cannot be.
	pub fn validate_schema(&self) -> Result<(), SchemaResolutionError> {
		self.prepared_schema().map(|_| ())
	}

	pub fn prepared_schema(&self) -> Result<&PreparedSchema, SchemaResolutionError> {
		self.prepared.get_or_try_init(|| self.prepare())
	}

	pub fn resolved_schema(&self) -> Result<&ResolvedSchema, SchemaResolutionError> {
		self.prepared_schema().map(PreparedSchema::resolved)
	}

	fn prepare(&self) -> Result<PreparedSchema, SchemaResolutionError> {
		let owner = self.owner.as_ref();
		let reference = match (&self.reference, owner, &self.attname) {
			(Some(reference), _, _) => reference,
			(None, Some(owner), Some(attname)) => {
				owner
					.annotation(attname)
					.ok_or_else(|| SchemaResolutionError::MissingAnnotation {
						owner: owner.name().to_string(),
						attname: attname.clone(),
					})?
			}
			_ => return Err(SchemaResolutionError::Unbound),
		};

		let mut resolved = reference.resolve(owner)?;
		if self.allow_null == Some(true) {
			resolved = resolved.nullable();
		}
		let json_schema = resolved.json_schema();
		tracing::debug!(schema = %resolved.display_name(), "prepared schema");
		Ok(PreparedSchema {
			resolved,
			json_schema,
		})
	}

	/// Expanded JSON Schema of the resolved schema
	pub fn json_schema(&self) -> Result<Value, SchemaResolutionError> {
		self.prepared_schema().map(|prepared| prepared.json_schema.clone())
	}

	/// Whether `null` is accepted: `allow_null` when set, otherwise whatever
	/// the resolved schema says.
	pub fn accepts_null(&self) -> Result<bool, SchemaResolutionError> {
		match self.allow_null {
			Some(allow_null) => Ok(allow_null),
			None => self.resolved_schema().map(ResolvedSchema::accepts_null),
		}
	}

	/// Field options merged over the process-wide defaults
	pub fn effective_export(&self) -> ExportKwargs {
		self.export.or_defaults(&settings::export_defaults())
	}

	/// Validate JSON-compatible data. Values already validated against the
	/// same schema are returned unchanged.
	pub fn validate_python(&self, value: impl Into<RawValue>) -> SchemaResult<SchemaValue> {
		self.validate_python_with(value.into(), None)
	}

	/// Like [`validate_python`](Self::validate_python) with an explicit
	/// strictness overriding the configured one.
	pub fn validate_python_with(&self, value: RawValue, strict: Option<bool>) -> SchemaResult<SchemaValue> {
		let prepared = self.prepared_schema()?;
		let identity = prepared.identity();
		let json = match value {
			RawValue::Instance(instance) if instance.schema_identity() == identity => {
				return Ok(instance);
			}
			other => other.into_json(),
		};
		if json.is_null() && self.allow_null == Some(true) {
			return Ok(SchemaValue::new(identity, Value::Null));
		}
		self.validate_value(prepared, identity, json, strict)
	}

	/// Decode `data` as a JSON document and validate it.
	pub fn validate_json(&self, data: impl AsRef<[u8]>) -> SchemaResult<SchemaValue> {
		self.validate_json_with(data, None)
	}

	pub fn validate_json_with(&self, data: impl AsRef<[u8]>, strict: Option<bool>) -> SchemaResult<SchemaValue> {
		let prepared = self.prepared_schema()?;
		let json: Value = serde_json::from_slice(data.as_ref()).map_err(DecodeError::from)?;
		self.validate_value(prepared, prepared.identity(), json, strict)
	}

	fn validate_value(
		&self,
		prepared: &PreparedSchema,
		identity: String,
		json: Value,
		strict: Option<bool>,
	) -> SchemaResult<SchemaValue> {
		let export = self.effective_export();
		let json = match export.dec_hook() {
			Some(hook) => hook.call(json).map_err(|message| {
				SchemaValidationError::new(ValidationErrorKind::ConstraintViolation, message, identity.as_str())
			})?,
			None => json,
		};
		let json = if strict.unwrap_or_else(|| export.is_strict()) {
			json
		} else {
			coerce_lax(json, &prepared.json_schema)
		};
		let canonical = prepared.resolved.validate(json)?;
		Ok(SchemaValue::new(identity, canonical))
	}

	/// Dump a validated value to JSON-compatible data, applying the export
	/// filters.
	pub fn dump_python(&self, value: &SchemaValue) -> Value {
		self.dump_python_with(value, &DumpOverrides::new())
	}

	pub fn dump_python_with(&self, value: &SchemaValue, overrides: &DumpOverrides) -> Value {
		if value.is_null() {
			return Value::Null;
		}
		let export = self.effective_export();
		let dumped = match export.enc_hook() {
			Some(hook) => hook.call(value.as_json().clone()),
			None => value.as_json().clone(),
		};
		let defaults = if export.exclude_defaults() {
			self.prepared_schema()
				.ok()
				.and_then(|prepared| prepared.resolved.default_instance())
		} else {
			None
		};
		export.dump_filter(overrides).apply(dumped, defaults.as_ref())
	}

	/// Dump a validated value to JSON bytes.
	pub fn dump_json(&self, value: &SchemaValue) -> Vec<u8> {
		self.dump_json_with(value, &DumpOverrides::new())
	}

	pub fn dump_json_with(&self, value: &SchemaValue, overrides: &DumpOverrides) -> Vec<u8> {
		self.dump_python_with(value, overrides).to_string().into_bytes()
	}

	/// Default instance of the schema type, when it declares one.
	pub fn get_default_value(&self) -> Option<SchemaValue> {
		let prepared = self.prepared_schema().ok()?;
		prepared
			.resolved
			.default_instance()
			.map(|value| SchemaValue::new(prepared.identity(), value))
	}
}

fn disagrees(explicit: &SchemaReference, annotated: &SchemaReference, owner: &Owner) -> bool {
	match (explicit.resolve(Some(owner)), annotated.resolve(Some(owner))) {
		(Ok(explicit), Ok(annotated)) => explicit.identity() != annotated.identity(),
		_ => explicit.to_string() != annotated.to_string(),
	}
}

impl PartialEq for SchemaAdapter {
	fn eq(&self, other: &Self) -> bool {
		if self.attname != other.attname || self.export != other.export {
			return false;
		}
		match (self.prepared_schema(), other.prepared_schema()) {
			(Ok(this), Ok(that)) => this.resolved == that.resolved,
			_ if self.is_bound() && other.is_bound() => false,
			_ => self.reference == other.reference && self.allow_null == other.allow_null,
		}
	}
}

impl fmt::Debug for SchemaAdapter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SchemaAdapter")
			.field("bound", &self.is_bound())
			.field("schema", &self.reference.as_ref().map(ToString::to_string))
			.finish()
	}
}
