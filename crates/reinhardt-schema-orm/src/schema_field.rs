//! Model field storing schema-typed data in a JSON column

use reinhardt_schema_types::{
	ConfigurationError, DumpOverrides, EXPORT_OPTIONS, ExportKwargs, Owner, RawValue, SchemaAdapter,
	SchemaReference, SchemaResult, SchemaValidationError, SchemaValue, ValidationErrorKind,
};
use serde_json::{Map, Value};

use crate::checks::CheckMessage;
use crate::defaults::{FieldDefault, default_factory};
use crate::descriptor::{ModelInstance, SchemaAttribute};
use crate::expression::{DbValue, FieldValue, QueryExpression};
use crate::field::{BaseField, DatabaseDialect, Field, FieldDeconstruction, FieldKwarg};

#[cfg(feature = "forms")]
use reinhardt_schema_forms::SchemaFormField;

/// Import path recorded in migration state
pub const SCHEMA_FIELD_PATH: &str = "reinhardt.orm.models.SchemaField";

const E001: &str = "schema_field.E001";
const E002: &str = "schema_field.E002";
const W003: &str = "schema_field.W003";

/// JSON column validated against a schema
///
/// The schema is either given explicitly or taken from the owning model's
/// annotation of the field. Either way it is resolved lazily, so it may name
/// types registered after the field is declared.
///
/// # Examples
///
/// ```
/// use reinhardt_schema_orm::{ModelMeta, SchemaField};
/// use reinhardt_schema_types::{Owner, SchemaType};
/// use serde::{Deserialize, Serialize};
/// use serde_json::json;
/// use utoipa::ToSchema;
///
/// #[derive(Serialize, Deserialize, ToSchema)]
/// struct Dimensions {
///     width: u32,
///     height: u32,
/// }
///
/// let meta = ModelMeta::new(Owner::new("shop", "Product"))
///     .add_field("size", SchemaField::new(SchemaType::of::<Dimensions>()));
/// let field = meta.field("size").unwrap();
///
/// let value = field.to_python(r#"{"width": 3, "height": "4"}"#).unwrap();
/// assert_eq!(value.as_json(), &json!({"width": 3, "height": 4}));
/// assert!(field.check().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct SchemaField {
	pub base: BaseField,
	schema: Option<SchemaReference>,
	default: Option<FieldDefault>,
	export: ExportKwargs,
	adapter: SchemaAdapter,
}

impl SchemaField {
	pub fn new(schema: impl Into<SchemaReference>) -> Self {
		Self::build(Some(schema.into()))
	}

	/// Field whose schema is the owner's annotation of the attribute.
	pub fn from_annotation() -> Self {
		Self::build(None)
	}

	fn build(schema: Option<SchemaReference>) -> Self {
		let export = ExportKwargs::new();
		Self {
			base: BaseField::new(),
			adapter: SchemaAdapter::new(schema.clone(), None, None, None, export.clone()),
			schema,
			default: None,
			export,
		}
	}

	/// Build from a field option map. Export options are split off first;
	/// `default` and the base field options configure the rest.
	pub fn with_options(
		schema: Option<SchemaReference>,
		mut options: Map<String, Value>,
	) -> Result<Self, ConfigurationError> {
		let export = ExportKwargs::extract(&mut options)?;
		let mut field = Self::build(schema);
		for (option, value) in options {
			if option == "default" {
				field.default = Some(FieldDefault::Value(value));
			} else if !field.base.set_kwarg(&option, &FieldKwarg::from_json(value)) {
				return Err(ConfigurationError::UnknownOption(option));
			}
		}
		field.export = export;
		field.rebuild_adapter();
		Ok(field)
	}

	pub fn null(mut self, null: bool) -> Self {
		self.base.null = null;
		self.rebuild_adapter();
		self
	}

	pub fn blank(mut self, blank: bool) -> Self {
		self.base.blank = blank;
		self
	}

	pub fn default(mut self, default: impl Into<FieldDefault>) -> Self {
		self.default = Some(default.into());
		self
	}

	pub fn export(mut self, export: ExportKwargs) -> Self {
		self.export = export;
		self.rebuild_adapter();
		self
	}

	pub fn verbose_name(mut self, verbose_name: impl Into<String>) -> Self {
		self.base.verbose_name = Some(verbose_name.into());
		self
	}

	pub fn help_text(mut self, help_text: impl Into<String>) -> Self {
		self.base.help_text = Some(help_text.into());
		self
	}

	pub fn db_column(mut self, db_column: impl Into<String>) -> Self {
		self.base.db_column = Some(db_column.into());
		self
	}

	pub fn unique(mut self, unique: bool) -> Self {
		self.base.unique = unique;
		self
	}

	pub fn editable(mut self, editable: bool) -> Self {
		self.base.editable = editable;
		self
	}

	// A nullable column makes the schema nullable; otherwise nullability is
	// whatever the schema itself accepts.
	fn rebuild_adapter(&mut self) {
		let allow_null = self.base.null.then_some(true);
		let mut adapter =
			SchemaAdapter::new(self.schema.clone(), None, None, allow_null, self.export.clone());
		if let (Some(owner), Some(attname)) = (self.adapter.owner(), self.adapter.attname()) {
			adapter.bind(owner.clone(), attname);
		}
		self.adapter = adapter;
	}

	pub fn schema(&self) -> Option<&SchemaReference> {
		self.schema.as_ref()
	}

	pub fn adapter(&self) -> &SchemaAdapter {
		&self.adapter
	}

	pub fn export_kwargs(&self) -> &ExportKwargs {
		&self.export
	}

	pub fn default_value(&self) -> Option<&FieldDefault> {
		self.default.as_ref()
	}

	pub fn has_default(&self) -> bool {
		self.default.is_some()
	}

	/// Default computed by the database, if the field has one.
	pub fn default_expression(&self) -> Option<&QueryExpression> {
		match &self.default {
			Some(FieldDefault::Expression(expression)) => Some(expression),
			_ => None,
		}
	}

	/// Attribute semantics of the field on model instances
	pub fn descriptor(&self) -> SchemaAttribute {
		SchemaAttribute::for_field(self)
	}

	/// Attach the field to attribute `name` of `owner`.
	pub fn contribute_to_class(&mut self, owner: &Owner, name: &str) {
		self.set_attributes_from_name(name);
		self.adapter.bind(owner.clone(), name);
	}

	/// Convert assigned or deserialized data into a validated value.
	///
	/// Text is decoded as a JSON document first and only then validated as
	/// a plain string.
	pub fn to_python(&self, value: impl Into<RawValue>) -> SchemaResult<SchemaValue> {
		let value = value.into();
		let text = match &value {
			RawValue::Text(text) => Some(text.as_bytes()),
			RawValue::Bytes(bytes) => Some(bytes.as_slice()),
			_ => None,
		};
		if let Some(text) = text {
			match self.adapter.validate_json(text) {
				Ok(decoded) => return Ok(decoded),
				Err(error) if error.is_input_error() => {}
				Err(error) => return Err(error),
			}
		}
		self.adapter.validate_python(value)
	}

	/// Full validation of a value about to be saved
	pub fn validate(&self, value: impl Into<RawValue>) -> SchemaResult<()> {
		let value = value.into();
		if value.is_null() && !self.base.null && !self.adapter.accepts_null()? {
			return Err(SchemaValidationError::new(
				ValidationErrorKind::ConstraintViolation,
				"This field cannot be null.",
				self.schema_identity(),
			)
			.into());
		}
		self.adapter.validate_python(value).map(|_| ())
	}

	/// Convert a column value into a validated value. SQL `NULL` is `None`.
	pub fn from_db_value(&self, value: Option<DbValue>) -> SchemaResult<Option<SchemaValue>> {
		let value = match value {
			None => return Ok(None),
			Some(DbValue::Text(text)) => self.to_python(RawValue::Text(text))?,
			Some(DbValue::Bytes(bytes)) => self.to_python(RawValue::Bytes(bytes))?,
			Some(DbValue::Json(json)) => self.adapter.validate_python(json)?,
			Some(DbValue::Expression(_)) => {
				return Err(SchemaValidationError::new(
					ValidationErrorKind::InvalidShape,
					"query expressions cannot be loaded as field values",
					self.schema_identity(),
				)
				.into());
			}
		};
		Ok((!value.is_null()).then_some(value))
	}

	/// Prepare a value for a query parameter or a column write.
	///
	/// Expressions are passed through; the inner value of a
	/// [`QueryExpression::Value`] is prepared. Values that cannot be
	/// validated, including all values while the schema is still unresolved,
	/// are passed through unchanged.
	pub fn get_prep_value(&self, value: impl Into<FieldValue>) -> Option<DbValue> {
		match value.into() {
			FieldValue::Expression(QueryExpression::Value(inner)) => {
				let prepared = self.prepare_raw_value(inner, &DumpOverrides::new());
				Some(DbValue::Expression(QueryExpression::Value(RawValue::Json(prepared))))
			}
			FieldValue::Expression(expression) => Some(DbValue::Expression(expression)),
			FieldValue::Raw(raw) => {
				let prepared = self.prepare_raw_value(raw, &DumpOverrides::new());
				if prepared.is_null() && self.base.null {
					None
				} else {
					Some(DbValue::Json(prepared))
				}
			}
		}
	}

	fn prepare_raw_value(&self, raw: RawValue, overrides: &DumpOverrides) -> Value {
		match self.adapter.validate_python(raw.clone()) {
			Ok(value) => self.adapter.dump_python_with(&value, overrides),
			Err(error) => {
				tracing::debug!(
					field = self.base.name.as_deref().unwrap_or_default(),
					%error,
					"passing value through without preparation"
				);
				raw.into_json()
			}
		}
	}

	fn raw_default(&self) -> Option<RawValue> {
		match self.default.as_ref()? {
			FieldDefault::Value(value) => Some(RawValue::Json(value.clone())),
			FieldDefault::Instance(value) => Some(RawValue::Instance(value.clone())),
			FieldDefault::Factory(factory) => Some(RawValue::Json(factory.call())),
			FieldDefault::Expression(_) => None,
		}
	}

	/// The validated default. Factories run on every call; expression
	/// defaults are left to the database and yield `None`.
	pub fn get_default(&self) -> SchemaResult<Option<SchemaValue>> {
		match self.raw_default() {
			Some(raw) => self.adapter.validate_python(raw).map(Some),
			None => Ok(None),
		}
	}

	/// Dumped JSON text of the field's value on `instance`, for fixtures.
	pub fn value_to_string(&self, instance: &ModelInstance) -> String {
		let name = self.base.name.as_deref().unwrap_or_default();
		match instance.get(name).ok().flatten() {
			Some(value) => self
				.prepare_raw_value(RawValue::Instance(value.clone()), &DumpOverrides::new())
				.to_string(),
			None => Value::Null.to_string(),
		}
	}

	pub fn db_type(&self, dialect: DatabaseDialect) -> &'static str {
		match dialect {
			DatabaseDialect::PostgreSQL => "JSONB",
			DatabaseDialect::MySQL => "JSON",
			DatabaseDialect::SQLite => "TEXT",
			DatabaseDialect::MSSQL => "NVARCHAR(MAX)",
		}
	}

	fn schema_identity(&self) -> String {
		self.adapter
			.prepared_schema()
			.map(|prepared| prepared.identity())
			.unwrap_or_default()
	}

	fn check_label(&self) -> String {
		let name = self.base.name.as_deref().unwrap_or("<unnamed>");
		match self.adapter.owner() {
			Some(owner) => format!("{}.{}", owner.qualified_name(), name),
			None => name.to_string(),
		}
	}

	/// Diagnose the declaration without failing it.
	pub fn check(&self) -> Vec<CheckMessage> {
		let mut messages = Vec::new();
		let obj = self.check_label();

		if let Err(error) = self.adapter.validate_schema() {
			messages.push(
				CheckMessage::error(E001, format!("Cannot resolve the schema. Original error: \n{}", error))
					.with_obj(&obj),
			);
			return messages;
		}

		let default = match self.get_default() {
			Ok(default) => default,
			Err(error) => {
				if error.is_input_error() {
					messages.push(
						CheckMessage::error(
							E002,
							format!("Default value cannot be adapted to the schema. Original error: \n{}", error),
						)
						.with_obj(&obj),
					);
				}
				None
			}
		};

		if self.export.include().is_some() || self.export.exclude().is_some() {
			let default = default
				.filter(|value| !value.is_null())
				.or_else(|| self.adapter.get_default_value());
			if let Some(default) = default {
				let prepared = self.prepare_raw_value(RawValue::Instance(default), &DumpOverrides::new());
				if let Err(error) = self.adapter.validate_python(prepared)
					&& error.is_input_error()
				{
					messages.push(
						CheckMessage::warning(
							W003,
							format!("Export arguments may lead to data integrity problems. Original error: \n{}", error),
						)
						.with_hint("Please review `include` and `exclude` arguments.")
						.with_obj(&obj),
					);
				}
			}
		}

		messages
	}

	// The resolved form is recorded once the schema can be resolved. Schemas
	// registered in their defining module are written as `module::Name` paths;
	// any other schema is written by its short name and must be reachable from
	// the global namespace when a migration is loaded without an owner.
	fn schema_text(&self) -> Option<String> {
		match &self.schema {
			Some(reference) if !reference.is_deferred() => Some(reference.qualified().to_string()),
			_ => match self.adapter.resolved_schema() {
				Ok(resolved) if self.adapter.is_bound() => {
					Some(SchemaReference::from(resolved.clone()).qualified().to_string())
				}
				_ => self.schema.as_ref().map(ToString::to_string),
			},
		}
	}

	/// Rebuild a field from its deconstructed form.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_schema_orm::{Field, SchemaField};
	/// use reinhardt_schema_types::{ExportKwargs, SchemaReference};
	/// use serde_json::json;
	///
	/// let field = SchemaField::new(SchemaReference::list("int"))
	///     .default(json!([1, 2]))
	///     .export(ExportKwargs::new().with_strict(true));
	///
	/// let restored = SchemaField::reconstruct(&field.deconstruct()).unwrap();
	///
	/// assert_eq!(restored.deconstruct(), field.deconstruct());
	/// ```
	pub fn reconstruct(deconstruction: &FieldDeconstruction) -> Result<Self, ConfigurationError> {
		if deconstruction.path != SCHEMA_FIELD_PATH {
			return Err(ConfigurationError::InvalidOption {
				option: "path".to_string(),
				message: format!("expected {}, got {}", SCHEMA_FIELD_PATH, deconstruction.path),
			});
		}

		let mut field = match deconstruction.kwargs.get("schema") {
			Some(FieldKwarg::String(text)) => {
				let reference =
					SchemaReference::parse(text).map_err(|error| ConfigurationError::InvalidOption {
						option: "schema".to_string(),
						message: error.to_string(),
					})?;
				Self::new(reference)
			}
			Some(other) => {
				return Err(ConfigurationError::InvalidOption {
					option: "schema".to_string(),
					message: format!("expected schema text, got {}", other.to_json()),
				});
			}
			None => Self::from_annotation(),
		};

		let mut export_options = Map::new();
		for (key, value) in &deconstruction.kwargs {
			match key.as_str() {
				"schema" => {}
				"default" => {
					field.default = Some(match value {
						FieldKwarg::Callable(name) => FieldDefault::Factory(default_factory(name)?),
						other => FieldDefault::Value(other.to_json()),
					});
				}
				"default_expression" => {
					let sql = value.as_str().ok_or_else(|| ConfigurationError::InvalidOption {
						option: key.clone(),
						message: format!("expected SQL text, got {}", value.to_json()),
					})?;
					field.default = Some(FieldDefault::Expression(QueryExpression::sql(sql)));
				}
				option if EXPORT_OPTIONS.contains(&option) => {
					export_options.insert(key.clone(), value.to_json());
				}
				option => {
					if !field.base.set_kwarg(option, value) {
						return Err(ConfigurationError::UnknownOption(key.clone()));
					}
				}
			}
		}

		field.export = ExportKwargs::from_options(&export_options)?;
		field.base.name = deconstruction.name.clone();
		field.rebuild_adapter();
		Ok(field)
	}

	/// Form field editing this field's data.
	#[cfg(feature = "forms")]
	pub fn formfield(&self) -> SchemaFormField {
		let name = self.base.name.clone().unwrap_or_default();
		let mut field = SchemaFormField::from_adapter(name, self.adapter.clone()).required(!self.base.blank);
		if let Some(label) = &self.base.verbose_name {
			field = field.label(label.clone());
		}
		if let Some(help_text) = &self.base.help_text {
			field = field.help_text(help_text.clone());
		}
		if let Ok(Some(default)) = self.get_default()
			&& !default.is_null()
		{
			field = field.initial(self.adapter.dump_python(&default));
		}
		field
	}
}

impl Field for SchemaField {
	fn deconstruct(&self) -> FieldDeconstruction {
		let mut kwargs = self.base.get_kwargs();

		if let Some(schema) = self.schema_text() {
			kwargs.insert("schema".to_string(), FieldKwarg::String(schema));
		}
		match &self.default {
			Some(FieldDefault::Factory(factory)) => {
				kwargs.insert(
					"default".to_string(),
					FieldKwarg::Callable(factory.name().to_string()),
				);
			}
			Some(FieldDefault::Expression(QueryExpression::Sql(sql))) => {
				kwargs.insert(
					"default_expression".to_string(),
					FieldKwarg::String(sql.clone()),
				);
			}
			Some(FieldDefault::Expression(QueryExpression::Value(raw))) => {
				let dumped = self.prepare_raw_value(raw.clone(), &DumpOverrides::unfiltered());
				kwargs.insert("default".to_string(), FieldKwarg::from_json(dumped));
			}
			Some(FieldDefault::Value(_) | FieldDefault::Instance(_)) => {
				if let Some(raw) = self.raw_default() {
					let dumped = self.prepare_raw_value(raw, &DumpOverrides::unfiltered());
					kwargs.insert("default".to_string(), FieldKwarg::from_json(dumped));
				}
			}
			None => {}
		}
		for (option, value) in self.export.to_options() {
			kwargs.insert(option, FieldKwarg::from_json(value));
		}

		FieldDeconstruction {
			name: self.base.name.clone(),
			path: SCHEMA_FIELD_PATH.to_string(),
			kwargs,
		}
	}

	fn set_attributes_from_name(&mut self, name: &str) {
		self.base.name = Some(name.to_string());
	}

	fn name(&self) -> Option<&str> {
		self.base.name.as_deref()
	}

	fn is_null(&self) -> bool {
		self.base.null
	}

	fn is_blank(&self) -> bool {
		self.base.blank
	}
}
