//! Attribute access on model instances holding schema fields

use std::collections::HashMap;
use std::sync::Arc;

use reinhardt_schema_types::{Owner, RawValue, SchemaError, SchemaResult, SchemaValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::checks::{Check, CheckMessage};
use crate::expression::DbValue;
use crate::field::Field;
use crate::schema_field::SchemaField;

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
	#[error("Model '{model}' has no schema field '{field}'")]
	UnknownField { model: String, field: String },

	#[error("Invalid value for field '{field}': {source}")]
	Field {
		field: String,
		#[source]
		source: SchemaError,
	},
}

/// How assignments to a schema field attribute are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaAttribute {
	/// The field has a default, every assigned value is validated
	Initialized,
	/// The field has no default, so `None` is stored as is
	Uninitialized,
}

impl SchemaAttribute {
	pub fn for_field(field: &SchemaField) -> Self {
		if field.has_default() {
			SchemaAttribute::Initialized
		} else {
			SchemaAttribute::Uninitialized
		}
	}

	/// The value stored on the instance for an assignment of `value`.
	pub fn set(self, field: &SchemaField, value: RawValue) -> SchemaResult<Option<SchemaValue>> {
		if self == SchemaAttribute::Uninitialized && value.is_null() {
			return Ok(None);
		}
		let value = field.to_python(value)?;
		Ok((!value.is_null()).then_some(value))
	}
}

/// Schema fields of one model, bound to the model as their owner
#[derive(Debug, Clone)]
pub struct ModelMeta {
	owner: Owner,
	fields: Vec<SchemaField>,
}

impl ModelMeta {
	pub fn new(owner: Owner) -> Self {
		Self {
			owner,
			fields: Vec::new(),
		}
	}

	pub fn add_field(mut self, name: &str, mut field: SchemaField) -> Self {
		field.contribute_to_class(&self.owner, name);
		self.fields.push(field);
		self
	}

	pub fn owner(&self) -> &Owner {
		&self.owner
	}

	pub fn fields(&self) -> &[SchemaField] {
		&self.fields
	}

	pub fn field(&self, name: &str) -> Option<&SchemaField> {
		self.fields.iter().find(|field| field.name() == Some(name))
	}

	fn require_field(&self, name: &str) -> Result<&SchemaField, ModelError> {
		self.field(name).ok_or_else(|| ModelError::UnknownField {
			model: self.owner.qualified_name(),
			field: name.to_string(),
		})
	}
}

impl Check for ModelMeta {
	fn tags(&self) -> Vec<String> {
		vec!["models".to_string()]
	}

	fn check(&self) -> Vec<CheckMessage> {
		self.fields.iter().flat_map(SchemaField::check).collect()
	}
}

fn field_error(field: &SchemaField) -> impl FnOnce(SchemaError) -> ModelError + '_ {
	move |source| ModelError::Field {
		field: field.name().unwrap_or_default().to_string(),
		source,
	}
}

/// Values of a model's schema fields
///
/// Reads only ever return validated [`SchemaValue`]s.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use reinhardt_schema_orm::{ModelInstance, ModelMeta, SchemaField};
/// use reinhardt_schema_types::{Owner, SchemaReference};
/// use serde_json::json;
///
/// let meta = ModelMeta::new(Owner::new("blog", "Post"))
///     .add_field("tags", SchemaField::new(SchemaReference::list("str")).default(json!([])));
/// let mut post = ModelInstance::new(Arc::new(meta)).unwrap();
///
/// post.set("tags", json!(["rust"])).unwrap();
/// assert_eq!(post.get_as::<Vec<String>>("tags").unwrap(), Some(vec!["rust".to_string()]));
/// assert!(post.set("tags", json!({"not": "a list"})).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ModelInstance {
	meta: Arc<ModelMeta>,
	values: HashMap<String, Option<SchemaValue>>,
}

impl ModelInstance {
	/// New instance with every default taken. Fields without a default, or
	/// with a database-computed default, start unset.
	pub fn new(meta: Arc<ModelMeta>) -> Result<Self, ModelError> {
		let mut values = HashMap::new();
		for field in meta.fields() {
			let value = field.get_default().map_err(field_error(field))?;
			values.insert(
				field.name().unwrap_or_default().to_string(),
				value.filter(|value| !value.is_null()),
			);
		}
		Ok(Self { meta, values })
	}

	/// Instance loaded from a row keyed by column name.
	pub fn from_db(
		meta: Arc<ModelMeta>,
		mut row: HashMap<String, Option<DbValue>>,
	) -> Result<Self, ModelError> {
		let mut values = HashMap::new();
		for field in meta.fields() {
			let column = field.base.column().unwrap_or_default();
			let value = row.remove(column).flatten();
			let value = field.from_db_value(value).map_err(field_error(field))?;
			values.insert(field.name().unwrap_or_default().to_string(), value);
		}
		Ok(Self { meta, values })
	}

	pub fn meta(&self) -> &ModelMeta {
		&self.meta
	}

	pub fn get(&self, name: &str) -> Result<Option<&SchemaValue>, ModelError> {
		self.meta.require_field(name)?;
		Ok(self.values.get(name).and_then(Option::as_ref))
	}

	/// Typed view of a field's value
	pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ModelError> {
		let field = self.meta.require_field(name)?;
		self.get(name)?
			.map(|value| value.to_typed::<T>())
			.transpose()
			.map_err(|error| field_error(field)(error.into()))
	}

	/// Assign `value` following the field's attribute semantics.
	pub fn set(&mut self, name: &str, value: impl Into<RawValue>) -> Result<(), ModelError> {
		let field = self.meta.require_field(name)?;
		let value = field
			.descriptor()
			.set(field, value.into())
			.map_err(field_error(field))?;
		self.values.insert(name.to_string(), value);
		Ok(())
	}

	/// Validate every field, collecting all failures.
	pub fn full_clean(&self) -> Result<(), Vec<ModelError>> {
		let errors: Vec<ModelError> = self
			.meta
			.fields()
			.iter()
			.filter_map(|field| {
				let name = field.name().unwrap_or_default();
				let value = match self.values.get(name).and_then(Option::as_ref) {
					Some(value) => RawValue::Instance(value.clone()),
					None if field.default_expression().is_some() => return None,
					None => RawValue::Json(Value::Null),
				};
				field.validate(value).err().map(field_error(field))
			})
			.collect();
		if errors.is_empty() { Ok(()) } else { Err(errors) }
	}

	/// Column values for an insert or update, keyed by column name.
	pub fn to_db_row(&self) -> HashMap<String, Option<DbValue>> {
		self.meta
			.fields()
			.iter()
			.map(|field| {
				let name = field.name().unwrap_or_default();
				let value = match (self.values.get(name).and_then(Option::as_ref), field.default_expression()) {
					(Some(value), _) => field.get_prep_value(value.clone()),
					(None, Some(expression)) => Some(DbValue::Expression(expression.clone())),
					(None, None) => field.get_prep_value(Value::Null),
				};
				(field.base.column().unwrap_or_default().to_string(), value)
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::expression::QueryExpression;
	use reinhardt_schema_types::{ExportKwargs, SchemaReference};
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn meta() -> Arc<ModelMeta> {
		Arc::new(
			ModelMeta::new(Owner::new("inventory", "Item"))
				.add_field(
					"dims",
					SchemaField::new(SchemaReference::map("float")).default(json!({"w": 1})),
				)
				.add_field("notes", SchemaField::new(SchemaReference::list("str")))
				.add_field(
					"extra",
					SchemaField::new("any")
						.null(true)
						.db_column("extra_json")
						.export(ExportKwargs::new().with_strict(true)),
				),
		)
	}

	#[rstest]
	fn test_descriptor_follows_default(meta: Arc<ModelMeta>) {
		assert_eq!(meta.field("dims").unwrap().descriptor(), SchemaAttribute::Initialized);
		assert_eq!(meta.field("notes").unwrap().descriptor(), SchemaAttribute::Uninitialized);
	}

	#[rstest]
	fn test_new_instance_takes_defaults(meta: Arc<ModelMeta>) {
		let instance = ModelInstance::new(meta).unwrap();

		assert_eq!(instance.get("dims").unwrap().unwrap().as_json(), &json!({"w": 1.0}));
		assert_eq!(instance.get("notes").unwrap(), None);
	}

	#[rstest]
	fn test_uninitialized_field_accepts_none(meta: Arc<ModelMeta>) {
		let mut instance = ModelInstance::new(meta).unwrap();

		instance.set("notes", Value::Null).unwrap();

		assert_eq!(instance.get("notes").unwrap(), None);
	}

	#[rstest]
	fn test_initialized_field_validates_none(meta: Arc<ModelMeta>) {
		let mut instance = ModelInstance::new(meta).unwrap();

		let err = instance.set("dims", Value::Null).unwrap_err();

		assert!(matches!(err, ModelError::Field { ref field, .. } if field == "dims"));
	}

	#[rstest]
	fn test_set_validates_and_coerces(meta: Arc<ModelMeta>) {
		let mut instance = ModelInstance::new(meta).unwrap();

		instance.set("dims", r#"{"w": "2.5"}"#).unwrap();

		assert_eq!(instance.get_as::<HashMap<String, f64>>("dims").unwrap().unwrap()["w"], 2.5);
	}

	#[rstest]
	fn test_unknown_field(meta: Arc<ModelMeta>) {
		let instance = ModelInstance::new(meta).unwrap();

		assert_eq!(
			instance.get("price").unwrap_err(),
			ModelError::UnknownField {
				model: "inventory::Item".into(),
				field: "price".into(),
			}
		);
	}

	#[rstest]
	fn test_db_round_trip_uses_columns(meta: Arc<ModelMeta>) {
		let mut instance = ModelInstance::new(Arc::clone(&meta)).unwrap();
		instance.set("notes", json!(["a", "b"])).unwrap();

		let row = instance.to_db_row();
		let loaded = ModelInstance::from_db(meta, row.clone()).unwrap();

		assert_eq!(row.get("extra_json"), Some(&None));
		assert_eq!(row.get("notes"), Some(&Some(DbValue::Json(json!(["a", "b"])))));
		assert_eq!(loaded.get("notes").unwrap(), instance.get("notes").unwrap());
		assert_eq!(loaded.get("dims").unwrap(), instance.get("dims").unwrap());
	}

	#[rstest]
	fn test_expression_default_is_written_as_expression() {
		let meta = Arc::new(ModelMeta::new(Owner::new("inventory", "Item")).add_field(
			"dims",
			SchemaField::new(SchemaReference::map("float")).default(QueryExpression::sql("'{}'")),
		));
		let instance = ModelInstance::new(meta).unwrap();

		let row = instance.to_db_row();

		assert_eq!(
			row.get("dims"),
			Some(&Some(DbValue::Expression(QueryExpression::sql("'{}'"))))
		);
		assert!(instance.full_clean().is_ok());
	}

	#[rstest]
	fn test_full_clean_collects_missing_values(meta: Arc<ModelMeta>) {
		let instance = ModelInstance::new(meta).unwrap();

		let errors = instance.full_clean().unwrap_err();

		assert_eq!(errors.len(), 1);
		assert!(matches!(&errors[0], ModelError::Field { field, .. } if field == "notes"));
	}

	#[rstest]
	fn test_value_to_string(meta: Arc<ModelMeta>) {
		let instance = ModelInstance::new(Arc::clone(&meta)).unwrap();

		assert_eq!(meta.field("dims").unwrap().value_to_string(&instance), r#"{"w":1.0}"#);
		assert_eq!(meta.field("notes").unwrap().value_to_string(&instance), "null");
	}

	#[rstest]
	fn test_model_checks_collect_field_messages() {
		let meta = ModelMeta::new(Owner::new("inventory", "Item"))
			.add_field("a", SchemaField::new("Unknown"))
			.add_field("b", SchemaField::new("int").default(json!("x")));

		let ids: Vec<String> = Check::check(&meta).into_iter().map(|message| message.id).collect();

		assert_eq!(ids, vec!["schema_field.E001", "schema_field.E002"]);
	}
}
