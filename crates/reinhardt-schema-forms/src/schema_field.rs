//! Form field validating submitted JSON against a schema

use serde_json::{Map, Value};

use reinhardt_schema_types::{
	ConfigurationError, ExportKwargs, Owner, SchemaAdapter, SchemaError, SchemaReference,
	SchemaValue,
};

use crate::field::{FieldError, FieldResult, FormField};
use crate::widget::{Textarea, Widget};

/// Data bound to a schema form field for redisplay
#[derive(Debug, Clone, PartialEq)]
pub enum BoundData {
	Valid(SchemaValue),
	/// Submitted text that did not decode or validate, kept as typed
	Invalid(String),
	Empty,
}

/// A form field holding structured data described by a schema
///
/// # Examples
///
/// ```
/// use reinhardt_schema_forms::{FormField, SchemaFormField};
/// use reinhardt_schema_types::SchemaReference;
/// use serde_json::json;
///
/// let field = SchemaFormField::new("scores", SchemaReference::list("int"));
///
/// assert_eq!(field.clean(Some(&json!("[1, \"2\"]"))).unwrap(), json!([1, 2]));
/// let err = field.clean(Some(&json!("[1, \"x\"]"))).unwrap_err();
/// assert_eq!(err.to_string(), "Schema didn't match for Schema.");
/// ```
#[derive(Debug, Clone)]
pub struct SchemaFormField {
	pub name: String,
	pub label: Option<String>,
	pub required: bool,
	pub disabled: bool,
	pub help_text: Option<String>,
	pub initial: Option<Value>,
	adapter: SchemaAdapter,
	widget: Box<dyn Widget>,
}

fn is_empty_value(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(text) => text.is_empty(),
		Value::Array(items) => items.is_empty(),
		Value::Object(object) => object.is_empty(),
		_ => false,
	}
}

impl SchemaFormField {
	pub fn new(name: impl Into<String>, schema: impl Into<SchemaReference>) -> Self {
		Self::from_adapter(name, SchemaAdapter::from_type(schema, ExportKwargs::new()))
	}

	/// Build from a field option map. Export options are split off; the
	/// remaining `required`, `disabled`, `label`, `help_text`, `initial` and
	/// `allow_null` keys configure the field.
	pub fn with_options(
		name: impl Into<String>,
		schema: impl Into<SchemaReference>,
		mut options: Map<String, Value>,
	) -> Result<Self, ConfigurationError> {
		let export = ExportKwargs::extract(&mut options)?;
		let allow_null = options.remove("allow_null").and_then(|value| value.as_bool());
		let adapter = SchemaAdapter::from_type(schema, export).with_allow_null(allow_null);
		let mut field = Self::from_adapter(name, adapter);

		for (option, value) in options {
			match (option.as_str(), value) {
				("required", Value::Bool(required)) => field.required = required,
				("disabled", Value::Bool(disabled)) => field.disabled = disabled,
				("label", Value::String(label)) => field.label = Some(label),
				("help_text", Value::String(help_text)) => field.help_text = Some(help_text),
				("initial", initial) => field.initial = Some(initial),
				(other, value) => {
					return Err(ConfigurationError::InvalidOption {
						option: other.to_string(),
						message: format!("unsupported form field option value {}", value),
					});
				}
			}
		}
		Ok(field)
	}

	/// Build around an existing adapter, as model fields do.
	pub fn from_adapter(name: impl Into<String>, adapter: SchemaAdapter) -> Self {
		Self {
			name: name.into(),
			label: None,
			required: true,
			disabled: false,
			help_text: None,
			initial: None,
			adapter,
			widget: Box::new(Textarea::default()),
		}
	}

	pub fn required(mut self, required: bool) -> Self {
		self.required = required;
		self
	}

	pub fn disabled(mut self, disabled: bool) -> Self {
		self.disabled = disabled;
		self
	}

	pub fn label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn help_text(mut self, text: impl Into<String>) -> Self {
		self.help_text = Some(text.into());
		self
	}

	pub fn initial(mut self, value: Value) -> Self {
		self.initial = Some(value);
		self
	}

	pub fn allow_null(mut self, allow_null: Option<bool>) -> Self {
		self.adapter = self.adapter.with_allow_null(allow_null);
		self.bind_widget_schema();
		self
	}

	/// Use `widget`, handing it the JSON Schema if the schema resolves already.
	pub fn widget(mut self, widget: Box<dyn Widget>) -> Self {
		self.widget = widget;
		self.bind_widget_schema();
		self
	}

	pub fn adapter(&self) -> &SchemaAdapter {
		&self.adapter
	}

	/// Bind the field to attribute `field_name` of the form type `owner`.
	/// An adapter that is already bound keeps its binding.
	pub fn bind(&mut self, owner: Owner, field_name: &str) {
		if !self.adapter.is_bound() {
			self.adapter.bind(owner, field_name);
		}
		self.bind_widget_schema();
	}

	fn bind_widget_schema(&mut self) {
		match self.adapter.json_schema() {
			Ok(schema) => self.widget.bind_schema(&schema, self.adapter.allow_null()),
			Err(error) => tracing::debug!(field = %self.name, %error, "widget schema deferred"),
		}
	}

	fn schema_error(&self, error: SchemaError) -> FieldError {
		match error {
			SchemaError::Decode(error) => FieldError::Schema {
				field: self.name.clone(),
				title: "JSON".to_string(),
				detail: error.to_string(),
			},
			SchemaError::Validation(error) => FieldError::Schema {
				field: self.name.clone(),
				title: "Schema".to_string(),
				detail: error.to_string(),
			},
			other => FieldError::ImproperlyConfigured(other.to_string()),
		}
	}

	/// Text is decoded as a JSON document; other data is validated as is.
	fn try_coerce(&self, value: &Value) -> Result<SchemaValue, SchemaError> {
		match value {
			Value::String(text) => self.adapter.validate_json(text),
			other => self.adapter.validate_python(other.clone()),
		}
	}

	/// Convert submitted data into a validated value, `None` for empty input.
	pub fn to_python(&self, value: Option<&Value>) -> FieldResult<Option<SchemaValue>> {
		let Some(value) = value.filter(|value| !is_empty_value(value)) else {
			return Ok(None);
		};
		if self.disabled {
			return self
				.adapter
				.validate_python(value.clone())
				.map(Some)
				.map_err(|error| self.schema_error(error));
		}
		self.try_coerce(value)
			.map(Some)
			.map_err(|error| self.schema_error(error))
	}

	/// Whether empty input stands for `null`: `allow_null` when set, otherwise
	/// inferred from the schema.
	pub fn is_nullable(&self) -> FieldResult<bool> {
		self.adapter
			.accepts_null()
			.map_err(|error| FieldError::ImproperlyConfigured(error.to_string()))
	}

	/// Clean submitted data into a validated value.
	pub fn clean_value(&self, value: Option<&Value>) -> FieldResult<Option<SchemaValue>> {
		let cleaned = self.to_python(value)?;
		if cleaned.is_none() && self.required && !self.disabled && !self.is_nullable()? {
			return Err(FieldError::required(&self.name));
		}
		Ok(cleaned)
	}

	pub fn bound_data(&self, data: Option<&Value>, initial: Option<&Value>) -> BoundData {
		if self.disabled {
			return match initial {
				Some(initial) => match self.adapter.validate_python(initial.clone()) {
					Ok(value) => BoundData::Valid(value),
					Err(_) => BoundData::Invalid(initial.to_string()),
				},
				None => BoundData::Empty,
			};
		}
		let Some(data) = data.filter(|data| !data.is_null()) else {
			return BoundData::Empty;
		};
		match self.try_coerce(data) {
			Ok(value) => BoundData::Valid(value),
			Err(_) => BoundData::Invalid(match data {
				Value::String(text) => text.clone(),
				other => other.to_string(),
			}),
		}
	}

	/// Text shown in the widget for `value`.
	pub fn prepare_value(&self, value: &BoundData) -> Option<String> {
		match value {
			BoundData::Empty => None,
			BoundData::Invalid(text) => Some(text.clone()),
			BoundData::Valid(value) if value.is_null() => None,
			BoundData::Valid(value) => String::from_utf8(self.adapter.dump_json(value)).ok(),
		}
	}

	/// Render the widget with the value bound from `data` or `initial`.
	pub fn render(&self, data: Option<&Value>) -> String {
		let bound = self.bound_data(data.or(self.initial.as_ref()), self.initial.as_ref());
		self.widget
			.render(&self.name, self.prepare_value(&bound).as_deref(), &Default::default())
	}
}

impl FormField for SchemaFormField {
	fn name(&self) -> &str {
		&self.name
	}

	fn label(&self) -> Option<&str> {
		self.label.as_deref()
	}

	fn required(&self) -> bool {
		self.required
	}

	fn help_text(&self) -> Option<&str> {
		self.help_text.as_deref()
	}

	fn widget(&self) -> &dyn Widget {
		self.widget.as_ref()
	}

	fn initial(&self) -> Option<&Value> {
		self.initial.as_ref()
	}

	fn clean(&self, value: Option<&Value>) -> FieldResult<Value> {
		Ok(self
			.clean_value(value)?
			.map(|value| self.adapter.dump_python(&value))
			.unwrap_or(Value::Null))
	}

	/// Compares dumped forms; data that does not validate counts as changed.
	fn has_changed(&self, initial: Option<&Value>, data: Option<&Value>) -> bool {
		let initial = initial.filter(|value| !value.is_null());
		let data = data.filter(|value| !value.is_null());
		match (initial, data) {
			(None, None) => false,
			(Some(initial), Some(data)) => match (self.try_coerce(initial), self.try_coerce(data)) {
				(Ok(initial), Ok(data)) => {
					self.adapter.dump_python(&initial) != self.adapter.dump_python(&data)
				}
				_ => true,
			},
			_ => true,
		}
	}
}
