//! Widgets rendering schema form fields

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde_json::Value;

/// Renders a field to HTML and reads its submitted value back
pub trait Widget: Send + Sync + fmt::Debug {
	fn render(&self, name: &str, value: Option<&str>, attrs: &BTreeMap<String, String>) -> String;

	fn value_from_data(&self, data: &HashMap<String, Value>, name: &str) -> Option<Value> {
		data.get(name).cloned()
	}

	/// Called with the expanded JSON Schema once the field's schema is known.
	fn bind_schema(&mut self, _schema: &Value, _allow_null: Option<bool>) {}

	fn box_clone(&self) -> Box<dyn Widget>;
}

impl Clone for Box<dyn Widget> {
	fn clone(&self) -> Self {
		self.box_clone()
	}
}

pub(crate) fn escape_html(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#x27;"),
			c => escaped.push(c),
		}
	}
	escaped
}

fn render_attrs(attrs: &BTreeMap<String, String>) -> String {
	attrs
		.iter()
		.map(|(key, value)| format!(" {}=\"{}\"", escape_html(key), escape_html(value)))
		.collect()
}

/// Plain multi-line text input, the default widget
#[derive(Debug, Clone)]
pub struct Textarea {
	pub cols: u32,
	pub rows: u32,
}

impl Default for Textarea {
	fn default() -> Self {
		Self { cols: 40, rows: 10 }
	}
}

impl Widget for Textarea {
	fn render(&self, name: &str, value: Option<&str>, attrs: &BTreeMap<String, String>) -> String {
		format!(
			"<textarea name=\"{}\" cols=\"{}\" rows=\"{}\"{}>\n{}</textarea>",
			escape_html(name),
			self.cols,
			self.rows,
			render_attrs(attrs),
			escape_html(value.unwrap_or_default())
		)
	}

	fn box_clone(&self) -> Box<dyn Widget> {
		Box::new(self.clone())
	}
}

/// Widget for client-side JSON editors driven by the field's JSON Schema
///
/// The schema is embedded as a `data-schema` attribute next to a hidden
/// textarea that carries the submitted value.
#[derive(Debug, Clone, Default)]
pub struct JsonFormSchemaWidget {
	schema: Option<Value>,
	allow_null: Option<bool>,
}

impl JsonFormSchemaWidget {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn schema(&self) -> Option<&Value> {
		self.schema.as_ref()
	}

	pub fn allow_null(&self) -> Option<bool> {
		self.allow_null
	}
}

impl Widget for JsonFormSchemaWidget {
	fn render(&self, name: &str, value: Option<&str>, attrs: &BTreeMap<String, String>) -> String {
		let schema = self.schema.as_ref().map(Value::to_string).unwrap_or_else(|| "{}".to_string());
		format!(
			"<div data-schema-editor=\"{name}\" data-schema=\"{schema}\" data-allow-null=\"{allow_null}\"{attrs}></div>\
			<textarea name=\"{name}\" hidden>{value}</textarea>",
			name = escape_html(name),
			schema = escape_html(&schema),
			allow_null = self.allow_null.unwrap_or(false),
			attrs = render_attrs(attrs),
			value = escape_html(value.unwrap_or_default()),
		)
	}

	fn bind_schema(&mut self, schema: &Value, allow_null: Option<bool>) {
		self.schema = Some(schema.clone());
		self.allow_null = allow_null;
	}

	fn box_clone(&self) -> Box<dyn Widget> {
		Box::new(self.clone())
	}
}
