//! Default values of schema fields

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use reinhardt_schema_types::{ConfigurationError, SchemaValue};
use serde_json::Value;

use crate::expression::QueryExpression;

type FactoryFn = dyn Fn() -> Value + Send + Sync;

/// A named callable producing a fresh default on every row construction
#[derive(Clone)]
pub struct DefaultFactory {
	name: Arc<str>,
	func: Arc<FactoryFn>,
}

impl DefaultFactory {
	pub fn new<F>(name: impl Into<Arc<str>>, func: F) -> Self
	where
		F: Fn() -> Value + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			func: Arc::new(func),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn call(&self) -> Value {
		(self.func)()
	}
}

impl PartialEq for DefaultFactory {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name
	}
}

impl fmt::Debug for DefaultFactory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("DefaultFactory").field(&self.name).finish()
	}
}

static FACTORIES: Lazy<RwLock<HashMap<String, DefaultFactory>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Make `factory` available to fields reconstructed from migration state.
pub fn register_default_factory(factory: DefaultFactory) {
	tracing::debug!(factory = factory.name(), "registering default factory");
	FACTORIES.write().insert(factory.name().to_string(), factory);
}

pub(crate) fn default_factory(name: &str) -> Result<DefaultFactory, ConfigurationError> {
	FACTORIES
		.read()
		.get(name)
		.cloned()
		.ok_or_else(|| ConfigurationError::UnknownHook(name.to_string()))
}

/// Default of a schema field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
	/// JSON-compatible data validated when the default is taken
	Value(Value),
	Instance(SchemaValue),
	/// Invoked lazily, once per constructed row
	Factory(DefaultFactory),
	/// Computed by the database, bypassing validation
	Expression(QueryExpression),
}

impl From<Value> for FieldDefault {
	fn from(value: Value) -> Self {
		FieldDefault::Value(value)
	}
}

impl From<SchemaValue> for FieldDefault {
	fn from(value: SchemaValue) -> Self {
		FieldDefault::Instance(value)
	}
}

impl From<DefaultFactory> for FieldDefault {
	fn from(factory: DefaultFactory) -> Self {
		FieldDefault::Factory(factory)
	}
}

impl From<QueryExpression> for FieldDefault {
	fn from(expression: QueryExpression) -> Self {
		FieldDefault::Expression(expression)
	}
}
