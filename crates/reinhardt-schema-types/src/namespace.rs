//! Namespaces that forward references are evaluated in
//!
//! Names are looked up in this order: the owner's local namespace, the owner's
//! module namespace, the global namespace, then the built-in scalar schemas.
//! A module namespace is made of the schemas registered at link time with
//! [`register_schema!`](crate::register_schema) plus those added at runtime
//! through [`module_namespace`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::SchemaResolutionError;
use crate::reference::{SchemaReference, split_qualified};
use crate::schema::SchemaType;

/// A schema made known to a module at link time
pub struct SchemaRegistration {
	pub module: &'static str,
	pub name: &'static str,
	pub factory: fn() -> SchemaType,
}

impl SchemaRegistration {
	pub const fn new(module: &'static str, name: &'static str, factory: fn() -> SchemaType) -> Self {
		Self {
			module,
			name,
			factory,
		}
	}
}

inventory::collect!(SchemaRegistration);

/// Register a schema type in the namespace of the current module.
///
/// # Examples
///
/// ```
/// use reinhardt_schema_types::{SchemaReference, register_schema};
/// use serde::{Deserialize, Serialize};
/// use utoipa::ToSchema;
///
/// #[derive(Serialize, Deserialize, ToSchema)]
/// struct Tag {
///     label: String,
/// }
///
/// register_schema!(Tag);
///
/// let reference = SchemaReference::named(format!("{}::Tag", module_path!()));
/// assert!(reference.resolve(None).is_ok());
/// ```
#[macro_export]
macro_rules! register_schema {
	($ty:ty) => {
		$crate::register_schema!($ty, stringify!($ty));
	};
	($ty:ty, $name:expr) => {
		$crate::inventory::submit! {
			$crate::SchemaRegistration::new(module_path!(), $name, $crate::SchemaType::of::<$ty>)
		}
	};
}

/// A mutable mapping from names to schema types
#[derive(Clone)]
pub struct Namespace {
	name: Arc<str>,
	entries: Arc<RwLock<HashMap<String, SchemaType>>>,
}

impl Namespace {
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self {
			name: name.into(),
			entries: Arc::new(RwLock::new(HashMap::new())),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn register(&self, name: impl Into<String>, schema: SchemaType) {
		let name = name.into();
		tracing::debug!(namespace = %self.name, name = %name, "registering schema");
		self.entries.write().insert(name, schema);
	}

	/// Register `T` under its utoipa schema name.
	pub fn register_type<T>(&self)
	where
		T: ToSchema + serde::Serialize + serde::de::DeserializeOwned + 'static,
	{
		self.register(T::name(), SchemaType::of::<T>());
	}

	pub fn unregister(&self, name: &str) -> Option<SchemaType> {
		self.entries.write().remove(name)
	}

	pub fn get(&self, name: &str) -> Option<SchemaType> {
		self.entries.read().get(name).cloned()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.entries.read().contains_key(name)
	}

	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<_> = self.entries.read().keys().cloned().collect();
		names.sort();
		names
	}
}

impl fmt::Debug for Namespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Namespace")
			.field("name", &self.name)
			.field("names", &self.names())
			.finish()
	}
}

static GLOBAL: Lazy<Namespace> = Lazy::new(|| Namespace::new("<global>"));

static MODULES: Lazy<RwLock<HashMap<String, Namespace>>> = Lazy::new(|| RwLock::new(HashMap::new()));

static BUILTINS: Lazy<HashMap<&'static str, SchemaType>> = Lazy::new(|| {
	HashMap::from([
		("int", SchemaType::partial::<i64>("int")),
		("float", SchemaType::partial::<f64>("float")),
		("str", SchemaType::partial::<String>("str")),
		("bool", SchemaType::partial::<bool>("bool")),
		("any", SchemaType::opaque::<Value>("any")),
	])
});

/// Namespace searched after the owner's module
pub fn global_namespace() -> &'static Namespace {
	&GLOBAL
}

/// Runtime namespace of `module`, created on first access
pub fn module_namespace(module: &str) -> Namespace {
	if let Some(namespace) = MODULES.read().get(module) {
		return namespace.clone();
	}
	MODULES
		.write()
		.entry(module.to_string())
		.or_insert_with(|| Namespace::new(module))
		.clone()
}

/// Built-in scalar schema by name
pub fn builtin(name: &str) -> Option<SchemaType> {
	BUILTINS.get(name).cloned()
}

fn lookup_in_module(module: &str, name: &str) -> Option<SchemaType> {
	let runtime = MODULES.read().get(module).and_then(|namespace| namespace.get(name));
	runtime.or_else(|| {
		inventory::iter::<SchemaRegistration>
			.into_iter()
			.find(|registration| registration.module == module && registration.name == name)
			.map(|registration| (registration.factory)())
	})
}

/// `module::Name` path of `schema` when it is registered in the module that
/// defines it, so the path resolves without an owner.
pub fn qualified_path(schema: &SchemaType) -> Option<String> {
	let identity = schema.identity();
	if identity.contains('<') {
		return None;
	}
	let (module, _) = identity.rsplit_once("::")?;
	lookup_in_module(module, schema.name())
		.filter(|registered| registered == schema)
		.map(|_| format!("{}::{}", module, schema.name()))
}

pub(crate) fn lookup(name: &str, owner: Option<&Owner>) -> Result<SchemaType, SchemaResolutionError> {
	if let Some((module, short)) = split_qualified(name) {
		return lookup_in_module(module, short).ok_or_else(|| SchemaResolutionError::Undefined {
			name: short.to_string(),
			namespace: module.to_string(),
		});
	}

	let found = owner
		.and_then(|owner| {
			owner
				.locals()
				.and_then(|locals| locals.get(name))
				.or_else(|| lookup_in_module(owner.module(), name))
		})
		.or_else(|| GLOBAL.get(name))
		.or_else(|| builtin(name));

	match found {
		Some(schema) => {
			tracing::debug!(name, schema = schema.identity(), "resolved forward reference");
			Ok(schema)
		}
		None => Err(SchemaResolutionError::Undefined {
			name: name.to_string(),
			namespace: owner.map_or_else(|| GLOBAL.name().to_string(), |owner| owner.module().to_string()),
		}),
	}
}

/// Description of the type a field is declared on
///
/// # Examples
///
/// ```
/// use reinhardt_schema_types::{Owner, SchemaReference};
///
/// let owner = Owner::new("app::models", "Product").annotate("tags", "list[str]");
///
/// assert_eq!(owner.qualified_name(), "app::models::Product");
/// assert_eq!(owner.annotation("tags"), Some(&SchemaReference::list("str")));
/// ```
#[derive(Debug, Clone)]
pub struct Owner {
	module: String,
	name: String,
	locals: Option<Namespace>,
	annotations: HashMap<String, SchemaReference>,
}

impl Owner {
	pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			module: module.into(),
			name: name.into(),
			locals: None,
			annotations: HashMap::new(),
		}
	}

	pub fn with_locals(mut self, locals: Namespace) -> Self {
		self.locals = Some(locals);
		self
	}

	/// Declare the type annotation of attribute `attname`.
	///
	/// Text is parsed into its structured form right away so containers of
	/// forward references can still be resolved lazily. Unparseable text is
	/// kept as a name and reported on resolution.
	pub fn annotate(mut self, attname: impl Into<String>, reference: impl Into<SchemaReference>) -> Self {
		let reference = match reference.into() {
			SchemaReference::Named(text) => {
				SchemaReference::parse(&text).unwrap_or(SchemaReference::Named(text))
			}
			other => other,
		};
		self.annotations.insert(attname.into(), reference);
		self
	}

	pub fn module(&self) -> &str {
		&self.module
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn qualified_name(&self) -> String {
		format!("{}::{}", self.module, self.name)
	}

	pub fn locals(&self) -> Option<&Namespace> {
		self.locals.as_ref()
	}

	pub fn annotation(&self, attname: &str) -> Option<&SchemaReference> {
		self.annotations.get(attname)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[derive(serde::Serialize, serde::Deserialize, ToSchema)]
	struct Local {
		value: i64,
	}

	#[rstest]
	fn test_builtins_resolve_without_owner() {
		for name in ["int", "float", "str", "bool", "any"] {
			assert!(lookup(name, None).is_ok(), "{name}");
		}
	}

	#[rstest]
	fn test_locals_shadow_module() {
		let module = "namespace_tests::shadow";
		module_namespace(module).register("Thing", SchemaType::partial::<i64>("int"));
		let locals = Namespace::new("locals");
		locals.register_type::<Local>();
		locals.register("Thing", SchemaType::of::<Local>());
		let owner = Owner::new(module, "Model").with_locals(locals);

		let found = lookup("Thing", Some(&owner)).unwrap();

		assert_eq!(found, SchemaType::of::<Local>());
	}

	#[rstest]
	fn test_undefined_names_the_owner_module() {
		let owner = Owner::new("namespace_tests::missing", "Model");

		let err = lookup("Nowhere", Some(&owner)).unwrap_err();

		assert_eq!(
			err,
			SchemaResolutionError::Undefined {
				name: "Nowhere".into(),
				namespace: "namespace_tests::missing".into(),
			}
		);
	}

	#[rstest]
	fn test_qualified_lookup_only_searches_that_module() {
		module_namespace("namespace_tests::qualified").register("Local", SchemaType::of::<Local>());

		assert!(lookup("namespace_tests::qualified::Local", None).is_ok());
		assert!(lookup("namespace_tests::other::Local", None).is_err());
	}

	#[rstest]
	fn test_unregister() {
		let namespace = Namespace::new("scratch");
		namespace.register("A", SchemaType::partial::<bool>("bool"));

		assert!(namespace.contains("A"));
		assert!(namespace.unregister("A").is_some());
		assert!(!namespace.contains("A"));
	}
}
