//! Schema references: declared-but-not-yet-evaluated schemas
//!
//! A field is declared with a [`SchemaReference`]. References may name types
//! that do not exist yet (`"Inner"`, `"list['app::Inner']"`); they are only
//! evaluated by [`SchemaReference::resolve`] on first use.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::SchemaResolutionError;
use crate::namespace::{self, Owner};
use crate::resolved::ResolvedSchema;
use crate::schema::SchemaType;

/// Documentation side-data attached to a schema
///
/// Has no effect on validation. Merged into the JSON Schema fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaMeta {
	pub title: Option<String>,
	pub description: Option<String>,
	pub examples: Vec<Value>,
	/// Extra JSON Schema keywords, applied last
	pub extra_json_schema: Map<String, Value>,
}

impl SchemaMeta {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn title(mut self, title: impl Into<String>) -> Self {
		self.title = Some(title.into());
		self
	}

	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}

	pub fn example(mut self, example: Value) -> Self {
		self.examples.push(example);
		self
	}

	pub fn extra(mut self, keyword: impl Into<String>, value: Value) -> Self {
		self.extra_json_schema.insert(keyword.into(), value);
		self
	}

	/// Merge this metadata into a JSON Schema fragment.
	pub fn apply_to(&self, schema: Value) -> Value {
		let mut object = match schema {
			Value::Object(object) => object,
			// boolean schemas cannot carry keywords
			other => return other,
		};
		if let Some(title) = &self.title {
			object.insert("title".into(), Value::String(title.clone()));
		}
		if let Some(description) = &self.description {
			object.insert("description".into(), Value::String(description.clone()));
		}
		if !self.examples.is_empty() {
			object.insert("examples".into(), Value::Array(self.examples.clone()));
		}
		for (keyword, value) in &self.extra_json_schema {
			object.insert(keyword.clone(), value.clone());
		}
		Value::Object(object)
	}
}

/// A name to be looked up later, optionally qualified by a module path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForwardRef {
	pub name: String,
	pub module: Option<String>,
}

impl ForwardRef {
	/// Build a forward reference from a possibly qualified name
	/// (`"Inner"`, `"app::models::Inner"` or `"app.Inner"`).
	pub fn new(path: impl AsRef<str>) -> Self {
		let path = path.as_ref().trim();
		match split_qualified(path) {
			Some((module, name)) => Self {
				name: name.to_string(),
				module: Some(module.to_string()),
			},
			None => Self {
				name: path.to_string(),
				module: None,
			},
		}
	}

	pub fn in_module(name: impl Into<String>, module: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			module: Some(module.into()),
		}
	}

	pub fn qualified_name(&self) -> String {
		match &self.module {
			Some(module) => format!("{}::{}", module, self.name),
			None => self.name.clone(),
		}
	}
}

impl fmt::Display for ForwardRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.qualified_name())
	}
}

pub(crate) fn split_qualified(path: &str) -> Option<(&str, &str)> {
	path.rsplit_once("::").or_else(|| path.rsplit_once('.'))
}

/// A schema as declared on a field
///
/// # Examples
///
/// ```
/// use reinhardt_schema_types::{ForwardRef, SchemaReference};
///
/// let reference: SchemaReference = "list['app::Inner']".parse().unwrap();
/// assert_eq!(
///     reference,
///     SchemaReference::list(SchemaReference::forward(ForwardRef::new("app::Inner")))
/// );
/// assert_eq!(reference.to_string(), "list['app::Inner']");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaReference {
	Concrete(SchemaType),
	Annotated {
		inner: Box<SchemaReference>,
		meta: SchemaMeta,
	},
	ForwardRef(ForwardRef),
	/// Textual reference evaluated in the owner's namespace on first use
	Named(String),
	List(Box<SchemaReference>),
	Optional(Box<SchemaReference>),
	Map(Box<SchemaReference>),
}

impl SchemaReference {
	pub fn of(schema: SchemaType) -> Self {
		SchemaReference::Concrete(schema)
	}

	pub fn named(text: impl Into<String>) -> Self {
		SchemaReference::Named(text.into())
	}

	pub fn forward(reference: ForwardRef) -> Self {
		SchemaReference::ForwardRef(reference)
	}

	pub fn list(item: impl Into<SchemaReference>) -> Self {
		SchemaReference::List(Box::new(item.into()))
	}

	pub fn optional(inner: impl Into<SchemaReference>) -> Self {
		SchemaReference::Optional(Box::new(inner.into()))
	}

	pub fn map(value: impl Into<SchemaReference>) -> Self {
		SchemaReference::Map(Box::new(value.into()))
	}

	pub fn annotated(inner: impl Into<SchemaReference>, meta: SchemaMeta) -> Self {
		SchemaReference::Annotated {
			inner: Box::new(inner.into()),
			meta,
		}
	}

	/// Parse the textual form used in field deconstruction.
	pub fn parse(text: &str) -> Result<Self, SchemaResolutionError> {
		Parser::new(text).parse_all()
	}

	/// Whether evaluating this reference requires a namespace lookup.
	pub fn is_deferred(&self) -> bool {
		match self {
			SchemaReference::Concrete(_) => false,
			SchemaReference::ForwardRef(_) | SchemaReference::Named(_) => true,
			SchemaReference::Annotated { inner, .. }
			| SchemaReference::List(inner)
			| SchemaReference::Optional(inner)
			| SchemaReference::Map(inner) => inner.is_deferred(),
		}
	}

	/// Replace concrete schemas registered in their defining module by their
	/// `module::Name` path. Other schemas keep their short name and resolve
	/// through the owner's namespaces or the global namespace.
	pub fn qualified(&self) -> SchemaReference {
		match self {
			SchemaReference::Concrete(schema) => namespace::qualified_path(schema)
				.map_or_else(|| self.clone(), SchemaReference::Named),
			SchemaReference::Annotated { inner, meta } => {
				SchemaReference::annotated(inner.qualified(), meta.clone())
			}
			SchemaReference::List(item) => SchemaReference::list(item.qualified()),
			SchemaReference::Optional(inner) => SchemaReference::optional(inner.qualified()),
			SchemaReference::Map(value) => SchemaReference::map(value.qualified()),
			SchemaReference::ForwardRef(_) | SchemaReference::Named(_) => self.clone(),
		}
	}

	/// Evaluate this reference, looking names up relative to `owner`.
	pub fn resolve(&self, owner: Option<&Owner>) -> Result<ResolvedSchema, SchemaResolutionError> {
		let resolved = match self {
			SchemaReference::Concrete(schema) => ResolvedSchema::Type(schema.clone()),
			SchemaReference::Annotated { inner, meta } => {
				ResolvedSchema::Annotated(Box::new(inner.resolve(owner)?), meta.clone())
			}
			SchemaReference::ForwardRef(reference) => {
				ResolvedSchema::Type(namespace::lookup(&reference.qualified_name(), owner)?)
			}
			SchemaReference::Named(text) => match SchemaReference::parse(text)? {
				SchemaReference::Named(name) => ResolvedSchema::Type(namespace::lookup(&name, owner)?),
				parsed => parsed.resolve(owner)?,
			},
			SchemaReference::List(item) => ResolvedSchema::List(Box::new(item.resolve(owner)?)),
			SchemaReference::Optional(inner) => {
				ResolvedSchema::Optional(Box::new(inner.resolve(owner)?))
			}
			SchemaReference::Map(value) => ResolvedSchema::Map(Box::new(value.resolve(owner)?)),
		};
		Ok(resolved)
	}
}

impl fmt::Display for SchemaReference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SchemaReference::Concrete(schema) => f.write_str(schema.name()),
			SchemaReference::Annotated { inner, .. } => write!(f, "{}", inner),
			SchemaReference::ForwardRef(reference) => write!(f, "'{}'", reference),
			SchemaReference::Named(text) => f.write_str(text),
			SchemaReference::List(item) => write!(f, "list[{}]", item),
			SchemaReference::Optional(inner) => write!(f, "Optional[{}]", inner),
			SchemaReference::Map(value) => write!(f, "dict[str, {}]", value),
		}
	}
}

impl FromStr for SchemaReference {
	type Err = SchemaResolutionError;

	fn from_str(text: &str) -> Result<Self, Self::Err> {
		SchemaReference::parse(text)
	}
}

impl From<SchemaType> for SchemaReference {
	fn from(schema: SchemaType) -> Self {
		SchemaReference::Concrete(schema)
	}
}

impl From<ForwardRef> for SchemaReference {
	fn from(reference: ForwardRef) -> Self {
		SchemaReference::ForwardRef(reference)
	}
}

impl From<&str> for SchemaReference {
	fn from(text: &str) -> Self {
		SchemaReference::Named(text.to_string())
	}
}

impl From<String> for SchemaReference {
	fn from(text: String) -> Self {
		SchemaReference::Named(text)
	}
}

impl From<ResolvedSchema> for SchemaReference {
	fn from(resolved: ResolvedSchema) -> Self {
		match resolved {
			ResolvedSchema::Type(schema) => SchemaReference::Concrete(schema),
			ResolvedSchema::List(item) => SchemaReference::list(*item),
			ResolvedSchema::Optional(inner) => SchemaReference::optional(*inner),
			ResolvedSchema::Map(value) => SchemaReference::map(*value),
			ResolvedSchema::Annotated(inner, meta) => SchemaReference::annotated(*inner, meta),
		}
	}
}

// expr  := term ('|' term)*
// term  := quoted | path ('[' expr (',' expr)* ']')?
struct Parser<'a> {
	source: &'a str,
	rest: &'a str,
}

impl<'a> Parser<'a> {
	fn new(source: &'a str) -> Self {
		Self {
			source,
			rest: source,
		}
	}

	fn error(&self, message: impl Into<String>) -> SchemaResolutionError {
		SchemaResolutionError::InvalidReference {
			reference: self.source.to_string(),
			message: message.into(),
		}
	}

	fn skip_whitespace(&mut self) {
		self.rest = self.rest.trim_start();
	}

	fn eat(&mut self, token: char) -> bool {
		self.skip_whitespace();
		match self.rest.strip_prefix(token) {
			Some(rest) => {
				self.rest = rest;
				true
			}
			None => false,
		}
	}

	fn parse_all(mut self) -> Result<SchemaReference, SchemaResolutionError> {
		let reference = self.parse_union()?;
		self.skip_whitespace();
		if !self.rest.is_empty() {
			return Err(self.error(format!("unexpected trailing input '{}'", self.rest)));
		}
		Ok(reference)
	}

	fn parse_union(&mut self) -> Result<SchemaReference, SchemaResolutionError> {
		let mut terms = vec![self.parse_term()?];
		while self.eat('|') {
			terms.push(self.parse_term()?);
		}
		if terms.len() == 1 {
			return Ok(terms.remove(0));
		}

		let before = terms.len();
		terms.retain(|term| !is_none(term));
		match (before - terms.len(), terms.len()) {
			(1, 1) => Ok(SchemaReference::optional(terms.remove(0))),
			_ => Err(self.error("only `X | None` unions are supported")),
		}
	}

	fn parse_term(&mut self) -> Result<SchemaReference, SchemaResolutionError> {
		self.skip_whitespace();
		if let Some(quote) = self.rest.chars().next().filter(|c| *c == '"' || *c == '\'') {
			return self.parse_quoted(quote);
		}

		let path = self.parse_path()?;
		if !self.eat('[') {
			return Ok(SchemaReference::Named(path.to_string()));
		}
		let mut arguments = vec![self.parse_union()?];
		while self.eat(',') {
			arguments.push(self.parse_union()?);
		}
		if !self.eat(']') {
			return Err(self.error("expected ']'"));
		}
		self.generic(path, arguments)
	}

	fn parse_quoted(&mut self, quote: char) -> Result<SchemaReference, SchemaResolutionError> {
		let body = &self.rest[quote.len_utf8()..];
		let end = body
			.find(quote)
			.ok_or_else(|| self.error("unterminated quoted reference"))?;
		let inner = &body[..end];
		self.rest = &body[end + quote.len_utf8()..];

		match Parser::new(inner).parse_all()? {
			SchemaReference::Named(name) => Ok(SchemaReference::ForwardRef(ForwardRef::new(name))),
			other => Ok(other),
		}
	}

	fn parse_path(&mut self) -> Result<&'a str, SchemaResolutionError> {
		self.skip_whitespace();
		let end = self
			.rest
			.find(|c: char| !(c.is_alphanumeric() || c == '_' || c == ':' || c == '.'))
			.unwrap_or(self.rest.len());
		if end == 0 {
			return Err(self.error("expected a type name"));
		}
		let (path, rest) = self.rest.split_at(end);
		self.rest = rest;
		Ok(path)
	}

	fn generic(
		&self,
		path: &str,
		mut arguments: Vec<SchemaReference>,
	) -> Result<SchemaReference, SchemaResolutionError> {
		let base = split_qualified(path).map_or(path, |(_, name)| name);
		match (base, arguments.len()) {
			("list" | "List" | "Sequence" | "Vec", 1) => Ok(SchemaReference::list(arguments.remove(0))),
			("Optional" | "Option", 1) => Ok(SchemaReference::optional(arguments.remove(0))),
			("dict" | "Dict" | "Mapping" | "HashMap" | "BTreeMap", 2) => {
				if !matches!(&arguments[0], SchemaReference::Named(key) if key == "str" || key == "String")
				{
					return Err(self.error("mapping keys must be `str`"));
				}
				Ok(SchemaReference::map(arguments.remove(1)))
			}
			_ => Err(self.error(format!(
				"unsupported generic '{}' with {} argument(s)",
				path,
				arguments.len()
			))),
		}
	}
}

fn is_none(reference: &SchemaReference) -> bool {
	matches!(reference, SchemaReference::Named(name) if name == "None")
}
