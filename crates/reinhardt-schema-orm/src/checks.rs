//! System checks reported by schema fields
//!
//! Checks never fail a declaration. They collect [`CheckMessage`]s that a
//! management command reports in bulk before serving or migrating.

use std::fmt;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

/// Severity of a check message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CheckLevel {
	Debug,
	Info,
	Warning,
	Error,
	Critical,
}

impl fmt::Display for CheckLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let label = match self {
			CheckLevel::Debug => "DEBUG",
			CheckLevel::Info => "INFO",
			CheckLevel::Warning => "WARNING",
			CheckLevel::Error => "ERROR",
			CheckLevel::Critical => "CRITICAL",
		};
		f.write_str(label)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckMessage {
	pub level: CheckLevel,
	pub id: String,
	pub msg: String,
	pub hint: Option<String>,
	/// Dotted path of the object the message is about
	pub obj: Option<String>,
}

impl CheckMessage {
	pub fn new(level: CheckLevel, id: impl Into<String>, msg: impl Into<String>) -> Self {
		Self {
			level,
			id: id.into(),
			msg: msg.into(),
			hint: None,
			obj: None,
		}
	}

	pub fn error(id: impl Into<String>, msg: impl Into<String>) -> Self {
		Self::new(CheckLevel::Error, id, msg)
	}

	pub fn warning(id: impl Into<String>, msg: impl Into<String>) -> Self {
		Self::new(CheckLevel::Warning, id, msg)
	}

	pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
		self.hint = Some(hint.into());
		self
	}

	pub fn with_obj(mut self, obj: impl Into<String>) -> Self {
		self.obj = Some(obj.into());
		self
	}

	/// Errors and critical messages stop commands that run checks.
	pub fn is_serious(&self) -> bool {
		self.level >= CheckLevel::Error
	}
}

impl fmt::Display for CheckMessage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if let Some(obj) = &self.obj {
			write!(f, "{}: ", obj)?;
		}
		write!(f, "({}) {}", self.id, self.msg)?;
		if let Some(hint) = &self.hint {
			write!(f, "\n\tHINT: {}", hint)?;
		}
		Ok(())
	}
}

pub trait Check: Send + Sync {
	fn tags(&self) -> Vec<String> {
		Vec::new()
	}

	fn check(&self) -> Vec<CheckMessage>;
}

static GLOBAL_REGISTRY: Lazy<Mutex<CheckRegistry>> = Lazy::new(|| Mutex::new(CheckRegistry::new()));

#[derive(Default)]
pub struct CheckRegistry {
	checks: Vec<Box<dyn Check>>,
}

impl CheckRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Process-wide registry
	pub fn global() -> &'static Mutex<CheckRegistry> {
		&GLOBAL_REGISTRY
	}

	pub fn register(&mut self, check: Box<dyn Check>) {
		self.checks.push(check);
	}

	pub fn len(&self) -> usize {
		self.checks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.checks.is_empty()
	}

	/// Run every registered check, or only those carrying one of `tags`.
	pub fn run_checks(&self, tags: Option<&[&str]>) -> Vec<CheckMessage> {
		let messages: Vec<CheckMessage> = self
			.checks
			.iter()
			.filter(|check| match tags {
				Some(tags) => check.tags().iter().any(|tag| tags.contains(&tag.as_str())),
				None => true,
			})
			.flat_map(|check| check.check())
			.collect();
		tracing::debug!(count = messages.len(), "system checks finished");
		messages
	}
}
