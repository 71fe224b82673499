//! Rule-based checks over resolved definitions.

mod rules;


use std::borrow::Cow;
use std::sync::Arc;

use amalgam_types::TypeRef;
pub use rules::{BaseCallInterfacesRule, ExplicitDependenciesRule, OverrideTargetsRule};

use crate::artifact::ResolvedDefinition;
use crate::error::CompositionError;

/// A single check applied to every resolved definition.
pub trait ValidationRule: Send + Sync {
	fn name(&self) -> &'static str;
	fn check(&self, definition: &ResolvedDefinition) -> RuleOutcome;
}

/// Result of one rule on one definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
	pub passed: bool,
	pub message: Cow<'static, str>,
}

impl RuleOutcome {
	pub fn pass() -> Self {
		Self {
			passed: true,
			message: Cow::Borrowed("ok"),
		}
	}

	pub fn fail(message: impl Into<Cow<'static, str>>) -> Self {
		Self {
			passed: false,
			message: message.into(),
		}
	}
}

/// One logged rule outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationEntry {
	pub target: TypeRef,
	pub rule: &'static str,
	pub passed: bool,
	pub message: Cow<'static, str>,
}

impl ValidationEntry {
	pub fn failed(target: TypeRef, rule: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
		Self {
			target,
			rule,
			passed: false,
			message: message.into(),
		}
	}
}

/// Accumulated pass/fail log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationLog {
	entries: Vec<ValidationEntry>,
}

impl ValidationLog {
	pub fn push(&mut self, entry: ValidationEntry) {
		self.entries.push(entry);
	}

	pub fn entries(&self) -> &[ValidationEntry] {
		&self.entries
	}

	pub fn failures(&self) -> impl Iterator<Item = &ValidationEntry> + '_ {
		self.entries.iter().filter(|e| !e.passed)
	}

	pub fn passed(&self) -> usize {
		self.entries.iter().filter(|e| e.passed).count()
	}

	pub fn failed(&self) -> usize {
		self.total() - self.passed()
	}

	pub fn total(&self) -> usize {
		self.entries.len()
	}

	pub fn is_success(&self) -> bool {
		self.entries.iter().all(|e| e.passed)
	}

	/// Converts a log with failures into [`CompositionError::ValidationFailed`].
	pub fn into_result(self) -> Result<Self, CompositionError> {
		if self.is_success() {
			return Ok(self);
		}
		let first = self
			.failures()
			.next()
			.map(|e| format!("{} [{}]: {}", e.target, e.rule, e.message))
			.unwrap_or_default();
		Err(CompositionError::ValidationFailed {
			failed: self.failed(),
			total: self.total(),
			first,
		})
	}
}

/// Ordered set of validation rules.
#[derive(Clone)]
pub struct Validator {
	rules: Vec<Arc<dyn ValidationRule>>,
}

impl Default for Validator {
	fn default() -> Self {
		Self::new()
	}
}

impl Validator {
	/// Creates a validator with the built-in rules.
	pub fn new() -> Self {
		Self::empty()
			.with_rule(ExplicitDependenciesRule)
			.with_rule(BaseCallInterfacesRule)
			.with_rule(OverrideTargetsRule)
	}

	pub fn empty() -> Self {
		Self { rules: Vec::new() }
	}

	#[must_use]
	pub fn with_rule(mut self, rule: impl ValidationRule + 'static) -> Self {
		self.rules.push(Arc::new(rule));
		self
	}

	pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
		self.rules.iter().map(|r| r.name())
	}

	pub fn validate_definition(&self, definition: &ResolvedDefinition) -> ValidationLog {
		let mut log = ValidationLog::default();
		self.validate_into(definition, &mut log);
		log
	}

	pub fn validate_into(&self, definition: &ResolvedDefinition, log: &mut ValidationLog) {
		for rule in &self.rules {
			let outcome = rule.check(definition);
			if !outcome.passed {
				tracing::debug!(target_type = %definition.target(), rule = rule.name(), message = %outcome.message, "validation rule failed");
			}
			log.push(ValidationEntry {
				target: definition.target().clone(),
				rule: rule.name(),
				passed: outcome.passed,
				message: outcome.message,
			});
		}
	}
}

impl std::fmt::Debug for Validator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(self.rule_names()).finish()
	}
}
