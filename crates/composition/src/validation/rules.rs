use amalgam_types::TypeRef;

use super::{RuleOutcome, ValidationRule};
use crate::artifact::ResolvedDefinition;

/// Every explicit dependency of a mixin must be met by another mixin of the
/// same class.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitDependenciesRule;

impl ValidationRule for ExplicitDependenciesRule {
	fn name(&self) -> &'static str {
		"explicit-dependencies"
	}

	fn check(&self, definition: &ResolvedDefinition) -> RuleOutcome {
		let descriptor = definition.descriptor();
		for binding in descriptor.mixins() {
			for dependency in binding.explicit_dependencies() {
				let satisfied = descriptor
					.mixins()
					.any(|other| other.mixin() != binding.mixin() && other.mixin().is_assignable_to(dependency));
				if !satisfied {
					return RuleOutcome::fail(format!(
						"mixin {} depends on {}, which no other mixin of {} provides",
						binding.mixin(),
						dependency,
						descriptor.target()
					));
				}
			}
		}
		RuleOutcome::pass()
	}
}

/// Interfaces a mixin calls through to its base must be implemented by the
/// target or by one of its mixins.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseCallInterfacesRule;

impl ValidationRule for BaseCallInterfacesRule {
	fn name(&self) -> &'static str {
		"base-call-interfaces"
	}

	fn check(&self, definition: &ResolvedDefinition) -> RuleOutcome {
		let descriptor = definition.descriptor();
		let missing = definition.required_base_calls().iter().find(|interface| {
			!descriptor.target().is_assignable_to(interface) && !descriptor.mixins().any(|m| m.mixin().is_assignable_to(interface))
		});
		match missing {
			Some(interface) => RuleOutcome::fail(format!(
				"base call interface {interface} is implemented neither by {} nor by any of its mixins",
				descriptor.target()
			)),
			None => RuleOutcome::pass(),
		}
	}
}

/// Overrides must come from the target or a mixin and replace a member of the
/// target, one of its ancestors, or a mixin.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverrideTargetsRule;

impl ValidationRule for OverrideTargetsRule {
	fn name(&self) -> &'static str {
		"override-targets"
	}

	fn check(&self, definition: &ResolvedDefinition) -> RuleOutcome {
		let descriptor = definition.descriptor();
		let target = descriptor.target();
		let is_mixin = |ty: &TypeRef| descriptor.mixin(ty).is_some();
		for binding in definition.overrides() {
			if binding.overrider != *target && !is_mixin(&binding.overrider) {
				return RuleOutcome::fail(format!(
					"override of {} is supplied by {}, which is neither {target} nor one of its mixins",
					binding.member, binding.overrider
				));
			}
			if !target.can_ascribe_to(&binding.overridden) && !is_mixin(&binding.overridden) {
				return RuleOutcome::fail(format!(
					"{} overrides {}.{}, which is outside the hierarchy of {target}",
					binding.overrider, binding.overridden, binding.member
				));
			}
		}
		RuleOutcome::pass()
	}
}
