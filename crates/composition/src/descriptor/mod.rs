//! Per-class composition descriptors.
//!
//! # Override families
//!
//! Two mixin types belong to the same override family when they are equal,
//! when one derives from the other, or when they share an open generic
//! definition (whatever the type arguments). Members of one family compete
//! for the same override slot, so a descriptor holds at most one of them.
//!
//! # Inheritance
//!
//! [`ClassDescriptor::inherit_from`] merges an ancestor's bindings into a new
//! descriptor. A binding the class already holds in the same family wins
//! silently when it is the same or more specific; a less specific one is a
//! [`CompositionError::LessSpecificOverride`].

mod binding;


use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};

use amalgam_types::TypeRef;
use rustc_hash::FxBuildHasher;
pub use binding::{MixinBinding, MixinOrigin, OriginKind};

use crate::error::{ArgumentError, CompositionError};
use crate::{FxIndexMap, FxIndexSet};

/// Position of an existing binding relative to a candidate mixin type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixinRelation {
	/// Same type or same generic family.
	Same,
	/// The existing binding derives from the candidate.
	MoreSpecific,
	/// The candidate derives from the existing binding.
	LessSpecific,
}

/// Classifies `existing` against `candidate`, or `None` if they are unrelated.
pub fn relation(existing: &TypeRef, candidate: &TypeRef) -> Option<MixinRelation> {
	if existing.generic_identity() == candidate.generic_identity() {
		Some(MixinRelation::Same)
	} else if existing.can_ascribe_to(candidate) || existing.can_ascribe_to(candidate.generic_identity()) {
		Some(MixinRelation::MoreSpecific)
	} else if candidate.can_ascribe_to(existing) || candidate.can_ascribe_to(existing.generic_identity()) {
		Some(MixinRelation::LessSpecific)
	} else {
		None
	}
}

/// Immutable record of the mixins and complete interfaces bound to a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
	target: TypeRef,
	mixins: FxIndexMap<TypeRef, MixinBinding>,
	complete_interfaces: FxIndexSet<TypeRef>,
}

impl ClassDescriptor {
	/// Creates a descriptor with no mixins and no complete interfaces.
	pub fn empty(target: TypeRef) -> Self {
		Self {
			target,
			mixins: FxIndexMap::default(),
			complete_interfaces: FxIndexSet::default(),
		}
	}

	/// Creates a descriptor, rejecting unhostable mixins, duplicate bindings
	/// and two bindings of the same override family.
	pub fn new(
		target: TypeRef,
		mixins: impl IntoIterator<Item = MixinBinding>,
		complete_interfaces: impl IntoIterator<Item = TypeRef>,
	) -> Result<Self, CompositionError> {
		if target.is_interface() {
			return Err(ArgumentError::InterfaceTarget { ty: target }.into());
		}
		let mut descriptor = Self::empty(target);
		for binding in mixins {
			descriptor.insert_binding(binding)?;
		}
		for interface in complete_interfaces {
			if !interface.is_interface() {
				return Err(ArgumentError::NotAnInterface { ty: interface }.into());
			}
			descriptor.complete_interfaces.insert(interface);
		}
		Ok(descriptor)
	}

	fn insert_binding(&mut self, binding: MixinBinding) -> Result<(), CompositionError> {
		check_hostable(&self.target, binding.mixin())?;
		if self.mixins.contains_key(binding.mixin()) {
			return Err(CompositionError::DuplicateMixin {
				target: self.target.clone(),
				mixin: binding.mixin().clone(),
			});
		}
		if let Some((existing, _)) = self.related_binding(binding.mixin()) {
			return Err(CompositionError::AmbiguousMixin {
				target: self.target.clone(),
				existing: existing.mixin().clone(),
				incoming: binding.mixin().clone(),
			});
		}
		self.mixins.insert(binding.mixin().clone(), binding);
		Ok(())
	}

	pub fn target(&self) -> &TypeRef {
		&self.target
	}

	/// Bindings in configuration order.
	pub fn mixins(&self) -> impl ExactSizeIterator<Item = &MixinBinding> + '_ {
		self.mixins.values()
	}

	/// Returns the binding for exactly `mixin`.
	pub fn mixin(&self, mixin: &TypeRef) -> Option<&MixinBinding> {
		self.mixins.get(mixin)
	}

	pub fn mixin_count(&self) -> usize {
		self.mixins.len()
	}

	pub fn complete_interfaces(&self) -> impl ExactSizeIterator<Item = &TypeRef> + '_ {
		self.complete_interfaces.iter()
	}

	pub fn has_complete_interface(&self, interface: &TypeRef) -> bool {
		self.complete_interfaces.contains(interface)
	}

	/// Returns true if there are no mixins and no complete interfaces.
	pub fn is_empty(&self) -> bool {
		self.mixins.is_empty() && self.complete_interfaces.is_empty()
	}

	/// Returns true if a binding in the same override family as `candidate`
	/// is already present.
	pub fn contains_override_for_mixin(&self, candidate: &TypeRef) -> bool {
		self.related_binding(candidate).is_some()
	}

	/// Finds the binding related to `candidate`, preferring one that is the
	/// same or more specific over one that is less specific.
	pub fn related_binding(&self, candidate: &TypeRef) -> Option<(&MixinBinding, MixinRelation)> {
		let mut less_specific = None;
		for binding in self.mixins.values() {
			match relation(binding.mixin(), candidate) {
				Some(MixinRelation::LessSpecific) => {
					less_specific.get_or_insert(binding);
				}
				Some(rel) => return Some((binding, rel)),
				None => {}
			}
		}
		less_specific.map(|b| (b, MixinRelation::LessSpecific))
	}

	/// Merges the bindings and complete interfaces of `base` into a new
	/// descriptor for this target.
	pub fn inherit_from(&self, base: &ClassDescriptor) -> Result<ClassDescriptor, CompositionError> {
		let mut merged = self.clone();
		for inherited in base.mixins.values() {
			match self.related_binding(inherited.mixin()) {
				Some((_, MixinRelation::Same | MixinRelation::MoreSpecific)) => {}
				Some((configured, MixinRelation::LessSpecific)) => {
					return Err(CompositionError::LessSpecificOverride {
						target: self.target.clone(),
						ancestor: base.target.clone(),
						inherited: inherited.mixin().clone(),
						configured: configured.mixin().clone(),
					});
				}
				None => {
					check_hostable(&self.target, inherited.mixin())?;
					merged.mixins.insert(inherited.mixin().clone(), inherited.clone());
				}
			}
		}
		for interface in &base.complete_interfaces {
			merged.complete_interfaces.insert(interface.clone());
		}
		Ok(merged)
	}

	/// Copies this descriptor for a different target.
	pub fn rebind(&self, target: TypeRef) -> ClassDescriptor {
		ClassDescriptor {
			target,
			mixins: self.mixins.clone(),
			complete_interfaces: self.complete_interfaces.clone(),
		}
	}
}

/// Rejects mixins the target class can never host.
pub(crate) fn check_hostable(target: &TypeRef, mixin: &TypeRef) -> Result<(), CompositionError> {
	let reason = if target.is_interface() {
		"interfaces cannot host mixins"
	} else if mixin.is_interface() {
		"interfaces cannot be used as mixins"
	} else if mixin == target {
		"a class cannot be mixed into itself"
	} else if mixin.is_generated() {
		"generated concrete types cannot be used as mixins"
	} else {
		return Ok(());
	};
	Err(CompositionError::UnhostableMixin {
		target: target.clone(),
		mixin: mixin.clone(),
		reason,
	})
}

impl Hash for ClassDescriptor {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.target.hash(state);
		self.mixins.len().hash(state);
		unordered_hash(self.mixins.values()).hash(state);
		self.complete_interfaces.len().hash(state);
		unordered_hash(&self.complete_interfaces).hash(state);
	}
}

/// Combines item hashes independently of iteration order, matching the
/// order-insensitive equality of index maps and sets.
pub(crate) fn unordered_hash<'a, T: Hash + 'a>(items: impl IntoIterator<Item = &'a T>) -> u64 {
	items
		.into_iter()
		.fold(0u64, |acc, item| acc.wrapping_add(FxBuildHasher.hash_one(item)))
}

impl fmt::Display for ClassDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} [", self.target)?;
		for (idx, mixin) in self.mixins.keys().enumerate() {
			if idx > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{mixin}")?;
		}
		f.write_str("]")
	}
}
