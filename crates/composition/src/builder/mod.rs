//! Fluent construction of [`ConfigurationSet`]s.
//!
//! A builder starts empty, from an explicit parent set, or from whatever is
//! active on the calling thread. Classes selected with
//! [`ConfigurationBuilder::for_class`] are seeded with the parent's exact
//! descriptor; an explicitly added mixin supersedes a seeded one of the same
//! override family. Classes that request inheritance are merged with their
//! ancestors' final descriptors when the set is built, ancestors first.


use std::iter;
use std::sync::Arc;

use amalgam_types::TypeRef;
use rustc_hash::FxHashSet;

use crate::artifact::DescriptorRecovery;
use crate::collection::DescriptorCollection;
use crate::config::{ConfigurationSet, MasterConfiguration};
use crate::descriptor::{self, ClassDescriptor, MixinBinding, MixinOrigin};
use crate::error::{ArgumentError, CompositionError};
use crate::{FxIndexMap, FxIndexSet};

/// Accumulates per-class changes on top of an optional parent set.
#[derive(Default)]
pub struct ConfigurationBuilder {
	parent: Option<ConfigurationSet>,
	classes: FxIndexMap<TypeRef, ClassBuilder>,
	recovery: Option<Arc<dyn DescriptorRecovery>>,
}

impl ConfigurationBuilder {
	/// Starts from an empty configuration.
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts from `parent`. Descriptors not touched by the builder are kept.
	pub fn with_parent(parent: ConfigurationSet) -> Self {
		Self {
			recovery: parent.recovery().cloned(),
			parent: Some(parent),
			classes: FxIndexMap::default(),
		}
	}

	/// Starts from the active configuration, building the master if no scope
	/// is open.
	pub fn from_active(master: &MasterConfiguration) -> Result<Self, CompositionError> {
		Ok(Self::with_parent(ConfigurationSet::active_or_master(master)?))
	}

	#[must_use]
	pub fn with_recovery(mut self, recovery: Arc<dyn DescriptorRecovery>) -> Self {
		self.recovery = Some(recovery);
		self
	}

	pub fn parent(&self) -> Option<&ConfigurationSet> {
		self.parent.as_ref()
	}

	/// Selects `target` for modification.
	pub fn for_class(&mut self, target: &TypeRef) -> Result<&mut ClassBuilder, CompositionError> {
		if target.is_interface() {
			return Err(ArgumentError::InterfaceTarget { ty: target.clone() }.into());
		}
		let seed = self.parent.as_ref().and_then(|p| p.descriptors().get_exact(target));
		Ok(self
			.classes
			.entry(target.clone())
			.or_insert_with(|| ClassBuilder::seeded(target.clone(), seed)))
	}

	/// Returns the builder of a class already selected.
	pub fn class(&self, target: &TypeRef) -> Option<&ClassBuilder> {
		self.classes.get(target)
	}

	/// Produces the immutable set.
	pub fn build(self) -> Result<ConfigurationSet, CompositionError> {
		let mut pending = FxIndexMap::default();
		for (target, class) in self.classes {
			let descriptor = class.descriptor()?;
			pending.insert(target, (descriptor, class.ancestors));
		}

		let mut resolver = InheritanceResolver {
			parent: self.parent.as_ref(),
			pending,
			resolved: FxIndexMap::default(),
			visiting: FxHashSet::default(),
		};
		while let Some(target) = resolver.pending.keys().next().cloned() {
			resolver.resolve(&target)?;
		}

		let mut collection = DescriptorCollection::new();
		if let Some(parent) = &self.parent {
			for descriptor in parent.descriptors().iter() {
				if !resolver.resolved.contains_key(descriptor.target()) {
					collection.insert(descriptor.clone())?;
				}
			}
		}
		let changed = resolver.resolved.len();
		for (_, descriptor) in resolver.resolved {
			collection.insert(Arc::new(descriptor))?;
		}

		let set = ConfigurationSet::from_parts(collection, self.recovery)?;
		tracing::debug!(
			configuration = set.id(),
			descriptors = set.descriptors().len(),
			changed,
			"built configuration set"
		);
		Ok(set)
	}
}

impl std::fmt::Debug for ConfigurationBuilder {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ConfigurationBuilder")
			.field("parent", &self.parent)
			.field("classes", &self.classes.keys().collect::<Vec<_>>())
			.finish_non_exhaustive()
	}
}

/// Pending changes to one class.
#[derive(Debug, Clone)]
pub struct ClassBuilder {
	target: TypeRef,
	mixins: FxIndexMap<TypeRef, MixinBinding>,
	explicit: FxHashSet<TypeRef>,
	complete_interfaces: FxIndexSet<TypeRef>,
	ancestors: Vec<TypeRef>,
}

impl ClassBuilder {
	fn seeded(target: TypeRef, seed: Option<&Arc<ClassDescriptor>>) -> Self {
		let mut class = Self {
			target,
			mixins: FxIndexMap::default(),
			explicit: FxHashSet::default(),
			complete_interfaces: FxIndexSet::default(),
			ancestors: Vec::new(),
		};
		if let Some(seed) = seed {
			class.mixins.extend(seed.mixins().map(|b| (b.mixin().clone(), b.clone())));
			class.complete_interfaces.extend(seed.complete_interfaces().cloned());
		}
		class
	}

	pub fn target(&self) -> &TypeRef {
		&self.target
	}

	/// Adds `mixin`, recording the caller as its origin.
	#[track_caller]
	pub fn add_mixin(&mut self, mixin: &TypeRef) -> Result<&mut Self, CompositionError> {
		self.add_binding(MixinBinding::new(mixin.clone(), MixinOrigin::caller()))
	}

	#[track_caller]
	pub fn add_mixin_with_dependencies(
		&mut self,
		mixin: &TypeRef,
		dependencies: impl IntoIterator<Item = TypeRef>,
	) -> Result<&mut Self, CompositionError> {
		let binding = MixinBinding::new(mixin.clone(), MixinOrigin::caller()).with_dependencies(dependencies);
		self.add_binding(binding)
	}

	/// Adds a binding.
	///
	/// A seeded binding of the same override family is replaced. Two explicit
	/// bindings of one family are ambiguous.
	pub fn add_binding(&mut self, binding: MixinBinding) -> Result<&mut Self, CompositionError> {
		descriptor::check_hostable(&self.target, binding.mixin())?;
		if self.explicit.contains(binding.mixin()) {
			return Err(CompositionError::DuplicateMixin {
				target: self.target.clone(),
				mixin: binding.mixin().clone(),
			});
		}
		if let Some(existing) = self
			.mixins
			.keys()
			.find(|ty| self.explicit.contains(*ty) && descriptor::relation(ty, binding.mixin()).is_some())
		{
			return Err(CompositionError::AmbiguousMixin {
				target: self.target.clone(),
				existing: existing.clone(),
				incoming: binding.mixin().clone(),
			});
		}

		let before = self.mixins.len();
		self.mixins
			.retain(|ty, _| descriptor::relation(ty, binding.mixin()).is_none());
		if self.mixins.len() != before {
			tracing::trace!(target_type = %self.target, mixin = %binding.mixin(), "superseded inherited mixin binding");
		}
		self.explicit.insert(binding.mixin().clone());
		self.mixins.insert(binding.mixin().clone(), binding);
		Ok(self)
	}

	/// Removes exactly `mixin`. Returns false if it was not bound.
	pub fn remove_mixin(&mut self, mixin: &TypeRef) -> bool {
		self.explicit.remove(mixin);
		self.mixins.shift_remove(mixin).is_some()
	}

	pub fn add_complete_interface(&mut self, interface: &TypeRef) -> Result<&mut Self, CompositionError> {
		if !interface.is_interface() {
			return Err(ArgumentError::NotAnInterface { ty: interface.clone() }.into());
		}
		self.complete_interfaces.insert(interface.clone());
		Ok(self)
	}

	/// Drops every mixin and complete interface, seeded or explicit.
	///
	/// The class stays in the built set as an explicitly empty descriptor.
	pub fn clear(&mut self) -> &mut Self {
		self.mixins.clear();
		self.explicit.clear();
		self.complete_interfaces.clear();
		self
	}

	/// Merges the final descriptor of `ancestor` into this class on build.
	pub fn inherit_from(&mut self, ancestor: &TypeRef) -> &mut Self {
		if !self.ancestors.contains(ancestor) {
			self.ancestors.push(ancestor.clone());
		}
		self
	}

	/// Inherits from the target's direct base class, if it has one.
	pub fn inherit_from_base(&mut self) -> &mut Self {
		if let Some(base) = self.target.base().cloned() {
			self.inherit_from(&base);
		}
		self
	}

	pub fn mixins(&self) -> impl ExactSizeIterator<Item = &MixinBinding> + '_ {
		self.mixins.values()
	}

	pub fn complete_interfaces(&self) -> impl ExactSizeIterator<Item = &TypeRef> + '_ {
		self.complete_interfaces.iter()
	}

	pub fn inherits_from(&self) -> &[TypeRef] {
		&self.ancestors
	}

	fn descriptor(&self) -> Result<ClassDescriptor, CompositionError> {
		ClassDescriptor::new(
			self.target.clone(),
			self.mixins.values().cloned(),
			self.complete_interfaces.iter().cloned(),
		)
	}
}

/// Applies requested inheritance, resolving each ancestor before its
/// descendants.
struct InheritanceResolver<'a> {
	parent: Option<&'a ConfigurationSet>,
	pending: FxIndexMap<TypeRef, (ClassDescriptor, Vec<TypeRef>)>,
	resolved: FxIndexMap<TypeRef, ClassDescriptor>,
	visiting: FxHashSet<TypeRef>,
}

impl InheritanceResolver<'_> {
	fn resolve(&mut self, target: &TypeRef) -> Result<(), CompositionError> {
		let Some((mut descriptor, ancestors)) = self.pending.shift_remove(target) else {
			return Ok(());
		};
		self.visiting.insert(target.clone());
		for ancestor in &ancestors {
			if let Some(base) = self.descriptor_for(ancestor)? {
				descriptor = descriptor.inherit_from(&base)?;
			}
		}
		self.visiting.remove(target);
		self.resolved.insert(target.clone(), descriptor);
		Ok(())
	}

	/// Final descriptor applying to `ty`, walking its base chain and generic
	/// definitions like [`DescriptorCollection::get_with_inheritance`].
	fn descriptor_for(&mut self, ty: &TypeRef) -> Result<Option<ClassDescriptor>, CompositionError> {
		for level in iter::once(ty).chain(ty.ancestors()) {
			for candidate in iter::once(level).chain(level.generic_definition()) {
				if self.visiting.contains(candidate) {
					return Err(CompositionError::InheritanceCycle {
						target: candidate.clone(),
					});
				}
				if self.pending.contains_key(candidate) {
					self.resolve(candidate)?;
				}
				if let Some(found) = self.resolved.get(candidate) {
					return Ok(Some(found.clone()));
				}
				if let Some(found) = self.parent.and_then(|p| p.descriptors().get_exact(candidate)) {
					return Ok(Some(ClassDescriptor::clone(found)));
				}
			}
		}
		Ok(None)
	}
}
