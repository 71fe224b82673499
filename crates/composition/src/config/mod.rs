//! Immutable configuration sets and the per-thread active configuration.
//!
//! # Role
//!
//! A [`ConfigurationSet`] answers "which mixins apply to this class" for a
//! fixed collection of descriptors. Sets are cheap to clone and share; a set
//! becomes the ambient configuration of a thread while a
//! [`ConfigurationScope`] obtained from [`ConfigurationSet::enter_scope`] is
//! held.
//!
//! # Resolution
//!
//! - [`ConfigurationSet::resolve`] reports an explicitly emptied class the
//!   same way as a class never mentioned: `None`.
//! - [`ConfigurationSet::resolve_or_synthesize`] always yields a descriptor,
//!   creating an empty one on a miss. Synthesized descriptors are never
//!   stored in the set.
//! - [`ConfigurationSet::contains_exact`] still tells the two cases apart.
//!
//! Results found on an ancestor or a generic definition are rebound to the
//! queried type.

mod active;
mod master;


use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub use active::ConfigurationScope;
use amalgam_types::TypeRef;
pub use master::{DeclarativeScanner, EmptyScanner, MasterConfiguration};

use crate::FxIndexMap;
use crate::artifact::{DefinitionBuilder, DescriptorRecovery};
use crate::collection::DescriptorCollection;
use crate::descriptor::ClassDescriptor;
use crate::error::CompositionError;
use crate::validation::{ValidationEntry, ValidationLog, Validator};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

struct SetInner {
	id: u64,
	descriptors: DescriptorCollection,
	interfaces: FxIndexMap<TypeRef, Arc<ClassDescriptor>>,
	recovery: Option<Arc<dyn DescriptorRecovery>>,
}

/// Immutable, shareable set of class descriptors.
#[derive(Clone)]
pub struct ConfigurationSet {
	inner: Arc<SetInner>,
}

impl ConfigurationSet {
	pub fn empty() -> Self {
		Self::from_inner(DescriptorCollection::new(), FxIndexMap::default(), None)
	}

	/// Creates a set from descriptors with distinct targets.
	pub fn new(descriptors: impl IntoIterator<Item = ClassDescriptor>) -> Result<Self, CompositionError> {
		let collection = DescriptorCollection::from_descriptors(descriptors.into_iter().map(Arc::new))?;
		Self::from_parts(collection, None)
	}

	/// Creates a set, indexing complete interfaces.
	///
	/// An interface is indexed under the most general class registering it;
	/// subclasses that carry it through inheritance do not compete. Fails if
	/// two unrelated classes register the same complete interface.
	pub fn from_parts(
		descriptors: DescriptorCollection,
		recovery: Option<Arc<dyn DescriptorRecovery>>,
	) -> Result<Self, CompositionError> {
		let mut registrants: FxIndexMap<TypeRef, Vec<&Arc<ClassDescriptor>>> = FxIndexMap::default();
		for descriptor in descriptors.iter() {
			for interface in descriptor.complete_interfaces() {
				registrants.entry(interface.clone()).or_default().push(descriptor);
			}
		}

		let mut interfaces: FxIndexMap<TypeRef, Arc<ClassDescriptor>> = FxIndexMap::default();
		for (interface, candidates) in registrants {
			let mut roots = candidates.iter().filter(|d| {
				!candidates
					.iter()
					.any(|other| other.target() != d.target() && d.target().can_ascribe_to(other.target()))
			});
			let Some(first) = roots.next() else {
				continue;
			};
			if let Some(second) = roots.next() {
				return Err(CompositionError::AmbiguousCompleteInterface {
					interface,
					first: first.target().clone(),
					second: second.target().clone(),
				});
			}
			interfaces.insert(interface, Arc::clone(first));
		}
		Ok(Self::from_inner(descriptors, interfaces, recovery))
	}

	fn from_inner(
		descriptors: DescriptorCollection,
		interfaces: FxIndexMap<TypeRef, Arc<ClassDescriptor>>,
		recovery: Option<Arc<dyn DescriptorRecovery>>,
	) -> Self {
		Self {
			inner: Arc::new(SetInner {
				id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
				descriptors,
				interfaces,
				recovery,
			}),
		}
	}

	/// Returns a copy that maps generated types back to their descriptors
	/// through `recovery`.
	#[must_use]
	pub fn with_recovery(&self, recovery: Arc<dyn DescriptorRecovery>) -> Self {
		Self::from_inner(self.inner.descriptors.clone(), self.inner.interfaces.clone(), Some(recovery))
	}

	/// Process-unique identifier of this set.
	pub fn id(&self) -> u64 {
		self.inner.id
	}

	/// Returns true if both handles refer to the same set.
	pub fn same_as(&self, other: &ConfigurationSet) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}

	pub fn descriptors(&self) -> &DescriptorCollection {
		&self.inner.descriptors
	}

	pub fn recovery(&self) -> Option<&Arc<dyn DescriptorRecovery>> {
		self.inner.recovery.as_ref()
	}

	fn lookup(&self, ty: &TypeRef) -> Option<Arc<ClassDescriptor>> {
		if ty.is_generated()
			&& let Some(recovery) = &self.inner.recovery
		{
			return recovery.recover_descriptor(ty);
		}
		let found = self.inner.descriptors.get_with_inheritance(ty)?;
		if found.target() == ty {
			Some(found.clone())
		} else {
			Some(Arc::new(found.rebind(ty.clone())))
		}
	}

	/// Returns the non-empty descriptor that applies to `ty`, if any.
	pub fn resolve(&self, ty: &TypeRef) -> Option<Arc<ClassDescriptor>> {
		self.lookup(ty).filter(|descriptor| !descriptor.is_empty())
	}

	/// Returns the descriptor that applies to `ty`, or a fresh empty one.
	pub fn resolve_or_synthesize(&self, ty: &TypeRef) -> Arc<ClassDescriptor> {
		self.lookup(ty)
			.unwrap_or_else(|| Arc::new(ClassDescriptor::empty(ty.clone())))
	}

	pub fn contains_exact(&self, ty: &TypeRef) -> bool {
		self.inner.descriptors.contains_exact(ty)
	}

	pub fn contains_with_inheritance(&self, ty: &TypeRef) -> bool {
		self.inner.descriptors.contains_with_inheritance(ty)
	}

	/// Descriptor that registered `interface` as a complete interface.
	pub fn complete_interface(&self, interface: &TypeRef) -> Option<&Arc<ClassDescriptor>> {
		self.inner.interfaces.get(interface)
	}

	/// Validates every closed class target.
	///
	/// Open generic definitions are skipped; they are checked once closed. A
	/// definition that cannot be built is logged as a failed entry.
	pub fn validate(&self, definitions: &dyn DefinitionBuilder, validator: &Validator) -> ValidationLog {
		let mut log = ValidationLog::default();
		for descriptor in self.inner.descriptors.iter() {
			let target = descriptor.target();
			if target.is_generic_definition() || target.is_interface() {
				continue;
			}
			match definitions.build_definition(descriptor) {
				Ok(definition) => validator.validate_into(&definition, &mut log),
				Err(err) => log.push(ValidationEntry::failed(target.clone(), "definition", err.to_string())),
			}
		}
		if !log.is_success() {
			tracing::warn!(
				configuration = self.id(),
				failed = log.failed(),
				total = log.total(),
				"configuration validation failed"
			);
		}
		log
	}

	/// Makes this set the active configuration of the calling thread until
	/// the returned scope is left.
	pub fn enter_scope(&self) -> ConfigurationScope {
		active::enter(Some(self.clone()))
	}

	/// Configuration active on the calling thread.
	pub fn active() -> Option<ConfigurationSet> {
		active::current()
	}

	/// Number of scopes open on the calling thread.
	pub fn scope_depth() -> usize {
		active::depth()
	}

	/// The active configuration, or the master if no scope is open.
	pub fn active_or_master(master: &MasterConfiguration) -> Result<ConfigurationSet, CompositionError> {
		match active::current() {
			Some(active) => Ok(active),
			None => master.get(),
		}
	}
}

impl std::fmt::Debug for ConfigurationSet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ConfigurationSet")
			.field("id", &self.inner.id)
			.field("descriptors", &self.inner.descriptors.len())
			.field("recovery", &self.inner.recovery.is_some())
			.finish()
	}
}
