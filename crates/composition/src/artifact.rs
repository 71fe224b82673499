//! Contracts of the artifact builder that turns resolved compositions into
//! concrete types.
//!
//! The engine never emits code itself. It hands a [`CompoundCacheKey`] to an
//! [`ArtifactBuilder`] and caches whatever type comes back.

use std::sync::Arc;

use amalgam_types::TypeRef;

use crate::cache::{CompoundCacheKey, ParticipantState};
use crate::descriptor::ClassDescriptor;
use crate::error::{AssemblyError, CompositionError};

/// Maps a built concrete type back to the descriptor it was assembled from.
pub trait DescriptorRecovery: Send + Sync {
	fn recover_descriptor(&self, concrete: &TypeRef) -> Option<Arc<ClassDescriptor>>;
}

/// Computes the override bindings and base-call requirements of a descriptor.
pub trait DefinitionBuilder: Send + Sync {
	fn build_definition(&self, descriptor: &Arc<ClassDescriptor>) -> Result<ResolvedDefinition, CompositionError>;
}

/// Assembles concrete types.
///
/// Called with the cache lock held. Implementations must not call back into
/// the [`crate::CompositionCache`] that invoked them.
pub trait ArtifactBuilder: DescriptorRecovery + DefinitionBuilder {
	fn assemble_type(&self, key: &CompoundCacheKey, state: &mut ParticipantState) -> Result<TypeRef, AssemblyError>;
}

/// One member override introduced by a composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideBinding {
	pub member: Arc<str>,
	/// Type supplying the overriding implementation.
	pub overrider: TypeRef,
	/// Type whose member is overridden.
	pub overridden: TypeRef,
}

impl OverrideBinding {
	pub fn new(member: impl Into<Arc<str>>, overrider: TypeRef, overridden: TypeRef) -> Self {
		Self {
			member: member.into(),
			overrider,
			overridden,
		}
	}
}

/// A descriptor together with the overrides and base-call interfaces its
/// composition requires.
#[derive(Debug, Clone)]
pub struct ResolvedDefinition {
	descriptor: Arc<ClassDescriptor>,
	overrides: Vec<OverrideBinding>,
	required_base_calls: Vec<TypeRef>,
}

impl ResolvedDefinition {
	pub fn new(descriptor: Arc<ClassDescriptor>) -> Self {
		Self {
			descriptor,
			overrides: Vec::new(),
			required_base_calls: Vec::new(),
		}
	}

	#[must_use]
	pub fn with_override(mut self, binding: OverrideBinding) -> Self {
		self.overrides.push(binding);
		self
	}

	#[must_use]
	pub fn with_base_call(mut self, interface: TypeRef) -> Self {
		self.required_base_calls.push(interface);
		self
	}

	pub fn descriptor(&self) -> &Arc<ClassDescriptor> {
		&self.descriptor
	}

	pub fn target(&self) -> &TypeRef {
		self.descriptor.target()
	}

	pub fn overrides(&self) -> &[OverrideBinding] {
		&self.overrides
	}

	pub fn required_base_calls(&self) -> &[TypeRef] {
		&self.required_base_calls
	}
}
