//! Descriptors keyed by exact target type.

use std::sync::Arc;

use amalgam_types::TypeRef;

use crate::FxIndexMap;
use crate::descriptor::ClassDescriptor;
use crate::error::CompositionError;

/// Ordered map from target type to descriptor.
///
/// Holds at most one descriptor per exact target. Lookups can fall back to
/// generic definitions and base classes, see [`Self::get_with_inheritance`].
#[derive(Debug, Clone, Default)]
pub struct DescriptorCollection {
	descriptors: FxIndexMap<TypeRef, Arc<ClassDescriptor>>,
}

impl DescriptorCollection {
	pub fn new() -> Self {
		Self::default()
	}

	/// Collects descriptors, failing on the first repeated target.
	pub fn from_descriptors(descriptors: impl IntoIterator<Item = Arc<ClassDescriptor>>) -> Result<Self, CompositionError> {
		let mut collection = Self::new();
		for descriptor in descriptors {
			collection.insert(descriptor)?;
		}
		Ok(collection)
	}

	pub fn insert(&mut self, descriptor: Arc<ClassDescriptor>) -> Result<(), CompositionError> {
		let target = descriptor.target().clone();
		if self.descriptors.contains_key(&target) {
			return Err(CompositionError::DuplicateTarget { target });
		}
		self.descriptors.insert(target, descriptor);
		Ok(())
	}

	pub fn get_exact(&self, ty: &TypeRef) -> Option<&Arc<ClassDescriptor>> {
		self.descriptors.get(ty)
	}

	/// Finds the descriptor for `ty` or the nearest configured ancestor.
	///
	/// At each level the exact type is tried first, then its open generic
	/// definition. The result keeps its own target, which may differ from `ty`.
	pub fn get_with_inheritance(&self, ty: &TypeRef) -> Option<&Arc<ClassDescriptor>> {
		std::iter::once(ty).chain(ty.ancestors()).find_map(|level| {
			self.descriptors.get(level).or_else(|| {
				level
					.generic_definition()
					.and_then(|definition| self.descriptors.get(definition))
			})
		})
	}

	pub fn contains_exact(&self, ty: &TypeRef) -> bool {
		self.descriptors.contains_key(ty)
	}

	pub fn contains_with_inheritance(&self, ty: &TypeRef) -> bool {
		self.get_with_inheritance(ty).is_some()
	}

	/// Descriptors in insertion order.
	pub fn iter(&self) -> impl ExactSizeIterator<Item = &Arc<ClassDescriptor>> + '_ {
		self.descriptors.values()
	}

	pub fn len(&self) -> usize {
		self.descriptors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.descriptors.is_empty()
	}
}
