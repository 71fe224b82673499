//! Two-phase recovery of composed objects from stored state.
//!
//! [`begin_reconstruction`] checks the stored composition marker and picks
//! the concrete type; [`finish_reconstruction`] attaches member data once the
//! caller has created the object. Splitting the two lets callers resolve
//! object graphs with cycles before any member data is populated.


use std::sync::Arc;

use amalgam_types::TypeRef;
use indexmap::IndexMap;
use serde_json::Value;

use crate::FxIndexMap;
use crate::descriptor::ClassDescriptor;
use crate::error::{ArgumentError, ReconstructionError};

/// Composition context recorded alongside a composed object's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionMarker {
	descriptor: Arc<ClassDescriptor>,
}

impl CompositionMarker {
	pub fn new(descriptor: Arc<ClassDescriptor>) -> Self {
		Self { descriptor }
	}

	pub fn descriptor(&self) -> &Arc<ClassDescriptor> {
		&self.descriptor
	}

	/// Type every reconstructed instance must be assignable to.
	pub fn required_type(&self) -> &TypeRef {
		self.descriptor.target()
	}
}

/// Serialized state of one object.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredState {
	declared: TypeRef,
	marker: Option<CompositionMarker>,
	members: IndexMap<String, Value>,
	mixin_members: FxIndexMap<TypeRef, IndexMap<String, Value>>,
}

impl StoredState {
	/// State of an object whose recorded type is `declared`.
	pub fn new(declared: TypeRef) -> Self {
		Self {
			declared,
			marker: None,
			members: IndexMap::new(),
			mixin_members: FxIndexMap::default(),
		}
	}

	#[must_use]
	pub fn with_marker(mut self, marker: CompositionMarker) -> Self {
		self.marker = Some(marker);
		self
	}

	#[must_use]
	pub fn with_member(mut self, name: impl Into<String>, value: Value) -> Self {
		self.members.insert(name.into(), value);
		self
	}

	#[must_use]
	pub fn with_mixin_member(mut self, mixin: TypeRef, name: impl Into<String>, value: Value) -> Self {
		self.mixin_members.entry(mixin).or_default().insert(name.into(), value);
		self
	}

	pub fn declared(&self) -> &TypeRef {
		&self.declared
	}

	pub fn marker(&self) -> Option<&CompositionMarker> {
		self.marker.as_ref()
	}

	pub fn members(&self) -> &IndexMap<String, Value> {
		&self.members
	}
}

/// An object whose concrete type is decided but whose members are not yet
/// populated.
#[derive(Debug)]
pub struct ObjectHandle {
	concrete: TypeRef,
	marker: CompositionMarker,
	state: StoredState,
}

impl ObjectHandle {
	pub fn concrete(&self) -> &TypeRef {
		&self.concrete
	}

	pub fn marker(&self) -> &CompositionMarker {
		&self.marker
	}
}

/// A fully reconstructed object.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedObject {
	pub concrete: TypeRef,
	pub descriptor: Arc<ClassDescriptor>,
	pub members: IndexMap<String, Value>,
	pub mixin_members: FxIndexMap<TypeRef, IndexMap<String, Value>>,
}

/// Validates the stored composition context and picks the concrete type.
///
/// `transform` maps the type the marker requires to the concrete type to
/// instantiate, usually through [`crate::Composer::resolve_or_build_type`].
pub fn begin_reconstruction(
	transform: impl FnOnce(&TypeRef) -> TypeRef,
	state: StoredState,
) -> Result<ObjectHandle, ReconstructionError> {
	let Some(marker) = state.marker.clone() else {
		return Err(ReconstructionError::NotComposed { ty: state.declared });
	};

	let required = marker.required_type();
	let concrete = transform(required);
	if !concrete.is_assignable_to(required) {
		return Err(ArgumentError::IncompatibleType {
			expected: required.clone(),
			actual: concrete,
		}
		.into());
	}
	tracing::trace!(required = %required, concrete = %concrete, "began reconstruction");
	Ok(ObjectHandle { concrete, marker, state })
}

/// Populates member data for a handle from [`begin_reconstruction`].
///
/// Fails if the stored state carries data for a mixin the composition does
/// not configure.
pub fn finish_reconstruction(handle: ObjectHandle) -> Result<ReconstructedObject, ReconstructionError> {
	let ObjectHandle { concrete, marker, state } = handle;
	let descriptor = marker.descriptor;
	if let Some(unknown) = state.mixin_members.keys().find(|m| descriptor.mixin(m).is_none()) {
		return Err(ReconstructionError::UnknownMixin {
			target: descriptor.target().clone(),
			mixin: unknown.clone(),
		});
	}
	Ok(ReconstructedObject {
		concrete,
		descriptor,
		members: state.members,
		mixin_members: state.mixin_members,
	})
}
