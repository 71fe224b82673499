use std::fmt;
use std::sync::Arc;

use amalgam_types::{ParameterList, Signature, TypeRef};
use smallvec::SmallVec;

use crate::descriptor::ClassDescriptor;

/// One contributor's share of a [`CompoundCacheKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
	/// The contributor has nothing to add for this request.
	Absent,
	Descriptor(Arc<ClassDescriptor>),
	Type(TypeRef),
	Token(Arc<str>),
}

impl KeyPart {
	pub fn descriptor(&self) -> Option<&Arc<ClassDescriptor>> {
		match self {
			Self::Descriptor(descriptor) => Some(descriptor),
			_ => None,
		}
	}
}

/// Name and parameter list of a requested constructor invoker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvokerShape {
	pub name: Arc<str>,
	pub parameters: ParameterList,
}

impl InvokerShape {
	pub fn new(name: impl Into<Arc<str>>, parameters: impl IntoIterator<Item = TypeRef>) -> Self {
		Self {
			name: name.into(),
			parameters: parameters.into_iter().collect(),
		}
	}

	pub fn signature(&self) -> Signature<'_> {
		Signature(&self.parameters)
	}
}

impl fmt::Display for InvokerShape {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}{}", self.name, self.signature())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstructorSelector {
	pub shape: InvokerShape,
	pub allow_non_public: bool,
}

/// Structural identity of a cache entry.
///
/// The requested type, the constructor selector for invoker entries, and one
/// [`KeyPart`] per registered contributor in registration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompoundCacheKey {
	requested: TypeRef,
	selector: Option<ConstructorSelector>,
	participants: SmallVec<[KeyPart; 2]>,
}

impl CompoundCacheKey {
	pub fn for_type(requested: TypeRef, participants: impl IntoIterator<Item = KeyPart>) -> Self {
		Self {
			requested,
			selector: None,
			participants: participants.into_iter().collect(),
		}
	}

	/// Extends a type key with a constructor selector.
	pub fn for_constructor(type_key: CompoundCacheKey, selector: ConstructorSelector) -> Self {
		Self {
			selector: Some(selector),
			..type_key
		}
	}

	/// The key of the concrete type this key refers to.
	pub fn type_key(&self) -> CompoundCacheKey {
		Self {
			requested: self.requested.clone(),
			selector: None,
			participants: self.participants.clone(),
		}
	}

	pub fn requested(&self) -> &TypeRef {
		&self.requested
	}

	pub fn selector(&self) -> Option<&ConstructorSelector> {
		self.selector.as_ref()
	}

	pub fn participants(&self) -> &[KeyPart] {
		&self.participants
	}

	/// First descriptor contributed to this key.
	pub fn descriptor(&self) -> Option<&Arc<ClassDescriptor>> {
		self.participants.iter().find_map(KeyPart::descriptor)
	}
}
