use std::fmt;

use smallvec::SmallVec;

use crate::TypeRef;

/// Parameter type list of a constructor or invoker.
pub type ParameterList = SmallVec<[TypeRef; 4]>;

/// Accessibility of a member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
	#[default]
	Public,
	NonPublic,
}

/// Constructor exposed by a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstructorInfo {
	parameters: ParameterList,
	visibility: Visibility,
}

impl ConstructorInfo {
	/// Creates a public constructor taking `parameters` in order.
	pub fn public(parameters: impl IntoIterator<Item = TypeRef>) -> Self {
		Self {
			parameters: parameters.into_iter().collect(),
			visibility: Visibility::Public,
		}
	}

	/// Creates a non-public constructor taking `parameters` in order.
	pub fn non_public(parameters: impl IntoIterator<Item = TypeRef>) -> Self {
		Self {
			parameters: parameters.into_iter().collect(),
			visibility: Visibility::NonPublic,
		}
	}

	pub fn parameters(&self) -> &[TypeRef] {
		&self.parameters
	}

	pub fn visibility(&self) -> Visibility {
		self.visibility
	}

	pub fn is_public(&self) -> bool {
		self.visibility == Visibility::Public
	}

	/// Returns true if the parameter list equals `parameters` exactly.
	pub fn matches(&self, parameters: &[TypeRef]) -> bool {
		self.parameters.as_slice() == parameters
	}

	/// Returns a displayable form of the parameter list.
	pub fn signature(&self) -> Signature<'_> {
		Signature(&self.parameters)
	}
}

/// Displays a parameter list as `(A, B, C)`.
#[derive(Debug, Clone, Copy)]
pub struct Signature<'a>(pub &'a [TypeRef]);

impl fmt::Display for Signature<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("(")?;
		for (idx, ty) in self.0.iter().enumerate() {
			if idx > 0 {
				f.write_str(", ")?;
			}
			f.write_str(ty.name())?;
		}
		f.write_str(")")
	}
}
