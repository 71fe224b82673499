use amalgam_types::{ConstructorInfo, TypeRef};

use super::key::{ConstructorSelector, InvokerShape};
use crate::error::LookupError;

/// A constructor of a concrete type, bound to the shape it was requested with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundInvoker {
	concrete: TypeRef,
	constructor: ConstructorInfo,
	shape: InvokerShape,
}

impl BoundInvoker {
	pub fn concrete(&self) -> &TypeRef {
		&self.concrete
	}

	pub fn constructor(&self) -> &ConstructorInfo {
		&self.constructor
	}

	pub fn shape(&self) -> &InvokerShape {
		&self.shape
	}
}

/// Finds the constructor of `concrete` whose parameters match the selector.
pub(crate) fn bind_constructor(concrete: &TypeRef, selector: &ConstructorSelector) -> Result<BoundInvoker, LookupError> {
	let parameters = &selector.shape.parameters;
	concrete
		.constructors()
		.iter()
		.find(|ctor| ctor.matches(parameters) && (ctor.is_public() || selector.allow_non_public))
		.map(|ctor| BoundInvoker {
			concrete: concrete.clone(),
			constructor: ctor.clone(),
			shape: selector.shape.clone(),
		})
		.ok_or_else(|| LookupError::ConstructorNotFound {
			concrete: concrete.clone(),
			signature: selector.shape.signature().to_string(),
			visibility: if selector.allow_non_public { "public or non-public" } else { "public" },
		})
}
