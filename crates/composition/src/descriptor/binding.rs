use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;
use std::sync::Arc;

use amalgam_types::TypeRef;

use crate::FxIndexSet;

/// How a binding entered the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OriginKind {
	/// Discovered by a declarative scan.
	Declared,
	/// Added through [`crate::ConfigurationBuilder`].
	Configured,
	/// Created by the engine itself.
	Synthesized,
}

impl fmt::Display for OriginKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Declared => write!(f, "declared"),
			Self::Configured => write!(f, "configured"),
			Self::Synthesized => write!(f, "synthesized"),
		}
	}
}

/// Where a binding came from, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MixinOrigin {
	pub kind: OriginKind,
	pub location: Arc<str>,
}

impl MixinOrigin {
	/// Records the source location of the calling builder operation.
	#[track_caller]
	pub fn caller() -> Self {
		let loc = Location::caller();
		Self {
			kind: OriginKind::Configured,
			location: format!("{}:{}", loc.file(), loc.line()).into(),
		}
	}

	pub fn declared(location: impl Into<Arc<str>>) -> Self {
		Self {
			kind: OriginKind::Declared,
			location: location.into(),
		}
	}

	pub fn synthesized() -> Self {
		Self {
			kind: OriginKind::Synthesized,
			location: Arc::from("<synthesized>"),
		}
	}
}

impl fmt::Display for MixinOrigin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} at {}", self.kind, self.location)
	}
}

/// One mixin bound to a target class.
///
/// Equality covers the mixin and its dependencies. The origin is diagnostic
/// only, so identical compositions configured at different sites compare equal.
#[derive(Debug, Clone)]
pub struct MixinBinding {
	mixin: TypeRef,
	explicit_dependencies: FxIndexSet<TypeRef>,
	origin: MixinOrigin,
}

impl MixinBinding {
	pub fn new(mixin: TypeRef, origin: MixinOrigin) -> Self {
		Self {
			mixin,
			explicit_dependencies: FxIndexSet::default(),
			origin,
		}
	}

	/// Adds explicit dependencies; duplicates are collapsed.
	pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = TypeRef>) -> Self {
		self.explicit_dependencies.extend(dependencies);
		self
	}

	pub fn mixin(&self) -> &TypeRef {
		&self.mixin
	}

	pub fn explicit_dependencies(&self) -> impl ExactSizeIterator<Item = &TypeRef> + '_ {
		self.explicit_dependencies.iter()
	}

	pub fn depends_on(&self, ty: &TypeRef) -> bool {
		self.explicit_dependencies.contains(ty)
	}

	pub fn origin(&self) -> &MixinOrigin {
		&self.origin
	}
}

impl PartialEq for MixinBinding {
	fn eq(&self, other: &Self) -> bool {
		self.mixin == other.mixin && self.explicit_dependencies == other.explicit_dependencies
	}
}

impl Eq for MixinBinding {}

impl Hash for MixinBinding {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.mixin.hash(state);
		self.explicit_dependencies.len().hash(state);
		super::unordered_hash(&self.explicit_dependencies).hash(state);
	}
}
