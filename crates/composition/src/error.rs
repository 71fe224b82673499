//! Error types for composition, caching, scoping and reconstruction.
//!
//! None of these are corrected automatically. A conflicting composition is
//! reported to the caller, which decides whether to adjust configuration and
//! try again.

use std::error::Error as StdError;

use amalgam_types::TypeRef;

/// Invalid call parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
	#[error("{ty} is an interface and cannot be a composition target")]
	InterfaceTarget { ty: TypeRef },
	#[error("{ty} is not an interface and cannot be registered as a complete interface")]
	NotAnInterface { ty: TypeRef },
	#[error("{ty} is an open generic type definition and cannot be instantiated")]
	OpenGenericRequest { ty: TypeRef },
	#[error("{ty} is an interface and cannot be instantiated")]
	InterfaceRequest { ty: TypeRef },
	#[error("type {actual} is not assignable to {expected}")]
	IncompatibleType { expected: TypeRef, actual: TypeRef },
}

/// Ambiguous or contradictory composition data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositionError {
	/// A class shadows an inherited mixin with a less specific one.
	#[error(
		"class {target} inherits mixin {inherited} from {ancestor}, but is explicitly configured for the less specific mixin {configured}"
	)]
	LessSpecificOverride {
		target: TypeRef,
		ancestor: TypeRef,
		inherited: TypeRef,
		configured: TypeRef,
	},
	/// Two explicit bindings compete for the same override slot.
	#[error("class {target} cannot hold both {existing} and {incoming}: they belong to the same override family")]
	AmbiguousMixin {
		target: TypeRef,
		existing: TypeRef,
		incoming: TypeRef,
	},
	#[error("mixin {mixin} has already been added to class {target}")]
	DuplicateMixin { target: TypeRef, mixin: TypeRef },
	#[error("complete interface {interface} is registered for both {first} and {second}")]
	AmbiguousCompleteInterface {
		interface: TypeRef,
		first: TypeRef,
		second: TypeRef,
	},
	#[error("class {target} cannot host mixin {mixin}: {reason}")]
	UnhostableMixin {
		target: TypeRef,
		mixin: TypeRef,
		reason: &'static str,
	},
	#[error("configuration already contains a descriptor for {target}")]
	DuplicateTarget { target: TypeRef },
	#[error("class inheritance requested for {target} forms a cycle")]
	InheritanceCycle { target: TypeRef },
	#[error("{failed} of {total} composition checks failed; first failure: {first}")]
	ValidationFailed { failed: usize, total: usize, first: String },
	#[error("declarative configuration scan failed: {message}")]
	Scan { message: String },
	#[error(transparent)]
	Argument(#[from] ArgumentError),
}

/// Constructor lookup failure during invoker binding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
	#[error("{concrete} has no {visibility} constructor with signature {signature}")]
	ConstructorNotFound {
		concrete: TypeRef,
		signature: String,
		visibility: &'static str,
	},
}

/// Failure reported by an [`crate::ArtifactBuilder`] while assembling a type.
#[derive(Debug, thiserror::Error)]
#[error("assembling a concrete type for {requested} failed: {message}")]
pub struct AssemblyError {
	pub requested: TypeRef,
	pub message: String,
	#[source]
	pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl AssemblyError {
	pub fn new(requested: TypeRef, message: impl Into<String>) -> Self {
		Self {
			requested,
			message: message.into(),
			source: None,
		}
	}

	pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
		self.source = Some(Box::new(source));
		self
	}
}

/// Errors surfaced by [`crate::CompositionCache`].
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
	#[error(transparent)]
	Assembly(#[from] AssemblyError),
	#[error(transparent)]
	Lookup(#[from] LookupError),
	#[error(transparent)]
	Composition(#[from] CompositionError),
	#[error(transparent)]
	Argument(#[from] ArgumentError),
}

/// Misuse of configuration scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
	#[error("configuration scope {scope} left out of order; innermost open scope is {innermost}")]
	OutOfOrder { scope: u64, innermost: u64 },
	#[error("configuration scope {scope} is not open on this thread")]
	NotOpen { scope: u64 },
	#[error("configuration scope {scope} was already left")]
	AlreadyLeft { scope: u64 },
}

/// Failures of the two-phase reconstruction protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconstructionError {
	#[error("stored state of {ty} carries no composition marker; it is not a composed type")]
	NotComposed { ty: TypeRef },
	#[error("stored state holds data for mixin {mixin}, which is not configured for {target}")]
	UnknownMixin { target: TypeRef, mixin: TypeRef },
	#[error(transparent)]
	Argument(#[from] ArgumentError),
}
