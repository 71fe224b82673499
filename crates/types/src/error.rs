/// Errors produced while deriving new types from existing ones.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
	/// Only open generic definitions can be closed.
	#[error("{ty} is not an open generic type definition")]
	NotGenericDefinition { ty: String },
	/// Wrong number of type arguments.
	#[error("{ty} expects {expected} type argument(s), got {actual}")]
	ArityMismatch { ty: String, expected: usize, actual: usize },
}
