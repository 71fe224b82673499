//! Host-independent type descriptors.
//!
//! Composition decisions depend on a handful of questions about types: what a
//! class derives from, which interfaces it implements, whether it is an open
//! generic definition or a closed instance of one, and which constructors it
//! exposes. This crate answers them without any host reflection API.
//!
//! # Identity
//!
//! A [`TypeRef`] is identified by its canonical name and [`TypeKind`]. Closed
//! generic instances get canonical names derived from their definition and
//! arguments (`List`1[Int32]`), so closing the same definition twice yields equal
//! handles with equal hashes.

mod error;
mod info;
mod member;


pub use error::TypeError;
pub use info::{Ancestors, GenericShape, TypeBuilder, TypeInfo, TypeKind, TypeList, TypeRef};
pub use member::{ConstructorInfo, ParameterList, Signature, Visibility};
