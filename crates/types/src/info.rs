use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::TypeError;
use crate::member::ConstructorInfo;

/// Short list of types (interfaces, generic arguments).
pub type TypeList = SmallVec<[TypeRef; 2]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeKind {
	Class,
	Interface,
}

/// Generic form of a type.
#[derive(Debug, Clone)]
pub enum GenericShape {
	NonGeneric,
	/// Open definition with `arity` unbound parameters.
	Definition { arity: usize },
	/// Closed instance of `definition`.
	Instance {
		definition: TypeRef,
		arguments: TypeList,
	},
}

/// Immutable type metadata. Always handled through a [`TypeRef`].
#[derive(Debug)]
pub struct TypeInfo {
	name: Arc<str>,
	kind: TypeKind,
	base: Option<TypeRef>,
	interfaces: TypeList,
	generic: GenericShape,
	constructors: Vec<ConstructorInfo>,
	generated: bool,
}

impl TypeInfo {
	/// Starts a non-generic class.
	pub fn class(name: impl Into<Arc<str>>) -> TypeBuilder {
		TypeBuilder::new(name.into(), TypeKind::Class, GenericShape::NonGeneric)
	}

	/// Starts a non-generic interface.
	pub fn interface(name: impl Into<Arc<str>>) -> TypeBuilder {
		TypeBuilder::new(name.into(), TypeKind::Interface, GenericShape::NonGeneric)
	}

	/// Starts an open generic class definition named `name`N``.
	///
	/// An arity of zero produces an ordinary class.
	pub fn generic_class(name: &str, arity: usize) -> TypeBuilder {
		Self::generic(name, arity, TypeKind::Class)
	}

	/// Starts an open generic interface definition named `name`N``.
	pub fn generic_interface(name: &str, arity: usize) -> TypeBuilder {
		Self::generic(name, arity, TypeKind::Interface)
	}

	fn generic(name: &str, arity: usize, kind: TypeKind) -> TypeBuilder {
		if arity == 0 {
			return TypeBuilder::new(name.into(), kind, GenericShape::NonGeneric);
		}
		TypeBuilder::new(
			format!("{name}`{arity}").into(),
			kind,
			GenericShape::Definition { arity },
		)
	}
}

/// Builder for [`TypeInfo`].
#[must_use]
#[derive(Debug)]
pub struct TypeBuilder {
	name: Arc<str>,
	kind: TypeKind,
	base: Option<TypeRef>,
	interfaces: TypeList,
	generic: GenericShape,
	constructors: Vec<ConstructorInfo>,
	generated: bool,
}

impl TypeBuilder {
	fn new(name: Arc<str>, kind: TypeKind, generic: GenericShape) -> Self {
		Self {
			name,
			kind,
			base: None,
			interfaces: TypeList::new(),
			generic,
			constructors: Vec::new(),
			generated: false,
		}
	}

	/// Sets the base class. Interfaces have no base class; use
	/// [`Self::implements`] for interface inheritance.
	pub fn extends(mut self, base: &TypeRef) -> Self {
		self.base = Some(base.clone());
		self
	}

	pub fn implements(mut self, interface: &TypeRef) -> Self {
		if !self.interfaces.contains(interface) {
			self.interfaces.push(interface.clone());
		}
		self
	}

	pub fn constructor(mut self, ctor: ConstructorInfo) -> Self {
		self.constructors.push(ctor);
		self
	}

	pub fn constructors(mut self, ctors: impl IntoIterator<Item = ConstructorInfo>) -> Self {
		self.constructors.extend(ctors);
		self
	}

	/// Marks the type as a built concrete artifact.
	pub fn generated(mut self) -> Self {
		self.generated = true;
		self
	}

	pub fn build(self) -> TypeRef {
		let base = match self.kind {
			TypeKind::Class => self.base,
			TypeKind::Interface => None,
		};
		TypeRef(Arc::new(TypeInfo {
			name: self.name,
			kind: self.kind,
			base,
			interfaces: self.interfaces,
			generic: self.generic,
			constructors: self.constructors,
			generated: self.generated,
		}))
	}
}

/// Shared handle to immutable type metadata.
///
/// Equality and hashing use the canonical name and kind, never the pointer.
#[derive(Clone)]
pub struct TypeRef(Arc<TypeInfo>);

impl TypeRef {
	pub fn name(&self) -> &str {
		&self.0.name
	}

	pub fn kind(&self) -> TypeKind {
		self.0.kind
	}

	pub fn is_interface(&self) -> bool {
		self.0.kind == TypeKind::Interface
	}

	pub fn is_class(&self) -> bool {
		self.0.kind == TypeKind::Class
	}

	pub fn base(&self) -> Option<&TypeRef> {
		self.0.base.as_ref()
	}

	/// Iterates the base-class chain, nearest first, excluding `self`.
	pub fn ancestors(&self) -> Ancestors<'_> {
		Ancestors {
			next: self.0.base.as_ref(),
		}
	}

	/// Directly declared interfaces.
	pub fn interfaces(&self) -> &[TypeRef] {
		&self.0.interfaces
	}

	pub fn constructors(&self) -> &[ConstructorInfo] {
		&self.0.constructors
	}

	/// Returns true for built concrete artifacts.
	pub fn is_generated(&self) -> bool {
		self.0.generated
	}

	pub fn generic_shape(&self) -> &GenericShape {
		&self.0.generic
	}

	pub fn is_generic_definition(&self) -> bool {
		matches!(self.0.generic, GenericShape::Definition { .. })
	}

	pub fn is_generic_instance(&self) -> bool {
		matches!(self.0.generic, GenericShape::Instance { .. })
	}

	/// Number of generic parameters, zero for non-generic types.
	pub fn generic_arity(&self) -> usize {
		match &self.0.generic {
			GenericShape::NonGeneric => 0,
			GenericShape::Definition { arity } => *arity,
			GenericShape::Instance { arguments, .. } => arguments.len(),
		}
	}

	/// The open definition this instance closes.
	pub fn generic_definition(&self) -> Option<&TypeRef> {
		match &self.0.generic {
			GenericShape::Instance { definition, .. } => Some(definition),
			_ => None,
		}
	}

	pub fn generic_arguments(&self) -> &[TypeRef] {
		match &self.0.generic {
			GenericShape::Instance { arguments, .. } => arguments,
			_ => &[],
		}
	}

	/// The generic family this type belongs to: the open definition for
	/// instances, the type itself otherwise.
	pub fn generic_identity(&self) -> &TypeRef {
		self.generic_definition().unwrap_or(self)
	}

	/// Returns true if `self` is a closed instance of `definition`.
	pub fn is_specialization_of(&self, definition: &TypeRef) -> bool {
		self.generic_definition().is_some_and(|d| d == definition)
	}

	/// Returns true if `other` appears in the base-class chain of `self`.
	pub fn is_subclass_of(&self, other: &TypeRef) -> bool {
		self.ancestors().any(|a| a == other)
	}

	/// Returns true if `self` is `other` or derives from it.
	///
	/// An open definition `other` matches any of its instances along the
	/// chain, whatever the type arguments.
	pub fn can_ascribe_to(&self, other: &TypeRef) -> bool {
		let open = other.is_generic_definition();
		iter::once(self)
			.chain(self.ancestors())
			.any(|t| t == other || (open && t.is_specialization_of(other)))
	}

	/// Returns true if `self`, one of its ancestors, or one of their
	/// interfaces (transitively) is the interface `interface`.
	pub fn implements(&self, interface: &TypeRef) -> bool {
		if !interface.is_interface() {
			return false;
		}
		iter::once(self)
			.chain(self.ancestors())
			.any(|t| t.interfaces().iter().any(|i| i.interface_matches(interface)))
	}

	fn interface_matches(&self, interface: &TypeRef) -> bool {
		self == interface
			|| (interface.is_generic_definition() && self.is_specialization_of(interface))
			|| self.interfaces().iter().any(|i| i.interface_matches(interface))
	}

	/// Returns true if a value of `self` can stand in for `other`.
	pub fn is_assignable_to(&self, other: &TypeRef) -> bool {
		self.can_ascribe_to(other) || self.implements(other)
	}

	/// Closes an open generic definition over `arguments`.
	///
	/// The instance shares the definition's base, interfaces and constructors.
	pub fn close(&self, arguments: &[TypeRef]) -> Result<TypeRef, TypeError> {
		let GenericShape::Definition { arity } = self.0.generic else {
			return Err(TypeError::NotGenericDefinition {
				ty: self.name().to_string(),
			});
		};
		if arguments.len() != arity {
			return Err(TypeError::ArityMismatch {
				ty: self.name().to_string(),
				expected: arity,
				actual: arguments.len(),
			});
		}

		let mut name = String::with_capacity(self.name().len() + 16 * arity);
		name.push_str(self.name());
		name.push('[');
		for (idx, arg) in arguments.iter().enumerate() {
			if idx > 0 {
				name.push(',');
			}
			name.push_str(arg.name());
		}
		name.push(']');

		Ok(TypeRef(Arc::new(TypeInfo {
			name: name.into(),
			kind: self.0.kind,
			base: self.0.base.clone(),
			interfaces: self.0.interfaces.clone(),
			generic: GenericShape::Instance {
				definition: self.clone(),
				arguments: arguments.iter().cloned().collect(),
			},
			constructors: self.0.constructors.clone(),
			generated: false,
		})))
	}

	/// Returns true if both handles point at the same allocation.
	pub fn ptr_eq(a: &TypeRef, b: &TypeRef) -> bool {
		Arc::ptr_eq(&a.0, &b.0)
	}
}

impl PartialEq for TypeRef {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0) || (self.0.kind == other.0.kind && self.0.name == other.0.name)
	}
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.0.name.hash(state);
		self.0.kind.hash(state);
	}
}

impl PartialOrd for TypeRef {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for TypeRef {
	fn cmp(&self, other: &Self) -> Ordering {
		self.0.name.cmp(&other.0.name).then(self.0.kind.cmp(&other.0.kind))
	}
}

impl fmt::Debug for TypeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0.name)
	}
}

impl fmt::Display for TypeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0.name)
	}
}

/// Iterator over a base-class chain. See [`TypeRef::ancestors`].
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
	next: Option<&'a TypeRef>,
}

impl<'a> Iterator for Ancestors<'a> {
	type Item = &'a TypeRef;

	fn next(&mut self) -> Option<Self::Item> {
		let current = self.next?;
		self.next = current.base();
		Some(current)
	}
}
