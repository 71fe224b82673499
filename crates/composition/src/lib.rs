//! Mixin composition: which mixins apply to a class, and the concrete type
//! that results.
//!
//! # Mental Model
//!
//! 1. **Configuration:** [`ConfigurationBuilder`] accumulates per-class mixin
//!    bindings into an immutable [`ConfigurationSet`] of [`ClassDescriptor`]s.
//! 2. **Resolution:** [`ConfigurationSet::resolve`] finds the descriptor for a
//!    class, walking base classes and open generic definitions.
//! 3. **Scoping:** [`ConfigurationSet::enter_scope`] makes a set the active one
//!    for the calling thread until the returned [`ConfigurationScope`] is left.
//!    Without an active set, the [`MasterConfiguration`] applies.
//! 4. **Caching:** [`CompositionCache`] maps the requested class plus every
//!    [`KeyContributor`]'s value to the concrete type produced by an
//!    [`ArtifactBuilder`], building each at most once.
//!
//! # Key Types
//!
//! | Type | Role |
//! |------|------|
//! | [`ClassDescriptor`] | Mixins and complete interfaces bound to one class. |
//! | [`DescriptorCollection`] | Descriptors keyed by target, with inheritance-aware lookup. |
//! | [`ConfigurationSet`] | Immutable, shareable set of descriptors. |
//! | [`MasterConfiguration`] | Process-wide default set, built lazily by a [`DeclarativeScanner`]. |
//! | [`Validator`] | Runs [`ValidationRule`]s over resolved definitions. |
//! | [`CompositionCache`] | Once-only concrete type and constructor cache. |
//! | [`Composer`] | Facade tying the above together for object factories. |
//!
//! # Concurrency
//!
//! - Descriptors and configuration sets are immutable and `Send + Sync`.
//! - The active configuration is per thread; scopes must be left in LIFO order.
//! - The cache holds a single lock across lookup and assembly. Code running
//!   inside [`ArtifactBuilder::assemble_type`] must not call back into the cache.

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxBuildHasher;

pub mod artifact;
pub mod builder;
pub mod cache;
pub mod collection;
pub mod composer;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod reconstruct;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use amalgam_types::{ConstructorInfo, TypeInfo, TypeRef};
pub use artifact::{ArtifactBuilder, DefinitionBuilder, DescriptorRecovery, OverrideBinding, ResolvedDefinition};
pub use builder::{ClassBuilder, ConfigurationBuilder};
pub use cache::{
	BoundInvoker, CompositionCache, CompoundCacheKey, ConstructorSelector, InvokerShape, KeyContributor, KeyPart, MixinKeyContributor,
	ParticipantState, PrebuiltReport,
};
pub use collection::DescriptorCollection;
pub use composer::{Composer, ComposerConfig};
pub use config::{ConfigurationScope, ConfigurationSet, DeclarativeScanner, EmptyScanner, MasterConfiguration};
pub use descriptor::{ClassDescriptor, MixinBinding, MixinOrigin, MixinRelation, OriginKind};
pub use error::{ArgumentError, AssemblyError, CacheError, CompositionError, LookupError, ReconstructionError, ScopeError};
pub use validation::{RuleOutcome, ValidationEntry, ValidationLog, ValidationRule, Validator};

pub(crate) type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;
pub(crate) type FxIndexSet<T> = IndexSet<T, FxBuildHasher>;
