//! Once-only cache of concrete types and constructor invokers.
//!
//! # Role
//!
//! Maps a [`CompoundCacheKey`] (requested type plus every contributor's
//! [`KeyPart`]) to the concrete type assembled for it, and to constructor
//! invokers bound on that type.
//!
//! # Invariants
//!
//! - One lock guards both maps and the participant state. It is held from the
//!   lookup through assembly and insertion, so each key is assembled at most
//!   once and every caller observes the same concrete type for it.
//! - A failed assembly or constructor lookup stores nothing.
//! - Entries are never replaced or evicted. Prebuilt artifacts lose to
//!   whatever is already registered under their key.

mod contributor;
mod invoker;
mod key;
mod state;

#[cfg(test)]
mod tests;

use std::collections::hash_map::Entry;
use std::sync::Arc;

use amalgam_types::TypeRef;
pub use contributor::{KeyContributor, MixinKeyContributor};
pub use invoker::BoundInvoker;
pub use key::{CompoundCacheKey, ConstructorSelector, InvokerShape, KeyPart};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
pub use state::ParticipantState;

use crate::artifact::ArtifactBuilder;
use crate::error::{ArgumentError, CacheError, CompositionError};

/// Outcome of [`CompositionCache::load_prebuilt`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrebuiltReport {
	/// Artifacts stored under their rebuilt key.
	pub registered: usize,
	/// Artifacts whose key was already taken.
	pub discarded: usize,
	/// Artifacts that are not composed types and carry no usable key.
	pub skipped: usize,
}

#[derive(Default)]
struct CacheInner {
	built_types: FxHashMap<CompoundCacheKey, TypeRef>,
	constructors: FxHashMap<CompoundCacheKey, BoundInvoker>,
	participant_state: ParticipantState,
}

/// Process-wide cache in front of an [`ArtifactBuilder`].
pub struct CompositionCache {
	builder: Arc<dyn ArtifactBuilder>,
	contributors: Vec<Arc<dyn KeyContributor>>,
	inner: Mutex<CacheInner>,
}

impl CompositionCache {
	/// Creates a cache with no key contributors.
	pub fn new(builder: Arc<dyn ArtifactBuilder>) -> Self {
		Self {
			builder,
			contributors: Vec::new(),
			inner: Mutex::new(CacheInner::default()),
		}
	}

	/// Appends a contributor. Its part follows those already registered.
	#[must_use]
	pub fn with_contributor(mut self, contributor: Arc<dyn KeyContributor>) -> Self {
		self.contributors.push(contributor);
		self
	}

	pub fn contributors(&self) -> impl ExactSizeIterator<Item = &Arc<dyn KeyContributor>> + '_ {
		self.contributors.iter()
	}

	pub fn builder(&self) -> &Arc<dyn ArtifactBuilder> {
		&self.builder
	}

	/// Computes the type key for a live request.
	pub fn type_key(&self, requested: &TypeRef) -> Result<CompoundCacheKey, CacheError> {
		if requested.is_interface() {
			return Err(ArgumentError::InterfaceRequest { ty: requested.clone() }.into());
		}
		if requested.is_generic_definition() {
			return Err(ArgumentError::OpenGenericRequest { ty: requested.clone() }.into());
		}
		let parts = self
			.contributors
			.iter()
			.map(|c| c.cache_key_for(requested))
			.collect::<Result<Vec<_>, CompositionError>>()?;
		Ok(CompoundCacheKey::for_type(requested.clone(), parts))
	}

	/// Returns the concrete type for `requested` under the current
	/// composition, assembling it on first use.
	pub fn resolve_or_build_type(&self, requested: &TypeRef) -> Result<TypeRef, CacheError> {
		let key = self.type_key(requested)?;
		let mut inner = self.inner.lock();
		self.type_for_key(&mut inner, &key)
	}

	/// Returns an invoker for the constructor of the concrete type matching
	/// `shape`, binding it on first use.
	///
	/// Type resolution and binding happen under one lock acquisition.
	pub fn resolve_or_build_constructor(
		&self,
		requested: &TypeRef,
		shape: InvokerShape,
		allow_non_public: bool,
	) -> Result<BoundInvoker, CacheError> {
		let type_key = self.type_key(requested)?;
		let selector = ConstructorSelector { shape, allow_non_public };
		let key = CompoundCacheKey::for_constructor(type_key.clone(), selector.clone());

		let mut inner = self.inner.lock();
		if let Some(invoker) = inner.constructors.get(&key) {
			tracing::trace!(requested = %requested, "constructor cache hit");
			return Ok(invoker.clone());
		}

		let concrete = self.type_for_key(&mut inner, &type_key)?;
		let invoker = invoker::bind_constructor(&concrete, &selector)?;
		tracing::debug!(concrete = %concrete, shape = %selector.shape, "bound constructor invoker");
		inner.constructors.insert(key, invoker.clone());
		Ok(invoker)
	}

	fn type_for_key(&self, inner: &mut CacheInner, key: &CompoundCacheKey) -> Result<TypeRef, CacheError> {
		if let Some(concrete) = inner.built_types.get(key) {
			tracing::trace!(requested = %key.requested(), concrete = %concrete, "type cache hit");
			return Ok(concrete.clone());
		}
		let concrete = self.builder.assemble_type(key, &mut inner.participant_state)?;
		tracing::debug!(requested = %key.requested(), concrete = %concrete, "assembled concrete type");
		inner.built_types.insert(key.clone(), concrete.clone());
		Ok(concrete)
	}

	/// Registers previously built artifacts under keys rebuilt from their own
	/// metadata.
	///
	/// Never fails. An artifact whose key is already present is discarded, so
	/// the first registration wins.
	pub fn load_prebuilt(&self, artifacts: impl IntoIterator<Item = TypeRef>) -> PrebuiltReport {
		let mut report = PrebuiltReport::default();
		let keyed: Vec<_> = artifacts
			.into_iter()
			.filter_map(|artifact| match self.rebuild_key(&artifact) {
				Some(key) => Some((key, artifact)),
				None => {
					tracing::warn!(artifact = %artifact, "skipping prebuilt artifact that is not a composed type");
					report.skipped += 1;
					None
				}
			})
			.collect();

		let mut inner = self.inner.lock();
		for (key, artifact) in keyed {
			match inner.built_types.entry(key) {
				Entry::Occupied(existing) => {
					tracing::debug!(artifact = %artifact, existing = %existing.get(), "discarding prebuilt artifact");
					report.discarded += 1;
				}
				Entry::Vacant(slot) => {
					slot.insert(artifact);
					report.registered += 1;
				}
			}
		}
		report
	}

	fn rebuild_key(&self, artifact: &TypeRef) -> Option<CompoundCacheKey> {
		if !artifact.is_generated() {
			return None;
		}
		let requested = artifact.base()?.clone();
		let parts = self
			.contributors
			.iter()
			.map(|c| c.rebuild_key_from_artifact(artifact));
		Some(CompoundCacheKey::for_type(requested, parts))
	}

	pub fn type_count(&self) -> usize {
		self.inner.lock().built_types.len()
	}

	pub fn constructor_count(&self) -> usize {
		self.inner.lock().constructors.len()
	}

	/// Runs `f` with exclusive access to the participant state.
	pub fn with_participant_state<R>(&self, f: impl FnOnce(&mut ParticipantState) -> R) -> R {
		f(&mut self.inner.lock().participant_state)
	}
}

impl std::fmt::Debug for CompositionCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let names: Vec<_> = self.contributors.iter().map(|c| c.name()).collect();
		f.debug_struct("CompositionCache")
			.field("contributors", &names)
			.finish_non_exhaustive()
	}
}
