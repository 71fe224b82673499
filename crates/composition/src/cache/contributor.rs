use std::sync::Arc;

use amalgam_types::TypeRef;

use super::key::KeyPart;
use crate::artifact::DescriptorRecovery;
use crate::config::{ConfigurationSet, MasterConfiguration};
use crate::error::CompositionError;

/// Supplies one part of every compound cache key.
///
/// The two derivations must agree: the part computed for a live request must
/// equal the part rebuilt from the artifact that request produced.
pub trait KeyContributor: Send + Sync {
	/// Stable name used in diagnostics.
	fn name(&self) -> &'static str;

	/// Key part for a live request for `requested`.
	fn cache_key_for(&self, requested: &TypeRef) -> Result<KeyPart, CompositionError>;

	/// Key part for a previously built `artifact`, without the original
	/// request context.
	fn rebuild_key_from_artifact(&self, artifact: &TypeRef) -> KeyPart;
}

/// Contributes the mixin descriptor that applies to the requested type.
///
/// Live requests resolve against the active configuration, falling back to
/// the master. Artifacts are mapped back through descriptor recovery.
pub struct MixinKeyContributor {
	master: Arc<MasterConfiguration>,
	recovery: Arc<dyn DescriptorRecovery>,
}

impl MixinKeyContributor {
	pub fn new(master: Arc<MasterConfiguration>, recovery: Arc<dyn DescriptorRecovery>) -> Self {
		Self { master, recovery }
	}
}

impl KeyContributor for MixinKeyContributor {
	fn name(&self) -> &'static str {
		"mixins"
	}

	fn cache_key_for(&self, requested: &TypeRef) -> Result<KeyPart, CompositionError> {
		let configuration = ConfigurationSet::active_or_master(&self.master)?;
		Ok(configuration
			.resolve(requested)
			.map_or(KeyPart::Absent, KeyPart::Descriptor))
	}

	fn rebuild_key_from_artifact(&self, artifact: &TypeRef) -> KeyPart {
		self.recovery
			.recover_descriptor(artifact)
			.filter(|descriptor| !descriptor.is_empty())
			.map_or(KeyPart::Absent, KeyPart::Descriptor)
	}
}

impl std::fmt::Debug for MixinKeyContributor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MixinKeyContributor")
			.field("master_initialized", &self.master.is_initialized())
			.finish_non_exhaustive()
	}
}
