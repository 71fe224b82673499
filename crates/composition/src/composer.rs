//! Facade used by object factories.

use std::sync::Arc;

use amalgam_types::TypeRef;
use serde::{Deserialize, Serialize};

use crate::artifact::{ArtifactBuilder, DescriptorRecovery};
use crate::cache::{BoundInvoker, CompositionCache, InvokerShape, KeyContributor, MixinKeyContributor, PrebuiltReport};
use crate::config::{ConfigurationScope, ConfigurationSet, MasterConfiguration};
use crate::descriptor::ClassDescriptor;
use crate::error::{CacheError, CompositionError};
use crate::validation::{ValidationLog, Validator};

/// Behaviour switches for a [`Composer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposerConfig {
	/// Turn validation failures into [`CompositionError::ValidationFailed`].
	#[serde(default = "default_strict_validation")]
	pub strict_validation: bool,
	/// Build and validate the master configuration in [`Composer::init`].
	#[serde(default)]
	pub validate_master_on_init: bool,
}

fn default_strict_validation() -> bool {
	true
}

impl Default for ComposerConfig {
	fn default() -> Self {
		Self {
			strict_validation: default_strict_validation(),
			validate_master_on_init: false,
		}
	}
}

/// Ties a master configuration, an artifact builder, a cache and a validator
/// together.
///
/// Every operation runs against the configuration active on the calling
/// thread, or the master when no scope is open.
pub struct Composer {
	config: ComposerConfig,
	master: Arc<MasterConfiguration>,
	builder: Arc<dyn ArtifactBuilder>,
	cache: CompositionCache,
	validator: Validator,
}

impl Composer {
	/// Creates a composer whose cache keys on the resolved mixin descriptor.
	pub fn new(config: ComposerConfig, master: Arc<MasterConfiguration>, builder: Arc<dyn ArtifactBuilder>) -> Self {
		let recovery: Arc<dyn DescriptorRecovery> = builder.clone();
		let cache = CompositionCache::new(builder.clone())
			.with_contributor(Arc::new(MixinKeyContributor::new(master.clone(), recovery)));
		Self {
			config,
			master,
			builder,
			cache,
			validator: Validator::new(),
		}
	}

	#[must_use]
	pub fn with_validator(mut self, validator: Validator) -> Self {
		self.validator = validator;
		self
	}

	/// Appends a key contributor after the built-in mixin contributor.
	#[must_use]
	pub fn with_contributor(mut self, contributor: Arc<dyn KeyContributor>) -> Self {
		self.cache = self.cache.with_contributor(contributor);
		self
	}

	/// Builds the master configuration, validating it if configured to.
	pub fn init(&self) -> Result<ConfigurationSet, CompositionError> {
		let master = self.master.get()?;
		if self.config.validate_master_on_init {
			self.validate_configuration(&master)?;
		}
		Ok(master)
	}

	pub fn config(&self) -> &ComposerConfig {
		&self.config
	}

	pub fn master(&self) -> &Arc<MasterConfiguration> {
		&self.master
	}

	pub fn cache(&self) -> &CompositionCache {
		&self.cache
	}

	/// The active configuration, or the master.
	pub fn configuration(&self) -> Result<ConfigurationSet, CompositionError> {
		ConfigurationSet::active_or_master(&self.master)
	}

	/// Non-empty descriptor applying to `ty`.
	///
	/// Generated types resolve to the descriptor they were assembled from.
	pub fn resolve(&self, ty: &TypeRef) -> Result<Option<Arc<ClassDescriptor>>, CompositionError> {
		if ty.is_generated() {
			return Ok(self.builder.recover_descriptor(ty).filter(|d| !d.is_empty()));
		}
		Ok(self.configuration()?.resolve(ty))
	}

	/// Descriptor applying to `ty`, synthesizing an empty one on a miss.
	pub fn resolve_or_synthesize(&self, ty: &TypeRef) -> Result<Arc<ClassDescriptor>, CompositionError> {
		if ty.is_generated() {
			return Ok(self
				.builder
				.recover_descriptor(ty)
				.unwrap_or_else(|| Arc::new(ClassDescriptor::empty(ty.clone()))));
		}
		Ok(self.configuration()?.resolve_or_synthesize(ty))
	}

	/// Makes `configuration` active on the calling thread.
	pub fn enter_scope(&self, configuration: &ConfigurationSet) -> ConfigurationScope {
		configuration.enter_scope()
	}

	/// Validates the active configuration.
	pub fn validate(&self) -> Result<ValidationLog, CompositionError> {
		let configuration = self.configuration()?;
		self.validate_configuration(&configuration)
	}

	fn validate_configuration(&self, configuration: &ConfigurationSet) -> Result<ValidationLog, CompositionError> {
		let log = configuration.validate(self.builder.as_ref(), &self.validator);
		if self.config.strict_validation {
			log.into_result()
		} else {
			Ok(log)
		}
	}

	pub fn resolve_or_build_type(&self, requested: &TypeRef) -> Result<TypeRef, CacheError> {
		self.cache.resolve_or_build_type(requested)
	}

	pub fn resolve_or_build_constructor(
		&self,
		requested: &TypeRef,
		shape: InvokerShape,
		allow_non_public: bool,
	) -> Result<BoundInvoker, CacheError> {
		self.cache
			.resolve_or_build_constructor(requested, shape, allow_non_public)
	}

	pub fn load_prebuilt(&self, artifacts: impl IntoIterator<Item = TypeRef>) -> PrebuiltReport {
		self.cache.load_prebuilt(artifacts)
	}
}

impl std::fmt::Debug for Composer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Composer")
			.field("config", &self.config)
			.field("master", &self.master)
			.field("cache", &self.cache)
			.field("validator", &self.validator)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::builder::ConfigurationBuilder;
	use crate::test_fixtures::*;

	fn composer(master: ConfigurationSet, builder: Arc<FakeBuilder>) -> Composer {
		Composer::new(
			ComposerConfig::default(),
			Arc::new(MasterConfiguration::with_configuration(master)),
			builder,
		)
	}

	#[test]
	fn test_config_defaults_from_empty_object() {
		let config: ComposerConfig = serde_json::from_str("{}").unwrap();
		assert_eq!(config, ComposerConfig::default());
		assert!(config.strict_validation);
		assert!(!config.validate_master_on_init);

		let lenient: ComposerConfig = serde_json::from_str(r#"{"strict_validation": false}"#).unwrap();
		assert!(!lenient.strict_validation);
	}

	#[test]
	fn test_scope_changes_built_type() {
		let fake = Arc::new(FakeBuilder::default());
		let master = ConfigurationSet::new([descriptor_with(base_type(), [mixin_a()])]).unwrap();
		let composer = composer(master, fake.clone());

		let from_master = composer.resolve_or_build_type(&base_type()).unwrap();
		assert_eq!(composer.resolve_or_build_type(&base_type()).unwrap(), from_master);

		let scoped = ConfigurationSet::new([descriptor_with(base_type(), [mixin_b()])]).unwrap();
		let built_in_scope = {
			let _scope = composer.enter_scope(&scoped);
			composer.resolve_or_build_type(&base_type()).unwrap()
		};
		assert_ne!(built_in_scope, from_master, "different composition yields a different type");
		assert_eq!(fake.assemblies(), 2);
		assert_eq!(composer.resolve_or_build_type(&base_type()).unwrap(), from_master);
	}

	#[test]
	fn test_resolve_generated_type_recovers_descriptor() {
		let fake = Arc::new(FakeBuilder::default());
		let master = ConfigurationSet::new([descriptor_with(base_type(), [mixin_a()])]).unwrap();
		let composer = composer(master, fake);

		let concrete = composer.resolve_or_build_type(&derived_type()).unwrap();
		let recovered = composer.resolve(&concrete).unwrap().expect("recovered");
		assert_eq!(recovered.target(), &derived_type());
		assert!(recovered.mixin(&mixin_a()).is_some());
	}

	#[test]
	fn test_strict_validation_reports_failure() {
		let mut builder = ConfigurationBuilder::new();
		builder
			.for_class(&base_type())
			.unwrap()
			.add_mixin_with_dependencies(&mixin_a(), [mixin_b()])
			.unwrap();
		let master = builder.build().unwrap();

		let strict = composer(master.clone(), Arc::new(FakeBuilder::default()));
		let err = strict.validate().unwrap_err();
		assert!(matches!(err, CompositionError::ValidationFailed { failed: 1, .. }), "{err}");

		let lenient = Composer::new(
			ComposerConfig {
				strict_validation: false,
				..ComposerConfig::default()
			},
			Arc::new(MasterConfiguration::with_configuration(master)),
			Arc::new(FakeBuilder::default()),
		);
		let log = lenient.validate().unwrap();
		assert_eq!(log.failed(), 1);
	}

	#[test]
	fn test_init_builds_master_once() {
		let scans = Arc::new(std::sync::atomic::AtomicUsize::new(0));
		let counter = scans.clone();
		let master = MasterConfiguration::new(move || {
			counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
			ConfigurationSet::new([descriptor_with(base_type(), [mixin_a()])])
		});
		let composer = Composer::new(
			ComposerConfig {
				validate_master_on_init: true,
				..ComposerConfig::default()
			},
			Arc::new(master),
			Arc::new(FakeBuilder::default()),
		);

		let first = composer.init().unwrap();
		let second = composer.configuration().unwrap();
		assert!(first.same_as(&second));
		assert_eq!(scans.load(std::sync::atomic::Ordering::SeqCst), 1);
	}
}
