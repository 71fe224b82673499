//! Process-wide default configuration.

use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use super::ConfigurationSet;
use crate::error::CompositionError;

/// Builds the default configuration from declarative sources.
pub trait DeclarativeScanner: Send + Sync {
	fn build_default_configuration(&self) -> Result<ConfigurationSet, CompositionError>;
}

impl<F> DeclarativeScanner for F
where
	F: Fn() -> Result<ConfigurationSet, CompositionError> + Send + Sync,
{
	fn build_default_configuration(&self) -> Result<ConfigurationSet, CompositionError> {
		self()
	}
}

/// Scanner that finds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScanner;

impl DeclarativeScanner for EmptyScanner {
	fn build_default_configuration(&self) -> Result<ConfigurationSet, CompositionError> {
		Ok(ConfigurationSet::empty())
	}
}

static GLOBAL: OnceLock<Arc<MasterConfiguration>> = OnceLock::new();

/// Configuration used when no scope is active.
///
/// Built on first [`Self::get`] by the scanner unless one was set explicitly.
/// Reads are lock-free; the one-time build and [`Self::set`] serialize on an
/// internal lock so the scanner runs at most once per reset.
pub struct MasterConfiguration {
	scanner: Arc<dyn DeclarativeScanner>,
	current: ArcSwapOption<ConfigurationSet>,
	build_lock: Mutex<()>,
}

impl MasterConfiguration {
	pub fn new(scanner: impl DeclarativeScanner + 'static) -> Self {
		Self {
			scanner: Arc::new(scanner),
			current: ArcSwapOption::empty(),
			build_lock: Mutex::new(()),
		}
	}

	/// Creates a master that starts out with `configuration`.
	pub fn with_configuration(configuration: ConfigurationSet) -> Self {
		let master = Self::new(EmptyScanner);
		master.current.store(Some(Arc::new(configuration)));
		master
	}

	/// Returns the master configuration, scanning for it on first use.
	pub fn get(&self) -> Result<ConfigurationSet, CompositionError> {
		if let Some(current) = self.peek() {
			return Ok(current);
		}
		let _guard = self.build_lock.lock();
		if let Some(current) = self.peek() {
			return Ok(current);
		}
		let configuration = self.scanner.build_default_configuration()?;
		tracing::info!(
			descriptors = configuration.descriptors().len(),
			id = configuration.id(),
			"built master configuration"
		);
		self.current.store(Some(Arc::new(configuration.clone())));
		Ok(configuration)
	}

	/// Returns the master configuration without building it.
	pub fn peek(&self) -> Option<ConfigurationSet> {
		self.current.load_full().map(|c| (*c).clone())
	}

	/// Replaces the master configuration. `None` makes the next
	/// [`Self::get`] scan again.
	pub fn set(&self, configuration: Option<ConfigurationSet>) {
		let _guard = self.build_lock.lock();
		self.current.store(configuration.map(Arc::new));
	}

	pub fn reset(&self) {
		self.set(None);
	}

	pub fn is_initialized(&self) -> bool {
		self.current.load().is_some()
	}

	/// Process-wide master, created with [`EmptyScanner`] unless another was
	/// installed first.
	pub fn global() -> &'static Arc<MasterConfiguration> {
		GLOBAL.get_or_init(|| Arc::new(MasterConfiguration::new(EmptyScanner)))
	}

	/// Installs the process-wide master. Returns false if one is already in
	/// place, including the default created by [`Self::global`].
	pub fn install_global(master: Arc<MasterConfiguration>) -> bool {
		GLOBAL.set(master).is_ok()
	}
}

impl std::fmt::Debug for MasterConfiguration {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MasterConfiguration")
			.field("current", &self.peek().map(|c| c.id()))
			.finish_non_exhaustive()
	}
}
