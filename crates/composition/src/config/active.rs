//! Per-thread active configuration with LIFO scope tokens.

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;

use super::ConfigurationSet;
use crate::error::ScopeError;

struct Frame {
	token: u64,
	previous: Option<ConfigurationSet>,
}

struct ActiveStack {
	current: Option<ConfigurationSet>,
	frames: Vec<Frame>,
}

thread_local! {
	static ACTIVE: RefCell<ActiveStack> = const {
		RefCell::new(ActiveStack {
			current: None,
			frames: Vec::new(),
		})
	};
	static NEXT_TOKEN: Cell<u64> = const { Cell::new(1) };
}

/// Configuration active on the calling thread, if any.
pub(crate) fn current() -> Option<ConfigurationSet> {
	ACTIVE.try_with(|a| a.borrow().current.clone()).ok().flatten()
}

/// Number of open scopes on the calling thread.
pub(crate) fn depth() -> usize {
	ACTIVE.try_with(|a| a.borrow().frames.len()).unwrap_or(0)
}

/// Pushes `config` as the active configuration.
///
/// During thread-local teardown nothing is pushed and the returned scope is
/// already closed.
pub(crate) fn enter(config: Option<ConfigurationSet>) -> ConfigurationScope {
	let token = NEXT_TOKEN
		.try_with(|next| {
			let token = next.get();
			next.set(token + 1);
			token
		})
		.unwrap_or(0);
	let depth = ACTIVE
		.try_with(|a| {
			let mut a = a.borrow_mut();
			let previous = std::mem::replace(&mut a.current, config);
			a.frames.push(Frame { token, previous });
			a.frames.len()
		})
		.ok();

	match depth {
		Some(depth) => tracing::trace!(scope = token, depth, "entered configuration scope"),
		None => tracing::warn!(scope = token, "configuration scope entered during thread teardown"),
	}
	ConfigurationScope {
		token,
		open: depth.is_some(),
		_not_send: PhantomData,
	}
}

/// Guard for a configuration made active by [`ConfigurationSet::enter_scope`].
///
/// Leaving restores the configuration that was active before the scope was
/// entered. Scopes must be left innermost first. The guard is bound to the
/// thread that created it.
///
/// Dropping a guard while inner scopes are open unwinds them too, and panics
/// in debug builds.
#[must_use = "the configuration is only active while the scope is held"]
#[derive(Debug)]
pub struct ConfigurationScope {
	token: u64,
	open: bool,
	_not_send: PhantomData<*const ()>,
}

impl ConfigurationScope {
	/// Thread-local token identifying this scope.
	pub fn token(&self) -> u64 {
		self.token
	}

	pub fn is_open(&self) -> bool {
		self.open
	}

	/// Leaves the scope.
	///
	/// Fails without touching the active configuration if an inner scope is
	/// still open, or if this scope was already left.
	pub fn leave(&mut self) -> Result<(), ScopeError> {
		if !self.open {
			return Err(ScopeError::AlreadyLeft { scope: self.token });
		}
		let scope = self.token;
		let result = ACTIVE
			.try_with(|a| {
				let mut a = a.borrow_mut();
				match a.frames.last().map(|f| f.token) {
					Some(innermost) if innermost == scope => {
						if let Some(frame) = a.frames.pop() {
							a.current = frame.previous;
						}
						Ok(())
					}
					Some(innermost) if a.frames.iter().any(|f| f.token == scope) => {
						Err(ScopeError::OutOfOrder { scope, innermost })
					}
					_ => Err(ScopeError::NotOpen { scope }),
				}
			})
			.unwrap_or(Err(ScopeError::NotOpen { scope }));

		if result.is_ok() {
			self.open = false;
			tracing::trace!(scope, "left configuration scope");
		}
		result
	}

	/// Pops every frame down to and including this scope's frame.
	fn unwind(&mut self) {
		let scope = self.token;
		let _ = ACTIVE.try_with(|a| {
			let mut a = a.borrow_mut();
			if let Some(pos) = a.frames.iter().position(|f| f.token == scope) {
				let removed = a.frames.split_off(pos);
				if let Some(frame) = removed.into_iter().next() {
					a.current = frame.previous;
				}
			}
		});
		self.open = false;
	}
}

impl Drop for ConfigurationScope {
	fn drop(&mut self) {
		if !self.open {
			return;
		}
		match self.leave() {
			Ok(()) => {}
			Err(err @ ScopeError::OutOfOrder { .. }) => {
				tracing::error!(error = %err, "configuration scope dropped out of order; unwinding inner scopes");
				self.unwind();
				if cfg!(debug_assertions) && !std::thread::panicking() {
					panic!("configuration scope dropped out of order: {err}");
				}
			}
			Err(err) => {
				tracing::error!(error = %err, "configuration scope dropped while not open");
				self.open = false;
			}
		}
	}
}
