use std::any::Any;
use std::fmt;

use rustc_hash::FxHashMap;

/// Bookkeeping an artifact builder keeps between assembly calls.
///
/// Slots are keyed by a static name and hold any `Send` value. The cache
/// only hands this out under its lock, so no further synchronization is needed.
#[derive(Default)]
pub struct ParticipantState {
	slots: FxHashMap<&'static str, Box<dyn Any + Send>>,
}

impl ParticipantState {
	pub fn get<T: Any>(&self, slot: &str) -> Option<&T> {
		self.slots.get(slot)?.downcast_ref()
	}

	pub fn get_mut<T: Any>(&mut self, slot: &str) -> Option<&mut T> {
		self.slots.get_mut(slot)?.downcast_mut()
	}

	/// Stores `value`, returning true if the slot was already occupied.
	pub fn insert<T: Any + Send>(&mut self, slot: &'static str, value: T) -> bool {
		self.slots.insert(slot, Box::new(value)).is_some()
	}

	pub fn remove(&mut self, slot: &str) -> bool {
		self.slots.remove(slot).is_some()
	}

	pub fn contains(&self, slot: &str) -> bool {
		self.slots.contains_key(slot)
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}
}

impl fmt::Debug for ParticipantState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.slots.keys()).finish()
	}
}
