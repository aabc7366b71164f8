//! Shares one native listener per [`Callback`] across every element it's bound to.

use crate::{error::DocumentError, value::Callback};
use core::fmt::{self, Debug, Formatter};
use hashbrown::{hash_map::Entry, HashMap};
use num_traits::{CheckedAdd, CheckedSub, One, Zero};

/// Native listeners of type `V`, keyed by [`Callback::identity`] and counted per binding.
///
/// A listener is created on a callback's first binding and handed back by [`unbind`](`ListenerBindings::unbind`)
/// when its last binding goes away.
pub struct ListenerBindings<V, C = u32>
where
	C: CheckedAdd + CheckedSub + One + Zero,
{
	entries: HashMap<usize, (C, V)>,
}
impl<V, C> Default for ListenerBindings<V, C>
where
	C: CheckedAdd + CheckedSub + One + Zero,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<V, C> ListenerBindings<V, C>
where
	C: CheckedAdd + CheckedSub + One + Zero,
{
	#[must_use]
	pub fn new() -> Self {
		Self { entries: HashMap::new() }
	}

	/// Counts one more binding of `callback`, creating its listener with `create` if it had none.
	///
	/// # Errors
	///
	/// Iff the binding count of `callback` is saturated.
	pub fn bind(&mut self, callback: &Callback, create: impl FnOnce() -> V) -> Result<&V, DocumentError> {
		match self.entries.entry(callback.identity()) {
			Entry::Occupied(occupied) => {
				let (count, listener) = occupied.into_mut();
				*count = count
					.checked_add(&C::one())
					.ok_or_else(|| DocumentError::new("add_event_listener", format!("Too many bindings of callback {:?}", callback.name())))?;
				Ok(listener)
			}
			Entry::Vacant(vacant) => Ok(&vacant.insert((C::one(), create())).1),
		}
	}

	/// The listener currently shared for `callback`, if it's bound anywhere.
	#[must_use]
	pub fn get(&self, callback: &Callback) -> Option<&V> {
		self.entries.get(&callback.identity()).map(|(_, listener)| listener)
	}

	/// Counts one binding of `callback` less. Returns its listener once no bindings remain.
	///
	/// Unknown callbacks are ignored.
	pub fn unbind(&mut self, callback: &Callback) -> Option<V> {
		match self.entries.entry(callback.identity()) {
			Entry::Occupied(mut occupied) => {
				let count = &mut occupied.get_mut().0;
				match count.checked_sub(&C::one()).filter(|count| !count.is_zero()) {
					Some(remaining) => {
						*count = remaining;
						None
					}
					None => Some(occupied.remove().1),
				}
			}
			Entry::Vacant(_) => None,
		}
	}

	/// Number of distinct callbacks with at least one binding.
	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl<V, C> Debug for ListenerBindings<V, C>
where
	C: CheckedAdd + CheckedSub + One + Zero,
{
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ListenerBindings").field("len", &self.entries.len()).finish_non_exhaustive()
	}
}
