//! Mockable UUID generation for newly minted identifiers.

use ::uuid::Uuid;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Supplies the v4 UUIDs that become the unique part of each minted DID.
///
/// Production code draws from the thread local RNG. Tests can instead replay a
/// known sequence, which makes the minted DIDs predictable. A sequence is only
/// replayed once, so a caller drawing until it sees a fresh UUID always
/// terminates.
#[derive(Debug)]
pub struct UuidProvider {
	source: Source,
}

#[derive(Debug)]
enum Source {
	ThreadLocalRng,
	Sequence { uuids: Vec<Uuid>, pos: AtomicUsize },
}

impl UuidProvider {
	pub fn new_thread_local() -> Self {
		Self {
			source: Source::ThreadLocalRng,
		}
	}

	/// Replays `uuids` in order, then falls back to the thread local RNG once
	/// exhausted.
	///
	/// # Panics
	/// Panics if `uuids` is empty.
	pub fn new_from_sequence(uuids: Vec<Uuid>) -> Self {
		assert!(!uuids.is_empty(), "uuid sequence must not be empty");
		Self {
			source: Source::Sequence {
				uuids,
				pos: AtomicUsize::new(0),
			},
		}
	}

	#[inline]
	pub fn next_v4(&self) -> Uuid {
		match &self.source {
			Source::ThreadLocalRng => Uuid::new_v4(),
			Source::Sequence { uuids, pos } => {
				let curr_pos = pos.fetch_add(1, Ordering::SeqCst);
				uuids.get(curr_pos).copied().unwrap_or_else(Uuid::new_v4)
			}
		}
	}
}

impl Default for UuidProvider {
	fn default() -> Self {
		Self::new_thread_local()
	}
}
