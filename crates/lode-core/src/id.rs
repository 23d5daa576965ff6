//! Strongly-typed identifiers for arenas and their blocks.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique [`ArenaId`] allocation.
static ARENA_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for an arena.
///
/// Allocated from a monotonic atomic counter via [`ArenaId::next`]. Every
/// [`BlockId`] carries the id of the arena that issued it, which is how an
/// arena recognises handles that belong to somebody else. The id is an
/// identity only: it never keeps the arena alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId(u64);

impl ArenaId {
    /// Allocate a fresh, unique arena ID.
    ///
    /// Each call returns a new ID that has never been returned before
    /// within this process. Thread-safe.
    pub fn next() -> Self {
        Self(ARENA_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to one block inside an arena.
///
/// A handle names a slot in the arena's block table plus the generation the
/// slot had when the handle was issued. Merging a block away bumps the slot
/// generation, so a handle kept past `free` is detected as stale rather than
/// silently aliasing whatever block reuses the slot.
///
/// The handle is stable across growth and packing. The block's *address* is
/// not: query it again after either operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockId {
    arena: ArenaId,
    slot: u32,
    generation: u32,
}

impl BlockId {
    /// Create a handle. Only arenas mint these.
    #[doc(hidden)]
    pub fn new(arena: ArenaId, slot: u32, generation: u32) -> Self {
        Self {
            arena,
            slot,
            generation,
        }
    }

    /// The arena that issued this handle.
    pub fn arena(&self) -> ArenaId {
        self.arena
    }

    /// Index into the owning arena's block table.
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Generation of the slot when this handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block(arena={}, slot={}, gen={})",
            self.arena, self.slot, self.generation
        )
    }
}
