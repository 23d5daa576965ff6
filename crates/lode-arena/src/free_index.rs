//! Sorted index of free blocks for best-fit lookup.
//!
//! Entries are ordered by [`FreeKey`], i.e. by capacity and then by address.
//! The key is stored alongside the slot, so the sort order never depends on
//! a block that was mutated behind the index's back. Any change to a free
//! block's capacity or address goes through remove, mutate, insert.

use crate::block::Block;

/// Composite sort key of a free block.
///
/// Field order matters: the derived `Ord` compares `capacity` first and
/// breaks ties on `address`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct FreeKey {
    pub(crate) capacity: usize,
    pub(crate) address: usize,
}

impl FreeKey {
    pub(crate) fn of(block: &Block) -> Self {
        Self {
            capacity: block.capacity,
            address: block.address,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    key: FreeKey,
    slot: u32,
}

/// Free blocks sorted ascending by `(capacity, address)`.
#[derive(Default)]
pub(crate) struct FreeIndex {
    entries: Vec<Entry>,
}

impl FreeIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Position of the first entry that is not less than `key`.
    pub(crate) fn locate(&self, key: FreeKey) -> usize {
        self.entries.partition_point(|e| e.key < key)
    }

    /// Slot of the smallest free block holding at least `capacity` bytes,
    /// lowest address first among equals.
    pub(crate) fn best_fit(&self, capacity: usize) -> Option<u32> {
        let pos = self.locate(FreeKey {
            capacity,
            address: 0,
        });
        self.entries.get(pos).map(|e| e.slot)
    }

    /// # Panics
    ///
    /// Panics if the block is not free.
    pub(crate) fn insert(&mut self, slot: u32, block: &Block) {
        assert!(block.free, "only free blocks can be indexed (slot {slot})");
        let key = FreeKey::of(block);
        let pos = self.locate(key);
        self.entries.insert(pos, Entry { key, slot });
    }

    /// Remove the entry of a free block, using its current key.
    ///
    /// # Panics
    ///
    /// Panics if the block is not free or the index has no entry for it
    /// under that key.
    pub(crate) fn remove(&mut self, slot: u32, block: &Block) {
        assert!(block.free, "only free blocks can be indexed (slot {slot})");
        let key = FreeKey::of(block);
        let pos = self.locate(key);
        match self.entries.get(pos) {
            Some(entry) if entry.slot == slot && entry.key == key => {
                self.entries.remove(pos);
            }
            _ => panic!("free index has no entry for slot {slot} at {key:?}"),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Capacity of the largest free block, 0 if none.
    pub(crate) fn largest(&self) -> usize {
        self.entries.last().map_or(0, |e| e.key.capacity)
    }

    /// `(key, slot)` pairs in index order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (FreeKey, u32)> + '_ {
        self.entries.iter().map(|e| (e.key, e.slot))
    }
}
