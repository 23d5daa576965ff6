//! Structural self-check of an arena.

use lode_core::MappedStorage;

use crate::arena::Arena;
use crate::error::ArenaError;
use crate::free_index::FreeKey;

fn corrupted(reason: String) -> ArenaError {
    ArenaError::Corrupted { reason }
}

impl<S: MappedStorage> Arena<S> {
    /// Walk the block chain and the free index and check that they agree.
    ///
    /// Checks, in order: the chain links are consistent in both directions,
    /// blocks tile `[0, total_capacity)` without gaps or overlap, no two free
    /// blocks are adjacent, free capacity equals the summed size of free
    /// blocks, and the free index holds exactly the free blocks under their
    /// current keys in strictly ascending order.
    ///
    /// Runs after every mutating call when
    /// [`ArenaConfig::verify_invariants`](crate::ArenaConfig::verify_invariants)
    /// is set.
    ///
    /// # Errors
    ///
    /// [`ArenaError::Corrupted`] naming the first violation found.
    pub fn validate(&self) -> Result<(), ArenaError> {
        let chain = &self.chain;
        let head = chain.get(chain.head());
        if head.prev.is_some() {
            return Err(corrupted(format!(
                "head block {} has a predecessor",
                chain.head()
            )));
        }

        let mut expected_address = 0usize;
        let mut prev: Option<u32> = None;
        let mut prev_free = false;
        let mut free_sum = 0usize;
        let mut free_count = 0usize;
        let mut walked = 0usize;

        for (slot, block) in chain.iter() {
            walked += 1;
            if walked > chain.len() {
                return Err(corrupted(format!(
                    "chain walk exceeds {} blocks; links form a cycle",
                    chain.len()
                )));
            }
            if block.prev != prev {
                return Err(corrupted(format!(
                    "block {slot} links back to {:?}, expected {prev:?}",
                    block.prev
                )));
            }
            if block.capacity == 0 {
                return Err(corrupted(format!("block {slot} has zero capacity")));
            }
            if block.address != expected_address {
                return Err(corrupted(format!(
                    "block {slot} starts at {}, expected {expected_address}",
                    block.address
                )));
            }
            if block.free {
                if prev_free {
                    return Err(corrupted(format!(
                        "free block {slot} follows another free block"
                    )));
                }
                free_sum += block.capacity;
                free_count += 1;
            }
            expected_address = block.end();
            prev_free = block.free;
            prev = Some(slot);
        }

        if walked != chain.len() {
            return Err(corrupted(format!(
                "chain walk reached {walked} blocks, chain records {}",
                chain.len()
            )));
        }
        if prev != Some(chain.tail()) {
            return Err(corrupted(format!(
                "chain ends at {prev:?}, tail is {}",
                chain.tail()
            )));
        }
        if expected_address != self.total_capacity {
            return Err(corrupted(format!(
                "blocks cover {expected_address} bytes, total capacity is {}",
                self.total_capacity
            )));
        }
        if free_sum != self.free_capacity {
            return Err(corrupted(format!(
                "free blocks hold {free_sum} bytes, free capacity is {}",
                self.free_capacity
            )));
        }

        let index = &self.free_index;
        if index.len() != free_count {
            return Err(corrupted(format!(
                "free index has {} entries for {free_count} free blocks",
                index.len()
            )));
        }

        let mut last: Option<FreeKey> = None;
        for (key, slot) in index.iter() {
            if chain.generation(slot).is_none() {
                return Err(corrupted(format!(
                    "free index entry {key:?} names vacant slot {slot}"
                )));
            }
            let block = chain.get(slot);
            if !block.free {
                return Err(corrupted(format!(
                    "free index entry {key:?} names allocated block {slot}"
                )));
            }
            if FreeKey::of(block) != key {
                return Err(corrupted(format!(
                    "free index entry {key:?} is stale for block {slot} at ({}, {})",
                    block.capacity, block.address
                )));
            }
            if last.is_some_and(|last| last >= key) {
                return Err(corrupted(format!("free index out of order at {key:?}")));
            }
            last = Some(key);
        }

        Ok(())
    }
}
