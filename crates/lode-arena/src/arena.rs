//! The growable, defragmenting byte arena.
//!
//! [`Arena`] hands out byte ranges ("blocks") of one logical buffer and
//! keeps a physical copy of that buffer in a [`MappedStorage`] collaborator.
//!
//! # Allocation
//!
//! Free space is tracked in an index sorted by `(capacity, address)`, so
//! [`Arena::allocate`] is a best fit: the smallest free block that holds the
//! request, lowest address among equals. The remainder of a larger block is
//! split off as a new free block. When nothing fits, the arena grows
//! according to its [`GrowthPolicy`] and retries.
//!
//! [`Arena::free`] coalesces immediately with free neighbours, so two free
//! blocks are never adjacent.
//!
//! # Handles survive, addresses do not
//!
//! A [`BlockId`] stays valid until its block is freed. The block's address
//! is another matter: [`Arena::pack`] slides live blocks toward the start of
//! the buffer to gather all free space into one trailing block, and growth
//! may replace the physical store. Always re-read [`BlockInfo::address`]
//! after either call instead of caching it.
//!
//! # Storage lifecycle
//!
//! No physical store exists until the first [`Arena::activate`], which
//! creates one at the current total capacity. Writes and packing need the
//! store mapped ([`Arena::map`]). Growth replaces the store, copies the live
//! bytes across, and puts the active/mapped state back the way it found it.
//! Dropping the arena releases the store.

use lode_core::{ArenaId, BlockId, MappedStorage};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::block::{Block, BlockChain, BlockInfo};
use crate::config::{ArenaConfig, GrowthPolicy};
use crate::error::ArenaError;
use crate::free_index::FreeIndex;
use crate::stats::{ArenaStats, Counters};
use crate::write::BlockWriter;

/// Best-fit byte arena over a single growable buffer.
///
/// Every mutating operation takes `&mut self`; share an arena across threads
/// by wrapping it in a lock.
pub struct Arena<S: MappedStorage> {
    id: ArenaId,
    config: ArenaConfig,
    pub(crate) chain: BlockChain,
    pub(crate) free_index: FreeIndex,
    pub(crate) total_capacity: usize,
    pub(crate) free_capacity: usize,
    storage: S,
    handle: Option<S::Handle>,
    active: bool,
    mapped: bool,
    counters: Counters,
}

impl<S: MappedStorage> Arena<S> {
    /// Create an arena of `config.initial_capacity` free bytes.
    ///
    /// No physical storage is created yet; see [`Arena::activate`].
    pub fn new(config: ArenaConfig, storage: S) -> Result<Self, ArenaError> {
        config.validate()?;
        let chain = BlockChain::new(config.initial_capacity);
        let mut free_index = FreeIndex::new();
        free_index.insert(chain.head(), chain.get(chain.head()));

        let arena = Self {
            id: ArenaId::next(),
            total_capacity: config.initial_capacity,
            free_capacity: config.initial_capacity,
            config,
            chain,
            free_index,
            storage,
            handle: None,
            active: false,
            mapped: false,
            counters: Counters::default(),
        };
        arena.check();
        Ok(arena)
    }

    /// Identity of this arena, carried by every handle it issues.
    pub fn id(&self) -> ArenaId {
        self.id
    }

    /// The configuration the arena was created with.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// The storage collaborator.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Handle of the current physical store, if one has been created.
    ///
    /// Changes whenever the arena grows.
    pub fn storage_handle(&self) -> Option<S::Handle> {
        self.handle
    }

    /// Logical size of the arena in bytes.
    pub fn total_capacity(&self) -> usize {
        self.total_capacity
    }

    /// Bytes not held by any allocated block.
    pub fn free_capacity(&self) -> usize {
        self.free_capacity
    }

    /// Bytes held by allocated blocks.
    pub fn used_capacity(&self) -> usize {
        self.total_capacity - self.free_capacity
    }

    /// Whether the store is the active device target.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the store's bytes are visible to the host.
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// Whether `id` was issued by this arena and still names a live block.
    pub fn owns_block(&self, id: BlockId) -> bool {
        id.arena() == self.id && self.chain.generation(id.slot()) == Some(id.generation())
    }

    /// Allocate a block of exactly `capacity` bytes, growing if needed.
    ///
    /// The returned block's bytes are whatever the region held before; the
    /// arena does not clear them.
    ///
    /// # Errors
    ///
    /// Only growth can fail: [`ArenaError::CapacityExceeded`] when the
    /// configured ceiling is reached, [`ArenaError::Storage`] when the
    /// collaborator cannot provide the larger store.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn allocate(&mut self, capacity: usize) -> Result<BlockId, ArenaError> {
        assert!(capacity > 0, "cannot allocate a zero-capacity block");

        let slot = loop {
            if capacity <= self.free_capacity {
                if let Some(slot) = self.free_index.best_fit(capacity) {
                    break slot;
                }
            }
            let target = self.growth_target(capacity)?;
            self.grow(target)?;
        };

        self.free_index.remove(slot, self.chain.get(slot));
        let (address, available) = {
            let block = self.chain.get(slot);
            (block.address, block.capacity)
        };
        if available > capacity {
            let remainder = Block::new(address + capacity, available - capacity);
            let remainder = self.chain.insert_after(slot, remainder);
            self.free_index.insert(remainder, self.chain.get(remainder));
        }

        let block = self.chain.get_mut(slot);
        block.capacity = capacity;
        block.free = false;
        self.free_capacity -= capacity;

        trace!(arena = %self.id, address, capacity, "allocated block");
        self.check();
        Ok(self.block_id(slot))
    }

    /// Return a block to free space, merging it with free neighbours.
    ///
    /// Returns the handle of the resulting free block. When the block merges
    /// into its predecessor, that is the predecessor's handle and `id`
    /// becomes stale.
    ///
    /// # Panics
    ///
    /// Panics if `id` is foreign or stale, or the block is already free.
    pub fn free(&mut self, id: BlockId) -> BlockId {
        let slot = self.resolve(id);
        let block = self.chain.get_mut(slot);
        assert!(!block.free, "double free of {id}");
        block.free = true;
        let (capacity, prev, next) = (block.capacity, block.prev, block.next);
        self.free_capacity += capacity;

        let prev_free = prev.filter(|&p| self.chain.get(p).free);
        let next_free = next.filter(|&n| self.chain.get(n).free);

        let merged = match (prev_free, next_free) {
            (Some(prev), Some(next)) => {
                let next_capacity = self.chain.get(next).capacity;
                self.free_index.remove(next, self.chain.get(next));
                let (address, prev_capacity) = {
                    let b = self.chain.get(prev);
                    (b.address, b.capacity)
                };
                self.reshape_free(prev, address, prev_capacity + capacity + next_capacity);
                self.chain.remove(slot);
                self.chain.remove(next);
                prev
            }
            (Some(prev), None) => {
                let (address, prev_capacity) = {
                    let b = self.chain.get(prev);
                    (b.address, b.capacity)
                };
                self.reshape_free(prev, address, prev_capacity + capacity);
                self.chain.remove(slot);
                prev
            }
            (None, Some(next)) => {
                self.free_index.remove(next, self.chain.get(next));
                let absorbed = self.chain.remove(next);
                self.chain.get_mut(slot).capacity += absorbed.capacity;
                self.free_index.insert(slot, self.chain.get(slot));
                slot
            }
            (None, None) => {
                self.free_index.insert(slot, self.chain.get(slot));
                slot
            }
        };

        trace!(arena = %self.id, capacity, merged_into = merged, "freed block");
        self.check();
        self.block_id(merged)
    }

    /// Enlarge the arena to `new_capacity` bytes.
    ///
    /// The added space joins the trailing free block, or becomes a new one.
    /// If a physical store exists it is replaced by one of the new size;
    /// live bytes are copied across and the active/mapped state is
    /// restored. Block handles and addresses are unchanged.
    ///
    /// # Errors
    ///
    /// [`ArenaError::CapacityExceeded`] if `new_capacity` is above the
    /// configured ceiling. [`ArenaError::Storage`] if the collaborator fails.
    /// A failure while opening the old store for copying leaves the arena
    /// untouched, in its previous active/mapped state. A failure after that
    /// point leaves the logical layout grown, but possibly without a store or
    /// with the store unmapped.
    ///
    /// # Panics
    ///
    /// Panics if `new_capacity` is not larger than the current capacity.
    pub fn grow(&mut self, new_capacity: usize) -> Result<(), ArenaError> {
        assert!(
            new_capacity > self.total_capacity,
            "cannot grow arena from {} to {new_capacity} bytes",
            self.total_capacity
        );
        if let Some(limit) = self.config.max_capacity {
            if new_capacity > limit {
                return Err(ArenaError::CapacityExceeded {
                    requested: new_capacity,
                    limit,
                });
            }
        }

        let was_active = self.active;
        let was_mapped = self.mapped;
        let preserved = match self.handle {
            Some(_) if self.free_capacity < self.total_capacity => {
                let activated = !self.active;
                if activated {
                    self.activate()?;
                }
                if !self.mapped {
                    if let Err(err) = self.map() {
                        if activated {
                            self.deactivate();
                        }
                        return Err(err);
                    }
                }
                Some(self.mapped_bytes_mut().to_vec())
            }
            _ => None,
        };

        let old_capacity = self.total_capacity;
        let added = new_capacity - old_capacity;
        self.free_capacity += added;
        self.total_capacity = new_capacity;

        let tail = self.chain.tail();
        let (tail_free, tail_address, tail_capacity) = {
            let b = self.chain.get(tail);
            (b.free, b.address, b.capacity)
        };
        if tail_free {
            self.reshape_free(tail, tail_address, tail_capacity + added);
        } else {
            let slot = self.chain.insert_after(tail, Block::new(old_capacity, added));
            self.free_index.insert(slot, self.chain.get(slot));
        }

        self.release_storage();
        if let Some(bytes) = &preserved {
            self.activate()?;
            self.map()?;
            self.mapped_bytes_mut()[..bytes.len()].copy_from_slice(bytes);
            if !was_mapped {
                self.unmap();
            }
            if !was_active {
                self.deactivate();
            }
        } else {
            if was_active {
                self.activate()?;
            }
            if was_mapped {
                self.map()?;
            }
        }

        self.counters.grows += 1;
        debug!(
            arena = %self.id,
            from = old_capacity,
            to = new_capacity,
            preserved_bytes = preserved.as_ref().map_or(0, Vec::len),
            "grew arena"
        );
        self.check();
        Ok(())
    }

    /// Slide every allocated block toward the start of the buffer so that
    /// all free space ends up in one block at the tail.
    ///
    /// Allocated blocks keep their handles, relative order, and contents;
    /// their addresses decrease by the free space that preceded them. Does
    /// nothing if there is no free space or it is already a single trailing
    /// block.
    ///
    /// # Panics
    ///
    /// Panics if the store is not mapped.
    pub fn pack(&mut self) {
        assert!(self.mapped, "packing requires mapped storage");

        let tail = self.chain.get(self.chain.tail());
        if self.free_capacity == 0 || (tail.free && tail.capacity == self.free_capacity) {
            return;
        }

        let mut hole = self
            .chain
            .iter()
            .find(|(_, b)| b.free)
            .map(|(slot, _)| slot)
            .expect("an arena with free capacity has a free block");
        let mut moved = 0usize;

        while let Some(first) = self.chain.get(hole).next {
            let gap = self.chain.get(hole).capacity;

            // The run of allocated blocks between this hole and the next one.
            let mut run: SmallVec<[u32; 8]> = SmallVec::new();
            let mut cursor = Some(first);
            while let Some(slot) = cursor {
                let block = self.chain.get(slot);
                if block.free {
                    break;
                }
                run.push(slot);
                cursor = block.next;
            }
            let start = self.chain.get(first).address;
            let len: usize = run.iter().map(|&s| self.chain.get(s).capacity).sum();

            self.mapped_bytes_mut().copy_within(start..start + len, start - gap);
            for &slot in &run {
                self.chain.get_mut(slot).address -= gap;
            }
            moved += len;

            self.free_index.remove(hole, self.chain.get(hole));
            self.chain.remove(hole);

            match cursor {
                Some(next_hole) => {
                    let (address, capacity) = {
                        let b = self.chain.get(next_hole);
                        (b.address, b.capacity)
                    };
                    self.reshape_free(next_hole, address - gap, capacity + gap);
                    hole = next_hole;
                }
                None => {
                    let last = self.chain.tail();
                    let end = self.chain.get(last).end();
                    let slot = self.chain.insert_after(last, Block::new(end, gap));
                    self.free_index.insert(slot, self.chain.get(slot));
                    break;
                }
            }
        }

        self.counters.packs += 1;
        self.counters.bytes_moved += moved as u64;
        debug!(
            arena = %self.id,
            moved_bytes = moved,
            free = self.free_capacity,
            "packed arena"
        );
        self.check();
    }

    /// Writer over the bytes of an allocated block.
    ///
    /// # Panics
    ///
    /// Panics if `id` is foreign, stale, or free, or the store is not mapped.
    pub fn writer(&mut self, id: BlockId) -> BlockWriter<'_> {
        let range = self.allocated_range(id);
        BlockWriter::new(&mut self.mapped_bytes_mut()[range])
    }

    /// Current contents of an allocated block.
    ///
    /// # Panics
    ///
    /// Panics if `id` is foreign, stale, or free, or the store is not mapped.
    pub fn block_bytes(&self, id: BlockId) -> &[u8] {
        let range = self.allocated_range(id);
        assert!(self.mapped, "arena storage is not mapped");
        let bytes = self
            .storage
            .mapped(self.bound_handle())
            .expect("mapped storage exposes its bytes");
        &bytes[range]
    }

    /// Where a block currently lives.
    ///
    /// # Panics
    ///
    /// Panics if `id` is foreign or stale.
    pub fn block(&self, id: BlockId) -> BlockInfo {
        let slot = self.resolve(id);
        self.info(slot, self.chain.get(slot))
    }

    /// All blocks in address order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
        self.chain
            .iter()
            .map(move |(slot, block)| self.info(slot, block))
    }

    /// Free blocks in best-fit order: ascending capacity, then address.
    pub fn free_blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
        self.free_index
            .iter()
            .map(move |(_, slot)| self.info(slot, self.chain.get(slot)))
    }

    /// Occupancy and activity snapshot.
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            total_capacity: self.total_capacity,
            free_capacity: self.free_capacity,
            used_capacity: self.used_capacity(),
            block_count: self.chain.len(),
            free_block_count: self.free_index.len(),
            largest_free_block: self.free_index.largest(),
            grow_count: self.counters.grows,
            pack_count: self.counters.packs,
            bytes_moved: self.counters.bytes_moved,
        }
    }

    /// Make the store the active device target, creating it on first use.
    ///
    /// # Panics
    ///
    /// Panics if already active.
    pub fn activate(&mut self) -> Result<(), ArenaError> {
        assert!(!self.active, "arena storage is already active");
        let handle = match self.handle {
            Some(handle) => handle,
            None => {
                let handle = self
                    .storage
                    .create(self.config.target, self.total_capacity)?;
                debug!(
                    arena = %self.id,
                    bytes = self.total_capacity,
                    buffer = %self.config.target,
                    "created backing storage"
                );
                self.handle = Some(handle);
                handle
            }
        };
        self.storage.activate(handle)?;
        self.active = true;
        Ok(())
    }

    /// Clear the active binding.
    ///
    /// # Panics
    ///
    /// Panics if not active.
    pub fn deactivate(&mut self) {
        assert!(self.active, "arena storage is not active");
        self.storage.deactivate(self.bound_handle());
        self.active = false;
    }

    /// Expose the store's bytes to the host.
    ///
    /// # Panics
    ///
    /// Panics if not active or already mapped.
    pub fn map(&mut self) -> Result<(), ArenaError> {
        assert!(self.active, "arena storage must be active to map");
        assert!(!self.mapped, "arena storage is already mapped");
        self.storage.map(self.bound_handle())?;
        self.mapped = true;
        Ok(())
    }

    /// Revoke host access to the store.
    ///
    /// # Panics
    ///
    /// Panics if not active and mapped.
    pub fn unmap(&mut self) {
        assert!(self.active, "arena storage must be active to unmap");
        assert!(self.mapped, "arena storage is not mapped");
        self.storage.unmap(self.bound_handle());
        self.mapped = false;
    }

    fn growth_target(&self, requested: usize) -> Result<usize, ArenaError> {
        let total = self.total_capacity;
        let doubled = total.saturating_mul(2);
        let wanted = match self.config.growth {
            GrowthPolicy::Doubling => doubled,
            GrowthPolicy::DoublingOrFit => doubled.max(total.saturating_add(requested)),
        };
        let target = self.config.max_capacity.map_or(wanted, |limit| wanted.min(limit));
        if target <= total {
            return Err(ArenaError::CapacityExceeded {
                requested: total.saturating_add(requested),
                limit: self.config.max_capacity.unwrap_or(total),
            });
        }
        Ok(target)
    }

    /// Change a free block's extent, keeping the free index sorted.
    fn reshape_free(&mut self, slot: u32, address: usize, capacity: usize) {
        self.free_index.remove(slot, self.chain.get(slot));
        let block = self.chain.get_mut(slot);
        block.address = address;
        block.capacity = capacity;
        self.free_index.insert(slot, self.chain.get(slot));
    }

    fn release_storage(&mut self) {
        if let Some(handle) = self.handle.take() {
            if self.mapped {
                self.storage.unmap(handle);
                self.mapped = false;
            }
            if self.active {
                self.storage.deactivate(handle);
                self.active = false;
            }
            self.storage.destroy(handle);
        }
    }

    fn bound_handle(&self) -> S::Handle {
        self.handle.expect("an active arena always holds a storage handle")
    }

    fn mapped_bytes_mut(&mut self) -> &mut [u8] {
        assert!(self.mapped, "arena storage is not mapped");
        let handle = self.bound_handle();
        self.storage
            .mapped_mut(handle)
            .expect("mapped storage exposes its bytes")
    }

    fn allocated_range(&self, id: BlockId) -> std::ops::Range<usize> {
        let block = self.chain.get(self.resolve(id));
        assert!(!block.free, "{id} is not an allocated block");
        block.address..block.end()
    }

    fn resolve(&self, id: BlockId) -> u32 {
        assert_eq!(id.arena(), self.id, "{id} belongs to a different arena");
        match self.chain.generation(id.slot()) {
            Some(generation) if generation == id.generation() => id.slot(),
            _ => panic!("stale block handle {id}"),
        }
    }

    fn block_id(&self, slot: u32) -> BlockId {
        let generation = self
            .chain
            .generation(slot)
            .unwrap_or_else(|| panic!("block slot {slot} is vacant"));
        BlockId::new(self.id, slot, generation)
    }

    fn info(&self, slot: u32, block: &Block) -> BlockInfo {
        BlockInfo {
            id: self.block_id(slot),
            address: block.address,
            capacity: block.capacity,
            free: block.free,
        }
    }

    fn check(&self) {
        if self.config.verify_invariants {
            if let Err(err) = self.validate() {
                panic!("{err}");
            }
        }
    }
}

impl<S: MappedStorage> Drop for Arena<S> {
    fn drop(&mut self) {
        self.release_storage();
    }
}
