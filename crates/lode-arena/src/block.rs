//! Blocks and the address-ordered chain that owns them.
//!
//! A [`Block`] describes one contiguous byte range of the arena. The
//! [`BlockChain`] stores blocks in a slot table and links them by slot index
//! into a doubly linked list ordered by address. Slots of blocks that get
//! merged away are recycled; each slot carries a generation so that a
//! [`BlockId`](lode_core::BlockId) issued for an older occupant is
//! recognisably stale.

use lode_core::BlockId;

/// One contiguous byte range `[address, address + capacity)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Block {
    pub(crate) address: usize,
    pub(crate) capacity: usize,
    pub(crate) free: bool,
    pub(crate) prev: Option<u32>,
    pub(crate) next: Option<u32>,
}

impl Block {
    /// A free, unlinked block.
    pub(crate) fn new(address: usize, capacity: usize) -> Self {
        Self {
            address,
            capacity,
            free: true,
            prev: None,
            next: None,
        }
    }

    /// First address past the block.
    pub(crate) fn end(&self) -> usize {
        self.address + self.capacity
    }
}

/// Read-only view of a block, as reported to callers.
///
/// `address` is a snapshot: growth and packing may move the block, so
/// re-query after either.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Handle of the block.
    pub id: BlockId,
    /// Byte offset from the start of the arena.
    pub address: usize,
    /// Length in bytes.
    pub capacity: usize,
    /// Whether the block is free space.
    pub free: bool,
}

struct Slot {
    generation: u32,
    block: Option<Block>,
}

/// Slot table plus head/tail of the address-ordered chain.
///
/// The chain always contains at least one block.
pub(crate) struct BlockChain {
    slots: Vec<Slot>,
    vacant: Vec<u32>,
    head: u32,
    tail: u32,
    len: usize,
}

impl BlockChain {
    /// A chain of one free block covering `[0, capacity)`.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                block: Some(Block::new(0, capacity)),
            }],
            vacant: Vec::new(),
            head: 0,
            tail: 0,
            len: 1,
        }
    }

    pub(crate) fn head(&self) -> u32 {
        self.head
    }

    pub(crate) fn tail(&self) -> u32 {
        self.tail
    }

    /// Number of blocks in the chain.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Generation of an occupied slot, `None` for vacant or unknown slots.
    pub(crate) fn generation(&self, slot: u32) -> Option<u32> {
        let entry = self.slots.get(slot as usize)?;
        entry.block.as_ref().map(|_| entry.generation)
    }

    /// # Panics
    ///
    /// Panics if the slot is vacant.
    pub(crate) fn get(&self, slot: u32) -> &Block {
        self.slots[slot as usize]
            .block
            .as_ref()
            .unwrap_or_else(|| panic!("block slot {slot} is vacant"))
    }

    /// # Panics
    ///
    /// Panics if the slot is vacant.
    pub(crate) fn get_mut(&mut self, slot: u32) -> &mut Block {
        self.slots[slot as usize]
            .block
            .as_mut()
            .unwrap_or_else(|| panic!("block slot {slot} is vacant"))
    }

    /// Splice `block` into the chain directly after `after`.
    ///
    /// The caller supplies an address consistent with the neighbours; only
    /// the links are set here. Returns the new block's slot.
    pub(crate) fn insert_after(&mut self, after: u32, mut block: Block) -> u32 {
        let next = self.get(after).next;
        block.prev = Some(after);
        block.next = next;
        let slot = self.occupy(block);

        self.get_mut(after).next = Some(slot);
        match next {
            Some(next) => self.get_mut(next).prev = Some(slot),
            None => self.tail = slot,
        }
        slot
    }

    /// Unlink a block and vacate its slot, returning the block.
    ///
    /// # Panics
    ///
    /// Panics if the block is the only one in the chain.
    pub(crate) fn remove(&mut self, slot: u32) -> Block {
        assert!(self.len > 1, "cannot remove the last block of a chain");
        let entry = &mut self.slots[slot as usize];
        let block = entry
            .block
            .take()
            .unwrap_or_else(|| panic!("block slot {slot} is vacant"));
        entry.generation = entry.generation.wrapping_add(1);
        self.vacant.push(slot);
        self.len -= 1;

        match block.prev {
            Some(prev) => self.get_mut(prev).next = block.next,
            None => {
                self.head = block
                    .next
                    .expect("a chain of two or more blocks has a successor to the head");
            }
        }
        match block.next {
            Some(next) => self.get_mut(next).prev = block.prev,
            None => {
                self.tail = block
                    .prev
                    .expect("a chain of two or more blocks has a predecessor to the tail");
            }
        }
        block
    }

    /// Iterate `(slot, block)` from head to tail.
    pub(crate) fn iter(&self) -> ChainIter<'_> {
        ChainIter {
            chain: self,
            cursor: Some(self.head),
        }
    }

    fn occupy(&mut self, block: Block) -> u32 {
        self.len += 1;
        match self.vacant.pop() {
            Some(slot) => {
                self.slots[slot as usize].block = Some(block);
                slot
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    block: Some(block),
                });
                (self.slots.len() - 1) as u32
            }
        }
    }
}

/// Head-to-tail iterator over a [`BlockChain`].
pub(crate) struct ChainIter<'a> {
    chain: &'a BlockChain,
    cursor: Option<u32>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = (u32, &'a Block);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let block = self.chain.get(slot);
        self.cursor = block.next;
        Some((slot, block))
    }
}
