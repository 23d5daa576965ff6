//! Workload profiles and utilities for benchmarking the Lode arena.
//!
//! - [`churn_ops`]: deterministic allocate/free sequence from a seed
//! - [`run_churn`]: replay such a sequence against an arena
//! - [`fragmented_arena`]: mapped arena with every other block freed, the
//!   worst case for [`Arena::pack`]

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use lode_arena::{Arena, ArenaConfig, ArenaError, HostStorage};
use lode_core::{BlockId, MappedStorage};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// One step of a churn workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChurnOp {
    /// Allocate a block of this many bytes.
    Allocate(usize),
    /// Free the live block at this position (taken modulo the live count).
    Free(usize),
}

/// Shape of a churn workload.
#[derive(Clone, Debug)]
pub struct ChurnProfile {
    /// Number of operations to generate.
    pub ops: usize,
    /// Smallest allocation, in bytes.
    pub min_size: usize,
    /// Largest allocation, in bytes (inclusive).
    pub max_size: usize,
    /// Percentage of operations that are frees, 0..=100.
    pub free_percent: u32,
}

impl ChurnProfile {
    /// Mixed vertex-batch sizes, roughly balanced allocs and frees.
    pub fn reference() -> Self {
        Self {
            ops: 10_000,
            min_size: 16,
            max_size: 4096,
            free_percent: 45,
        }
    }

    /// Many tiny allocations; stresses the free index more than copying.
    pub fn small_blocks() -> Self {
        Self {
            ops: 10_000,
            min_size: 4,
            max_size: 64,
            free_percent: 45,
        }
    }
}

/// Generate a deterministic churn sequence.
pub fn churn_ops(profile: &ChurnProfile, seed: u64) -> Vec<ChurnOp> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let span = (profile.max_size - profile.min_size + 1) as u64;
    (0..profile.ops)
        .map(|_| {
            if rng.next_u32() % 100 < profile.free_percent {
                ChurnOp::Free(rng.next_u32() as usize)
            } else {
                ChurnOp::Allocate(profile.min_size + (rng.next_u64() % span) as usize)
            }
        })
        .collect()
}

/// Apply `ops` to `arena`, returning the handles still live at the end.
///
/// A free with nothing live is skipped.
pub fn run_churn<S: MappedStorage>(
    arena: &mut Arena<S>,
    ops: &[ChurnOp],
) -> Result<Vec<BlockId>, ArenaError> {
    let mut live = Vec::new();
    for op in ops {
        match *op {
            ChurnOp::Allocate(size) => live.push(arena.allocate(size)?),
            ChurnOp::Free(pos) if !live.is_empty() => {
                let id = live.swap_remove(pos % live.len());
                arena.free(id);
            }
            ChurnOp::Free(_) => {}
        }
    }
    Ok(live)
}

/// A mapped arena of `blocks` blocks of `block_size` bytes with every
/// other block freed, leaving `blocks / 2` interior holes.
pub fn fragmented_arena(blocks: usize, block_size: usize) -> Result<Arena<HostStorage>, ArenaError> {
    let config = ArenaConfig::new(blocks * block_size).with_verify_invariants(false);
    let mut arena = Arena::new(config, HostStorage::new())?;
    arena.activate()?;
    arena.map()?;

    let mut ids = Vec::with_capacity(blocks);
    for i in 0..blocks {
        let id = arena.allocate(block_size)?;
        arena.writer(id).write_bytes(0, &vec![i as u8; block_size]);
        ids.push(id);
    }
    for id in ids.into_iter().step_by(2) {
        arena.free(id);
    }
    Ok(arena)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn churn_is_deterministic() {
        let profile = ChurnProfile::reference();
        assert_eq!(churn_ops(&profile, 42), churn_ops(&profile, 42));
        assert_ne!(churn_ops(&profile, 42), churn_ops(&profile, 43));
    }

    #[test]
    fn churn_sizes_within_profile() {
        let profile = ChurnProfile::small_blocks();
        for op in churn_ops(&profile, 7) {
            if let ChurnOp::Allocate(size) = op {
                assert!((4..=64).contains(&size), "size {size} out of range");
            }
        }
    }

    #[test]
    fn churn_replays_cleanly() {
        let profile = ChurnProfile {
            ops: 2_000,
            ..ChurnProfile::reference()
        };
        let config = ArenaConfig::new(4096).with_verify_invariants(true);
        let mut arena = Arena::new(config, HostStorage::new()).unwrap();
        let live = run_churn(&mut arena, &churn_ops(&profile, 1)).unwrap();
        let used: usize = live.iter().map(|&id| arena.block(id).capacity).sum();
        assert_eq!(arena.used_capacity(), used);
        arena.validate().unwrap();
    }

    #[test]
    fn fragmented_arena_has_interior_holes() {
        let arena = fragmented_arena(8, 16).unwrap();
        let stats = arena.stats();
        assert_eq!(stats.total_capacity, 128);
        assert_eq!(stats.free_block_count, 4);
        assert_eq!(stats.free_capacity, 64);
        arena.validate().unwrap();
    }
}
