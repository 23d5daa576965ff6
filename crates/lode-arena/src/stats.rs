//! Occupancy and activity metrics for an arena.
//!
//! [`ArenaStats`] is a point-in-time snapshot taken by
//! [`Arena::stats`](crate::Arena::stats). Capacities describe the arena right
//! now; the counters are cumulative since the arena was created.

/// Occupancy snapshot plus cumulative activity counters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArenaStats {
    /// Logical size of the arena in bytes.
    pub total_capacity: usize,
    /// Bytes not handed out to any block.
    pub free_capacity: usize,
    /// Bytes held by allocated blocks.
    pub used_capacity: usize,
    /// Number of blocks in the chain, free and allocated.
    pub block_count: usize,
    /// Number of free blocks.
    pub free_block_count: usize,
    /// Capacity of the largest free block.
    pub largest_free_block: usize,
    /// Cumulative number of growth operations.
    pub grow_count: u64,
    /// Cumulative number of pack passes that moved data.
    pub pack_count: u64,
    /// Cumulative bytes relocated by packing.
    pub bytes_moved: u64,
}

impl ArenaStats {
    /// Share of free space that is not in the largest free block.
    ///
    /// 0.0 when all free space is contiguous (or there is none), approaching
    /// 1.0 as free space splinters into many small holes.
    pub fn fragmentation(&self) -> f64 {
        if self.free_capacity == 0 {
            return 0.0;
        }
        1.0 - self.largest_free_block as f64 / self.free_capacity as f64
    }
}

/// Counters the arena bumps as it works.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Counters {
    pub(crate) grows: u64,
    pub(crate) packs: u64,
    pub(crate) bytes_moved: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let s = ArenaStats::default();
        assert_eq!(s.total_capacity, 0);
        assert_eq!(s.grow_count, 0);
        assert_eq!(s.fragmentation(), 0.0);
    }

    #[test]
    fn contiguous_free_space_is_unfragmented() {
        let s = ArenaStats {
            free_capacity: 300,
            largest_free_block: 300,
            ..Default::default()
        };
        assert_eq!(s.fragmentation(), 0.0);
    }

    #[test]
    fn split_free_space_reports_fragmentation() {
        let s = ArenaStats {
            free_capacity: 400,
            largest_free_block: 100,
            ..Default::default()
        };
        assert!((s.fragmentation() - 0.75).abs() < 1e-12);
    }
}
