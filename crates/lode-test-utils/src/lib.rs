//! Test utilities and storage doubles for Lode development.
//!
//! Provides wrappers around any [`MappedStorage`](lode_core::MappedStorage)
//! that record or sabotage the calls an arena makes
//! ([`RecordingStorage`], [`FailingStorage`]), plus deterministic byte
//! patterns for checking that data survives growth and packing.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{CallLog, FailingStorage, RecordingStorage, StorageCall};

/// Deterministic, seed-dependent byte pattern of length `len`.
///
/// Different seeds give different sequences, so blocks filled with distinct
/// seeds can be told apart after they move.
pub fn pattern(seed: u64, len: usize) -> Vec<u8> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 56) as u8
        })
        .collect()
}

/// Whether `bytes` equals `pattern(seed, bytes.len())`.
pub fn matches_pattern(seed: u64, bytes: &[u8]) -> bool {
    pattern(seed, bytes.len()) == bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_is_deterministic() {
        assert_eq!(pattern(7, 32), pattern(7, 32));
        assert!(matches_pattern(7, &pattern(7, 32)));
    }

    #[test]
    fn seeds_differ() {
        assert_ne!(pattern(1, 32), pattern(2, 32));
        assert!(!matches_pattern(1, &pattern(2, 32)));
    }

    #[test]
    fn prefix_is_stable_across_lengths() {
        let long = pattern(3, 64);
        assert_eq!(&long[..16], pattern(3, 16).as_slice());
    }
}
