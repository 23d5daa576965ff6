//! End-to-end arena scenarios through the facade crate.

use lode::prelude::*;
use lode_test_utils::{matches_pattern, pattern, FailingStorage, RecordingStorage, StorageCall};

fn mapped(config: ArenaConfig) -> Arena<HostStorage> {
    let mut arena = Arena::new(config.with_verify_invariants(true), HostStorage::new()).unwrap();
    arena.activate().unwrap();
    arena.map().unwrap();
    arena
}

fn layout<S: MappedStorage>(arena: &Arena<S>) -> Vec<(usize, usize, bool)> {
    arena
        .blocks()
        .map(|b| (b.address, b.capacity, b.free))
        .collect()
}

#[test]
fn first_allocation_splits_initial_block() {
    let mut arena = mapped(ArenaConfig::new(1024));
    let id = arena.allocate(100).unwrap();

    let info = arena.block(id);
    assert_eq!((info.address, info.capacity), (0, 100));
    assert_eq!(layout(&arena), vec![(0, 100, false), (100, 924, true)]);
}

#[test]
fn oversized_request_grows_and_keeps_prior_contents() {
    let mut arena = mapped(ArenaConfig::new(1024).with_growth(GrowthPolicy::Doubling));
    let first = arena.allocate(100).unwrap();
    arena.writer(first).write_bytes(0, &pattern(1, 100));

    let big = arena.allocate(2000).unwrap();
    assert!(arena.total_capacity() >= 2048);
    assert_eq!(arena.block(big).capacity, 2000);
    assert_eq!(arena.block(first).address, 0);
    assert!(matches_pattern(1, arena.block_bytes(first)));
    arena.validate().unwrap();
}

#[test]
fn freeing_beside_a_hole_merges_into_it() {
    let mut arena = mapped(ArenaConfig::new(300));
    let a = arena.allocate(100).unwrap();
    let b = arena.allocate(100).unwrap();
    let c = arena.allocate(100).unwrap();
    arena.free(b);
    assert_eq!(
        layout(&arena),
        vec![(0, 100, false), (100, 100, true), (200, 100, false)]
    );

    let merged = arena.free(c);
    assert_eq!(layout(&arena), vec![(0, 100, false), (100, 200, true)]);
    let info = arena.block(merged);
    assert_eq!((info.address, info.capacity, info.free), (100, 200, true));
    assert!(arena.owns_block(a));
    assert!(!arena.owns_block(c));
}

#[test]
fn pack_gathers_free_space_at_tail() {
    let mut arena = mapped(ArenaConfig::new(110));
    let sizes = [50, 20, 30, 10];
    let ids: Vec<BlockId> = sizes.iter().map(|&s| arena.allocate(s).unwrap()).collect();
    for (seed, &id) in ids.iter().enumerate() {
        let capacity = arena.block(id).capacity;
        arena.writer(id).write_bytes(0, &pattern(seed as u64, capacity));
    }
    arena.free(ids[1]);
    arena.free(ids[3]);

    arena.pack();

    assert_eq!(
        layout(&arena),
        vec![(0, 50, false), (50, 30, false), (80, 30, true)]
    );
    assert!(matches_pattern(0, arena.block_bytes(ids[0])));
    assert!(matches_pattern(2, arena.block_bytes(ids[2])));
    let stats = arena.stats();
    assert_eq!(stats.free_block_count, 1);
    assert_eq!(stats.pack_count, 1);
    assert_eq!(stats.fragmentation(), 0.0);
}

#[test]
fn pack_then_allocate_reuses_reclaimed_tail() {
    let mut arena = mapped(ArenaConfig::new(100));
    let ids: Vec<BlockId> = (0..10).map(|_| arena.allocate(10).unwrap()).collect();
    for id in ids.iter().step_by(2) {
        arena.free(*id);
    }
    assert_eq!(arena.stats().largest_free_block, 10);

    arena.pack();
    let big = arena.allocate(50).unwrap();
    assert_eq!(arena.block(big).address, 50);
    assert_eq!(arena.total_capacity(), 100);
    assert_eq!(arena.stats().grow_count, 0);
}

#[test]
fn writes_survive_growth_and_packing() {
    let mut arena = mapped(ArenaConfig::new(64));
    let vertex = arena.allocate(24).unwrap();
    {
        let mut w = arena.writer(vertex);
        let next = w.write_vec3(0, [1.0, 2.0, 3.0]);
        let next = w.write_vec2(next, [0.25, 0.75]);
        w.write_color(next, [1.0, 0.0, 0.0, 1.0]);
    }
    let spacer = arena.allocate(40).unwrap();

    arena.allocate(200).unwrap();
    arena.free(spacer);
    arena.pack();

    let bytes = arena.block_bytes(vertex);
    assert_eq!(&bytes[0..4], &1.0f32.to_ne_bytes());
    assert_eq!(&bytes[16..20], &0.75f32.to_ne_bytes());
    assert_eq!(&bytes[20..24], &[255, 0, 0, 255]);
}

#[test]
fn storage_lifecycle_is_lazy_and_released_on_drop() {
    let storage = RecordingStorage::new(HostStorage::new());
    let log = storage.log();
    let config = ArenaConfig::new(256).with_target(BufferTarget::Index);
    let mut arena = Arena::new(config, storage).unwrap();

    arena.allocate(16).unwrap();
    arena.allocate(512).unwrap();
    assert_eq!(log.creates(), 0, "no store before first activate");

    arena.activate().unwrap();
    let handle = arena.storage_handle().unwrap();
    assert_eq!(
        log.calls(),
        vec![
            StorageCall::Create {
                target: BufferTarget::Index,
                size: arena.total_capacity(),
                handle
            },
            StorageCall::Activate(handle),
        ]
    );

    drop(arena);
    assert_eq!(log.destroys(), 1);
}

#[test]
fn refused_growth_reports_storage_error() {
    let storage = FailingStorage::fail_create_after(HostStorage::new(), 1);
    let config = ArenaConfig::new(32).with_verify_invariants(true);
    let mut arena = Arena::new(config, storage).unwrap();
    arena.activate().unwrap();
    arena.map().unwrap();
    arena.allocate(32).unwrap();

    let err = arena.allocate(8).unwrap_err();
    assert!(matches!(err, ArenaError::Storage(StorageError::Device { .. })));
    assert!(arena.storage_handle().is_none());
}

#[test]
fn ceiling_is_reported_not_exceeded() {
    let mut arena = mapped(ArenaConfig::new(64).with_max_capacity(128));
    arena.allocate(100).unwrap();
    assert_eq!(arena.total_capacity(), 128);
    let err = arena.allocate(64).unwrap_err();
    assert_eq!(
        err,
        ArenaError::CapacityExceeded {
            requested: 192,
            limit: 128
        }
    );
    assert_eq!(arena.total_capacity(), 128);
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    enum Step {
        Allocate(usize),
        Free(usize),
        Pack,
    }

    fn steps() -> impl Strategy<Value = Vec<Step>> {
        proptest::collection::vec(
            prop_oneof![
                4 => (1usize..200).prop_map(Step::Allocate),
                3 => any::<usize>().prop_map(Step::Free),
                1 => Just(Step::Pack),
            ],
            1..80,
        )
    }

    proptest! {
        #[test]
        fn live_blocks_keep_their_bytes(steps in steps()) {
            let mut arena = mapped(ArenaConfig::new(256));
            let mut live: Vec<(BlockId, u64)> = Vec::new();
            for (seed, step) in steps.into_iter().enumerate() {
                let seed = seed as u64;
                match step {
                    Step::Allocate(n) => {
                        let id = arena.allocate(n).unwrap();
                        arena.writer(id).write_bytes(0, &pattern(seed, n));
                        live.push((id, seed));
                    }
                    Step::Free(i) if !live.is_empty() => {
                        let (id, _) = live.swap_remove(i % live.len());
                        arena.free(id);
                    }
                    Step::Free(_) => {}
                    Step::Pack => arena.pack(),
                }
                for &(id, seed) in &live {
                    prop_assert!(matches_pattern(seed, arena.block_bytes(id)));
                }
            }
            prop_assert!(arena.validate().is_ok());
        }
    }
}
