//! Concurrent readers against a mutating writer.
//!
//! A minimal generation coordinator stands in for the attribute layer's:
//! each reader publishes the generation it entered at, and the writer trims
//! only below the oldest published generation. Readers check that every
//! snapshot is sorted, fully resolvable, and unchanged when read twice.
//!
//! Run with logging:
//! ```bash
//! RUST_LOG=enumstore=debug cargo test --features tracing --test concurrent_readers
//! ```

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering, fence};
use std::thread;

use enumstore::{EnumStore, EnumStoreReader, Snapshot, StoreConfig};

const READERS: usize = 4;
const ROUNDS: u64 = 400;
const IDLE: u64 = u64::MAX;

struct Coordinator {
    current: AtomicU64,
    observed: Vec<AtomicU64>,
    done: AtomicBool,
}

impl Coordinator {
    fn new() -> Self {
        Self {
            current: AtomicU64::new(1),
            observed: (0..READERS).map(|_| AtomicU64::new(IDLE)).collect(),
            done: AtomicBool::new(false),
        }
    }

    fn enter(&self, reader: usize) {
        let generation = self.current.load(Ordering::SeqCst);
        self.observed[reader].store(generation, Ordering::SeqCst);
        fence(Ordering::SeqCst);
    }

    fn leave(&self, reader: usize) {
        self.observed[reader].store(IDLE, Ordering::SeqCst);
    }

    fn first_used(&self) -> u64 {
        fence(Ordering::SeqCst);
        let current = self.current.load(Ordering::SeqCst);
        self.observed
            .iter()
            .map(|slot| slot.load(Ordering::SeqCst))
            .min()
            .unwrap_or(IDLE)
            .min(current)
    }
}

fn contents(snapshot: &Snapshot<u64>) -> Vec<u64> {
    snapshot
        .iter()
        .map(|entry| snapshot.get_value(entry).unwrap())
        .collect()
}

fn run_reader(id: usize, reader: EnumStoreReader<u64>, coordinator: Arc<Coordinator>) -> usize {
    let mut checked = 0;
    while !coordinator.done.load(Ordering::SeqCst) {
        coordinator.enter(id);
        let snapshot = reader.snapshot();

        let first = contents(&snapshot);
        assert!(first.windows(2).all(|w| w[0] < w[1]), "snapshot out of order");
        assert_eq!(first.len(), snapshot.num_uniques());
        for value in first.iter().step_by(7) {
            assert!(snapshot.find_frozen_index(value).is_some());
        }

        thread::yield_now();
        assert_eq!(contents(&snapshot), first, "snapshot changed under reader");

        drop(snapshot);
        coordinator.leave(id);
        checked += 1;
    }
    checked
}

#[test]
fn readers_see_stable_snapshots() {
    common::init_tracing();

    let config = StoreConfig::new()
        .with_initial_buffer_words(128)
        .with_min_buffer_words(64)
        .with_min_dead_words(32);
    let mut store: EnumStore<u64> = EnumStore::new(config);
    store.freeze_tree();

    let coordinator = Arc::new(Coordinator::new());
    let handles: Vec<_> = (0..READERS)
        .map(|id| {
            let reader = store.reader();
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || run_reader(id, reader, coordinator))
        })
        .collect();

    let mut compactions = 0;
    for round in 0..ROUNDS {
        for i in 0..20 {
            store.insert(&((round * 7 + i * 13) % 300));
        }
        for i in 0..16 {
            if let Some(entry) = store.find_index(&((round * 11 + i * 3) % 300)) {
                store.dec_ref_count(entry);
            }
        }
        store.free_unused_enums();

        if store.should_compact() && store.perform_compaction(0) {
            compactions += 1;
        }

        store.freeze_tree();
        let generation = coordinator.current.load(Ordering::SeqCst);
        store.transfer_hold_lists(generation);
        coordinator.current.store(generation + 1, Ordering::SeqCst);
        store.trim_hold_lists(coordinator.first_used());
    }

    coordinator.done.store(true, Ordering::SeqCst);
    let checked: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert!(checked > 0);
    tracing::info!(checked, compactions, "concurrent reader run finished");

    // Writer state is still consistent with a fresh snapshot.
    let snapshot = store.reader().snapshot();
    let live: Vec<u64> = store.iter().map(|r| store.get_value(r).unwrap()).collect();
    assert_eq!(contents(&snapshot), live);
}

#[test]
fn snapshot_outlives_store() {
    let mut store: EnumStore<u64> = EnumStore::default();
    for value in 0..100 {
        store.insert(&value);
    }
    store.freeze_tree();
    let snapshot = store.reader().snapshot();
    let reader = store.reader();
    drop(store);

    assert_eq!(snapshot.num_uniques(), 100);
    assert_eq!(reader.snapshot().num_uniques(), 100);
    assert_eq!(contents(&snapshot), (0..100).collect::<Vec<_>>());
}

#[test]
fn readers_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<EnumStoreReader<String>>();
    assert_send_sync::<Snapshot<String>>();
    assert_send_sync::<EnumStore<String>>();
}
