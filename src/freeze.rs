//! Frozen views and their publication to readers.
//!
//! A [`FrozenView`] is everything a reader needs to answer queries without
//! touching writer state: the frozen dictionary root, the buffer set that
//! root's handles resolve against, and the remap tables of compactions not
//! yet trimmed.
//!
//! # Publication protocol
//!
//! 1. The writer builds a view and moves it into an `Arc`.
//! 2. `publish` swaps the raw `Arc` pointer into an `AtomicPtr` and retires
//!    the previous pointer through `seize`.
//! 3. A reader enters a `seize` guard, protects the pointer, bumps the strong
//!    count and leaves the guard. From then on the reader owns its view.
//!
//! The retired `Arc` is dropped only once no guard that could have loaded
//! it is still active. Buffers and tree nodes are kept alive by the `Arc`s
//! inside the view, independently of the hold lists.

use std::fmt as StdFmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicPtr, AtomicUsize};

use seize::{Collector, Guard};

use crate::alloc::BufferSet;
use crate::compact::{RemapTable, chase};
use crate::dict::{FrozenRoot, NodeData};
use crate::entry_ref::EntryRef;
use crate::ordering::{READ_ORD, SWAP_ORD};
use crate::tracing_helpers::trace_log;

// ============================================================================
//  FrozenView
// ============================================================================

/// Immutable state published to readers by one freeze.
#[derive(Debug)]
pub struct FrozenView<D> {
    root: FrozenRoot<D>,
    buffers: BufferSet,
    remaps: Vec<Arc<RemapTable>>,
    sequence: u64,
}

impl<D: NodeData> FrozenView<D> {
    pub(crate) fn new(
        root: FrozenRoot<D>,
        buffers: BufferSet,
        remaps: Vec<Arc<RemapTable>>,
        sequence: u64,
    ) -> Self {
        Self {
            root,
            buffers,
            remaps,
            sequence,
        }
    }

    /// View with nothing in it.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(FrozenRoot::default(), BufferSet::new(), Vec::new(), 0)
    }

    /// The frozen dictionary.
    #[must_use]
    #[inline(always)]
    pub fn root(&self) -> &FrozenRoot<D> {
        &self.root
    }

    /// Buffers the frozen handles resolve against.
    #[must_use]
    #[inline(always)]
    pub fn buffers(&self) -> &BufferSet {
        &self.buffers
    }

    /// Number of freezes that preceded this view.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Current handle for `old`, following every compaction this view knows
    /// about. `None` if the result does not resolve in this view.
    #[must_use]
    pub fn current_ref(&self, old: EntryRef) -> Option<EntryRef> {
        let current: EntryRef = chase(old, self.remaps.iter().map(Arc::as_ref));
        self.buffers.is_valid(current).then_some(current)
    }
}

// ============================================================================
//  ViewCell
// ============================================================================

/// Lock-free single-writer publication slot for [`FrozenView`]s.
pub(crate) struct ViewCell<D> {
    collector: Collector,

    /// Always a pointer obtained from `Arc::into_raw`, never null.
    current: AtomicPtr<FrozenView<D>>,

    _marker: PhantomData<Arc<FrozenView<D>>>,
}

impl<D: NodeData> ViewCell<D> {
    pub(crate) fn new(view: FrozenView<D>) -> Self {
        Self {
            collector: Collector::new(),
            current: AtomicPtr::new(Arc::into_raw(Arc::new(view)).cast_mut()),
            _marker: PhantomData,
        }
    }

    /// Take a reference to the latest published view.
    pub(crate) fn load(&self) -> Arc<FrozenView<D>> {
        let guard = self.collector.enter();
        let ptr: *mut FrozenView<D> = guard.protect(&self.current, READ_ORD);

        // SAFETY: ptr came from Arc::into_raw and is not null. The guard
        // keeps it from being reclaimed until the count is bumped.
        unsafe {
            Arc::increment_strong_count(ptr.cast_const());
            Arc::from_raw(ptr.cast_const())
        }
    }

    /// Replace the published view. The old one is reclaimed once every
    /// reader that may have loaded it has left its guard.
    pub(crate) fn publish(&self, view: FrozenView<D>) {
        trace_log!(sequence = view.sequence, "publishing frozen view");
        let new: *mut FrozenView<D> = Arc::into_raw(Arc::new(view)).cast_mut();

        let guard = self.collector.enter();
        let old: *mut FrozenView<D> = self.current.swap(new, SWAP_ORD);

        // SAFETY: old came from Arc::into_raw and is no longer reachable
        // through `current`.
        unsafe {
            guard.defer_retire(old, |ptr, _| {
                drop(Arc::from_raw(ptr.cast_const()));
            });
        }
    }
}

impl<D> Drop for ViewCell<D> {
    fn drop(&mut self) {
        let ptr: *mut FrozenView<D> = *self.current.get_mut();

        // SAFETY: ptr came from Arc::into_raw; with `&mut self` no reader
        // can load it any more, and clones they took hold their own count.
        unsafe {
            drop(Arc::from_raw(ptr.cast_const()));
        }
    }
}

impl<D> StdFmt::Debug for ViewCell<D> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("ViewCell").finish_non_exhaustive()
    }
}

// ============================================================================
//  ReEnumerateGate
// ============================================================================

/// Reentrant switch that keeps enum ids stable while it is held.
#[derive(Debug, Default)]
pub(crate) struct ReEnumerateGate {
    disabled: AtomicUsize,
}

impl ReEnumerateGate {
    pub(crate) fn disable(self: &Arc<Self>) -> ReEnumerateGuard {
        self.disabled.fetch_add(1, SWAP_ORD);
        ReEnumerateGuard {
            gate: Arc::clone(self),
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.disabled.load(READ_ORD) == 0
    }
}

/// While any guard is alive, [`re_enumerate`](crate::EnumStore::re_enumerate)
/// panics.
///
/// Held for the duration of a flush that relies on enum ids matching sorted
/// positions. Guards nest and may be taken from any thread.
#[must_use = "reenumeration is re-enabled as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ReEnumerateGuard {
    gate: Arc<ReEnumerateGate>,
}

impl Drop for ReEnumerateGuard {
    fn drop(&mut self) {
        self.gate.disabled.fetch_sub(1, SWAP_ORD);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::NoData;

    #[test]
    fn test_load_sees_latest_publish() {
        let cell: ViewCell<NoData> = ViewCell::new(FrozenView::empty());
        let first = cell.load();
        assert_eq!(first.sequence(), 0);

        cell.publish(FrozenView::new(FrozenRoot::default(), BufferSet::new(), Vec::new(), 1));
        assert_eq!(cell.load().sequence(), 1);

        // The earlier view is still owned by its reader.
        assert_eq!(first.sequence(), 0);
        assert!(first.root().is_empty());
    }

    #[test]
    fn test_old_views_are_released() {
        let cell: ViewCell<NoData> = ViewCell::new(FrozenView::empty());
        let held = cell.load();
        for sequence in 1..100 {
            cell.publish(FrozenView::new(FrozenRoot::default(), BufferSet::new(), Vec::new(), sequence));
        }
        assert_eq!(held.sequence(), 0);
        drop(held);
        drop(cell);
    }

    #[test]
    fn test_guards_nest() {
        let gate = Arc::new(ReEnumerateGate::default());
        assert!(gate.is_enabled());

        let outer = gate.disable();
        let inner = gate.disable();
        drop(outer);
        assert!(!gate.is_enabled());
        drop(inner);
        assert!(gate.is_enabled());
    }

    #[test]
    fn test_current_ref_uses_remaps() {
        let old = EntryRef::new(0, 1);
        let new = EntryRef::new(1, 1);
        let mut table = RemapTable::default();
        table.insert(old, new);

        let view: FrozenView<NoData> =
            FrozenView::new(FrozenRoot::default(), BufferSet::new(), vec![Arc::new(table)], 3);
        // Nothing is allocated in this view's buffers.
        assert_eq!(view.current_ref(old), None);
    }
}

/// Model of the publication protocol: a word written before the view
/// pointer is published is visible to any reader that observes the pointer.
///
/// Run with: `RUSTFLAGS="--cfg loom" cargo test --lib freeze::loom_tests`
#[cfg(loom)]
mod loom_tests {
    use loom::sync::Arc;
    use loom::sync::atomic::{AtomicPtr, AtomicU32, AtomicUsize, Ordering};
    use loom::thread;

    struct Snapshot {
        word: AtomicU32,
    }

    #[test]
    fn test_loom_published_words_are_visible() {
        loom::model(|| {
            let slot: Arc<AtomicPtr<Snapshot>> = Arc::new(AtomicPtr::new(std::ptr::null_mut()));

            let writer = {
                let slot = Arc::clone(&slot);
                thread::spawn(move || {
                    let view = Box::new(Snapshot {
                        word: AtomicU32::new(0),
                    });
                    view.word.store(42, Ordering::Relaxed);
                    slot.store(Box::into_raw(view), Ordering::Release);
                })
            };

            let reader = {
                let slot = Arc::clone(&slot);
                thread::spawn(move || {
                    let ptr = slot.load(Ordering::Acquire);
                    if !ptr.is_null() {
                        // SAFETY: published views are only freed after both threads join.
                        let word = unsafe { (*ptr).word.load(Ordering::Relaxed) };
                        assert_eq!(word, 42);
                    }
                })
            };

            writer.join().unwrap();
            reader.join().unwrap();

            let ptr = slot.load(Ordering::Acquire);
            // SAFETY: ptr came from Box::into_raw and nothing else references it.
            drop(unsafe { Box::from_raw(ptr) });
        });
    }

    #[test]
    fn test_loom_reentrant_gate() {
        loom::model(|| {
            let disabled = Arc::new(AtomicUsize::new(0));

            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let disabled = Arc::clone(&disabled);
                    thread::spawn(move || {
                        disabled.fetch_add(1, Ordering::AcqRel);
                        assert!(disabled.load(Ordering::Acquire) >= 1);
                        disabled.fetch_sub(1, Ordering::AcqRel);
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }
            assert_eq!(disabled.load(Ordering::Acquire), 0);
        });
    }
}
