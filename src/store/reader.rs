//! Reader-side handles.

use std::fmt as StdFmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::dict::{FrozenRoot, NoData, NodeData, PostingRef};
use crate::entry_ref::EntryRef;
use crate::error::Result;
use crate::freeze::{FrozenView, ReEnumerateGate, ReEnumerateGuard, ViewCell};
use crate::io::BufferWriter;
use crate::value::{EntryValue, load_value};

use super::persist::write_values;

/// Cloneable, thread-safe handle for readers of an [`EnumStore`](super::EnumStore).
///
/// Never blocks and never blocks the writer.
pub struct EnumStoreReader<T, D = NoData> {
    views: Arc<ViewCell<D>>,
    gate: Arc<ReEnumerateGate>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: EntryValue, D: NodeData> EnumStoreReader<T, D> {
    pub(crate) fn new(views: Arc<ViewCell<D>>, gate: Arc<ReEnumerateGate>) -> Self {
        Self {
            views,
            gate,
            _marker: PhantomData,
        }
    }

    /// The state published by the writer's last freeze.
    ///
    /// The snapshot stays valid and unchanged for as long as it is held.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<T, D> {
        Snapshot {
            view: self.views.load(),
            _marker: PhantomData,
        }
    }

    /// Keep enum ids stable until the guard drops, e.g. while flushing.
    pub fn disable_re_enumerate(&self) -> ReEnumerateGuard {
        self.gate.disable()
    }
}

impl<T, D> Clone for EnumStoreReader<T, D> {
    fn clone(&self) -> Self {
        Self {
            views: Arc::clone(&self.views),
            gate: Arc::clone(&self.gate),
            _marker: PhantomData,
        }
    }
}

impl<T, D> StdFmt::Debug for EnumStoreReader<T, D> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("EnumStoreReader").finish_non_exhaustive()
    }
}

/// A frozen, immutable view of the store.
///
/// Lookups resolve handles against the buffers captured at freeze time,
/// so nothing the writer does afterwards changes their results.
pub struct Snapshot<T, D = NoData> {
    view: Arc<FrozenView<D>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: EntryValue, D: NodeData> Snapshot<T, D> {
    /// The underlying frozen view.
    #[must_use]
    pub fn view(&self) -> &FrozenView<D> {
        &self.view
    }

    /// The frozen dictionary.
    #[must_use]
    pub fn frozen_root(&self) -> &FrozenRoot<D> {
        self.view.root()
    }

    /// Number of freezes before this snapshot was published.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.view.sequence()
    }

    /// Number of values in the snapshot.
    #[must_use]
    pub fn num_uniques(&self) -> usize {
        self.view.root().len()
    }

    /// Handle holding exactly `value`.
    #[must_use]
    pub fn find_frozen_index(&self, value: &T) -> Option<EntryRef> {
        let cmp = T::comparator(self.view.buffers(), Some(value));
        self.view.root().find(&cmp).map(|(entry, _)| entry)
    }

    /// Number of values matching `value` as a term (folded for strings).
    #[must_use]
    pub fn lookup_frozen_term(&self, value: &T) -> u32 {
        let cmp = T::folded_comparator(self.view.buffers(), Some(value));
        self.view.root().lookup_term(&cmp)
    }

    /// Number of values in `[low, high]` under the folded order.
    #[must_use]
    pub fn lookup_frozen_range(&self, low: &T, high: &T) -> u32 {
        let buffers = self.view.buffers();
        let low = T::folded_comparator(buffers, Some(low));
        let high = T::folded_comparator(buffers, Some(high));
        self.view.root().lookup_range(&low, &high)
    }

    /// Value stored at `entry`.
    #[must_use]
    pub fn get_value(&self, entry: EntryRef) -> Option<T> {
        load_value(self.view.buffers(), entry)
    }

    /// Enum id stored at `entry`.
    #[must_use]
    pub fn enum_value(&self, entry: EntryRef) -> Option<u32> {
        self.view.buffers().header(entry).map(|header| header.enum_value())
    }

    /// Current handle for `old`, following compactions this snapshot knows about.
    #[must_use]
    pub fn current_ref(&self, old: EntryRef) -> Option<EntryRef> {
        self.view.current_ref(old)
    }

    /// In-order handles.
    pub fn iter(&self) -> impl Iterator<Item = EntryRef> + '_ {
        self.view.root().iter().map(|(entry, _)| entry)
    }

    /// Persist every value in sorted order.
    ///
    /// # Errors
    ///
    /// Propagates value and sink errors.
    pub fn write_all_values<W: BufferWriter + ?Sized>(&self, writer: &mut W) -> Result<()> {
        write_values::<T, W>(self.view.buffers(), self.iter(), writer)
    }
}

impl<T: EntryValue> Snapshot<T, PostingRef> {
    /// Handle and posting list of exactly `value`.
    #[must_use]
    pub fn lookup_posting(&self, value: &T) -> Option<(EntryRef, PostingRef)> {
        let cmp = T::comparator(self.view.buffers(), Some(value));
        self.view.root().find(&cmp)
    }
}

impl<T, D> Clone for Snapshot<T, D> {
    fn clone(&self) -> Self {
        Self {
            view: Arc::clone(&self.view),
            _marker: PhantomData,
        }
    }
}

impl<T, D> StdFmt::Debug for Snapshot<T, D> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("Snapshot").finish_non_exhaustive()
    }
}
