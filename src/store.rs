//! The enum store: single writer, lock-free readers.
//!
//! [`EnumStore`] interns values of one [`EntryValue`] type into unique
//! handles, keeps them in a sorted [`Dictionary`], and tracks a reference
//! count per value. [`EnumStoreReader`] hands out [`Snapshot`]s of the last
//! frozen state to any number of threads.
//!
//! Memory is never reused behind a reader's back. Removal from the
//! dictionary is logical; the space goes on a hold list and becomes
//! reusable only when the external coordinator trims past the generation
//! it was retired in:
//!
//! ```text
//! writer:  free_unused_enums ──> transfer_hold_lists(g) ──> trim_hold_lists(first_used > g)
//!                                                                   │
//!                                                      space reusable by insert
//! ```

use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::alloc::BufferPool;
use crate::compact::{self, RemapTable};
use crate::compare;
use crate::config::StoreConfig;
use crate::dict::{Dictionary, FrozenRoot, NoData, NodeData, PostingRef};
use crate::entry::{EntryHeader, HEADER_WORDS};
use crate::entry_ref::{ALIGNMENT, EntryRef, OFFSET_LIMIT};
use crate::freeze::{FrozenView, ReEnumerateGate, ReEnumerateGuard, ViewCell};
use crate::hold::{Generation, GenerationHoldList};
use crate::memory::{AddressSpace, MemoryUsage};
use crate::error::Result;
use crate::tracing_helpers::{debug_log, trace_log, warn_log};
use crate::value::{EntryValue, entry_words, load_value};

mod persist;
mod reader;

pub use persist::LoadedValues;
pub use reader::{EnumStoreReader, Snapshot};

/// Writer-side enum store.
///
/// # Example
///
/// ```rust
/// use enumstore::{EnumStore, StoreConfig};
///
/// let mut store: EnumStore<String> = EnumStore::new(StoreConfig::default());
/// let apple = store.insert(&"apple".to_string());
/// let banana = store.insert(&"banana".to_string());
/// assert_eq!(store.insert(&"apple".to_string()), apple);
///
/// assert_eq!(store.ref_count(apple), Some(2));
/// assert_eq!(store.ref_count(banana), Some(1));
/// assert_eq!(store.num_uniques(), 2);
///
/// store.freeze_tree();
/// let snapshot = store.reader().snapshot();
/// assert_eq!(snapshot.find_frozen_index(&"banana".to_string()), Some(banana));
/// ```
pub struct EnumStore<T: EntryValue, D: NodeData = NoData> {
    pool: BufferPool,
    dict: Dictionary<D>,
    config: StoreConfig,

    /// Enum id handed to the next new value. Wider than an enum id so
    /// running past `u32::MAX` is detected instead of wrapping.
    next_enum: u64,

    /// Freezes performed so far.
    freezes: u64,

    remap_holds: GenerationHoldList<Arc<RemapTable>>,
    views: Arc<ViewCell<D>>,
    gate: Arc<ReEnumerateGate>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: EntryValue, D: NodeData> EnumStore<T, D> {
    /// Create an empty store.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            pool: BufferPool::new(config),
            dict: Dictionary::new(),
            config,
            next_enum: 0,
            freezes: 0,
            remap_holds: GenerationHoldList::new(),
            views: Arc::new(ViewCell::new(FrozenView::empty())),
            gate: Arc::new(ReEnumerateGate::default()),
            _marker: PhantomData,
        }
    }

    /// Handle for reader threads.
    #[must_use]
    pub fn reader(&self) -> EnumStoreReader<T, D> {
        EnumStoreReader::new(Arc::clone(&self.views), Arc::clone(&self.gate))
    }

    /// The store's configuration.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ========================================================================
    //  Interning
    // ========================================================================

    /// Live handle holding `value`, if any.
    #[must_use]
    pub fn find_index(&self, value: &T) -> Option<EntryRef> {
        self.dict.find(&T::comparator(self.pool.buffers(), Some(value)))
    }

    /// Handle of `value`, adding it with a reference count of 0 if absent.
    ///
    /// # Errors
    ///
    /// The value's [`validate`](EntryValue::validate) error when it is absent
    /// and cannot be stored. The store is unchanged.
    pub fn try_find_or_add(&mut self, value: &T) -> Result<EntryRef> {
        if let Some(entry) = self.find_index(value) {
            return Ok(entry);
        }
        value.validate()?;
        Ok(self.add(value))
    }

    /// As [`try_find_or_add`](Self::try_find_or_add).
    ///
    /// # Panics
    ///
    /// If `value` cannot be stored, e.g. a string containing a NUL byte.
    pub fn find_or_add(&mut self, value: &T) -> EntryRef {
        match self.try_find_or_add(value) {
            Ok(entry) => entry,
            Err(err) => panic!("cannot intern value: {err}"),
        }
    }

    fn add(&mut self, value: &T) -> EntryRef {
        let words: usize = HEADER_WORDS + value.payload_words();
        self.ensure_space(words);
        let entry: EntryRef = match self.pool.try_alloc(words) {
            Some(entry) => entry,
            None => BufferPool::fail_new_size(words as u64, OFFSET_LIMIT),
        };

        let buffers = self.pool.buffers();
        if let Some(payload) = buffers.payload(entry) {
            value.store(&payload[..value.payload_words()]);
        }
        if buffers.header(entry).is_some() {
            let id: u32 = self.take_enum();
            if let Some(header) = self.pool.buffers().header(entry) {
                header.set_enum(id);
                header.set_ref_count(0);
            }
        }

        let inserted: bool =
            self.dict
                .insert(entry, D::default(), &T::comparator(self.pool.buffers(), None));
        debug_assert!(inserted, "value was absent a moment ago");
        trace_log!(%entry, words, "added value");
        entry
    }

    /// Next enum id. Saturates at `u32::MAX` until
    /// [`re_enumerate`](Self::re_enumerate) renumbers.
    fn take_enum(&mut self) -> u32 {
        let next: u64 = self.next_enum;
        self.next_enum += 1;
        u32::try_from(next).unwrap_or_else(|_| {
            warn_log!(next, "enum ids exhausted, reenumerate to renumber");
            u32::MAX
        })
    }

    /// Intern `value` and take one reference to it.
    ///
    /// # Errors
    ///
    /// As [`try_find_or_add`](Self::try_find_or_add).
    pub fn try_insert(&mut self, value: &T) -> Result<EntryRef> {
        let entry: EntryRef = self.try_find_or_add(value)?;
        self.inc_ref_count(entry);
        Ok(entry)
    }

    /// As [`try_insert`](Self::try_insert).
    ///
    /// # Panics
    ///
    /// If `value` cannot be stored, e.g. a string containing a NUL byte.
    pub fn insert(&mut self, value: &T) -> EntryRef {
        let entry: EntryRef = self.find_or_add(value);
        self.inc_ref_count(entry);
        entry
    }

    /// Value stored at `entry`.
    #[must_use]
    pub fn get_value(&self, entry: EntryRef) -> Option<T> {
        load_value(self.pool.buffers(), entry)
    }

    // ========================================================================
    //  Headers
    // ========================================================================

    fn header(&self, entry: EntryRef) -> Option<EntryHeader<'_>> {
        self.pool.buffers().header(entry)
    }

    /// Take one reference to `entry`. Returns the new count.
    pub fn inc_ref_count(&mut self, entry: EntryRef) -> Option<u32> {
        self.header(entry).map(EntryHeader::inc_ref_count)
    }

    /// Drop one reference to `entry`. Returns the new count, never below 0.
    ///
    /// An entry reaching 0 stays in the dictionary until a sweep.
    pub fn dec_ref_count(&mut self, entry: EntryRef) -> Option<u32> {
        self.header(entry).map(EntryHeader::dec_ref_count)
    }

    /// Reference count of `entry`.
    #[must_use]
    pub fn ref_count(&self, entry: EntryRef) -> Option<u32> {
        self.header(entry).map(EntryHeader::ref_count)
    }

    /// Enum id of `entry`.
    #[must_use]
    pub fn enum_value(&self, entry: EntryRef) -> Option<u32> {
        self.header(entry).map(EntryHeader::enum_value)
    }

    /// Enum ids of `entries`; `None` if any handle does not resolve.
    #[must_use]
    pub fn enum_values(&self, entries: &[EntryRef]) -> Option<Vec<u32>> {
        entries.iter().map(|&entry| self.enum_value(entry)).collect()
    }

    /// Set the reference count of `entry` directly. Load path only.
    pub fn fixup_ref_count(&mut self, entry: EntryRef, count: u32) {
        if let Some(header) = self.header(entry) {
            header.set_ref_count(count);
        }
    }

    /// Set every reference count from `hist`, indexed by sorted position.
    /// Load path only.
    pub fn fixup_ref_counts(&mut self, hist: &[u32]) {
        debug_assert_eq!(hist.len(), self.dict.len(), "histogram does not cover the dictionary");

        let buffers = self.pool.buffers();
        for ((entry, _), &count) in self.dict.iter().zip(hist) {
            if let Some(header) = buffers.header(entry) {
                header.set_ref_count(count);
            }
        }
    }

    // ========================================================================
    //  Sweeps
    // ========================================================================

    /// Remove every unused entry from the live dictionary.
    ///
    /// Returns the removed handles with their node data so the caller can
    /// release posting lists. Space goes on the hold list.
    pub fn free_unused_enums(&mut self) -> Vec<(EntryRef, D)> {
        let buffers = self.pool.buffers();
        let unused: Vec<EntryRef> = self
            .dict
            .iter()
            .filter(|&(entry, _)| buffers.header(entry).is_some_and(EntryHeader::is_unused))
            .map(|(entry, _)| entry)
            .collect();
        self.remove_entries(unused)
    }

    /// Remove the unused entries among `candidates`.
    ///
    /// Duplicates and handles no longer in the dictionary are ignored.
    pub fn free_unused_enums_in(
        &mut self,
        candidates: impl IntoIterator<Item = EntryRef>,
    ) -> Vec<(EntryRef, D)> {
        let candidates: BTreeSet<EntryRef> = candidates.into_iter().collect();
        let unused: Vec<EntryRef> = {
            let buffers = self.pool.buffers();
            let cmp = T::comparator(buffers, None);
            candidates
                .into_iter()
                .filter(|&entry| {
                    buffers.header(entry).is_some_and(EntryHeader::is_unused)
                        && self.dict.contains(entry, &cmp)
                })
                .collect()
        };
        self.remove_entries(unused)
    }

    fn remove_entries(&mut self, entries: Vec<EntryRef>) -> Vec<(EntryRef, D)> {
        let mut removed: Vec<(EntryRef, D, usize)> = Vec::with_capacity(entries.len());
        {
            let buffers = self.pool.buffers();
            let cmp = T::comparator(buffers, None);
            for entry in entries {
                let words: usize = entry_words::<T>(buffers, entry).unwrap_or(HEADER_WORDS);
                if let Some(data) = self.dict.remove(entry, &cmp) {
                    removed.push((entry, data, words));
                }
            }
        }

        debug_log!(count = removed.len(), "swept unused entries");
        removed
            .into_iter()
            .map(|(entry, data, words)| {
                self.pool.hold_entry(entry, words);
                (entry, data)
            })
            .collect()
    }

    // ========================================================================
    //  Generations
    // ========================================================================

    /// Tag everything retired since the last call with `generation`.
    pub fn transfer_hold_lists(&mut self, generation: Generation) {
        trace_log!(generation, "transferring hold lists");
        self.pool.transfer_hold_lists(generation);
        self.remap_holds.transfer(generation);
    }

    /// Release everything retired before `first_used`, the oldest
    /// generation a reader may still observe.
    pub fn trim_hold_lists(&mut self, first_used: Generation) {
        trace_log!(first_used, "trimming hold lists");
        self.pool.trim_hold_lists(first_used);
        drop(self.remap_holds.trim(first_used));
    }

    // ========================================================================
    //  Freezing and enumeration
    // ========================================================================

    /// Freeze the live dictionary and publish it to readers.
    pub fn freeze_tree(&mut self) {
        self.dict.freeze();
        self.freezes += 1;

        let remaps: Vec<Arc<RemapTable>> = self.remap_holds.iter().cloned().collect();
        self.views.publish(FrozenView::new(
            self.dict.frozen_root(),
            self.pool.buffers().clone(),
            remaps,
            self.freezes,
        ));
    }

    /// The root produced by the last [`freeze_tree`](Self::freeze_tree).
    #[must_use]
    pub fn frozen_root(&self) -> FrozenRoot<D> {
        self.dict.frozen_root()
    }

    /// Renumber enum ids to match sorted positions.
    ///
    /// Reference counts are untouched.
    ///
    /// # Panics
    ///
    /// If a [`ReEnumerateGuard`] is alive.
    pub fn re_enumerate(&mut self) {
        assert!(
            self.gate.is_enabled(),
            "re_enumerate called while reenumeration is disabled"
        );

        let buffers = self.pool.buffers();
        let mut next: u32 = 0;
        for (entry, _) in self.dict.iter() {
            if let Some(header) = buffers.header(entry) {
                header.set_enum(next);
            }
            next += 1;
        }
        self.next_enum = u64::from(next);
        debug_log!(uniques = next, "reenumerated");
    }

    /// Keep enum ids stable until the guard drops.
    pub fn disable_re_enumerate(&self) -> ReEnumerateGuard {
        self.gate.disable()
    }

    // ========================================================================
    //  Compaction
    // ========================================================================

    /// Move every live entry into a fresh buffer.
    ///
    /// Returns `false` when no buffer slot is free; a later trim then
    /// raises [`pending_compact`](Self::pending_compact).
    pub fn perform_compaction(&mut self, bytes_needed: u64) -> bool {
        let Some(remap) = compact::compact::<T, D>(&mut self.pool, &mut self.dict, bytes_needed)
        else {
            return false;
        };
        self.remap_holds.insert(Arc::new(remap));
        true
    }

    /// `true` when dead space or a deferred compaction calls for
    /// [`perform_compaction`](Self::perform_compaction).
    #[must_use]
    pub fn should_compact(&self) -> bool {
        compact::should_compact(&self.pool, &self.config)
    }

    /// Grow the active buffer in place, keeping every handle valid.
    pub fn fallback_resize(&mut self, bytes_needed: u64) {
        self.pool.fallback_resize(bytes_needed);
    }

    /// Make room for an entry of `words` words.
    ///
    /// Reuses or bumps when possible and otherwise grows the active buffer
    /// in place, so handles already handed out stay valid. Compaction is
    /// left to the caller (see [`should_compact`](Self::should_compact)).
    pub fn ensure_space(&mut self, words: usize) {
        if !self.pool.can_alloc(words) {
            self.pool.fallback_resize((words * ALIGNMENT) as u64);
        }
    }

    /// A compaction was deferred and a buffer slot has since been freed.
    #[must_use]
    pub const fn pending_compact(&self) -> bool {
        self.pool.pending_compact()
    }

    /// Acknowledge [`pending_compact`](Self::pending_compact).
    pub fn clear_pending_compact(&mut self) {
        self.pool.clear_pending_compact();
    }

    /// Current handle of `old` after any compactions not yet trimmed.
    #[must_use]
    pub fn current_ref(&self, old: EntryRef) -> Option<EntryRef> {
        let current: EntryRef = compact::chase(old, self.remap_holds.iter().map(Arc::as_ref));
        self.pool.buffers().is_valid(current).then_some(current)
    }

    /// Forget every remap table. Views already published keep theirs.
    pub fn clear_index_map(&mut self) {
        self.remap_holds.clear();
    }

    // ========================================================================
    //  Lifecycle and usage
    // ========================================================================

    /// Drop every value. Published views keep what they captured.
    pub fn reset(&mut self) {
        debug_log!("resetting enum store");
        self.pool.reset(self.config.initial_buffer_words);
        self.dict.clear();
        self.remap_holds.clear();
        self.next_enum = 0;
    }

    /// Number of values in the live dictionary.
    #[must_use]
    pub fn num_uniques(&self) -> usize {
        self.dict.len()
    }

    /// Last enum id handed out, or 0 when none was.
    #[must_use]
    pub fn last_enum(&self) -> u32 {
        u32::try_from(self.next_enum.saturating_sub(1)).unwrap_or(u32::MAX)
    }

    /// `true` when the live dictionary is non-empty.
    #[must_use]
    pub fn has_data(&self) -> bool {
        !self.dict.is_empty()
    }

    /// One past the largest offset in use in the active buffer.
    #[must_use]
    pub fn max_enum_offset(&self) -> usize {
        self.pool.max_enum_offset()
    }

    /// Words left for bump allocation.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pool.remaining()
    }

    /// Buffer memory, remap tables included.
    #[must_use]
    pub fn memory_usage(&self) -> MemoryUsage {
        let mut usage: MemoryUsage = self.pool.memory_usage();
        for table in self.remap_holds.iter() {
            let bytes: usize = table.memory_bytes();
            usage += MemoryUsage::new(bytes, bytes, 0, bytes);
        }
        usage
    }

    /// Dictionary node memory.
    #[must_use]
    pub fn tree_memory_usage(&self) -> MemoryUsage {
        self.dict.memory_usage()
    }

    /// Handle offset range consumed.
    #[must_use]
    pub fn address_space_usage(&self) -> AddressSpace {
        self.pool.address_space_usage()
    }

    /// `true` when `lhs` and `rhs` differ under the folded order.
    #[must_use]
    pub fn folded_change(&self, lhs: EntryRef, rhs: EntryRef) -> bool {
        compare::folded_change::<T>(self.pool.buffers(), lhs, rhs)
    }

    /// In-order handles of the live dictionary.
    pub fn iter(&self) -> impl Iterator<Item = EntryRef> + '_ {
        self.dict.iter().map(|(entry, _)| entry)
    }
}

impl<T: EntryValue> EnumStore<T, PostingRef> {
    /// Posting list attached to `entry`.
    #[must_use]
    pub fn posting(&self, entry: EntryRef) -> Option<PostingRef> {
        self.dict.data(entry, &T::comparator(self.pool.buffers(), None))
    }

    /// Attach `posting` to `entry`. Returns `false` if `entry` is not live.
    pub fn set_posting(&mut self, entry: EntryRef, posting: PostingRef) -> bool {
        let cmp = T::comparator(self.pool.buffers(), None);
        self.dict.set_data(entry, posting, &cmp)
    }
}

impl<T: EntryValue, D: NodeData> Default for EnumStore<T, D> {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl<T: EntryValue, D: NodeData> std::fmt::Debug for EnumStore<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnumStore")
            .field("uniques", &self.dict.len())
            .field("next_enum", &self.next_enum)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> StoreConfig {
        StoreConfig::new()
            .with_initial_buffer_words(32)
            .with_min_buffer_words(16)
    }

    #[test]
    fn test_insert_dedupes_and_counts() {
        let mut store: EnumStore<u32> = EnumStore::new(small());
        let a = store.insert(&5);
        let b = store.insert(&3);
        assert_eq!(store.insert(&5), a);

        assert_eq!(store.ref_count(a), Some(2));
        assert_eq!(store.ref_count(b), Some(1));
        assert_eq!(store.enum_values(&[a, b]), Some(vec![0, 1]));
        assert_eq!(store.enum_values(&[a, EntryRef::INVALID]), None);
        assert_eq!(store.last_enum(), 1);
        assert_eq!(store.iter().collect::<Vec<_>>(), vec![b, a]);
    }

    #[test]
    fn test_ref_count_floor_and_sweep() {
        let mut store: EnumStore<u32> = EnumStore::new(small());
        let a = store.insert(&1);
        let b = store.insert(&2);

        assert_eq!(store.dec_ref_count(a), Some(0));
        assert_eq!(store.dec_ref_count(a), Some(0));
        assert_eq!(store.num_uniques(), 2);
        assert_eq!(store.find_index(&1), Some(a));

        let removed = store.free_unused_enums_in([a, a, b]);
        assert_eq!(removed, vec![(a, NoData)]);
        assert_eq!(store.find_index(&1), None);
        assert_eq!(store.get_value(a), Some(1));
        assert!(store.free_unused_enums().is_empty());
    }

    #[test]
    fn test_free_unused_enums_in_ignores_live_and_stale_handles() {
        let mut store: EnumStore<String> = EnumStore::new(small());
        let kept = store.insert(&"kept".to_string());
        let gone = store.find_or_add(&"gone".to_string());
        let stale = store.find_or_add(&"stale".to_string());
        assert_eq!(store.free_unused_enums_in([stale]), vec![(stale, NoData)]);

        let removed = store.free_unused_enums_in([gone, kept, stale, EntryRef::INVALID]);
        assert_eq!(removed, vec![(gone, NoData)]);
        assert_eq!(store.iter().collect::<Vec<_>>(), vec![kept]);
    }

    #[test]
    fn test_try_insert_rejects_unstorable_string() {
        let mut store: EnumStore<String> = EnumStore::new(small());
        let ok = store.insert(&"ok".to_string());

        assert_eq!(
            store.try_insert(&"a\0b".to_string()),
            Err(crate::StoreError::InvalidValue {
                reason: "string value contains a NUL byte"
            })
        );
        assert_eq!(store.num_uniques(), 1);
        assert_eq!(store.last_enum(), 0);
        assert_eq!(store.try_insert(&"ok".to_string()), Ok(ok));
        assert_eq!(store.ref_count(ok), Some(2));

        store.freeze_tree();
        let mut out: Vec<u8> = Vec::new();
        store.write_all_values(&mut out, &store.frozen_root()).unwrap();
        assert_eq!(out, b"ok\0");
    }

    #[test]
    #[should_panic(expected = "contains a NUL byte")]
    fn test_insert_panics_on_unstorable_string() {
        let mut store: EnumStore<String> = EnumStore::new(small());
        store.insert(&"\0".to_string());
    }

    #[test]
    fn test_enum_ids_saturate_until_reenumerated() {
        let mut store: EnumStore<u32> = EnumStore::new(small());
        store.next_enum = u64::from(u32::MAX) - 1;
        let refs: Vec<EntryRef> = [30, 20, 10].iter().map(|v| store.insert(v)).collect();

        assert_eq!(
            store.enum_values(&refs),
            Some(vec![u32::MAX - 1, u32::MAX, u32::MAX])
        );
        assert_eq!(store.last_enum(), u32::MAX);

        store.re_enumerate();
        assert_eq!(store.enum_values(&refs), Some(vec![2, 1, 0]));
        assert_eq!(store.last_enum(), 2);
        let next = store.insert(&40);
        assert_eq!(store.enum_value(next), Some(3));
    }

    #[test]
    fn test_re_enumerate_assigns_sorted_positions() {
        let mut store: EnumStore<i32> = EnumStore::new(small());
        let refs: Vec<EntryRef> = [9, -1, 4].iter().map(|v| store.insert(v)).collect();
        store.re_enumerate();

        assert_eq!(store.enum_values(&refs), Some(vec![2, 0, 1]));
        assert_eq!(store.ref_count(refs[0]), Some(1));
        assert_eq!(store.last_enum(), 2);
    }

    #[test]
    #[should_panic(expected = "reenumeration is disabled")]
    fn test_re_enumerate_panics_under_guard() {
        let mut store: EnumStore<i32> = EnumStore::new(small());
        store.insert(&1);
        let _guard = store.reader().disable_re_enumerate();
        store.re_enumerate();
    }

    #[test]
    fn test_grows_past_initial_buffer() {
        let mut store: EnumStore<u64> = EnumStore::new(small());
        let refs: Vec<EntryRef> = (0..200_u64).map(|v| store.insert(&v)).collect();

        for (value, &entry) in refs.iter().enumerate() {
            assert_eq!(store.current_ref(entry), Some(entry));
            assert_eq!(store.get_value(entry), Some(value as u64));
        }
        assert_eq!(store.num_uniques(), 200);
    }

    #[test]
    fn test_posting_accessors() {
        let mut store: EnumStore<String, PostingRef> = EnumStore::new(small());
        let entry = store.insert(&"x".to_string());
        assert_eq!(store.posting(entry), Some(PostingRef::INVALID));
        assert!(store.set_posting(entry, PostingRef::new(3)));
        assert_eq!(store.posting(entry), Some(PostingRef::new(3)));

        store.dec_ref_count(entry);
        assert_eq!(store.free_unused_enums(), vec![(entry, PostingRef::new(3))]);
        assert!(!store.set_posting(entry, PostingRef::new(4)));
    }

    #[test]
    fn test_fixup_ref_counts_by_position() {
        let mut store: EnumStore<u32> = EnumStore::new(small());
        let high = store.find_or_add(&20);
        let low = store.find_or_add(&10);
        assert_eq!(store.ref_count(low), Some(0));

        store.fixup_ref_counts(&[4, 7]);
        assert_eq!(store.ref_count(low), Some(4));
        assert_eq!(store.ref_count(high), Some(7));

        store.fixup_ref_count(high, 1);
        assert_eq!(store.ref_count(high), Some(1));
    }

    #[test]
    fn test_reset() {
        let mut store: EnumStore<u32> = EnumStore::new(small());
        store.insert(&1);
        store.reset();
        assert!(!store.has_data());
        assert_eq!(store.find_index(&1), None);
        assert_eq!(store.max_enum_offset(), crate::alloc::RESERVED_WORDS);
    }
}
