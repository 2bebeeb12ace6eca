//! Buffer pool: the arena that owns every stored entry.
//!
//! Entries live in fixed-capacity buffers of 4-byte words. Handles
//! ([`EntryRef`]) address a buffer slot and a word offset, so a buffer can
//! never grow in place: growing means allocating a new buffer, either in a
//! free slot (compaction) or as a larger copy under the same slot id
//! ([`BufferPool::fallback_resize`]).
//!
//! Readers share buffers through `Arc<BufferData>`. A frozen view captures
//! the [`BufferSet`] at freeze time, so a buffer stays mapped for as long as
//! any reader holds a view that refers to it. Entry *space*, on the other
//! hand, is only recycled through the hold lists: see
//! [`BufferPool::trim_hold_lists`].

use std::collections::HashMap;
use std::fmt as StdFmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize};

use crate::config::StoreConfig;
use crate::entry::{EntryHeader, HEADER_WORDS};
use crate::entry_ref::{ALIGNMENT, EntryRef, NUM_BUFFERS, OFFSET_LIMIT};
use crate::hold::{Generation, GenerationHoldList};
use crate::memory::{AddressSpace, MemoryUsage};
use crate::ordering::{PUBLISH_ORD, READ_ORD, RELAXED};
use crate::tracing_helpers::{debug_log, error_log, trace_log, warn_log};

/// Words reserved at the start of every buffer so that offset 0 is never handed out.
pub const RESERVED_WORDS: usize = 1;

// ============================================================================
//  BufferData
// ============================================================================

/// Fixed-capacity word storage shared between the writer and readers.
///
/// Words beyond `used` have never been handed out. `used` is published with
/// release ordering, but readers reach entries through a frozen view, which
/// is the publication that matters.
pub struct BufferData {
    words: Box<[AtomicU32]>,
    used: AtomicUsize,
}

impl BufferData {
    /// Allocate a zeroed buffer of `capacity` words, with the reserved prefix in use.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity: usize = capacity.max(RESERVED_WORDS);
        let words: Box<[AtomicU32]> = (0..capacity).map(|_| AtomicU32::new(0)).collect();

        Self {
            words,
            used: AtomicUsize::new(RESERVED_WORDS),
        }
    }

    /// Capacity in words.
    #[must_use]
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.words.len()
    }

    /// Words handed out so far, reserved prefix included.
    #[must_use]
    #[inline(always)]
    pub fn used(&self) -> usize {
        self.used.load(READ_ORD)
    }

    /// Words still available for bump allocation.
    #[must_use]
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.used()
    }

    /// `len` words starting at `offset`, if they are within the used region.
    #[must_use]
    #[inline(always)]
    pub(crate) fn slice(&self, offset: usize, len: usize) -> Option<&[AtomicU32]> {
        let end: usize = offset.checked_add(len)?;
        if end > self.used() {
            return None;
        }
        self.words.get(offset..end)
    }

    /// Every used word from `offset` on.
    #[must_use]
    #[inline(always)]
    pub(crate) fn tail(&self, offset: usize) -> Option<&[AtomicU32]> {
        self.words.get(offset..self.used())
    }

    /// Bump-allocate `len` words. Writer only.
    fn bump(&self, len: usize) -> Option<usize> {
        let offset: usize = self.used.load(RELAXED);
        let end: usize = offset.checked_add(len)?;
        if end > self.capacity() {
            return None;
        }
        self.used.store(end, PUBLISH_ORD);
        Some(offset)
    }

    /// Copy the used region of `src` into this (larger, fresh) buffer.
    fn copy_from(&self, src: &Self) {
        let used: usize = src.used();
        debug_assert!(used <= self.capacity());

        for (dst, word) in self.words.iter().zip(src.words.iter()).take(used) {
            dst.store(word.load(RELAXED), RELAXED);
        }
        self.used.store(used, PUBLISH_ORD);
    }
}

impl StdFmt::Debug for BufferData {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("BufferData")
            .field("capacity", &self.capacity())
            .field("used", &self.used())
            .finish()
    }
}

// ============================================================================
//  BufferSet
// ============================================================================

/// The buffer slots a set of handles resolves against.
///
/// Cloning is cheap (one `Arc` per slot). The writer owns the live set;
/// every frozen view owns the set that was live when it was frozen.
#[derive(Debug, Clone)]
pub struct BufferSet {
    buffers: [Option<Arc<BufferData>>; NUM_BUFFERS],
}

impl BufferSet {
    /// A set with every slot empty.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffers: std::array::from_fn(|_| None),
        }
    }

    /// The buffer in slot `buffer_id`, if allocated.
    #[must_use]
    #[inline(always)]
    pub fn buffer(&self, buffer_id: usize) -> Option<&BufferData> {
        self.buffers.get(buffer_id)?.as_deref()
    }

    /// `true` when `entry` is a valid handle within its buffer's used region.
    #[must_use]
    pub fn is_valid(&self, entry: EntryRef) -> bool {
        entry.is_valid()
            && self
                .buffer(entry.buffer_id())
                .is_some_and(|buffer| entry.offset() < buffer.used())
    }

    /// `len` words of the entry at `entry`.
    #[must_use]
    #[inline(always)]
    pub(crate) fn words(&self, entry: EntryRef, len: usize) -> Option<&[AtomicU32]> {
        if !entry.is_valid() {
            return None;
        }
        self.buffer(entry.buffer_id())?.slice(entry.offset(), len)
    }

    /// Header of the entry at `entry`.
    #[must_use]
    #[inline(always)]
    pub fn header(&self, entry: EntryRef) -> Option<EntryHeader<'_>> {
        self.words(entry, HEADER_WORDS).and_then(EntryHeader::new)
    }

    /// Payload words of the entry at `entry`, up to the end of the used region.
    ///
    /// The value type decides how many of these words belong to the entry.
    #[must_use]
    #[inline(always)]
    pub(crate) fn payload(&self, entry: EntryRef) -> Option<&[AtomicU32]> {
        if !entry.is_valid() {
            return None;
        }
        self.buffer(entry.buffer_id())?
            .tail(entry.offset() + HEADER_WORDS)
    }

    fn slot_mut(&mut self, buffer_id: usize) -> &mut Option<Arc<BufferData>> {
        &mut self.buffers[buffer_id]
    }

    fn arc(&self, buffer_id: usize) -> Option<&Arc<BufferData>> {
        self.buffers.get(buffer_id)?.as_ref()
    }
}

impl Default for BufferSet {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
//  BufferState
// ============================================================================

/// Lifecycle of a buffer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferStatus {
    /// No buffer allocated.
    #[default]
    Free,
    /// Receives new allocations. Exactly one slot is active.
    Active,
    /// Evacuated by compaction; waits on the buffer hold list.
    Hold,
}

/// Writer-side bookkeeping for one buffer slot.
#[derive(Debug, Default)]
struct BufferState {
    status: BufferStatus,

    /// Words released by the hold lists and not yet reused.
    dead_words: usize,

    /// Words retired but still on a hold list.
    hold_words: usize,

    /// Reusable offsets keyed by entry size in words.
    free_lists: HashMap<usize, Vec<usize>>,
}

/// Entry space waiting on the entry hold list.
#[derive(Debug, Clone, Copy)]
struct HeldEntry {
    entry: EntryRef,
    words: usize,
}

// ============================================================================
//  BufferPool
// ============================================================================

/// Writer-owned arena of entry buffers.
///
/// # Example
///
/// ```rust
/// use enumstore::alloc::BufferPool;
/// use enumstore::StoreConfig;
///
/// let mut pool = BufferPool::new(StoreConfig::new().with_initial_buffer_words(64));
/// let entry = pool.try_alloc(3).unwrap();
/// assert!(pool.buffers().is_valid(entry));
/// assert_eq!(pool.max_enum_offset(), 4);
/// ```
#[derive(Debug)]
pub struct BufferPool {
    set: BufferSet,
    states: [BufferState; NUM_BUFFERS],
    active: usize,
    config: StoreConfig,

    /// Lower bound on the request size, set by compaction.
    min_size_needed: usize,

    /// Dead words of the active buffer as seen by compaction.
    dead_hint: usize,

    /// Buffers evacuated by the running compaction.
    to_hold: Vec<usize>,

    /// Compaction was wanted but no buffer slot was free.
    want_compact: bool,

    /// A slot has been freed since compaction was wanted.
    pending_compact: bool,

    entry_holds: GenerationHoldList<HeldEntry>,
    buffer_holds: GenerationHoldList<usize>,
}

impl BufferPool {
    /// Create a pool with an active buffer of `config.initial_buffer_words`.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        let mut pool = Self {
            set: BufferSet::new(),
            states: std::array::from_fn(|_| BufferState::default()),
            active: 0,
            config,
            min_size_needed: 0,
            dead_hint: 0,
            to_hold: Vec::new(),
            want_compact: false,
            pending_compact: false,
            entry_holds: GenerationHoldList::new(),
            buffer_holds: GenerationHoldList::new(),
        };

        let capacity: usize = config.initial_buffer_words.max(RESERVED_WORDS);
        pool.activate(0, capacity);
        pool
    }

    /// Drop every buffer and start over with `initial_words` of capacity.
    ///
    /// Only valid when no reader can observe the old buffers through the
    /// pool itself. Frozen views keep their own references.
    pub fn reset(&mut self, initial_words: usize) {
        let config: StoreConfig = self.config.with_initial_buffer_words(initial_words);
        *self = Self::new(config);
    }

    /// The live buffer set.
    #[must_use]
    #[inline(always)]
    pub const fn buffers(&self) -> &BufferSet {
        &self.set
    }

    /// Slot receiving new allocations.
    #[must_use]
    #[inline(always)]
    pub const fn active_buffer_id(&self) -> usize {
        self.active
    }

    /// Status of slot `buffer_id`.
    #[must_use]
    pub fn status(&self, buffer_id: usize) -> BufferStatus {
        self.states
            .get(buffer_id)
            .map_or(BufferStatus::Free, |state| state.status)
    }

    fn active_buffer(&self) -> Option<&BufferData> {
        self.set.buffer(self.active)
    }

    fn activate(&mut self, buffer_id: usize, capacity: usize) {
        debug_log!(buffer_id, capacity, "activating buffer");

        *self.set.slot_mut(buffer_id) = Some(Arc::new(BufferData::with_capacity(capacity)));
        self.states[buffer_id] = BufferState {
            status: BufferStatus::Active,
            ..BufferState::default()
        };
        self.active = buffer_id;
    }

    // ========================================================================
    //  Allocation
    // ========================================================================

    /// Allocate `words` words in the active buffer.
    ///
    /// An exact-size slot released by the hold lists is reused first.
    /// Returns `None` when the active buffer has no room; the caller then
    /// compacts or resizes.
    pub fn try_alloc(&mut self, words: usize) -> Option<EntryRef> {
        let active: usize = self.active;
        let state: &mut BufferState = &mut self.states[active];

        if let Some(offset) = state.free_lists.get_mut(&words).and_then(Vec::pop) {
            state.dead_words = state.dead_words.saturating_sub(words);
            trace_log!(buffer_id = active, offset, words, "reusing dead space");
            return Some(EntryRef::new(active, offset));
        }

        let offset: usize = self.active_buffer()?.bump(words)?;
        Some(EntryRef::new(active, offset))
    }

    /// `true` if [`try_alloc`](Self::try_alloc) would succeed for `words`.
    #[must_use]
    pub fn can_alloc(&self, words: usize) -> bool {
        let reusable: bool = self.states[self.active]
            .free_lists
            .get(&words)
            .is_some_and(|offsets| !offsets.is_empty());
        reusable || self.remaining() >= words
    }

    /// Words left for bump allocation in the active buffer.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.active_buffer().map_or(0, BufferData::remaining)
    }

    /// Used words of the active buffer: one past the largest offset handed out.
    #[must_use]
    pub fn max_enum_offset(&self) -> usize {
        self.active_buffer().map_or(0, BufferData::used)
    }

    /// Dead words in the active buffer.
    #[must_use]
    pub fn dead_words(&self) -> usize {
        self.states[self.active].dead_words
    }

    /// Words of the active buffer still on hold.
    #[must_use]
    pub fn hold_words(&self) -> usize {
        self.states[self.active].hold_words
    }

    // ========================================================================
    //  Sizing
    // ========================================================================

    /// Record the request size and dead words compaction is about to act on.
    pub fn set_size_needed_and_dead(&mut self, size_needed: usize, dead_words: usize) {
        self.min_size_needed = size_needed;
        self.dead_hint = dead_words;
    }

    /// Size of a replacement for the active buffer able to take `needed` more words.
    ///
    /// When `resizing`, the replacement is a copy that keeps dead space, so
    /// every used word counts. Otherwise only live words move.
    ///
    /// # Panics
    ///
    /// Calls [`fail_new_size`](Self::fail_new_size) when even the minimum
    /// size cannot be addressed.
    #[must_use]
    pub fn calc_words_to_alloc(&self, needed: usize, resizing: bool) -> usize {
        let used: usize = self.max_enum_offset();
        let carried: usize = if resizing {
            used
        } else {
            used.saturating_sub(self.dead_hint).max(RESERVED_WORDS)
        };

        let needed: usize = needed.max(self.min_size_needed);
        let required: u64 = (carried as u64).saturating_add(needed as u64);
        if required > OFFSET_LIMIT {
            Self::fail_new_size(required, OFFSET_LIMIT);
        }

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_precision_loss,
            clippy::cast_sign_loss
        )]
        let growth: u64 = (required as f64 * self.config.grow_factor.max(0.0)) as u64;
        let grown: u64 = required
            .saturating_add(growth)
            .max(self.config.min_buffer_words as u64)
            .min(OFFSET_LIMIT);

        #[allow(clippy::cast_possible_truncation)]
        let words: usize = grown as usize;
        words
    }

    /// Abort: `min_new_size` words cannot be addressed by a handle.
    ///
    /// Continuing would corrupt handle arithmetic, so this never returns.
    ///
    /// # Panics
    ///
    /// Always.
    #[cold]
    pub fn fail_new_size(min_new_size: u64, max_size: u64) -> ! {
        error_log!(min_new_size, max_size, "enum store address space exhausted");
        panic!(
            "enum store address space exhausted: cannot allocate {min_new_size} words, \
             maximum addressable is {max_size} words"
        );
    }

    // ========================================================================
    //  Compaction support
    // ========================================================================

    /// Switch to a fresh active buffer large enough for the live words plus
    /// `bytes_needed`.
    ///
    /// Returns `false`, remembering that compaction is wanted, when no slot
    /// is free. Otherwise the old active buffer moves to [`BufferStatus::Hold`]
    /// and stays readable until [`post_compact`](Self::post_compact) hands it
    /// to the hold list and a trim releases it.
    pub fn pre_compact(&mut self, bytes_needed: u64) -> bool {
        let Some(free_id) = (0..NUM_BUFFERS).find(|&id| self.states[id].status == BufferStatus::Free)
        else {
            debug_log!("no free buffer slot, compaction deferred");
            self.want_compact = true;
            return false;
        };

        #[allow(clippy::cast_possible_truncation)]
        let words_needed: usize = EntryRef::words_for_bytes(bytes_needed) as usize;
        let old: usize = self.active;
        let dead: usize = self.states[old].dead_words + self.states[old].hold_words;
        self.set_size_needed_and_dead(words_needed, dead);
        let capacity: usize = self.calc_words_to_alloc(words_needed, false);

        debug_log!(
            from = old,
            to = free_id,
            capacity,
            dead,
            "compaction switching active buffer"
        );

        let state: &mut BufferState = &mut self.states[old];
        state.status = BufferStatus::Hold;
        state.free_lists.clear();
        self.to_hold.push(old);
        self.activate(free_id, capacity);
        true
    }

    /// Hand the buffers evacuated by [`pre_compact`](Self::pre_compact) to the hold list.
    pub fn post_compact(&mut self) {
        for buffer_id in self.to_hold.drain(..) {
            self.buffer_holds.insert(buffer_id);
        }
        self.set_size_needed_and_dead(0, 0);
    }

    /// Grow the active buffer in place of compaction.
    ///
    /// The used region is copied into a larger buffer under the same slot
    /// id, so every handle stays valid. The pool drops its reference to the
    /// superseded copy right away; frozen views that captured it keep it
    /// alive through their own [`BufferSet`].
    ///
    /// # Panics
    ///
    /// Calls [`fail_new_size`](Self::fail_new_size) when the grown buffer
    /// cannot be addressed.
    pub fn fallback_resize(&mut self, bytes_needed: u64) {
        #[allow(clippy::cast_possible_truncation)]
        let words_needed: usize = EntryRef::words_for_bytes(bytes_needed) as usize;
        let active: usize = self.active;
        let used: usize = self.max_enum_offset();

        let required: u64 = (used as u64).saturating_add(words_needed as u64);
        if required > OFFSET_LIMIT {
            Self::fail_new_size(required, OFFSET_LIMIT);
        }
        let capacity: usize = self.calc_words_to_alloc(words_needed, true);

        warn_log!(
            buffer_id = active,
            used,
            capacity,
            "fallback resize of active buffer"
        );

        let grown = Arc::new(BufferData::with_capacity(capacity));
        if let Some(old) = self.set.arc(active) {
            grown.copy_from(old);
        }
        *self.set.slot_mut(active) = Some(grown);
    }

    /// Compaction was wanted and a slot has since been freed.
    #[must_use]
    pub const fn pending_compact(&self) -> bool {
        self.pending_compact
    }

    /// Acknowledge [`pending_compact`](Self::pending_compact).
    pub fn clear_pending_compact(&mut self) {
        self.pending_compact = false;
    }

    // ========================================================================
    //  Hold lists
    // ========================================================================

    /// Retire the `words` words at `entry`. They stay intact until trimmed.
    pub fn hold_entry(&mut self, entry: EntryRef, words: usize) {
        self.states[entry.buffer_id()].hold_words += words;
        self.entry_holds.insert(HeldEntry { entry, words });
    }

    /// Tag everything retired since the last call with `generation`.
    pub fn transfer_hold_lists(&mut self, generation: Generation) {
        self.entry_holds.transfer(generation);
        self.buffer_holds.transfer(generation);
    }

    /// Release everything retired before `first_used`.
    ///
    /// Entry space in the active buffer becomes dead space that
    /// [`try_alloc`](Self::try_alloc) may reuse. Evacuated buffers are freed.
    pub fn trim_hold_lists(&mut self, first_used: Generation) {
        for held in self.entry_holds.trim(first_used) {
            let state: &mut BufferState = &mut self.states[held.entry.buffer_id()];
            state.hold_words = state.hold_words.saturating_sub(held.words);
            state.dead_words += held.words;
            if state.status == BufferStatus::Active {
                state
                    .free_lists
                    .entry(held.words)
                    .or_default()
                    .push(held.entry.offset());
            }
        }

        for buffer_id in self.buffer_holds.trim(first_used) {
            self.free_buffer(buffer_id);
        }
    }

    fn free_buffer(&mut self, buffer_id: usize) {
        debug_log!(buffer_id, "freeing evacuated buffer");

        *self.set.slot_mut(buffer_id) = None;
        self.states[buffer_id] = BufferState::default();
        self.pending_compact = self.want_compact;
        self.want_compact = false;
    }

    // ========================================================================
    //  Usage
    // ========================================================================

    /// Memory held by buffers, in bytes.
    #[must_use]
    pub fn memory_usage(&self) -> MemoryUsage {
        let mut usage = MemoryUsage::default();

        for (buffer_id, state) in self.states.iter().enumerate() {
            let Some(buffer) = self.set.buffer(buffer_id) else {
                continue;
            };
            let allocated: usize = buffer.capacity() * ALIGNMENT;
            let on_hold: usize = if state.status == BufferStatus::Hold {
                allocated
            } else {
                state.hold_words * ALIGNMENT
            };
            usage += MemoryUsage::new(
                allocated,
                buffer.used() * ALIGNMENT,
                state.dead_words * ALIGNMENT,
                on_hold,
            );
        }
        usage
    }

    /// Offset range consumed in the active buffer, in words.
    #[must_use]
    pub fn address_space_usage(&self) -> AddressSpace {
        AddressSpace {
            used: self.max_enum_offset() as u64,
            dead: self.dead_words() as u64,
            limit: OFFSET_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_pool(words: usize) -> BufferPool {
        BufferPool::new(
            StoreConfig::new()
                .with_initial_buffer_words(words)
                .with_min_buffer_words(8)
                .with_grow_factor(0.0),
        )
    }

    #[test]
    fn test_first_allocation_skips_reserved_word() {
        let mut pool = small_pool(16);
        let entry = pool.try_alloc(2).unwrap();

        assert_eq!(entry, EntryRef::new(0, RESERVED_WORDS));
        assert!(pool.buffers().is_valid(entry));
        assert!(!pool.buffers().is_valid(EntryRef::new(0, 3)));
        assert!(!pool.buffers().is_valid(EntryRef::new(1, 1)));
    }

    #[test]
    fn test_alloc_fails_when_full() {
        let mut pool = small_pool(8);
        assert!(pool.try_alloc(4).is_some());
        assert_eq!(pool.remaining(), 3);
        assert!(!pool.can_alloc(4));
        assert!(pool.try_alloc(4).is_none());
    }

    #[test]
    fn test_held_space_is_reused_only_after_trim() {
        let mut pool = small_pool(16);
        let entry = pool.try_alloc(3).unwrap();

        pool.hold_entry(entry, 3);
        assert_eq!(pool.hold_words(), 3);
        pool.transfer_hold_lists(4);

        pool.trim_hold_lists(4);
        assert_ne!(pool.try_alloc(3), Some(entry));

        pool.trim_hold_lists(5);
        assert_eq!(pool.hold_words(), 0);
        assert_eq!(pool.dead_words(), 3);
        assert_eq!(pool.try_alloc(3), Some(entry));
        assert_eq!(pool.dead_words(), 0);
    }

    #[test]
    fn test_pre_compact_switches_buffers() {
        let mut pool = small_pool(16);
        let old = pool.try_alloc(4).unwrap();

        assert!(pool.pre_compact(8));
        assert_eq!(pool.active_buffer_id(), 1);
        assert_eq!(pool.status(0), BufferStatus::Hold);
        assert!(pool.buffers().is_valid(old));

        // No free slot left until the evacuated buffer is trimmed.
        assert!(!pool.pre_compact(8));
        assert!(!pool.pending_compact());

        pool.post_compact();
        pool.transfer_hold_lists(1);
        pool.trim_hold_lists(2);

        assert_eq!(pool.status(0), BufferStatus::Free);
        assert!(!pool.buffers().is_valid(old));
        assert!(pool.pending_compact());
        pool.clear_pending_compact();
        assert!(!pool.pending_compact());
    }

    #[test]
    fn test_fallback_resize_keeps_handles() {
        let mut pool = small_pool(8);
        let entry = pool.try_alloc(4).unwrap();
        let header = pool.buffers().header(entry).unwrap();
        header.set_enum(9);

        // A frozen view keeps the set it captured.
        let captured: BufferSet = pool.buffers().clone();

        pool.fallback_resize(64);
        assert!(pool.remaining() >= 16);
        assert_eq!(pool.buffers().header(entry).unwrap().enum_value(), 9);
        assert_eq!(captured.header(entry).unwrap().enum_value(), 9);
        assert_eq!(captured.buffer(0).unwrap().capacity(), 8);
    }

    #[test]
    fn test_fallback_resize_puts_nothing_on_hold() {
        let mut pool = small_pool(8);
        for _ in 0..64 {
            if !pool.can_alloc(3) {
                pool.fallback_resize(12);
            }
            assert!(pool.try_alloc(3).is_some());
        }

        let usage = pool.memory_usage();
        assert_eq!(usage.allocated_bytes_on_hold, 0);
        assert_eq!(usage.allocated_bytes, pool.buffers().buffer(0).unwrap().capacity() * ALIGNMENT);
    }

    #[test]
    fn test_calc_words_respects_minimum() {
        let pool = small_pool(16);
        assert_eq!(pool.calc_words_to_alloc(1, false), 8);
        assert_eq!(pool.calc_words_to_alloc(20, false), 21);
    }

    #[test]
    #[should_panic(expected = "address space exhausted")]
    fn test_fail_new_size_panics() {
        let pool = small_pool(16);
        let _ = pool.calc_words_to_alloc(usize::try_from(OFFSET_LIMIT).unwrap(), true);
    }

    #[test]
    fn test_memory_usage() {
        let mut pool = small_pool(16);
        let entry = pool.try_alloc(4).unwrap();
        pool.hold_entry(entry, 4);

        let usage = pool.memory_usage();
        assert_eq!(usage.allocated_bytes, 16 * ALIGNMENT);
        assert_eq!(usage.used_bytes, 5 * ALIGNMENT);
        assert_eq!(usage.allocated_bytes_on_hold, 4 * ALIGNMENT);

        let space = pool.address_space_usage();
        assert_eq!(space.used, 5);
        assert_eq!(space.limit, OFFSET_LIMIT);
    }
}
