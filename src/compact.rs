//! Online compaction.
//!
//! Compaction moves every dictionary entry out of the active buffer into a
//! fresh one, dropping the dead and held space in between. Entries are
//! copied verbatim (header and payload), so values, enum ids and reference
//! counts survive unchanged and the dictionary order is preserved.
//!
//! The old buffer is not freed here. It goes on the buffer hold list and
//! stays readable for every frozen view that still points into it. The
//! old-to-new [`RemapTable`] is kept (and published with later views) until
//! the same trim, so a reader holding a pre-compaction handle can find the
//! entry's new home.

use std::collections::HashMap;
use std::mem::size_of;

use crate::alloc::BufferPool;
use crate::config::StoreConfig;
use crate::dict::{Dictionary, NodeData};
use crate::entry_ref::{ALIGNMENT, EntryRef, OFFSET_LIMIT};
use crate::ordering::RELAXED;
use crate::tracing_helpers::{debug_log, trace_log};
use crate::value::{EntryValue, entry_words};

/// Old-to-new handle map produced by one compaction.
#[derive(Debug, Default)]
pub struct RemapTable {
    map: HashMap<EntryRef, EntryRef>,
}

impl RemapTable {
    /// Create an empty table with room for `capacity` moves.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
        }
    }

    /// Record that `old` moved to `new`.
    pub fn insert(&mut self, old: EntryRef, new: EntryRef) {
        self.map.insert(old, new);
    }

    /// New handle of `old`, if it moved.
    #[must_use]
    #[inline(always)]
    pub fn get(&self, old: EntryRef) -> Option<EntryRef> {
        self.map.get(&old).copied()
    }

    /// Number of moved entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// `true` when nothing moved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Approximate heap bytes held by the table.
    #[must_use]
    pub fn memory_bytes(&self) -> usize {
        self.map.capacity() * 2 * size_of::<EntryRef>()
    }
}

/// Follow `entry` through `tables`, oldest first.
#[must_use]
pub fn chase<'a>(entry: EntryRef, tables: impl IntoIterator<Item = &'a RemapTable>) -> EntryRef {
    tables
        .into_iter()
        .fold(entry, |current, table| table.get(current).unwrap_or(current))
}

/// `true` when the active buffer carries enough dead space to be worth
/// compacting, or a deferred compaction became possible.
#[must_use]
pub fn should_compact(pool: &BufferPool, config: &StoreConfig) -> bool {
    if pool.pending_compact() {
        return true;
    }

    let dead: usize = pool.dead_words() + pool.hold_words();
    if dead < config.min_dead_words {
        return false;
    }

    #[allow(clippy::cast_precision_loss)]
    let ratio: f64 = dead as f64 / pool.max_enum_offset().max(1) as f64;
    ratio > config.max_dead_ratio
}

/// Move every entry of `dict` into a fresh active buffer.
///
/// Returns `None`, leaving everything untouched, when no buffer slot is
/// free; the pool then reports [`pending_compact`](BufferPool::pending_compact)
/// once one is.
pub(crate) fn compact<T: EntryValue, D: NodeData>(
    pool: &mut BufferPool,
    dict: &mut Dictionary<D>,
    bytes_needed: u64,
) -> Option<RemapTable> {
    let old_buffer: usize = pool.active_buffer_id();
    if !pool.pre_compact(bytes_needed) {
        return None;
    }

    debug_log!(
        from = old_buffer,
        to = pool.active_buffer_id(),
        entries = dict.len(),
        "compaction started"
    );

    let mut remap = RemapTable::with_capacity(dict.len());
    for (old, _) in dict.iter() {
        debug_assert_eq!(old.buffer_id(), old_buffer, "dictionary entry outside the active buffer");

        let Some(words) = entry_words::<T>(pool.buffers(), old) else {
            continue;
        };
        let new: EntryRef = alloc_moved(pool, words);
        copy_entry(pool, old, new, words);
        trace_log!(%old, %new, words, "entry moved");
        remap.insert(old, new);
    }

    dict.rewrite_keys(|old| remap.get(old).unwrap_or(old));
    pool.post_compact();

    debug_log!(moved = remap.len(), "compaction finished");
    Some(remap)
}

fn alloc_moved(pool: &mut BufferPool, words: usize) -> EntryRef {
    if let Some(entry) = pool.try_alloc(words) {
        return entry;
    }

    pool.fallback_resize((words * ALIGNMENT) as u64);
    match pool.try_alloc(words) {
        Some(entry) => entry,
        None => BufferPool::fail_new_size(words as u64, OFFSET_LIMIT),
    }
}

fn copy_entry(pool: &BufferPool, old: EntryRef, new: EntryRef, words: usize) {
    let buffers = pool.buffers();
    let (Some(src), Some(dst)) = (buffers.words(old, words), buffers.words(new, words)) else {
        return;
    };
    for (to, from) in dst.iter().zip(src) {
        to.store(from.load(RELAXED), RELAXED);
    }
}
