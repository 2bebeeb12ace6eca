//! Writing values out and loading them back.
//!
//! The persisted form is a flat sequence of values in the order they were
//! written; full writes use dictionary order. A load requires that order
//! and rebuilds the dictionary from it in one pass.

use crate::alloc::{BufferPool, BufferSet, RESERVED_WORDS};
use crate::compare::EntryComparator;
use crate::dict::{FrozenRoot, NodeData};
use crate::entry::HEADER_WORDS;
use crate::entry_ref::{EntryRef, OFFSET_LIMIT};
use crate::error::{Result, StoreError};
use crate::io::BufferWriter;
use crate::tracing_helpers::{debug_log, warn_log};
use crate::value::{EntryValue, load_value};

use super::EnumStore;

/// Outcome of [`EnumStore::deserialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedValues {
    /// Bytes of input consumed.
    pub consumed: usize,
    /// Handles of the loaded values, in sorted order.
    pub refs: Vec<EntryRef>,
}

pub(crate) fn write_values<T: EntryValue, W: BufferWriter + ?Sized>(
    buffers: &BufferSet,
    entries: impl IntoIterator<Item = EntryRef>,
    writer: &mut W,
) -> Result<()> {
    for entry in entries {
        let value: T = load_value(buffers, entry).ok_or(StoreError::UnknownEntry { entry })?;
        value.serialize(writer)?;
    }
    Ok(())
}

impl<T: EntryValue, D: NodeData> EnumStore<T, D> {
    /// Persist the values behind `entries`, in the given order.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownEntry`] for a handle that does not resolve;
    /// otherwise propagates value and sink errors.
    pub fn write_enum_values<W: BufferWriter + ?Sized>(
        &self,
        writer: &mut W,
        entries: &[EntryRef],
    ) -> Result<()> {
        write_values::<T, W>(self.pool.buffers(), entries.iter().copied(), writer)
    }

    /// Persist every value of `root` in sorted order.
    ///
    /// # Errors
    ///
    /// As [`write_enum_values`](Self::write_enum_values).
    pub fn write_all_values<W: BufferWriter + ?Sized>(
        &self,
        writer: &mut W,
        root: &FrozenRoot<D>,
    ) -> Result<()> {
        write_values::<T, W>(self.pool.buffers(), root.iter().map(|(entry, _)| entry), writer)
    }

    /// Replace the contents of the store with the values persisted in `src`.
    ///
    /// Loaded values get enum ids equal to their position and a reference
    /// count of 0; restore counts with
    /// [`fixup_ref_counts`](Self::fixup_ref_counts).
    ///
    /// # Errors
    ///
    /// [`StoreError::Truncated`] or [`StoreError::Malformed`] for undecodable
    /// input, [`StoreError::InvalidValue`] or [`StoreError::ValueTooLarge`]
    /// for a value the store cannot hold, [`StoreError::Unsorted`] when
    /// values are not strictly increasing. The store is left empty on error.
    pub fn deserialize(&mut self, src: &[u8]) -> Result<LoadedValues> {
        self.reset();
        match self.load(src) {
            Ok(loaded) => {
                debug_log!(
                    values = loaded.refs.len(),
                    bytes = loaded.consumed,
                    "loaded enum store"
                );
                Ok(loaded)
            }
            Err(err) => {
                warn_log!(%err, "rejecting persisted enum store");
                self.reset();
                Err(err)
            }
        }
    }

    /// Decode `src` once without storing anything: the number of values
    /// and the words they need.
    fn size_input(src: &[u8]) -> Result<(usize, u64)> {
        let mut consumed: usize = 0;
        let mut count: usize = 0;
        let mut words: u64 = 0;

        while consumed < src.len() {
            let (value, used) = T::deserialize(&src[consumed..]).map_err(|err| err.at_offset(consumed))?;
            value.validate()?;
            words = words.saturating_add((HEADER_WORDS + value.payload_words()) as u64);
            count += 1;
            consumed += used;
        }
        Ok((count, words))
    }

    fn load(&mut self, src: &[u8]) -> Result<LoadedValues> {
        let (count, words) = Self::size_input(src)?;
        let required: u64 = words.saturating_add(RESERVED_WORDS as u64);
        if required > OFFSET_LIMIT {
            BufferPool::fail_new_size(required, OFFSET_LIMIT);
        }

        // One buffer that fits everything, so no copy is made while loading.
        #[allow(clippy::cast_possible_truncation)]
        let capacity: usize = (required as usize).max(self.config.initial_buffer_words);
        self.pool.reset(capacity);

        let mut consumed: usize = 0;
        let mut refs: Vec<EntryRef> = Vec::with_capacity(count);

        while consumed < src.len() {
            let (value, used) = T::deserialize(&src[consumed..]).map_err(|err| err.at_offset(consumed))?;

            let words: usize = HEADER_WORDS + value.payload_words();
            let entry: EntryRef = match self.pool.try_alloc(words) {
                Some(entry) => entry,
                None => BufferPool::fail_new_size(words as u64, OFFSET_LIMIT),
            };

            let buffers = self.pool.buffers();
            if let Some(payload) = buffers.payload(entry) {
                value.store(&payload[..value.payload_words()]);
            }
            if let Some(header) = buffers.header(entry) {
                #[allow(clippy::cast_possible_truncation)]
                header.set_enum(refs.len() as u32);
                header.set_ref_count(0);
            }

            if let Some(&prev) = refs.last() {
                if !T::comparator(buffers, None).less(prev, entry) {
                    return Err(StoreError::Unsorted { index: refs.len() });
                }
            }

            refs.push(entry);
            consumed += used;
        }

        let items: Vec<(EntryRef, D)> = refs.iter().map(|&entry| (entry, D::default())).collect();
        self.dict.build_from_sorted(&items);
        self.next_enum = refs.len() as u64;

        Ok(LoadedValues { consumed, refs })
    }
}
