//! Entry header: enum id and reference count.
//!
//! Every stored value is prefixed by two header words. The header is only
//! ever mutated by the writer. Readers may load it concurrently, which is
//! why the words are atomics, but they never depend on the reference count:
//! membership in a frozen dictionary is what makes an entry visible.

use std::sync::atomic::AtomicU32;

use crate::ordering::RELAXED;
use crate::tracing_helpers::warn_log;

/// Number of words in an entry header.
pub const HEADER_WORDS: usize = 2;

const ENUM_WORD: usize = 0;
const REF_COUNT_WORD: usize = 1;

/// Typed view over the header words of one entry.
#[derive(Clone, Copy)]
pub struct EntryHeader<'a> {
    words: &'a [AtomicU32; HEADER_WORDS],
}

impl<'a> EntryHeader<'a> {
    /// View the first [`HEADER_WORDS`] words of `words` as a header.
    ///
    /// Returns `None` if `words` is too short.
    #[must_use]
    #[inline(always)]
    pub fn new(words: &'a [AtomicU32]) -> Option<Self> {
        let words: &[AtomicU32; HEADER_WORDS] = words.get(..HEADER_WORDS)?.try_into().ok()?;
        Some(Self { words })
    }

    /// Enum id of the entry.
    #[must_use]
    #[inline(always)]
    pub fn enum_value(self) -> u32 {
        self.words[ENUM_WORD].load(RELAXED)
    }

    /// Overwrite the enum id.
    #[inline(always)]
    pub fn set_enum(self, value: u32) {
        self.words[ENUM_WORD].store(value, RELAXED);
    }

    /// Current reference count.
    #[must_use]
    #[inline(always)]
    pub fn ref_count(self) -> u32 {
        self.words[REF_COUNT_WORD].load(RELAXED)
    }

    /// Overwrite the reference count.
    ///
    /// Writer-only. Used when initializing an entry and when restoring counts
    /// from persisted occurrence data.
    #[inline(always)]
    pub fn set_ref_count(self, count: u32) {
        self.words[REF_COUNT_WORD].store(count, RELAXED);
    }

    /// Increment the reference count and return the new value.
    ///
    /// Plain load/store: there is exactly one writer.
    #[inline(always)]
    pub fn inc_ref_count(self) -> u32 {
        let count: u32 = self.ref_count().saturating_add(1);
        self.set_ref_count(count);
        count
    }

    /// Decrement the reference count and return the new value.
    ///
    /// Saturates at zero. A zero count marks the entry unused; it stays in
    /// the dictionary until a sweep removes it.
    #[inline(always)]
    pub fn dec_ref_count(self) -> u32 {
        let current: u32 = self.ref_count();
        if current == 0 {
            warn_log!("reference count decremented below zero, ignoring");
            return 0;
        }

        let count: u32 = current - 1;
        self.set_ref_count(count);
        count
    }

    /// `true` when no referent remains.
    #[must_use]
    #[inline(always)]
    pub fn is_unused(self) -> bool {
        self.ref_count() == 0
    }
}

impl std::fmt::Debug for EntryHeader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryHeader")
            .field("enum", &self.enum_value())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> Vec<AtomicU32> {
        (0..n).map(|_| AtomicU32::new(0)).collect()
    }

    #[test]
    fn test_too_short() {
        let storage = words(1);
        assert!(EntryHeader::new(&storage).is_none());
    }

    #[test]
    fn test_enum_and_ref_count_are_independent() {
        let storage = words(4);
        let header = EntryHeader::new(&storage).unwrap();

        header.set_enum(7);
        header.set_ref_count(3);
        assert_eq!(header.enum_value(), 7);
        assert_eq!(header.ref_count(), 3);

        assert_eq!(header.inc_ref_count(), 4);
        assert_eq!(header.enum_value(), 7);
    }

    #[test]
    fn test_dec_saturates_at_zero() {
        let storage = words(2);
        let header = EntryHeader::new(&storage).unwrap();

        header.set_ref_count(1);
        assert_eq!(header.dec_ref_count(), 0);
        assert!(header.is_unused());
        assert_eq!(header.dec_ref_count(), 0);
        assert_eq!(header.ref_count(), 0);
    }
}
