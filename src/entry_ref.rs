//! Packed entry handles.
//!
//! An [`EntryRef`] is not a pointer: it packs a buffer id and a word offset
//! into a single `u32`. A handle only means something relative to the
//! [`BufferSet`](crate::alloc::BufferSet) it was allocated from, and is
//! validated by bounds against that buffer's current fill level.
//!
//! Layout (high bit first):
//!
//! ```text
//! | buffer id (BUFFER_BITS) | offset in 4-byte words (OFFSET_BITS) |
//! ```

use std::fmt as StdFmt;

/// Number of bits used for the word offset.
pub const OFFSET_BITS: u32 = 31;

/// Number of bits used for the buffer id.
pub const BUFFER_BITS: u32 = u32::BITS - OFFSET_BITS;

/// Number of buffer slots addressable by a handle.
pub const NUM_BUFFERS: usize = 1 << BUFFER_BITS;

/// Alignment granularity of entries, in bytes. One word.
pub const ALIGNMENT: usize = 4;

/// Number of addressable words per buffer.
pub const OFFSET_LIMIT: u64 = 1 << OFFSET_BITS;

const OFFSET_MASK: u32 = (1 << OFFSET_BITS) - 1;

/// Opaque handle to an entry stored in the buffer pool.
///
/// Raw value 0 is [`EntryRef::INVALID`]. Word 0 of every buffer is reserved,
/// so no entry is ever allocated there.
///
/// The derived ordering compares raw bits. It exists for bookkeeping sets
/// and has nothing to do with the order of the stored values.
///
/// # Example
///
/// ```rust
/// use enumstore::EntryRef;
///
/// let r = EntryRef::new(1, 42);
/// assert_eq!(r.buffer_id(), 1);
/// assert_eq!(r.offset(), 42);
/// assert!(r.is_valid());
/// assert!(!EntryRef::INVALID.is_valid());
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryRef(u32);

impl EntryRef {
    /// The invalid handle. Comparators resolve it to their needle value.
    pub const INVALID: Self = Self(0);

    /// Pack a buffer id and word offset.
    ///
    /// # Panics
    ///
    /// Debug builds panic if either component does not fit its bit field.
    #[must_use]
    #[inline(always)]
    pub const fn new(buffer_id: usize, offset: usize) -> Self {
        debug_assert!(buffer_id < NUM_BUFFERS, "buffer id out of range");
        debug_assert!((offset as u64) < OFFSET_LIMIT, "offset out of range");

        #[allow(clippy::cast_possible_truncation)]
        let raw: u32 = ((buffer_id as u32) << OFFSET_BITS) | (offset as u32 & OFFSET_MASK);
        Self(raw)
    }

    /// Rebuild a handle from its raw bits.
    #[must_use]
    #[inline(always)]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw packed bits.
    #[must_use]
    #[inline(always)]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Buffer slot this handle points into.
    #[must_use]
    #[inline(always)]
    pub const fn buffer_id(self) -> usize {
        (self.0 >> OFFSET_BITS) as usize
    }

    /// Word offset within the buffer.
    #[must_use]
    #[inline(always)]
    pub const fn offset(self) -> usize {
        (self.0 & OFFSET_MASK) as usize
    }

    /// `false` only for [`EntryRef::INVALID`].
    #[must_use]
    #[inline(always)]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Round a byte count up to the alignment granularity.
    #[must_use]
    #[inline(always)]
    pub const fn align(bytes: u64) -> u64 {
        let mask: u64 = ALIGNMENT as u64 - 1;
        (bytes + mask) & !mask
    }

    /// Number of words needed to hold `bytes` bytes.
    #[must_use]
    #[inline(always)]
    pub const fn words_for_bytes(bytes: u64) -> u64 {
        Self::align(bytes) / ALIGNMENT as u64
    }
}

impl StdFmt::Debug for EntryRef {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        if self.is_valid() {
            write!(f, "EntryRef({}, {})", self.buffer_id(), self.offset())
        } else {
            write!(f, "EntryRef(invalid)")
        }
    }
}

impl StdFmt::Display for EntryRef {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        write!(f, "idx({}, {})", self.buffer_id(), self.offset())
    }
}
