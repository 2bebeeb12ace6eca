//! Value types storable in the enum store.
//!
//! A value type decides three things:
//!
//! - its payload layout in buffer words (after the [entry header](crate::entry)),
//! - its persisted byte form,
//! - which comparators order it.
//!
//! Numeric types persist as little-endian bytes. Strings persist as their
//! UTF-8 bytes followed by a NUL terminator, and are stored as a byte-length
//! word followed by the bytes packed four to a word.

use std::cmp::Ordering;
use std::fmt::Debug;
use std::sync::atomic::AtomicU32;

use crate::alloc::BufferSet;
use crate::compare::{EntryComparator, FoldedStringComparator, NumericComparator, StringComparator};
use crate::entry::HEADER_WORDS;
use crate::entry_ref::EntryRef;
use crate::error::{Result, StoreError};
use crate::io::BufferWriter;
use crate::ordering::RELAXED;

/// A value type the store can intern.
pub trait EntryValue: Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Comparator defining dictionary order for this type.
    type Comparator<'a>: EntryComparator
    where
        Self: 'a;

    /// Coarser comparator used for folded lookups. Same as
    /// [`Comparator`](Self::Comparator) for types without folding.
    type FoldedComparator<'a>: EntryComparator
    where
        Self: 'a;

    /// Check that `self` can be stored and persisted.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidValue`] or [`StoreError::ValueTooLarge`].
    #[inline(always)]
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Payload size of `self` in words.
    fn payload_words(&self) -> usize;

    /// Payload size of a stored value, read from its payload words.
    fn stored_payload_words(payload: &[AtomicU32]) -> Option<usize>;

    /// Write `self` into `payload`, which is exactly [`payload_words`](Self::payload_words) long.
    ///
    /// Callers [`validate`](Self::validate) first.
    fn store(&self, payload: &[AtomicU32]);

    /// Read a value back from its payload words.
    fn load(payload: &[AtomicU32]) -> Option<Self>;

    /// Append the persisted form of `self`.
    ///
    /// # Errors
    ///
    /// Propagates sink errors and [`validate`](Self::validate) failures.
    fn serialize<W: BufferWriter + ?Sized>(&self, writer: &mut W) -> Result<()>;

    /// Decode one value from the start of `src`, returning it and the bytes consumed.
    ///
    /// # Errors
    ///
    /// [`StoreError::Truncated`] or [`StoreError::Malformed`], with offsets
    /// relative to `src`.
    fn deserialize(src: &[u8]) -> Result<(Self, usize)>;

    /// Dictionary-order comparator over `buffers`, searching for `needle`.
    fn comparator<'a>(buffers: &'a BufferSet, needle: Option<&'a Self>) -> Self::Comparator<'a>;

    /// Folded comparator over `buffers`, searching for `needle`.
    fn folded_comparator<'a>(
        buffers: &'a BufferSet,
        needle: Option<&'a Self>,
    ) -> Self::FoldedComparator<'a>;
}

/// Numeric value types: copyable and totally ordered for dictionary purposes.
pub trait NumericValue: EntryValue + Copy {
    /// Total order used by [`NumericComparator`].
    fn cmp_numeric(&self, other: &Self) -> Ordering;
}

/// Load the value stored at `entry`.
#[must_use]
pub fn load_value<T: EntryValue>(buffers: &BufferSet, entry: EntryRef) -> Option<T> {
    T::load(buffers.payload(entry)?)
}

/// Total words (header included) occupied by the entry at `entry`.
#[must_use]
pub fn entry_words<T: EntryValue>(buffers: &BufferSet, entry: EntryRef) -> Option<usize> {
    Some(HEADER_WORDS + T::stored_payload_words(buffers.payload(entry)?)?)
}

fn store_u64(payload: &[AtomicU32], bits: u64) {
    let words: usize = payload.len();
    #[allow(clippy::cast_possible_truncation)]
    payload[0].store(bits as u32, RELAXED);
    if words > 1 {
        payload[1].store((bits >> 32) as u32, RELAXED);
    }
}

fn load_u64(payload: &[AtomicU32], words: usize) -> Option<u64> {
    let low: u64 = u64::from(payload.first()?.load(RELAXED));
    if words == 1 {
        return Some(low);
    }
    let high: u64 = u64::from(payload.get(1)?.load(RELAXED));
    Some(low | (high << 32))
}

/// The length word of a string of `len` bytes.
fn length_word(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| StoreError::ValueTooLarge {
        bytes: len,
        max: u64::from(u32::MAX),
    })
}

fn take<const N: usize>(src: &[u8]) -> Result<[u8; N]> {
    src.get(..N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(StoreError::Truncated {
            offset: 0,
            needed: N,
            available: src.len(),
        })
}

// ============================================================================
//  Numeric impls
// ============================================================================

macro_rules! numeric_value {
    ($($t:ty => $to_bits:expr, $from_bits:expr, $cmp:expr;)*) => {$(
        impl EntryValue for $t {
            type Comparator<'a> = NumericComparator<'a, $t>;
            type FoldedComparator<'a> = NumericComparator<'a, $t>;

            #[inline(always)]
            fn payload_words(&self) -> usize {
                std::mem::size_of::<$t>().div_ceil(4)
            }

            #[inline(always)]
            fn stored_payload_words(_payload: &[AtomicU32]) -> Option<usize> {
                Some(std::mem::size_of::<$t>().div_ceil(4))
            }

            fn store(&self, payload: &[AtomicU32]) {
                let to_bits: fn($t) -> u64 = $to_bits;
                store_u64(payload, to_bits(*self));
            }

            fn load(payload: &[AtomicU32]) -> Option<Self> {
                let from_bits: fn(u64) -> $t = $from_bits;
                let words: usize = std::mem::size_of::<$t>().div_ceil(4);
                load_u64(payload, words).map(from_bits)
            }

            fn serialize<W: BufferWriter + ?Sized>(&self, writer: &mut W) -> Result<()> {
                writer.write(&self.to_le_bytes())
            }

            fn deserialize(src: &[u8]) -> Result<(Self, usize)> {
                let bytes = take::<{ std::mem::size_of::<$t>() }>(src)?;
                Ok((<$t>::from_le_bytes(bytes), std::mem::size_of::<$t>()))
            }

            fn comparator<'a>(buffers: &'a BufferSet, needle: Option<&'a Self>) -> Self::Comparator<'a> {
                NumericComparator::new(buffers, needle.copied())
            }

            fn folded_comparator<'a>(
                buffers: &'a BufferSet,
                needle: Option<&'a Self>,
            ) -> Self::FoldedComparator<'a> {
                NumericComparator::new(buffers, needle.copied())
            }
        }

        impl NumericValue for $t {
            #[inline(always)]
            fn cmp_numeric(&self, other: &Self) -> Ordering {
                let cmp: fn(&$t, &$t) -> Ordering = $cmp;
                cmp(self, other)
            }
        }
    )*};
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
mod numeric_impls {
    use super::*;

    fn cmp_float<F: PartialOrd>(lhs: &F, rhs: &F, lhs_nan: bool, rhs_nan: bool) -> Ordering {
        match (lhs_nan, rhs_nan) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => lhs.partial_cmp(rhs).unwrap_or(Ordering::Equal),
        }
    }

    numeric_value! {
        i8 => |v| v as i64 as u64, |b| b as i8, Ord::cmp;
        i16 => |v| v as i64 as u64, |b| b as i16, Ord::cmp;
        i32 => |v| v as i64 as u64, |b| b as i32, Ord::cmp;
        i64 => |v| v as u64, |b| b as i64, Ord::cmp;
        u8 => |v| v as u64, |b| b as u8, Ord::cmp;
        u16 => |v| v as u64, |b| b as u16, Ord::cmp;
        u32 => |v| v as u64, |b| b as u32, Ord::cmp;
        u64 => |v| v, |b| b, Ord::cmp;
        f32 => |v| v.to_bits() as u64, |b| f32::from_bits(b as u32),
            |a, b| cmp_float(a, b, a.is_nan(), b.is_nan());
        f64 => |v| v.to_bits(), f64::from_bits,
            |a, b| cmp_float(a, b, a.is_nan(), b.is_nan());
    }
}

// ============================================================================
//  String impl
// ============================================================================

impl EntryValue for String {
    type Comparator<'a> = StringComparator<'a>;
    type FoldedComparator<'a> = FoldedStringComparator<'a>;

    fn validate(&self) -> Result<()> {
        length_word(self.len())?;
        if self.as_bytes().contains(&0) {
            return Err(StoreError::InvalidValue {
                reason: "string value contains a NUL byte",
            });
        }
        Ok(())
    }

    fn payload_words(&self) -> usize {
        1 + self.len().div_ceil(4)
    }

    fn stored_payload_words(payload: &[AtomicU32]) -> Option<usize> {
        let len: usize = payload.first()?.load(RELAXED) as usize;
        Some(1 + len.div_ceil(4))
    }

    /// # Panics
    ///
    /// If the string is longer than its length word can describe; such a
    /// value never passes [`validate`](EntryValue::validate).
    fn store(&self, payload: &[AtomicU32]) {
        let len: u32 = match length_word(self.len()) {
            Ok(len) => len,
            Err(err) => panic!("{err}"),
        };
        payload[0].store(len, RELAXED);

        for (word, chunk) in payload[1..].iter().zip(self.as_bytes().chunks(4)) {
            let mut bytes = [0_u8; 4];
            bytes[..chunk.len()].copy_from_slice(chunk);
            word.store(u32::from_le_bytes(bytes), RELAXED);
        }
    }

    fn load(payload: &[AtomicU32]) -> Option<Self> {
        let len: usize = payload.first()?.load(RELAXED) as usize;
        let words: &[AtomicU32] = payload.get(1..1 + len.div_ceil(4))?;

        let mut bytes: Vec<u8> = Vec::with_capacity(len);
        for word in words {
            bytes.extend_from_slice(&word.load(RELAXED).to_le_bytes());
        }
        bytes.truncate(len);
        String::from_utf8(bytes).ok()
    }

    fn serialize<W: BufferWriter + ?Sized>(&self, writer: &mut W) -> Result<()> {
        self.validate()?;
        writer.write(self.as_bytes())?;
        writer.write(&[0])
    }

    fn deserialize(src: &[u8]) -> Result<(Self, usize)> {
        let Some(end) = src.iter().position(|&b| b == 0) else {
            return Err(StoreError::Truncated {
                offset: 0,
                needed: src.len() + 1,
                available: src.len(),
            });
        };

        let text: &str = std::str::from_utf8(&src[..end]).map_err(|_| StoreError::Malformed {
            offset: 0,
            reason: "string value is not valid UTF-8",
        })?;
        Ok((text.to_owned(), end + 1))
    }

    fn comparator<'a>(buffers: &'a BufferSet, needle: Option<&'a Self>) -> Self::Comparator<'a> {
        StringComparator::new(buffers, needle.map(String::as_str))
    }

    fn folded_comparator<'a>(
        buffers: &'a BufferSet,
        needle: Option<&'a Self>,
    ) -> Self::FoldedComparator<'a> {
        FoldedStringComparator::new(buffers, needle.map(String::as_str))
    }
}
