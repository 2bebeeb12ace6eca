//! Comparators over entry handles.
//!
//! The dictionary orders handles, not values. A comparator resolves each
//! handle to its value through a [`BufferSet`] and compares the values.
//! [`EntryRef::INVALID`] stands for the comparator's *needle*: the value
//! being searched for, which is not stored anywhere.
//!
//! The dictionary only ever sees `&dyn EntryComparator`, which is how one
//! dictionary implementation serves every value type. The blanket impl for
//! references lets a concrete comparator be passed wherever a
//! `&dyn EntryComparator` is expected.

use std::cmp::Ordering;
use std::sync::atomic::AtomicU32;

use crate::alloc::BufferSet;
use crate::entry_ref::EntryRef;
use crate::ordering::RELAXED;
use crate::value::{EntryValue, NumericValue, load_value};

/// Strict weak order over entry handles.
pub trait EntryComparator {
    /// Compare the values behind `lhs` and `rhs`.
    fn compare(&self, lhs: EntryRef, rhs: EntryRef) -> Ordering;

    /// `true` if the value behind `lhs` orders before the value behind `rhs`.
    #[inline(always)]
    fn less(&self, lhs: EntryRef, rhs: EntryRef) -> bool {
        self.compare(lhs, rhs) == Ordering::Less
    }
}

impl<C: EntryComparator + ?Sized> EntryComparator for &C {
    #[inline(always)]
    fn compare(&self, lhs: EntryRef, rhs: EntryRef) -> Ordering {
        (**self).compare(lhs, rhs)
    }
}

/// Order two optional resolutions. An unresolvable handle (a contract
/// violation) orders first so the relation stays total.
#[inline(always)]
fn compare_resolved<V>(lhs: Option<V>, rhs: Option<V>, cmp: impl FnOnce(&V, &V) -> Ordering) -> Ordering {
    match (lhs, rhs) {
        (Some(a), Some(b)) => cmp(&a, &b),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
    }
}

// ============================================================================
//  NumericComparator
// ============================================================================

/// Numeric order. Floats order NaN before every number.
#[derive(Debug, Clone, Copy)]
pub struct NumericComparator<'a, T: NumericValue> {
    buffers: &'a BufferSet,
    needle: Option<T>,
}

impl<'a, T: NumericValue> NumericComparator<'a, T> {
    /// Comparator resolving handles against `buffers`, with an optional needle.
    #[must_use]
    pub const fn new(buffers: &'a BufferSet, needle: Option<T>) -> Self {
        Self { buffers, needle }
    }

    #[inline(always)]
    fn resolve(&self, entry: EntryRef) -> Option<T> {
        if entry.is_valid() {
            load_value(self.buffers, entry)
        } else {
            self.needle
        }
    }
}

impl<T: NumericValue> EntryComparator for NumericComparator<'_, T> {
    fn compare(&self, lhs: EntryRef, rhs: EntryRef) -> Ordering {
        compare_resolved(self.resolve(lhs), self.resolve(rhs), T::cmp_numeric)
    }
}

// ============================================================================
//  String views
// ============================================================================

/// A string either stored in a buffer or borrowed from a needle.
#[derive(Clone, Copy)]
enum StrView<'a> {
    /// Packed payload bytes (length word excluded) and their byte length.
    Stored { words: &'a [AtomicU32], len: usize },
    Needle(&'a str),
}

impl<'a> StrView<'a> {
    fn resolve(buffers: &'a BufferSet, needle: Option<&'a str>, entry: EntryRef) -> Option<Self> {
        if !entry.is_valid() {
            return needle.map(StrView::Needle);
        }
        let payload: &[AtomicU32] = buffers.payload(entry)?;
        let len: usize = payload.first()?.load(RELAXED) as usize;
        let words: &[AtomicU32] = payload.get(1..1 + len.div_ceil(4))?;
        Some(StrView::Stored { words, len })
    }

    fn len(&self) -> usize {
        match self {
            Self::Stored { len, .. } => *len,
            Self::Needle(s) => s.len(),
        }
    }

    #[inline(always)]
    fn byte(&self, i: usize) -> u8 {
        match self {
            Self::Stored { words, .. } => {
                let word: u32 = words[i / 4].load(RELAXED);
                word.to_le_bytes()[i % 4]
            }
            Self::Needle(s) => s.as_bytes()[i],
        }
    }

    fn chars(self) -> ViewChars<'a> {
        match self {
            Self::Stored { .. } => ViewChars::Stored { view: self, pos: 0 },
            Self::Needle(s) => ViewChars::Needle(s.chars()),
        }
    }
}

/// Characters of a [`StrView`], decoded straight from the packed words.
enum ViewChars<'a> {
    Stored { view: StrView<'a>, pos: usize },
    Needle(std::str::Chars<'a>),
}

impl ViewChars<'_> {
    /// Decode the sequence at `pos` and advance past it. Invalid sequences
    /// decode to U+FFFD one byte at a time.
    fn decode(view: &StrView<'_>, pos: &mut usize) -> char {
        let lead: u8 = view.byte(*pos);
        let (width, mut code): (usize, u32) = match lead {
            0x00..=0x7F => (1, u32::from(lead)),
            0xC0..=0xDF => (2, u32::from(lead & 0x1F)),
            0xE0..=0xEF => (3, u32::from(lead & 0x0F)),
            0xF0..=0xF7 => (4, u32::from(lead & 0x07)),
            _ => (0, 0),
        };
        if width == 0 || *pos + width > view.len() {
            *pos += 1;
            return char::REPLACEMENT_CHARACTER;
        }

        for i in 1..width {
            let next: u8 = view.byte(*pos + i);
            if next & 0xC0 != 0x80 {
                *pos += 1;
                return char::REPLACEMENT_CHARACTER;
            }
            code = (code << 6) | u32::from(next & 0x3F);
        }
        *pos += width;
        char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
    }
}

impl Iterator for ViewChars<'_> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        match self {
            Self::Stored { view, pos } => (*pos < view.len()).then(|| Self::decode(view, pos)),
            Self::Needle(chars) => chars.next(),
        }
    }
}

fn cmp_bytes(lhs: &StrView<'_>, rhs: &StrView<'_>) -> Ordering {
    let common: usize = lhs.len().min(rhs.len());
    for i in 0..common {
        match lhs.byte(i).cmp(&rhs.byte(i)) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    lhs.len().cmp(&rhs.len())
}

fn cmp_folded(lhs: &StrView<'_>, rhs: &StrView<'_>) -> Ordering {
    lhs.chars()
        .flat_map(char::to_lowercase)
        .cmp(rhs.chars().flat_map(char::to_lowercase))
}

// ============================================================================
//  StringComparator / FoldedStringComparator
// ============================================================================

/// Exact string order.
///
/// Folded order first, byte order as the tie-breaker: every distinct string
/// gets its own position, and strings that fold to the same value are
/// adjacent, so a folded lookup covers a contiguous range.
#[derive(Debug, Clone, Copy)]
pub struct StringComparator<'a> {
    buffers: &'a BufferSet,
    needle: Option<&'a str>,
}

impl<'a> StringComparator<'a> {
    /// Comparator resolving handles against `buffers`, with an optional needle.
    #[must_use]
    pub const fn new(buffers: &'a BufferSet, needle: Option<&'a str>) -> Self {
        Self { buffers, needle }
    }
}

impl EntryComparator for StringComparator<'_> {
    fn compare(&self, lhs: EntryRef, rhs: EntryRef) -> Ordering {
        compare_resolved(
            StrView::resolve(self.buffers, self.needle, lhs),
            StrView::resolve(self.buffers, self.needle, rhs),
            |a, b| cmp_folded(a, b).then_with(|| cmp_bytes(a, b)),
        )
    }
}

/// Case-folded string order (Unicode lowercase).
#[derive(Debug, Clone, Copy)]
pub struct FoldedStringComparator<'a> {
    buffers: &'a BufferSet,
    needle: Option<&'a str>,
}

impl<'a> FoldedStringComparator<'a> {
    /// Comparator resolving handles against `buffers`, with an optional needle.
    #[must_use]
    pub const fn new(buffers: &'a BufferSet, needle: Option<&'a str>) -> Self {
        Self { buffers, needle }
    }
}

impl EntryComparator for FoldedStringComparator<'_> {
    fn compare(&self, lhs: EntryRef, rhs: EntryRef) -> Ordering {
        compare_resolved(
            StrView::resolve(self.buffers, self.needle, lhs),
            StrView::resolve(self.buffers, self.needle, rhs),
            cmp_folded,
        )
    }
}

/// `true` when `lhs` and `rhs` differ under `T`'s folded order.
///
/// Used by the posting layer to find where a folded group starts.
#[must_use]
pub fn folded_change<T: EntryValue>(buffers: &BufferSet, lhs: EntryRef, rhs: EntryRef) -> bool {
    let comp = T::folded_comparator(buffers, None);
    comp.compare(lhs, rhs) != Ordering::Equal
}
