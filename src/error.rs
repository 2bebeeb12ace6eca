//! Recoverable errors.
//!
//! Only conditions a caller can act on are errors. Address-space exhaustion
//! and reenumerating under a [`ReEnumerateGuard`](crate::freeze::ReEnumerateGuard)
//! are contract violations and panic instead.

use thiserror::Error;

use crate::entry_ref::EntryRef;

/// Errors surfaced by interning, loading and writing values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The input ended in the middle of a value.
    #[error("truncated input at byte {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        /// Byte offset of the value being decoded.
        offset: usize,
        /// Bytes the value needs.
        needed: usize,
        /// Bytes left in the input.
        available: usize,
    },

    /// A value could not be decoded.
    #[error("malformed value at byte {offset}: {reason}")]
    Malformed {
        /// Byte offset of the value being decoded.
        offset: usize,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// Persisted values were not in strictly increasing order.
    #[error("value {index} is not greater than its predecessor")]
    Unsorted {
        /// Position of the offending value in the input.
        index: usize,
    },

    /// A value has no stored or persisted form.
    #[error("invalid value: {reason}")]
    InvalidValue {
        /// What was wrong with it.
        reason: &'static str,
    },

    /// A value is too long for its length word.
    #[error("value of {bytes} bytes exceeds the maximum of {max} bytes")]
    ValueTooLarge {
        /// Byte length of the value.
        bytes: usize,
        /// Largest length a stored value can have.
        max: u64,
    },

    /// A handle passed for writing does not resolve to a stored value.
    #[error("entry {entry} does not resolve to a stored value")]
    UnknownEntry {
        /// The offending handle.
        entry: EntryRef,
    },

    /// The output sink cannot take the bytes being written.
    #[error("insufficient space: needed {needed} bytes, {available} available")]
    InsufficientSpace {
        /// Bytes the write needs.
        needed: usize,
        /// Bytes left in the sink.
        available: usize,
    },
}

impl StoreError {
    /// Rebase an error produced while decoding a value that starts at `base`.
    #[must_use]
    pub(crate) const fn at_offset(self, base: usize) -> Self {
        match self {
            Self::Truncated {
                offset,
                needed,
                available,
            } => Self::Truncated {
                offset: base + offset,
                needed,
                available,
            },
            Self::Malformed { offset, reason } => Self::Malformed {
                offset: base + offset,
                reason,
            },
            other => other,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
