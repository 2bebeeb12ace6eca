//! Standard memory orderings for writer/reader access.
//!
//! These constants keep ordering usage consistent across the crate and make
//! the intent clear at each access point.

use std::sync::atomic::Ordering;

/// Ordering for reading a published value (view pointer, buffer fill level).
/// Pairs with the writer's `PUBLISH_ORD` stores.
pub const READ_ORD: Ordering = Ordering::Acquire;

/// Ordering for publishing a value to readers.
/// Every entry word written before the publish is visible after a `READ_ORD` load.
pub const PUBLISH_ORD: Ordering = Ordering::Release;

/// Ordering for swapping the published view.
pub const SWAP_ORD: Ordering = Ordering::AcqRel;

/// Ordering for entry words and header fields.
/// Readers only reach a word through an acquired publication, so relaxed is enough.
pub const RELAXED: Ordering = Ordering::Relaxed;
