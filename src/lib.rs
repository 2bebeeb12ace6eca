//! # `enumstore`
//!
//! Value-deduplication and ordering core of a columnar attribute store.
//!
//! Values are interned into compact handles ([`EntryRef`]). A sorted
//! dictionary over those handles answers term and range lookups, optionally
//! carries a posting-list reference per value, and can be frozen so that any
//! number of lock-free readers see a consistent snapshot while a single
//! writer keeps inserting, sweeping and compacting.
//!
//! ## Concurrency model
//!
//! | Side | Type | Access |
//! |------|------|--------|
//! | Writer | [`EnumStore`] | `&mut self`, one thread |
//! | Readers | [`EnumStoreReader`] / [`Snapshot`] | `Clone + Send + Sync`, never lock |
//!
//! Memory is reclaimed only through generation-tagged hold lists. An
//! external coordinator supplies the generations:
//!
//! ```rust
//! use enumstore::{EnumStore, StoreConfig};
//!
//! let mut store: EnumStore<String> = EnumStore::new(StoreConfig::default());
//! let apple = store.insert(&"apple".to_string());
//! store.freeze_tree();
//! let snapshot = store.reader().snapshot();
//!
//! store.dec_ref_count(apple);
//! store.free_unused_enums();
//! store.freeze_tree();
//! store.transfer_hold_lists(1);
//!
//! // Still readable by the snapshot taken before the sweep.
//! assert_eq!(snapshot.get_value(apple).as_deref(), Some("apple"));
//!
//! // Once no reader can observe generation 1, the space is reusable.
//! drop(snapshot);
//! store.trim_hold_lists(2);
//! assert_eq!(store.insert(&"peach".to_string()), apple);
//! ```
//!
//! ## Handles
//!
//! A handle packs a buffer id and a word offset. Handles stay valid until
//! their entry is swept and trimmed, except across
//! [`EnumStore::perform_compaction`], after which
//! [`EnumStore::current_ref`] maps old handles to new ones.

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::inline_always)]

mod tracing_helpers;

pub mod alloc;
pub mod compact;
pub mod compare;
pub mod config;
pub mod dict;
pub mod entry;
pub mod entry_ref;
pub mod error;
pub mod freeze;
pub mod hold;
pub mod io;
pub mod memory;
pub mod ordering;
pub mod store;
pub mod value;

pub use compare::{
    EntryComparator, FoldedStringComparator, NumericComparator, StringComparator,
};
pub use config::StoreConfig;
pub use dict::{FrozenRoot, NoData, NodeData, PostingRef};
pub use entry_ref::EntryRef;
pub use error::{Result, StoreError};
pub use freeze::ReEnumerateGuard;
pub use hold::Generation;
pub use io::{BufferWriter, SliceWriter};
pub use memory::{AddressSpace, MemoryUsage};
pub use store::{EnumStore, EnumStoreReader, LoadedValues, Snapshot};
pub use value::{EntryValue, NumericValue};
