//! Sorted dictionary over entry handles.
//!
//! A persistent AVL tree: every node is behind an `Arc`, and the writer
//! path-copies on mutation. Freezing is an O(1) clone of the root, after
//! which the frozen tree is immutable no matter what the writer does to the
//! live tree.
//!
//! The tree never looks at values. Ordering comes from a
//! `&dyn EntryComparator`, with [`EntryRef::INVALID`] standing for the
//! comparator's needle value in lookups.

use std::fmt::Debug;
use std::mem::size_of;

use crate::compare::EntryComparator;
use crate::entry_ref::EntryRef;
use crate::memory::MemoryUsage;

mod iter;
mod node;

pub use iter::Iter;

use node::{Link, Node};

// ============================================================================
//  Node data
// ============================================================================

/// Per-node payload, fixed per dictionary instance.
pub trait NodeData: Copy + Default + Debug + PartialEq + Send + Sync + 'static {}

/// Membership-only dictionary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NoData;

impl NodeData for NoData {}

/// Reference to a posting list owned by the attribute layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PostingRef(u32);

impl PostingRef {
    /// No posting list.
    pub const INVALID: Self = Self(0);

    /// Wrap a raw posting-list reference.
    #[must_use]
    #[inline(always)]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw reference.
    #[must_use]
    #[inline(always)]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// `true` unless this is [`PostingRef::INVALID`].
    #[must_use]
    #[inline(always)]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Default for PostingRef {
    fn default() -> Self {
        Self::INVALID
    }
}

impl NodeData for PostingRef {}

// ============================================================================
//  FrozenRoot
// ============================================================================

/// Immutable snapshot of a dictionary.
///
/// Cloning shares the tree. Lookups take comparators over the buffer set
/// that was live when the root was frozen.
#[derive(Debug, Clone)]
pub struct FrozenRoot<D> {
    root: Link<D>,
}

impl<D> Default for FrozenRoot<D> {
    fn default() -> Self {
        Self { root: None }
    }
}

impl<D: NodeData> FrozenRoot<D> {
    /// Number of handles in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        node::size(&self.root) as usize
    }

    /// `true` when the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Handle and data equal to the needle of `cmp`.
    #[must_use]
    pub fn find(&self, cmp: &dyn EntryComparator) -> Option<(EntryRef, D)> {
        node::find(&self.root, EntryRef::INVALID, cmp).map(|node| (node.key, node.data))
    }

    /// Number of handles equal to the needle of `cmp`.
    ///
    /// With a folded comparator this counts every variant of the term.
    #[must_use]
    pub fn lookup_term(&self, cmp: &dyn EntryComparator) -> u32 {
        node::count_not_greater(&self.root, cmp).saturating_sub(node::count_less(&self.root, cmp))
    }

    /// Number of handles between the needles of `low` and `high`, inclusive.
    ///
    /// 0 for an empty or inverted range.
    #[must_use]
    pub fn lookup_range(&self, low: &dyn EntryComparator, high: &dyn EntryComparator) -> u32 {
        node::count_not_greater(&self.root, high).saturating_sub(node::count_less(&self.root, low))
    }

    /// In-order iteration.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, D> {
        Iter::new(&self.root)
    }

    /// `true` when both snapshots share the same root.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => std::sync::Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

// ============================================================================
//  Dictionary
// ============================================================================

/// Writer-side sorted dictionary.
///
/// Only the live tree is mutable. [`freeze`](Self::freeze) captures it as
/// the [`FrozenRoot`] handed to readers.
#[derive(Debug)]
pub struct Dictionary<D> {
    root: Link<D>,
    frozen: FrozenRoot<D>,
}

impl<D> Default for Dictionary<D> {
    fn default() -> Self {
        Self {
            root: None,
            frozen: FrozenRoot::default(),
        }
    }
}

impl<D: NodeData> Dictionary<D> {
    /// Create an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles in the live tree.
    #[must_use]
    pub fn len(&self) -> usize {
        node::size(&self.root) as usize
    }

    /// `true` when the live tree is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Live handle equal to the needle of `cmp`.
    #[must_use]
    pub fn find(&self, cmp: &dyn EntryComparator) -> Option<EntryRef> {
        node::find(&self.root, EntryRef::INVALID, cmp).map(|node| node.key)
    }

    /// `true` when `key` (a stored handle) is in the live tree.
    #[must_use]
    pub fn contains(&self, key: EntryRef, cmp: &dyn EntryComparator) -> bool {
        node::find(&self.root, key, cmp).is_some_and(|node| node.key == key)
    }

    /// Insert `key`. Returns `false` if an equal value is already present.
    pub fn insert(&mut self, key: EntryRef, data: D, cmp: &dyn EntryComparator) -> bool {
        if node::find(&self.root, key, cmp).is_some() {
            return false;
        }
        self.root = Some(node::insert(self.root.take(), key, data, cmp));
        true
    }

    /// Remove `key`, returning its data. Frozen roots keep it.
    pub fn remove(&mut self, key: EntryRef, cmp: &dyn EntryComparator) -> Option<D> {
        if !self.contains(key, cmp) {
            return None;
        }
        let (root, removed) = node::remove(self.root.take(), key, cmp);
        self.root = root;
        removed
    }

    /// Data stored with `key`.
    #[must_use]
    pub fn data(&self, key: EntryRef, cmp: &dyn EntryComparator) -> Option<D> {
        node::find(&self.root, key, cmp).map(|node| node.data)
    }

    /// Replace the data stored with `key`. Returns `false` if `key` is absent.
    pub fn set_data(&mut self, key: EntryRef, data: D, cmp: &dyn EntryComparator) -> bool {
        if !self.contains(key, cmp) {
            return false;
        }
        node::set_data(&mut self.root, key, data, cmp)
    }

    /// Make the current live tree the frozen root.
    pub fn freeze(&mut self) {
        self.frozen = FrozenRoot {
            root: self.root.clone(),
        };
    }

    /// The root produced by the last [`freeze`](Self::freeze).
    #[must_use]
    pub fn frozen_root(&self) -> FrozenRoot<D> {
        self.frozen.clone()
    }

    /// Snapshot of the live tree, without freezing it.
    #[must_use]
    pub fn live_root(&self) -> FrozenRoot<D> {
        FrozenRoot {
            root: self.root.clone(),
        }
    }

    /// Replace the live tree with a balanced tree over `items`, which must
    /// already be in dictionary order.
    pub fn build_from_sorted(&mut self, items: &[(EntryRef, D)]) {
        self.root = node::build_sorted(items);
    }

    /// Rebuild the live tree with every key passed through `remap`.
    ///
    /// `remap` must preserve dictionary order; compaction copies values
    /// verbatim, so it does.
    pub fn rewrite_keys(&mut self, mut remap: impl FnMut(EntryRef) -> EntryRef) {
        let items: Vec<(EntryRef, D)> = self.iter().map(|(key, data)| (remap(key), data)).collect();
        self.build_from_sorted(&items);
    }

    /// Drop the live and frozen trees.
    pub fn clear(&mut self) {
        self.root = None;
        self.frozen = FrozenRoot::default();
    }

    /// In-order iteration over the live tree.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, D> {
        Iter::new(&self.root)
    }

    /// Memory held by live tree nodes, in bytes.
    #[must_use]
    pub fn memory_usage(&self) -> MemoryUsage {
        let bytes: usize = self.len() * size_of::<Node<D>>();
        MemoryUsage::new(bytes, bytes, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::BufferPool;
    use crate::compare::NumericComparator;
    use crate::config::StoreConfig;
    use crate::entry::HEADER_WORDS;
    use crate::value::EntryValue;

    fn store<T: EntryValue>(pool: &mut BufferPool, value: &T) -> EntryRef {
        let entry = pool.try_alloc(HEADER_WORDS + value.payload_words()).unwrap();
        let payload = pool.buffers().payload(entry).unwrap();
        value.store(&payload[..value.payload_words()]);
        entry
    }

    fn fill(values: &[u32]) -> (BufferPool, Dictionary<NoData>, Vec<EntryRef>) {
        let mut pool = BufferPool::new(StoreConfig::new().with_initial_buffer_words(1024));
        let mut dict = Dictionary::new();
        let mut refs = Vec::new();
        for value in values {
            let entry = store(&mut pool, value);
            let cmp = u32::comparator(pool.buffers(), None);
            assert!(dict.insert(entry, NoData, &cmp));
            refs.push(entry);
        }
        (pool, dict, refs)
    }

    fn values(pool: &BufferPool, iter: Iter<'_, NoData>) -> Vec<u32> {
        iter.map(|(key, _)| crate::value::load_value::<u32>(pool.buffers(), key).unwrap())
            .collect()
    }

    #[test]
    fn test_in_order_and_balanced() {
        let input: Vec<u32> = (0..100).map(|i| (i * 37) % 101).collect();
        let (pool, dict, _) = fill(&input);

        let mut expected = input.clone();
        expected.sort_unstable();
        assert_eq!(values(&pool, dict.iter()), expected);
        assert_eq!(dict.len(), 100);
        node::check(&dict.root);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let (mut pool, mut dict, refs) = fill(&[5, 1, 9]);
        let dup = store(&mut pool, &5_u32);
        let cmp = u32::comparator(pool.buffers(), None);

        assert!(!dict.insert(dup, NoData, &cmp));
        assert_eq!(dict.len(), 3);

        let needle = u32::comparator(pool.buffers(), Some(&5));
        assert_eq!(dict.find(&needle), Some(refs[0]));
    }

    #[test]
    fn test_remove_keeps_frozen_root() {
        let (pool, mut dict, refs) = fill(&[4, 2, 6, 1, 3, 5, 7]);
        dict.freeze();
        let frozen = dict.frozen_root();

        let cmp = u32::comparator(pool.buffers(), None);
        for &entry in &refs[..4] {
            assert_eq!(dict.remove(entry, &cmp), Some(NoData));
        }
        assert_eq!(dict.remove(refs[0], &cmp), None);
        node::check(&dict.root);

        assert_eq!(values(&pool, dict.iter()), vec![3, 5, 7]);
        assert_eq!(values(&pool, frozen.iter()), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_lookup_counts() {
        let (pool, mut dict, _) = fill(&[10, 20, 30, 40, 50]);
        dict.freeze();
        let frozen = dict.frozen_root();
        let needle = |v: u32| NumericComparator::new(pool.buffers(), Some(v));

        assert_eq!(frozen.lookup_term(&needle(30)), 1);
        assert_eq!(frozen.lookup_term(&needle(35)), 0);
        assert_eq!(frozen.lookup_range(&needle(15), &needle(40)), 3);
        assert_eq!(frozen.lookup_range(&needle(10), &needle(50)), 5);
        assert_eq!(frozen.lookup_range(&needle(40), &needle(15)), 0);
        assert_eq!(FrozenRoot::<NoData>::default().lookup_range(&needle(0), &needle(99)), 0);
    }

    #[test]
    fn test_folded_term_counts_variants() {
        let mut pool = BufferPool::new(StoreConfig::new().with_initial_buffer_words(256));
        let mut dict: Dictionary<NoData> = Dictionary::new();
        for word in ["Apple", "apple", "APPLE", "banana"] {
            let entry = store(&mut pool, &word.to_string());
            let cmp = String::comparator(pool.buffers(), None);
            assert!(dict.insert(entry, NoData, &cmp));
        }
        dict.freeze();

        let needle = "aPPle".to_string();
        let folded = String::folded_comparator(pool.buffers(), Some(&needle));
        let exact = String::comparator(pool.buffers(), Some(&needle));
        assert_eq!(dict.frozen_root().lookup_term(&folded), 3);
        assert_eq!(dict.frozen_root().lookup_term(&exact), 0);
    }

    #[test]
    fn test_posting_data() {
        let mut pool = BufferPool::new(StoreConfig::new().with_initial_buffer_words(64));
        let mut dict: Dictionary<PostingRef> = Dictionary::new();
        let entry = store(&mut pool, &7_u64);
        let cmp = u64::comparator(pool.buffers(), None);

        assert!(dict.insert(entry, PostingRef::INVALID, &cmp));
        dict.freeze();
        assert!(dict.set_data(entry, PostingRef::new(11), &cmp));
        assert_eq!(dict.data(entry, &cmp), Some(PostingRef::new(11)));

        let needle = u64::comparator(pool.buffers(), Some(&7));
        assert_eq!(dict.frozen_root().find(&needle), Some((entry, PostingRef::INVALID)));
    }

    #[test]
    fn test_build_and_rewrite() {
        let (pool, dict, _) = fill(&[3, 1, 2, 8, 5]);
        let items: Vec<(EntryRef, NoData)> = dict.iter().collect();

        let mut rebuilt: Dictionary<NoData> = Dictionary::new();
        rebuilt.build_from_sorted(&items);
        node::check(&rebuilt.root);
        assert_eq!(values(&pool, rebuilt.iter()), vec![1, 2, 3, 5, 8]);

        let mut seen = Vec::new();
        rebuilt.rewrite_keys(|key| {
            seen.push(key);
            key
        });
        assert_eq!(seen.len(), 5);
        assert_eq!(rebuilt.memory_usage().used_bytes, 5 * size_of::<Node<NoData>>());
    }
}
