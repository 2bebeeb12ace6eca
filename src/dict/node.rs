//! Persistent AVL nodes.
//!
//! Nodes are shared through `Arc`. Every mutation goes through
//! [`Arc::make_mut`], so a node reachable from a frozen root is copied
//! before it is changed and the frozen tree never observes a write. A node
//! owned by the live tree alone is mutated in place.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::compare::EntryComparator;
use crate::entry_ref::EntryRef;

use super::NodeData;

pub(crate) type Link<D> = Option<Arc<Node<D>>>;

#[derive(Debug, Clone)]
pub(crate) struct Node<D> {
    pub(crate) key: EntryRef,
    pub(crate) data: D,
    pub(crate) left: Link<D>,
    pub(crate) right: Link<D>,
    height: u8,
    size: u32,
}

#[inline(always)]
pub(crate) fn height<D>(link: &Link<D>) -> u8 {
    link.as_ref().map_or(0, |node| node.height)
}

#[inline(always)]
pub(crate) fn size<D>(link: &Link<D>) -> u32 {
    link.as_ref().map_or(0, |node| node.size)
}

impl<D: NodeData> Node<D> {
    fn new(key: EntryRef, data: D, left: Link<D>, right: Link<D>) -> Self {
        let mut node = Self {
            key,
            data,
            left,
            right,
            height: 0,
            size: 0,
        };
        node.update();
        node
    }

    #[inline(always)]
    fn update(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
        self.size = 1 + size(&self.left) + size(&self.right);
    }

    fn balance(&self) -> i32 {
        i32::from(height(&self.left)) - i32::from(height(&self.right))
    }
}

// ============================================================================
//  Rotations
// ============================================================================

fn rotate_right<D: NodeData>(mut node: Arc<Node<D>>) -> Arc<Node<D>> {
    let inner: &mut Node<D> = Arc::make_mut(&mut node);
    let Some(mut pivot) = inner.left.take() else {
        return node;
    };
    let pivot_inner: &mut Node<D> = Arc::make_mut(&mut pivot);
    inner.left = pivot_inner.right.take();
    inner.update();
    pivot_inner.right = Some(node);
    pivot_inner.update();
    pivot
}

fn rotate_left<D: NodeData>(mut node: Arc<Node<D>>) -> Arc<Node<D>> {
    let inner: &mut Node<D> = Arc::make_mut(&mut node);
    let Some(mut pivot) = inner.right.take() else {
        return node;
    };
    let pivot_inner: &mut Node<D> = Arc::make_mut(&mut pivot);
    inner.right = pivot_inner.left.take();
    inner.update();
    pivot_inner.left = Some(node);
    pivot_inner.update();
    pivot
}

/// Restore the AVL invariant at `node` after one of its subtrees changed.
fn rebalance<D: NodeData>(mut node: Arc<Node<D>>) -> Arc<Node<D>> {
    let inner: &mut Node<D> = Arc::make_mut(&mut node);
    inner.update();

    let balance: i32 = inner.balance();
    if balance > 1 {
        if let Some(left) = inner.left.take() {
            let left = if left.balance() < 0 {
                rotate_left(left)
            } else {
                left
            };
            inner.left = Some(left);
        }
        return rotate_right(node);
    }
    if balance < -1 {
        if let Some(right) = inner.right.take() {
            let right = if right.balance() > 0 {
                rotate_right(right)
            } else {
                right
            };
            inner.right = Some(right);
        }
        return rotate_left(node);
    }
    node
}

// ============================================================================
//  Mutation
// ============================================================================

/// Insert `key`, which must not be present yet.
pub(crate) fn insert<D: NodeData>(
    link: Link<D>,
    key: EntryRef,
    data: D,
    cmp: &dyn EntryComparator,
) -> Arc<Node<D>> {
    let Some(mut node) = link else {
        return Arc::new(Node::new(key, data, None, None));
    };

    let inner: &mut Node<D> = Arc::make_mut(&mut node);
    if cmp.less(key, inner.key) {
        inner.left = Some(insert(inner.left.take(), key, data, cmp));
    } else {
        inner.right = Some(insert(inner.right.take(), key, data, cmp));
    }
    rebalance(node)
}

/// Remove `key`, which must be present. Returns the new subtree and the removed data.
pub(crate) fn remove<D: NodeData>(
    link: Link<D>,
    key: EntryRef,
    cmp: &dyn EntryComparator,
) -> (Link<D>, Option<D>) {
    let Some(mut node) = link else {
        return (None, None);
    };

    match cmp.compare(key, node.key) {
        Ordering::Less => {
            let inner: &mut Node<D> = Arc::make_mut(&mut node);
            let (left, removed) = remove(inner.left.take(), key, cmp);
            inner.left = left;
            (Some(rebalance(node)), removed)
        }
        Ordering::Greater => {
            let inner: &mut Node<D> = Arc::make_mut(&mut node);
            let (right, removed) = remove(inner.right.take(), key, cmp);
            inner.right = right;
            (Some(rebalance(node)), removed)
        }
        Ordering::Equal => {
            let removed: Option<D> = Some(node.data);
            let replacement: Link<D> = match (node.left.clone(), node.right.clone()) {
                (None, right) => right,
                (left, None) => left,
                (Some(left), Some(right)) => {
                    let (min_key, min_data, rest) = remove_min(right);
                    Some(rebalance(Arc::new(Node::new(
                        min_key,
                        min_data,
                        Some(left),
                        rest,
                    ))))
                }
            };
            (replacement, removed)
        }
    }
}

fn remove_min<D: NodeData>(mut node: Arc<Node<D>>) -> (EntryRef, D, Link<D>) {
    if node.left.is_none() {
        return (node.key, node.data, node.right.clone());
    }

    let inner: &mut Node<D> = Arc::make_mut(&mut node);
    let Some(left) = inner.left.take() else {
        return (inner.key, inner.data, inner.right.take());
    };
    let (min_key, min_data, rest) = remove_min(left);
    inner.left = rest;
    (min_key, min_data, Some(rebalance(node)))
}

/// Replace the data stored with `key`, which must be present.
pub(crate) fn set_data<D: NodeData>(
    link: &mut Link<D>,
    key: EntryRef,
    data: D,
    cmp: &dyn EntryComparator,
) -> bool {
    let Some(node) = link.as_mut() else {
        return false;
    };

    match cmp.compare(key, node.key) {
        Ordering::Equal => {
            Arc::make_mut(node).data = data;
            true
        }
        Ordering::Less => set_data(&mut Arc::make_mut(node).left, key, data, cmp),
        Ordering::Greater => set_data(&mut Arc::make_mut(node).right, key, data, cmp),
    }
}

/// Balanced tree over `items`, which must already be in dictionary order.
pub(crate) fn build_sorted<D: NodeData>(items: &[(EntryRef, D)]) -> Link<D> {
    if items.is_empty() {
        return None;
    }

    let mid: usize = items.len() / 2;
    let (key, data) = items[mid];
    Some(Arc::new(Node::new(
        key,
        data,
        build_sorted(&items[..mid]),
        build_sorted(&items[mid + 1..]),
    )))
}

// ============================================================================
//  Queries
// ============================================================================

/// Node equal to the needle (or to `key` when it is a stored handle).
pub(crate) fn find<'a, D>(
    mut link: &'a Link<D>,
    key: EntryRef,
    cmp: &dyn EntryComparator,
) -> Option<&'a Node<D>> {
    while let Some(node) = link.as_deref() {
        match cmp.compare(key, node.key) {
            Ordering::Equal => return Some(node),
            Ordering::Less => link = &node.left,
            Ordering::Greater => link = &node.right,
        }
    }
    None
}

/// Number of keys ordering strictly before the needle.
pub(crate) fn count_less<D>(mut link: &Link<D>, cmp: &dyn EntryComparator) -> u32 {
    let mut count: u32 = 0;
    while let Some(node) = link.as_deref() {
        if cmp.compare(node.key, EntryRef::INVALID) == Ordering::Less {
            count += size(&node.left) + 1;
            link = &node.right;
        } else {
            link = &node.left;
        }
    }
    count
}

/// Number of keys not ordering after the needle.
pub(crate) fn count_not_greater<D>(mut link: &Link<D>, cmp: &dyn EntryComparator) -> u32 {
    let mut count: u32 = 0;
    while let Some(node) = link.as_deref() {
        if cmp.compare(node.key, EntryRef::INVALID) == Ordering::Greater {
            link = &node.left;
        } else {
            count += size(&node.left) + 1;
            link = &node.right;
        }
    }
    count
}

/// Check the AVL and size invariants; returns the subtree height.
#[cfg(test)]
pub(crate) fn check<D>(link: &Link<D>) -> u8 {
    let Some(node) = link.as_deref() else {
        return 0;
    };
    let left: u8 = check(&node.left);
    let right: u8 = check(&node.right);
    assert!(left.abs_diff(right) <= 1, "unbalanced node {:?}", node.key);
    assert_eq!(node.height, 1 + left.max(right));
    assert_eq!(node.size, 1 + size(&node.left) + size(&node.right));
    node.height
}
