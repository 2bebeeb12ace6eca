use crate::entry_ref::EntryRef;

use super::NodeData;
use super::node::{Link, Node};

/// In-order iterator over a dictionary tree.
#[derive(Debug)]
pub struct Iter<'a, D> {
    stack: Vec<&'a Node<D>>,
    remaining: usize,
}

impl<'a, D: NodeData> Iter<'a, D> {
    pub(crate) fn new(root: &'a Link<D>) -> Self {
        let mut iter = Self {
            stack: Vec::new(),
            remaining: super::node::size(root) as usize,
        };
        iter.push_left(root);
        iter
    }

    fn push_left(&mut self, mut link: &'a Link<D>) {
        while let Some(node) = link.as_deref() {
            self.stack.push(node);
            link = &node.left;
        }
    }
}

impl<D: NodeData> Iterator for Iter<'_, D> {
    type Item = (EntryRef, D);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(&node.right);
        self.remaining -= 1;
        Some((node.key, node.data))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<D: NodeData> ExactSizeIterator for Iter<'_, D> {}
