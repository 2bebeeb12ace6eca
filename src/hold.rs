//! Generation-tagged hold lists.
//!
//! Anything the writer retires (entry space, whole buffers, superseded
//! buffer copies, remap tables) goes through a [`GenerationHoldList`]:
//!
//! 1. `insert` parks the item as pending.
//! 2. `transfer(generation)` tags every pending item with the generation the
//!    external coordinator just closed.
//! 3. `trim(first_used)` releases every item tagged with a generation
//!    strictly older than the oldest generation a reader may still observe.
//!
//! Nothing here knows about threads. The coordinator supplies both
//! generation values; this module only keeps the bookkeeping exact.

use std::collections::VecDeque;

/// Epoch counter value supplied by the external coordinator.
pub type Generation = u64;

/// Items waiting for every reader of their retirement generation to finish.
#[derive(Debug)]
pub struct GenerationHoldList<T> {
    /// Retired since the last transfer.
    pending: Vec<T>,

    /// Tagged items, oldest generation first.
    held: VecDeque<(Generation, T)>,
}

impl<T> GenerationHoldList<T> {
    /// Create an empty hold list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
            held: VecDeque::new(),
        }
    }

    /// Retire an item. It is not tagged until the next [`transfer`](Self::transfer).
    pub fn insert(&mut self, item: T) {
        self.pending.push(item);
    }

    /// Tag all pending items with `generation`.
    ///
    /// Generations must be non-decreasing across calls.
    pub fn transfer(&mut self, generation: Generation) {
        debug_assert!(
            self.held.back().is_none_or(|(last, _)| *last <= generation),
            "hold list generations must not go backwards"
        );

        self.held
            .extend(self.pending.drain(..).map(|item| (generation, item)));
    }

    /// Release every item tagged with a generation older than `first_used`.
    ///
    /// Pending (untagged) items are never released.
    #[must_use = "released items must be reclaimed by the caller"]
    pub fn trim(&mut self, first_used: Generation) -> Vec<T> {
        let mut released: Vec<T> = Vec::new();
        while let Some((generation, _)) = self.held.front() {
            if *generation >= first_used {
                break;
            }
            if let Some((_, item)) = self.held.pop_front() {
                released.push(item);
            }
        }
        released
    }

    /// Number of untagged items.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of tagged items.
    #[must_use]
    pub fn held_len(&self) -> usize {
        self.held.len()
    }

    /// `true` when nothing is pending or held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.held.is_empty()
    }

    /// Iterate over every item, pending and held.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.held.iter().map(|(_, item)| item).chain(self.pending.iter())
    }

    /// Drop everything regardless of generation.
    ///
    /// Only valid when no reader can observe any held item, e.g. on reset.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.held.clear();
    }
}

impl<T> Default for GenerationHoldList<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_items_are_not_trimmed() {
        let mut list: GenerationHoldList<u32> = GenerationHoldList::new();
        list.insert(1);
        assert!(list.trim(u64::MAX).is_empty());
        assert_eq!(list.pending_len(), 1);
    }

    #[test]
    fn test_trim_is_strictly_older() {
        let mut list: GenerationHoldList<u32> = GenerationHoldList::new();
        list.insert(1);
        list.transfer(5);

        assert!(list.trim(5).is_empty());
        assert_eq!(list.trim(6), vec![1]);
        assert!(list.is_empty());
    }

    #[test]
    fn test_trim_releases_in_generation_order() {
        let mut list: GenerationHoldList<&str> = GenerationHoldList::new();
        list.insert("a");
        list.insert("b");
        list.transfer(1);
        list.insert("c");
        list.transfer(3);
        list.insert("d");

        assert_eq!(list.trim(2), vec!["a", "b"]);
        assert_eq!(list.held_len(), 1);
        assert_eq!(list.trim(10), vec!["c"]);
        assert_eq!(list.pending_len(), 1);
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec!["d"]);
    }

    #[test]
    fn test_clear() {
        let mut list: GenerationHoldList<u32> = GenerationHoldList::default();
        list.insert(1);
        list.transfer(0);
        list.insert(2);
        list.clear();
        assert!(list.is_empty());
    }
}
