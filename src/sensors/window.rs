//! Fixed-capacity FIFO history buffer.
//!
//! Backed by a `heapless::Deque`, so inserting into a full window evicts
//! the oldest element in O(1) with no allocation.

use heapless::Deque;

/// Bounded recent-history buffer, oldest first.
#[derive(Debug, Clone)]
pub struct Window<T, const N: usize> {
    items: Deque<T, N>,
}

impl<T, const N: usize> Window<T, N> {
    pub const CAPACITY: usize = N;

    pub const fn new() -> Self {
        Self {
            items: Deque::new(),
        }
    }

    /// Append `item`, returning the evicted oldest element if the window
    /// was already full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.is_full() {
            self.items.pop_front()
        } else {
            None
        };
        // Cannot fail: one slot was freed above if the deque was full.
        let _ = self.items.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Iterate oldest → newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T, const N: usize> Default for Window<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
