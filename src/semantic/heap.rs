//! Capacity-bounded min-heap for top-K selection.

use std::cmp::Ordering;

/// A min-heap that never holds more than `capacity` items.
///
/// `cmp(a, b) == Greater` means `a` ranks above `b`. Once full, a new item
/// only enters by evicting the current minimum, and only if it ranks
/// strictly above it.
pub struct BoundedHeap<T, C> {
    items: Vec<T>,
    capacity: usize,
    cmp: C,
}

impl<T, C> BoundedHeap<T, C>
where
    C: Fn(&T, &T) -> Ordering,
{
    pub fn new(capacity: usize, cmp: C) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
            cmp,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The lowest-ranked item currently held.
    pub fn peek_min(&self) -> Option<&T> {
        self.items.first()
    }

    /// Offer a candidate. Returns whether it was kept.
    pub fn offer(&mut self, item: T) -> bool {
        if self.capacity == 0 {
            return false;
        }

        if self.items.len() < self.capacity {
            self.items.push(item);
            self.sift_up(self.items.len() - 1);
            return true;
        }

        if (self.cmp)(&item, &self.items[0]) == Ordering::Greater {
            self.items[0] = item;
            self.sift_down(0);
            return true;
        }

        false
    }

    pub fn pop_min(&mut self) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }

        let last = self.items.len() - 1;
        self.items.swap(0, last);
        let min = self.items.pop();
        if !self.items.is_empty() {
            self.sift_down(0);
        }
        min
    }

    /// Drain the heap, highest-ranked first.
    pub fn into_sorted_desc(mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.items.len());
        while let Some(item) = self.pop_min() {
            out.push(item);
        }
        out.reverse();
        out
    }

    fn less(&self, a: usize, b: usize) -> bool {
        (self.cmp)(&self.items[a], &self.items[b]) == Ordering::Less
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.less(pos, parent) {
                break;
            }
            self.items.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut smallest = pos;

            if left < len && self.less(left, smallest) {
                smallest = left;
            }
            if right < len && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == pos {
                break;
            }

            self.items.swap(pos, smallest);
            pos = smallest;
        }
    }
}
