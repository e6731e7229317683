//! Fixed-capacity heap that retains the `K` best `(key, value)` pairs.
//!
//! The heap is stored as an implicit binary tree whose root is always the
//! *worst* retained entry, so both the pruning threshold and eviction are
//! `O(1)` and `O(log K)` respectively. "Best" is configurable: nearest-neighbour
//! search keeps the smallest distances, while ranking-style callers can keep the
//! largest keys.
//!
//! `NaN` keys are rejected silently so they can never corrupt the ordering.

/// Which end of the key range a [`BoundedHeap`] retains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keep {
    /// Keep the `K` smallest keys; the worst retained key is the largest.
    Smallest,
    /// Keep the `K` largest keys; the worst retained key is the smallest.
    Largest,
}

/// A bounded heap of `(key, value)` pairs.
#[derive(Debug, Clone)]
pub struct BoundedHeap<T> {
    capacity: usize,
    keep: Keep,
    entries: Vec<(f64, T)>,
}

impl<T> BoundedHeap<T> {
    /// Create an empty heap holding at most `capacity` entries.
    pub fn new(capacity: usize, keep: Keep) -> Self {
        Self {
            capacity,
            keep,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Heap that keeps the `capacity` smallest keys (k-nearest bookkeeping).
    pub fn smallest(capacity: usize) -> Self {
        Self::new(capacity, Keep::Smallest)
    }

    /// Heap that keeps the `capacity` largest keys.
    pub fn largest(capacity: usize) -> Self {
        Self::new(capacity, Keep::Largest)
    }

    /// Maximum number of retained entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Which end of the key range is retained.
    pub fn keep(&self) -> Keep {
        self.keep
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the heap holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the heap holds `capacity` entries.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Drop all entries, keeping the allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Offer a candidate. Returns `true` if it was retained.
    ///
    /// When the heap is full the candidate must be strictly better than the
    /// current worst entry, which is then evicted.
    pub fn offer(&mut self, key: f64, value: T) -> bool {
        if key.is_nan() || self.capacity == 0 {
            return false;
        }
        if self.entries.len() < self.capacity {
            self.entries.push((key, value));
            self.sift_up(self.entries.len() - 1);
            return true;
        }
        if !self.worse(self.entries[0].0, key) {
            return false;
        }
        self.entries[0] = (key, value);
        self.sift_down(0);
        true
    }

    /// The key a new candidate has to beat to be retained.
    ///
    /// Returns the worst retained key once the heap is full. Before that any
    /// key qualifies, so the result is `+inf` (or `-inf` when keeping the
    /// largest keys). A zero-capacity heap accepts nothing.
    pub fn threshold(&self) -> f64 {
        let open = match self.keep {
            Keep::Smallest => f64::INFINITY,
            Keep::Largest => f64::NEG_INFINITY,
        };
        if self.capacity == 0 {
            return -open;
        }
        if self.is_full() {
            self.entries[0].0
        } else {
            open
        }
    }

    /// The worst retained entry, if any.
    pub fn peek_worst(&self) -> Option<(f64, &T)> {
        self.entries.first().map(|(k, v)| (*k, v))
    }

    /// Remove and return the worst retained entry.
    ///
    /// # Panics
    ///
    /// Panics if the heap is empty; callers size and fill the heap themselves.
    pub fn remove_worst(&mut self) -> (f64, T) {
        assert!(!self.entries.is_empty(), "remove_worst called on an empty BoundedHeap");
        let worst = self.entries.swap_remove(0);
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        worst
    }

    /// Iterate retained entries in heap (unspecified) order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &T)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Consume the heap, returning entries best first.
    pub fn into_sorted_vec(self) -> Vec<(f64, T)> {
        let mut entries = self.entries;
        sort_best_first(&mut entries, self.keep);
        entries
    }

    /// Remove all entries, returning them best first. The allocation is kept.
    pub fn drain_sorted(&mut self) -> Vec<(f64, T)> {
        let mut out: Vec<(f64, T)> = self.entries.drain(..).collect();
        sort_best_first(&mut out, self.keep);
        out
    }

    /// Empty the heap and change its capacity.
    pub fn reset(&mut self, capacity: usize) {
        self.entries.clear();
        self.capacity = capacity;
    }

    /// Whether key `a` ranks worse than key `b`.
    #[inline]
    fn worse(&self, a: f64, b: f64) -> bool {
        match self.keep {
            Keep::Smallest => a > b,
            Keep::Largest => a < b,
        }
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.worse(self.entries[i].0, self.entries[parent].0) {
                break;
            }
            self.entries.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.entries.len();
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut top = i;
            if left < n && self.worse(self.entries[left].0, self.entries[top].0) {
                top = left;
            }
            if right < n && self.worse(self.entries[right].0, self.entries[top].0) {
                top = right;
            }
            if top == i {
                break;
            }
            self.entries.swap(i, top);
            i = top;
        }
    }
}

fn sort_best_first<T>(entries: &mut [(f64, T)], keep: Keep) {
    entries.sort_by(|a, b| match keep {
        Keep::Smallest => a.0.total_cmp(&b.0),
        Keep::Largest => b.0.total_cmp(&a.0),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_k_smallest() {
        let mut heap = BoundedHeap::smallest(3);
        for (i, k) in [5.0, 1.0, 9.0, 3.0, 7.0, 2.0].into_iter().enumerate() {
            heap.offer(k, i);
        }
        assert!(heap.is_full());
        assert_eq!(heap.threshold(), 3.0);

        let sorted = heap.into_sorted_vec();
        let keys: Vec<f64> = sorted.iter().map(|e| e.0).collect();
        assert_eq!(keys, vec![1.0, 2.0, 3.0]);
        assert_eq!(sorted[0].1, 1);
        assert_eq!(sorted[1].1, 5);
    }

    #[test]
    fn keeps_k_largest() {
        let mut heap = BoundedHeap::largest(2);
        for k in [5.0, 1.0, 9.0, 3.0] {
            heap.offer(k, ());
        }
        assert_eq!(heap.threshold(), 5.0);
        let keys: Vec<f64> = heap.into_sorted_vec().into_iter().map(|e| e.0).collect();
        assert_eq!(keys, vec![9.0, 5.0]);
    }

    #[test]
    fn threshold_is_open_until_full() {
        let mut heap = BoundedHeap::smallest(2);
        assert_eq!(heap.threshold(), f64::INFINITY);
        heap.offer(4.0, 'a');
        assert_eq!(heap.threshold(), f64::INFINITY);
        heap.offer(2.0, 'b');
        assert_eq!(heap.threshold(), 4.0);
        // Not strictly better than the worst: rejected.
        assert!(!heap.offer(4.0, 'c'));
        assert!(heap.offer(3.0, 'd'));
        assert_eq!(heap.threshold(), 3.0);
    }

    #[test]
    fn nan_keys_are_rejected() {
        let mut heap = BoundedHeap::smallest(2);
        assert!(!heap.offer(f64::NAN, 0));
        heap.offer(1.0, 1);
        heap.offer(2.0, 2);
        assert!(!heap.offer(f64::NAN, 3));
        assert_eq!(heap.len(), 2);
        assert_eq!(heap.threshold(), 2.0);
    }

    #[test]
    fn remove_worst_pops_in_worst_first_order() {
        let mut heap = BoundedHeap::smallest(4);
        for k in [3.0, 1.0, 4.0, 2.0] {
            heap.offer(k, ());
        }
        let popped: Vec<f64> = (0..4).map(|_| heap.remove_worst().0).collect();
        assert_eq!(popped, vec![4.0, 3.0, 2.0, 1.0]);
        assert!(heap.is_empty());
    }

    #[test]
    #[should_panic(expected = "empty")]
    fn remove_worst_on_empty_panics() {
        let mut heap: BoundedHeap<()> = BoundedHeap::smallest(1);
        heap.remove_worst();
    }

    #[test]
    fn zero_capacity_accepts_nothing() {
        let mut heap = BoundedHeap::smallest(0);
        assert!(!heap.offer(1.0, ()));
        assert_eq!(heap.threshold(), f64::NEG_INFINITY);
    }
}
