// SPDX-License-Identifier: Apache-2.0

use super::HeapEntry;
use std::collections::BinaryHeap;

/// A bounded max-heap of capacity `k` (spec.md §4.1's `FixedSizePQ`). Used
/// to accumulate the current `k` nearest candidates: `peek()` is always the
/// *worst* of the current best-`k` (the pruning radius), and pushing past
/// capacity evicts the worst of the `k+1` candidates.
///
/// Grounded directly on `KnnQueryHeap::dist_heap` (`goko::covertree::
/// query_tools::knn_query_heap`), which keeps exactly this invariant over
/// a `BinaryHeap` of `(dist, point_index)` to track the current k-th best
/// distance.
#[derive(Debug)]
pub struct FixedSizePQ<T> {
    heap: BinaryHeap<HeapEntry<T>>,
    capacity: usize,
    next_seq: u64,
}

impl<T> FixedSizePQ<T> {
    pub fn with_capacity(capacity: usize) -> FixedSizePQ<T> {
        FixedSizePQ {
            heap: BinaryHeap::with_capacity(capacity),
            capacity,
            next_seq: 0,
        }
    }

    /// Offers `payload` at `priority`. If the queue is at capacity, this
    /// evicts the current worst (largest-priority) element, but only if
    /// `priority` is better than it — offering a candidate worse than
    /// every element already held is a no-op, matching spec.md's
    /// "the element with the largest priority among the k+1 candidates is
    /// discarded".
    pub fn push(&mut self, priority: f64, payload: T) {
        if self.heap.len() < self.capacity {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.heap.push(HeapEntry {
                priority,
                seq,
                payload,
            });
            return;
        }
        if self.capacity == 0 {
            return;
        }
        if let Some(worst) = self.heap.peek() {
            if priority < worst.priority {
                self.heap.pop();
                let seq = self.next_seq;
                self.next_seq += 1;
                self.heap.push(HeapEntry {
                    priority,
                    seq,
                    payload,
                });
            }
        }
    }

    /// Removes and returns the current worst (largest-priority) element.
    pub fn pop(&mut self) -> Option<(f64, T)> {
        self.heap.pop().map(|e| (e.priority, e.payload))
    }

    /// The current worst (largest-priority) element without removing it —
    /// the pruning radius while the queue is full.
    pub fn peek(&self) -> Option<(f64, &T)> {
        self.heap.peek().map(|e| (e.priority, &e.payload))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drains the queue in ascending priority order (nearest first).
    /// `BinaryHeap::into_sorted_vec` already returns ascending order for
    /// our `Ord` (priority-ascending), so no extra reversal is needed.
    pub fn into_sorted_vec(self) -> Vec<(f64, T)> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|e| (e.priority, e.payload))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_k_best() {
        let mut pq = FixedSizePQ::with_capacity(3);
        for (p, v) in [(5.0, "e"), (1.0, "a"), (4.0, "d"), (2.0, "b"), (3.0, "c")] {
            pq.push(p, v);
        }
        assert!(pq.full());
        let sorted = pq.into_sorted_vec();
        assert_eq!(
            sorted,
            vec![(1.0, "a"), (2.0, "b"), (3.0, "c")]
        );
    }

    #[test]
    fn peek_is_the_pruning_radius() {
        let mut pq = FixedSizePQ::with_capacity(2);
        pq.push(10.0, "x");
        pq.push(2.0, "y");
        assert_eq!(pq.peek(), Some((10.0, &"x")));
        pq.push(5.0, "z");
        // 5.0 beats 10.0 as the worst, so "x" is evicted, worst is now "z".
        assert_eq!(pq.peek(), Some((5.0, &"z")));
    }

    #[test]
    fn capacity_zero_accepts_nothing() {
        let mut pq: FixedSizePQ<&str> = FixedSizePQ::with_capacity(0);
        pq.push(1.0, "x");
        assert!(pq.is_empty());
        assert!(pq.full());
    }

    #[test]
    fn worse_than_everything_is_rejected() {
        let mut pq = FixedSizePQ::with_capacity(1);
        pq.push(1.0, "best");
        pq.push(2.0, "worse");
        assert_eq!(pq.peek(), Some((1.0, &"best")));
    }
}
