// SPDX-License-Identifier: Apache-2.0

//! Priority queues of `(priority, payload)` on top of
//! `std::collections::BinaryHeap` (spec.md §4.1). Grounded on
//! `goko::covertree::query_tools::knn_query_heap::KnnQueryHeap` and
//! `grandma::query_tools::query_items`, which use the same
//! inverted-`Ord`-wrapper idiom to get min-heap behavior and a
//! deterministic tie-break out of a max-heap standard type.

mod bounded;
mod unbounded;

pub use bounded::FixedSizePQ;
pub use unbounded::UnboundedPQ;

use std::cmp::Ordering;

/// A `(priority, payload)` pair ordered by `priority` with a deterministic
/// tie-break on a monotonically increasing sequence number (spec.md §4.1:
/// "ties are broken in an unspecified but consistent manner" / "arbitrarily
/// but deterministically across a single query"). `seq` is assigned at
/// push time, so two entries pushed in the same call never compare equal
/// by accident the way NaN-laced float comparisons otherwise could.
#[derive(Debug, Clone, Copy)]
struct HeapEntry<T> {
    priority: f64,
    seq: u64,
    payload: T,
}

impl<T> PartialEq for HeapEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl<T> Eq for HeapEntry<T> {}

impl<T> PartialOrd for HeapEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for HeapEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.priority.partial_cmp(&other.priority) {
            Some(Ordering::Equal) | None => self.seq.cmp(&other.seq),
            Some(ord) => ord,
        }
    }
}

/// Wraps a `HeapEntry` so that `BinaryHeap` (a max-heap) yields the
/// *smallest* priority first, by inverting the comparison.
#[derive(Debug, Clone, Copy)]
struct MinOrder<T>(HeapEntry<T>);

impl<T> PartialEq for MinOrder<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl<T> Eq for MinOrder<T> {}

impl<T> PartialOrd for MinOrder<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for MinOrder<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.cmp(&self.0)
    }
}
