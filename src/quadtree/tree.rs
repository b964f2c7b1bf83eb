// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::arena::{Arena, ArenaIndex};
use crate::point::{squared_distance, PointSet};
use crate::pq::{FixedSizePQ, UnboundedPQ};

use super::node::QNode;

/// Observability counters, the quadtree analogue of [`crate::kdtree::
/// KdTreeStats`] (spec.md §9).
#[derive(Debug, Default)]
pub struct QuadtreeStats {
    nodes_visited: AtomicU64,
    nodes_visited_backtrack: AtomicU64,
}

impl QuadtreeStats {
    pub fn nodes_visited(&self) -> u64 {
        self.nodes_visited.load(AtomicOrdering::Relaxed)
    }
    pub fn nodes_visited_backtrack(&self) -> u64 {
        self.nodes_visited_backtrack.load(AtomicOrdering::Relaxed)
    }
}

/// The backing exact nearest-neighbor index of spec.md §4.3: a compressed
/// quadtree over a caller-owned point set, immutable after construction.
/// Exposes the same query surface as [`crate::kdtree::KdTree`] so the
/// Odds-On cache can be built over either (spec.md §4.4: "strategy A/B
/// share an identical query surface").
#[derive(Debug)]
pub struct Quadtree<'p> {
    points: PointSet<'p>,
    arena: Arena<QNode>,
    root: Option<ArenaIndex>,
    stats: QuadtreeStats,
}

impl<'p> Quadtree<'p> {
    pub(crate) fn new(points: PointSet<'p>, arena: Arena<QNode>, root: Option<ArenaIndex>) -> Self {
        Quadtree {
            points,
            arena,
            root,
            stats: QuadtreeStats::default(),
        }
    }

    pub fn points(&self) -> &PointSet<'p> {
        &self.points
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn node(&self, idx: ArenaIndex) -> &QNode {
        self.arena.get(idx)
    }

    pub fn root(&self) -> Option<ArenaIndex> {
        self.root
    }

    pub fn stats(&self) -> &QuadtreeStats {
        &self.stats
    }

    pub fn nn(&self, q: &[f64]) -> Option<ArenaIndex> {
        self.knn(q, 1, 0.0).into_iter().next().map(|(idx, _)| idx)
    }

    /// k-nearest-neighbors of `q`, best-first over the cube tree using each
    /// subtree's cube as an admissible lower bound on the squared distance
    /// to any point it contains (the quadtree counterpart of [`crate::
    /// kdtree::KdTree::knn`]'s priority search).
    pub fn knn(&self, q: &[f64], k: usize, eps: f64) -> Vec<(ArenaIndex, f64)> {
        let seed = FixedSizePQ::with_capacity(k);
        self.knn_seeded(q, k, eps, seed)
    }

    pub fn knn_seeded(
        &self,
        q: &[f64],
        k: usize,
        eps: f64,
        mut result: FixedSizePQ<ArenaIndex>,
    ) -> Vec<(ArenaIndex, f64)> {
        if k == 0 || self.root.is_none() {
            return Vec::new();
        }
        let mut frontier: UnboundedPQ<ArenaIndex> = UnboundedPQ::new();
        frontier.push(0.0, self.root.unwrap());

        while let Some((frontier_dist, idx)) = frontier.pop() {
            if result.full() {
                let kth = result.peek().map(|(d, _)| d).unwrap_or(f64::INFINITY);
                if (1.0 + eps) * frontier_dist >= kth {
                    break;
                }
            }
            self.stats.nodes_visited.fetch_add(1, AtomicOrdering::Relaxed);
            let node = self.arena.get(idx);

            if let Some(point_index) = node.point_index() {
                let sq_dist = squared_distance(q, self.points.point(point_index));
                result.push(sq_dist, idx);
            }

            if node.is_leaf() {
                continue;
            }
            let child_count = 1usize << node.center().len();
            for c in 0..child_count {
                if let Some(child) = node.child(c) {
                    let child_node = self.arena.get(child);
                    let lower_bound = cube_lower_bound_sq(q, child_node.center(), child_node.radius());
                    let kth = if result.full() {
                        result.peek().map(|(d, _)| d).unwrap_or(f64::INFINITY)
                    } else {
                        f64::INFINITY
                    };
                    if (1.0 + eps).powi(2) * lower_bound < kth || !result.full() {
                        if lower_bound > 0.0 {
                            self.stats
                                .nodes_visited_backtrack
                                .fetch_add(1, AtomicOrdering::Relaxed);
                        }
                        frontier.push(lower_bound, child);
                    }
                }
            }
        }

        result
            .into_sorted_vec()
            .into_iter()
            .map(|(d, idx)| (idx, d))
            .collect()
    }

    /// Descends by cube containment to the leaf `q` would land in (spec.md
    /// §4.3). `None` if `q` falls outside the root cube.
    pub fn locate(&self, q: &[f64]) -> Option<ArenaIndex> {
        let mut current = self.root?;
        loop {
            let node = self.arena.get(current);
            if !node.in_node(q) {
                return None;
            }
            if node.is_leaf() {
                return Some(current);
            }
            let child_idx = node.child_index(q);
            match node.child(child_idx) {
                Some(next) => current = next,
                None => return Some(current),
            }
        }
    }

    /// Asserts spec.md §4.3's compression invariant: every internal
    /// (non-leaf) node has at least two non-empty children. Test-only —
    /// panics on violation rather than returning a `bool`, since this is a
    /// construction correctness check, not a query.
    #[cfg(test)]
    pub(crate) fn assert_compression_invariant(&self) {
        fn walk(arena: &Arena<QNode>, idx: ArenaIndex) {
            let node = arena.get(idx);
            if node.is_leaf() {
                return;
            }
            let child_count = 1usize << node.center().len();
            let non_empty = (0..child_count).filter(|&c| node.child(c).is_some()).count();
            assert!(
                non_empty >= 2,
                "internal node has {} non-empty children, expected >= 2",
                non_empty
            );
            for c in 0..child_count {
                if let Some(child) = node.child(c) {
                    walk(arena, child);
                }
            }
        }
        if let Some(root) = self.root {
            walk(&self.arena, root);
        }
    }
}

/// Squared distance from `q` to the nearest point of the cube centered at
/// `center` with half-width `radius` on every axis — zero if `q` is inside.
fn cube_lower_bound_sq(q: &[f64], center: &[f64], radius: f64) -> f64 {
    q.iter()
        .zip(center)
        .map(|(x, c)| {
            let gap = (x - c).abs() - radius;
            if gap > 0.0 {
                gap * gap
            } else {
                0.0
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadtree::builder::QuadtreeBuilder;

    fn square_points() -> Vec<f64> {
        vec![0.0, 0.0, 10.0, 0.0, 0.0, 10.0, 10.0, 10.0]
    }

    #[test]
    fn nn_finds_exact_nearest_corner() {
        let data = square_points();
        let ps = PointSet::new(&data, 2).unwrap();
        let tree = QuadtreeBuilder::new().build(ps).unwrap();
        let idx = tree.nn(&[1.0, 1.0]).unwrap();
        let node = tree.node(idx);
        let p = tree.points().point(node.point_index().unwrap());
        assert_eq!(p, &[0.0, 0.0]);
    }

    #[test]
    fn knn_on_colinear_points() {
        let mut data = Vec::new();
        for x in 1..=10 {
            data.push(x as f64);
            data.push(0.0);
        }
        let ps = PointSet::new(&data, 2).unwrap();
        let tree = QuadtreeBuilder::new().build(ps).unwrap();
        let results = tree.knn(&[0.0, 0.0], 3, 0.0);
        assert_eq!(results.len(), 3);
        let dists: Vec<f64> = results.iter().map(|(_, d)| *d).collect();
        assert_eq!(dists, vec![1.0, 4.0, 9.0]);
    }

    #[test]
    fn locate_stays_within_the_root_cube() {
        let data = square_points();
        let ps = PointSet::new(&data, 2).unwrap();
        let tree = QuadtreeBuilder::new().build(ps).unwrap();
        assert!(tree.locate(&[1.0, 1.0]).is_some());
        assert!(tree.locate(&[1000.0, 1000.0]).is_none());
    }

    #[test]
    fn knn_k_zero_returns_empty() {
        let data = vec![0.0, 0.0];
        let ps = PointSet::new(&data, 2).unwrap();
        let tree = QuadtreeBuilder::new().build(ps).unwrap();
        assert!(tree.knn(&[0.0, 0.0], 0, 0.0).is_empty());
    }
}
