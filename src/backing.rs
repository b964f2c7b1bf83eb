// SPDX-License-Identifier: Apache-2.0

//! The exact nearest-neighbor index backing a [`crate::facade::Facade`]
//! (spec.md §6's `build_backing(points, d) -> BackingIndex`). Either a
//! [`KdTree`] or a [`Quadtree`] can serve this role — spec.md §4.3 names
//! the quadtree as an "alternative backing for the cache", but nothing
//! restricts it from also being the backing index itself, so `BackingIndex`
//! is a thin enum dispatch rather than committing to one structure.

use crate::errors::OddsonResult;
use crate::kdtree::{KdTree, KdTreeBuilder};
use crate::point::PointSet;
use crate::pq::FixedSizePQ;
use crate::quadtree::{Quadtree, QuadtreeBuilder};

/// The exact backing index: a complete k-d tree or compressed quadtree over
/// every site in `P`.
#[derive(Debug)]
pub enum BackingIndex<'p> {
    KdTree(KdTree<'p>),
    Quadtree(Quadtree<'p>),
}

impl<'p> BackingIndex<'p> {
    /// Builds a complete k-d tree backing index (spec.md §6's
    /// `build_backing`, defaulting to the k-d tree since spec.md calls the
    /// k-d tree cache "primary" and nothing distinguishes the two trees as
    /// *backing* indices).
    pub fn build_kdtree(points: PointSet<'p>) -> OddsonResult<BackingIndex<'p>> {
        Ok(BackingIndex::KdTree(KdTreeBuilder::new().build(points)?))
    }

    /// Builds a complete compressed quadtree backing index.
    pub fn build_quadtree(points: PointSet<'p>) -> OddsonResult<BackingIndex<'p>> {
        Ok(BackingIndex::Quadtree(QuadtreeBuilder::new().build(points)?))
    }

    pub fn points(&self) -> &PointSet<'p> {
        match self {
            BackingIndex::KdTree(t) => t.points(),
            BackingIndex::Quadtree(t) => t.points(),
        }
    }

    /// Exact nearest site index of `q`, or `None` over an empty index
    /// (spec.md §7's `EmptyIndex`: "never raises").
    pub fn nn_site(&self, q: &[f64]) -> Option<usize> {
        match self {
            BackingIndex::KdTree(t) => t.nn(q).map(|idx| t.node(idx).point_index()),
            BackingIndex::Quadtree(t) => t.nn(q).and_then(|idx| t.node(idx).point_index()),
        }
    }

    /// `(site index, squared distance)` pairs in ascending distance order,
    /// `min(k, n)` results (spec.md §4.2's "Invalid-k is defined").
    pub fn knn(&self, q: &[f64], k: usize, eps: f64) -> Vec<(usize, f64)> {
        match self {
            BackingIndex::KdTree(t) => t
                .knn(q, k, eps)
                .into_iter()
                .map(|(idx, d)| (t.node(idx).point_index(), d))
                .collect(),
            BackingIndex::Quadtree(t) => t
                .knn(q, k, eps)
                .into_iter()
                .filter_map(|(idx, d)| t.node(idx).point_index().map(|p| (p, d)))
                .collect(),
        }
    }

    /// Like [`BackingIndex::knn`], but accepts a pre-populated bounded
    /// result queue of arena indices — used internally by the facade's
    /// cache pre-seeding path (spec.md §4.4's "Optional: pre-seeding
    /// backing kNN"). `seed_sites` are candidate site indices the cache
    /// descent turned up; they are resolved to an initial lower bound
    /// before the search proceeds.
    pub fn knn_seeded_sites(
        &self,
        q: &[f64],
        k: usize,
        eps: f64,
        seed_sites: &[usize],
    ) -> Vec<(usize, f64)> {
        match self {
            BackingIndex::KdTree(t) => {
                let mut seed = FixedSizePQ::with_capacity(k);
                // Seeding needs arena indices, not site indices; resolve
                // each seed site to its k-d node by a direct NN probe on
                // the site's own coordinates (exact, since the site is in
                // the tree).
                for &site in seed_sites {
                    if let Some(idx) = t.nn(t.points().point(site)) {
                        let d = crate::point::squared_distance(q, t.points().point(site));
                        seed.push(d, idx);
                    }
                }
                t.knn_seeded(q, k, eps, seed)
                    .into_iter()
                    .map(|(idx, d)| (t.node(idx).point_index(), d))
                    .collect()
            }
            BackingIndex::Quadtree(t) => {
                let mut seed = FixedSizePQ::with_capacity(k);
                for &site in seed_sites {
                    if let Some(idx) = t.nn(t.points().point(site)) {
                        let d = crate::point::squared_distance(q, t.points().point(site));
                        seed.push(d, idx);
                    }
                }
                t.knn_seeded(q, k, eps, seed)
                    .into_iter()
                    .filter_map(|(idx, d)| t.node(idx).point_index().map(|p| (p, d)))
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kdtree_backing_finds_exact_corner() {
        let data = [0.0, 0.0, 10.0, 0.0, 0.0, 10.0, 10.0, 10.0];
        let ps = PointSet::new(&data, 2).unwrap();
        let backing = BackingIndex::build_kdtree(ps).unwrap();
        assert_eq!(backing.nn_site(&[1.0, 1.0]), Some(0));
    }

    #[test]
    fn quadtree_backing_finds_exact_corner() {
        let data = [0.0, 0.0, 10.0, 0.0, 0.0, 10.0, 10.0, 10.0];
        let ps = PointSet::new(&data, 2).unwrap();
        let backing = BackingIndex::build_quadtree(ps).unwrap();
        assert_eq!(backing.nn_site(&[1.0, 1.0]), Some(0));
    }
}
