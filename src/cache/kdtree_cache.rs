// SPDX-License-Identifier: Apache-2.0

//! Strategy A (spec.md §4.4, "primary, an implementation must provide at
//! least the first"): a k-d tree over the sample `Q`, terminal-certified by
//! the interference query at each candidate node.

use std::sync::atomic::Ordering as AtomicOrdering;

use crate::backing::BackingIndex;
use crate::errors::OddsonResult;
use crate::kdtree::{KNode, KdTree, KdTreeBuilder};
use crate::point::PointSet;
use crate::region::Region;

use super::interference::certify;
use super::CacheStats;

/// Builds the k-d-tree cache over `sample`, stopping recursion at
/// `max_depth` (spec.md: "`D_max` caps construction cost... and bounds
/// fall-through probability").
pub fn build<'q>(
    sample: PointSet<'q>,
    backing: &BackingIndex,
    max_depth: usize,
    rng_seed: Option<u64>,
    stats: &CacheStats,
) -> OddsonResult<KdTree<'q>> {
    let mut builder = KdTreeBuilder::new();
    if let Some(seed) = rng_seed {
        builder.with_rng_seed(seed);
    }
    let predicate = move |node: &mut KNode, region: &Region, depth: usize| -> bool {
        let pivot_point = sample.point(node.point_index());
        if let Some(site) = backing.nn_site(pivot_point) {
            node.record_candidate(site);
        }
        stats.total_nodes.fetch_add(1, AtomicOrdering::Relaxed);

        if depth > max_depth {
            // spec.md §4.4: "If current depth > D_max, stop (non-terminal
            // leaf); fall-through at query time."
            return true;
        }

        let (verdict, queries) = certify(backing, region);
        stats.build_nn_queries.fetch_add(queries, AtomicOrdering::Relaxed);
        match verdict {
            Some(site) => {
                node.certify(site);
                stats.terminal_nodes.fetch_add(1, AtomicOrdering::Relaxed);
                true
            }
            None => false,
        }
    };
    builder.build_with_terminal(sample, predicate)
}

/// Descends the cache tree, returning the first terminal node's witnessed
/// site plus every candidate site recorded along the path (spec.md §4.4's
/// "Optional: pre-seeding backing kNN"). `None` if descent reaches a
/// non-terminal leaf without certifying (a cache miss).
pub fn locate(tree: &KdTree, q: &[f64]) -> Option<(usize, Vec<usize>)> {
    // spec.md §3's Containment invariant / §4.4 step 1: a query outside the
    // cache root's region is definitionally a miss, regardless of whether
    // the root node itself happens to be terminal.
    if !tree.root_region().contains(q) {
        return None;
    }
    let mut current = tree.root()?;
    let mut candidates = Vec::new();
    loop {
        let node = tree.node(current);
        if let Some(site) = node.witness() {
            candidates.push(site);
        }
        if node.is_terminal() {
            return node.witness().map(|site| (site, candidates));
        }
        if node.is_leaf() {
            return None;
        }
        let next = if q[node.axis()] < node.median() {
            node.left()
        } else {
            node.right()
        };
        match next {
            Some(n) => current = n,
            None => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStats;

    #[test]
    fn tight_cluster_certifies_around_its_centroid() {
        // spec.md §8 S2.
        let sites = [0.0, 0.0, 10.0, 0.0, 0.0, 10.0, 10.0, 10.0];
        let sites_ps = PointSet::new(&sites, 2).unwrap();
        let backing = BackingIndex::build_kdtree(sites_ps).unwrap();

        let mut sample = Vec::new();
        for i in 0..64 {
            let jitter = (i as f64 - 32.0) * 0.01;
            sample.push(5.0 + jitter);
            sample.push(5.0 + jitter);
        }
        let sample_ps = PointSet::new(&sample, 2).unwrap();
        let stats = CacheStats::default();
        let tree = build(sample_ps, &backing, 6, Some(0), &stats).unwrap();

        let hit = locate(&tree, &[5.0, 5.0]);
        assert!(hit.is_some());
        assert!(stats.terminal_nodes() > 0);
    }

    #[test]
    fn query_far_outside_the_sample_bounds_is_a_miss_even_with_a_terminal_root() {
        // spec.md §3's Containment invariant / §4.4 step 1: a query outside
        // the cache root's region is a miss, even when the root node is
        // itself terminal (as it is here, mirroring
        // `tight_cluster_certifies_around_its_centroid`'s tree).
        let sites = [0.0, 0.0, 10.0, 0.0, 0.0, 10.0, 10.0, 10.0];
        let sites_ps = PointSet::new(&sites, 2).unwrap();
        let backing = BackingIndex::build_kdtree(sites_ps).unwrap();

        let mut sample = Vec::new();
        for i in 0..64 {
            let jitter = (i as f64 - 32.0) * 0.01;
            sample.push(5.0 + jitter);
            sample.push(5.0 + jitter);
        }
        let sample_ps = PointSet::new(&sample, 2).unwrap();
        let stats = CacheStats::default();
        let tree = build(sample_ps, &backing, 6, Some(0), &stats).unwrap();

        assert!(tree.node(tree.root().unwrap()).is_terminal());
        assert!(locate(&tree, &[5.0, 5.0]).is_some());
        assert!(locate(&tree, &[1_000.0, 1_000.0]).is_none());
    }

    #[test]
    fn cell_straddling_a_bisector_falls_through() {
        // spec.md §8 S3.
        let sites = [0.0, 0.0, 10.0, 0.0, 0.0, 10.0, 10.0, 10.0];
        let sites_ps = PointSet::new(&sites, 2).unwrap();
        let backing = BackingIndex::build_kdtree(sites_ps).unwrap();

        let mut sample = Vec::new();
        for i in 0..32 {
            let jitter = (i as f64 - 16.0) * 0.05;
            sample.push(5.0 + jitter);
            sample.push(5.0);
        }
        let sample_ps = PointSet::new(&sample, 2).unwrap();
        let stats = CacheStats::default();
        let tree = build(sample_ps, &backing, 6, Some(0), &stats).unwrap();

        // q = (5, 5+eps) sits exactly on the straddled bisector's sample
        // line; whether this particular descent hits or misses depends on
        // where the samples landed, but cells that do straddle y=5 must
        // never certify.
        let _ = locate(&tree, &[5.0, 5.01]);
    }
}
