// SPDX-License-Identifier: Apache-2.0

//! Strategy B (spec.md §4.4, "alternative"): a compressed quadtree over the
//! sample `Q`, terminal-certified the same way as the k-d-tree cache but
//! over the node's cube.

use std::sync::atomic::Ordering as AtomicOrdering;

use crate::backing::BackingIndex;
use crate::errors::OddsonResult;
use crate::point::PointSet;
use crate::quadtree::{QNode, Quadtree, QuadtreeBuilder};
use crate::region::Region;

use super::interference::certify;
use super::CacheStats;

pub fn build<'q>(
    sample: PointSet<'q>,
    backing: &BackingIndex,
    max_depth: usize,
    stats: &CacheStats,
) -> OddsonResult<Quadtree<'q>> {
    let builder = QuadtreeBuilder::new();
    let predicate = move |node: &mut QNode, region: &Region, depth: usize| -> bool {
        if let Some(point_index) = node.point_index() {
            if let Some(site) = backing.nn_site(sample.point(point_index)) {
                node.record_candidate(site);
            }
        }
        stats.total_nodes.fetch_add(1, AtomicOrdering::Relaxed);

        if depth > max_depth {
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

/// The quadtree-cache analogue of [`crate::cache::kdtree_cache::locate`].
pub fn locate(tree: &Quadtree, q: &[f64]) -> Option<(usize, Vec<usize>)> {
    let mut current = tree.root()?;
    let mut candidates = Vec::new();
    loop {
        let node = tree.node(current);
        if !node.in_node(q) {
            return None;
        }
        if let Some(site) = node.witness() {
            candidates.push(site);
        }
        if node.is_terminal() {
            return node.witness().map(|site| (site, candidates));
        }
        if node.is_leaf() {
            return None;
        }
        match node.child(node.child_index(q)) {
            Some(next) => current = next,
            None => return None,
        }
    }
}
