// SPDX-License-Identifier: Apache-2.0

//! Strategy C (spec.md §4.4, "historical variant, presented as an option"):
//! sort the sample by Z-order, merge maximal runs of identical exact-1-NN
//! into leaf cells, then pairwise-merge the leaves bottom-up into a binary
//! tree of union bounding boxes. Unlike the k-d and quadtree caches this
//! strategy allocates its nodes individually (spec.md §5 explicitly permits
//! this: "the cache may allocate nodes individually") rather than through
//! an [`crate::arena::Arena`] — there is no fixed node count known in
//! advance once runs are merged pairwise.
//!
//! spec.md's Open Questions section flags that one source variant
//! certifies a run's bounding box using only two off-diagonal corners; this
//! is an explicitly rejected weakening. This implementation always
//! certifies all `2^d` corners via [`super::interference::certify`].

use std::sync::atomic::Ordering as AtomicOrdering;

use crate::backing::BackingIndex;
use crate::point::PointSet;
use crate::region::Region;
use crate::zorder::sort_by_zorder;

use super::interference::certify;
use super::CacheStats;

/// A node of the Z-order run tree: either a certified or fallen-through
/// leaf cell, or an internal node unioning two children's bounding boxes.
#[derive(Debug)]
enum ZNode {
    Leaf {
        bbox: Region,
        /// `Some(site)` iff this leaf's bounding box certified (all 2^d
        /// corners share one exact NN); `None` for a non-terminal,
        /// fallen-through leaf.
        site: Option<usize>,
    },
    Internal {
        bbox: Region,
        left: Box<ZNode>,
        right: Box<ZNode>,
    },
}

impl ZNode {
    fn bbox(&self) -> &Region {
        match self {
            ZNode::Leaf { bbox, .. } => bbox,
            ZNode::Internal { bbox, .. } => bbox,
        }
    }
}

fn union(a: &Region, b: &Region) -> Region {
    let dim = a.dim();
    let lo: Vec<f64> = (0..dim).map(|k| a.min()[k].min(b.min()[k])).collect();
    let hi: Vec<f64> = (0..dim).map(|k| a.max()[k].max(b.max()[k])).collect();
    Region::from_bounds(&lo, &hi)
}

/// The cache built by Strategy C, over a caller-owned sample.
#[derive(Debug)]
pub struct ZOrderTree<'p> {
    points: PointSet<'p>,
    root: Option<ZNode>,
}

/// Minimum run length to attempt certification (spec.md: "length ≥ 3-4").
const MIN_RUN_LEN_DEFAULT: usize = 3;

pub fn build<'q>(
    sample: PointSet<'q>,
    backing: &BackingIndex,
    min_run_len: usize,
    stats: &CacheStats,
) -> ZOrderTree<'q> {
    let min_run_len = min_run_len.max(MIN_RUN_LEN_DEFAULT);
    let n = sample.len();
    if n == 0 {
        return ZOrderTree { points: sample, root: None };
    }

    let mut order: Vec<usize> = (0..n).collect();
    sort_by_zorder(&sample, &mut order);

    let own_nn: Vec<Option<usize>> = order
        .iter()
        .map(|&i| backing.nn_site(sample.point(i)))
        .collect();

    // Split `order` into maximal runs of consecutive samples sharing the
    // same exact-1-NN.
    let mut leaves: Vec<ZNode> = Vec::new();
    let mut start = 0usize;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && own_nn[end] == own_nn[start] {
            end += 1;
        }
        let run = &order[start..end];
        let bbox = bounding_box_of(&sample, run);
        stats.total_nodes.fetch_add(1, AtomicOrdering::Relaxed);

        let site = if run.len() >= min_run_len {
            let (verdict, queries) = certify(backing, &bbox);
            stats.build_nn_queries.fetch_add(queries, AtomicOrdering::Relaxed);
            match verdict {
                Some(site) if Some(site) == own_nn[start] => {
                    stats.terminal_nodes.fetch_add(1, AtomicOrdering::Relaxed);
                    Some(site)
                }
                _ => None,
            }
        } else {
            None
        };
        leaves.push(ZNode::Leaf { bbox, site });
        start = end;
    }

    // Pairwise bottom-up merge (spec.md: "leaves are pairwise merged
    // bottom-up into a binary tree whose internal nodes carry the union
    // bounding box").
    let mut level = leaves;
    while level.len() > 1 {
        let mut next = Vec::with_capacity((level.len() + 1) / 2);
        let mut it = level.into_iter();
        while let Some(a) = it.next() {
            match it.next() {
                Some(b) => {
                    let bbox = union(a.bbox(), b.bbox());
                    next.push(ZNode::Internal {
                        bbox,
                        left: Box::new(a),
                        right: Box::new(b),
                    });
                }
                None => next.push(a),
            }
        }
        level = next;
    }

    ZOrderTree {
        points: sample,
        root: level.into_iter().next(),
    }
}

fn bounding_box_of(points: &PointSet, indices: &[usize]) -> Region {
    let dim = points.dim();
    let mut lo = vec![f64::INFINITY; dim];
    let mut hi = vec![f64::NEG_INFINITY; dim];
    for &i in indices {
        let p = points.point(i);
        for k in 0..dim {
            if p[k] < lo[k] {
                lo[k] = p[k];
            }
            if p[k] > hi[k] {
                hi[k] = p[k];
            }
        }
    }
    Region::from_bounds(&lo, &hi)
}

impl<'p> ZOrderTree<'p> {
    pub fn points(&self) -> &PointSet<'p> {
        &self.points
    }

    /// Descends by box containment, recursing left-then-right (spec.md
    /// §4.4: "tests box containment and recurses left-then-right"); returns
    /// the first terminal leaf's site. No intermediate candidates are
    /// recorded — unlike Strategies A/B, an internal node here carries no
    /// single sample point to offer as a pre-seed, only a union bbox.
    pub fn locate(&self, q: &[f64]) -> Option<usize> {
        fn walk(node: &ZNode, q: &[f64]) -> Option<usize> {
            if !node.bbox().contains(q) {
                return None;
            }
            match node {
                ZNode::Leaf { site, .. } => *site,
                ZNode::Internal { left, right, .. } => walk(left, q).or_else(|| walk(right, q)),
            }
        }
        walk(self.root.as_ref()?, q)
    }
}
