// SPDX-License-Identifier: Apache-2.0

use smallvec::SmallVec;

use crate::arena::ArenaIndex;

const INLINE_DIMS: usize = 8;

/// A compressed-quadtree node (spec.md §3's `QNode`): an axis-aligned cube
/// (`center`, `radius`) that either stores a single point (a leaf) or has
/// up to `2^d` children, some possibly empty. Path compression (spec.md
/// §4.3) guarantees that after construction every *internal* node has at
/// least two non-empty children — a node with exactly one non-empty child
/// is replaced by that child during construction, so it never appears in
/// the finished arena.
#[derive(Debug, Clone)]
pub struct QNode {
    pub(crate) center: SmallVec<[f64; INLINE_DIMS]>,
    pub(crate) radius: f64,
    pub(crate) point_index: Option<usize>,
    pub(crate) children: Option<Vec<Option<ArenaIndex>>>,
    pub(crate) terminal: bool,
    /// The site witnessed by the interference query when this node was
    /// certified terminal (spec.md §4.4). `None` for a plain backing tree.
    pub(crate) witness: Option<usize>,
}

impl QNode {
    pub fn center(&self) -> &[f64] {
        &self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn point_index(&self) -> Option<usize> {
        self.point_index
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn witness(&self) -> Option<usize> {
        self.witness
    }

    /// Records a candidate backing NN without certifying the node terminal
    /// (spec.md §4.4: "each of which still records a candidate backing NN").
    pub(crate) fn record_candidate(&mut self, site: usize) {
        self.witness = Some(site);
    }

    /// Certifies this node terminal with the given witnessed site (spec.md
    /// §4.4's successful interference query).
    pub(crate) fn certify(&mut self, site: usize) {
        self.witness = Some(site);
        self.terminal = true;
    }

    pub fn child(&self, index: usize) -> Option<ArenaIndex> {
        self.children.as_ref().and_then(|c| c[index])
    }

    /// Epsilon slack absorbing floating-point noise at cube boundaries
    /// (spec.md §4.3: "slack ε = 1e-6 along each axis... a contract not a
    /// freedom").
    pub const CORNER_EPSILON: f64 = 1e-6;

    /// Whether `pt` falls inside this node's cube, with `CORNER_EPSILON`
    /// slack on every axis.
    pub fn in_node(&self, pt: &[f64]) -> bool {
        self.center
            .iter()
            .zip(pt)
            .all(|(c, x)| (x - c).abs() <= self.radius + Self::CORNER_EPSILON)
    }

    /// The child index `pt` belongs to: bit `k` set iff `pt[k] > center[k]`
    /// (spec.md §4.3).
    pub fn child_index(&self, pt: &[f64]) -> usize {
        let mut idx = 0usize;
        for (k, c) in self.center.iter().enumerate() {
            if pt[k] > *c {
                idx |= 1 << k;
            }
        }
        idx
    }
}
