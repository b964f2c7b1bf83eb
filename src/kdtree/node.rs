// SPDX-License-Identifier: Apache-2.0

use crate::arena::ArenaIndex;

/// A k-d tree node (spec.md §3's `KNode`). `point_index` refers to the
/// caller's original point array, not the arena — the arena holds nodes,
/// the point data is never copied (spec.md: "Points themselves are owned
/// by the caller").
#[derive(Debug, Clone)]
pub struct KNode {
    pub(crate) point_index: usize,
    pub(crate) axis: usize,
    pub(crate) median: f64,
    pub(crate) left: Option<ArenaIndex>,
    pub(crate) right: Option<ArenaIndex>,
    /// Set when this node was produced by a terminal predicate (the cache
    /// builder, spec.md §4.4) rather than by exhausting the recursion
    /// normally. A plain backing k-d tree never sets this.
    pub(crate) terminal: bool,
    /// The site witnessed by the interference query when this node was
    /// certified terminal (spec.md §4.4: "caches backing NN"). `None` for a
    /// plain backing tree, and for a non-terminal cache leaf.
    pub(crate) witness: Option<usize>,
}

impl KNode {
    pub(crate) fn leaf(point_index: usize, axis: usize) -> KNode {
        KNode {
            point_index,
            axis,
            median: f64::NAN,
            left: None,
            right: None,
            terminal: false,
            witness: None,
        }
    }

    pub fn point_index(&self) -> usize {
        self.point_index
    }

    pub fn axis(&self) -> usize {
        self.axis
    }

    pub fn median(&self) -> f64 {
        self.median
    }

    pub fn left(&self) -> Option<ArenaIndex> {
        self.left
    }

    pub fn right(&self) -> Option<ArenaIndex> {
        self.right
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
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
}
