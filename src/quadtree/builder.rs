// SPDX-License-Identifier: Apache-2.0

use std::fs::read_to_string;
use std::path::Path;

use smallvec::SmallVec;
use yaml_rust::YamlLoader;

use crate::arena::{Arena, ArenaIndex};
use crate::errors::{OddsonError, OddsonResult};
use crate::point::PointSet;
use crate::region::Region;

use super::node::QNode;
use super::tree::Quadtree;

const INLINE_DIMS: usize = 8;

/// Terminal predicate for quadtree construction, the quadtree analogue of
/// [`crate::kdtree::TerminalPredicate`] (spec.md §4.3: "If a terminal
/// predicate is supplied, consult it before recursing; on true, stop").
pub trait QuadtreeTerminalPredicate {
    fn is_terminal(&mut self, node: &mut QNode, region: &Region, depth: usize) -> bool;
}

impl<F> QuadtreeTerminalPredicate for F
where
    F: FnMut(&mut QNode, &Region, usize) -> bool,
{
    fn is_terminal(&mut self, node: &mut QNode, region: &Region, depth: usize) -> bool {
        self(node, region, depth)
    }
}

struct NeverTerminal;
impl QuadtreeTerminalPredicate for NeverTerminal {
    fn is_terminal(&mut self, _node: &mut QNode, _region: &Region, _depth: usize) -> bool {
        false
    }
}

/// Construction parameters for a [`Quadtree`]. spec.md §4.3 pins the
/// splitting/compression algorithm; there is nothing left to tune beyond
/// whether to cap recursion, which the cache builder controls via its own
/// `D_max` passed through the terminal predicate instead of a tree-level
/// field.
#[derive(Debug, Clone, Default)]
pub struct QuadtreeBuilder;

impl QuadtreeBuilder {
    pub fn new() -> QuadtreeBuilder {
        QuadtreeBuilder
    }

    pub fn from_yaml<P: AsRef<Path>>(path: P) -> OddsonResult<QuadtreeBuilder> {
        let config = read_to_string(&path)?;
        YamlLoader::load_from_str(&config).map_err(|e| OddsonError::ParseError {
            line: None,
            message: e.to_string(),
        })?;
        Ok(QuadtreeBuilder)
    }

    pub fn build<'p>(&self, points: PointSet<'p>) -> OddsonResult<Quadtree<'p>> {
        self.build_with_terminal(points, NeverTerminal)
    }

    pub fn build_with_terminal<'p>(
        &self,
        points: PointSet<'p>,
        mut terminal: impl QuadtreeTerminalPredicate,
    ) -> OddsonResult<Quadtree<'p>> {
        if points.dim() < 2 {
            return Err(OddsonError::InvalidInput {
                message: format!("dimension must be >= 2, got {}", points.dim()),
            });
        }
        let n = points.len();
        log::debug!("building compressed quadtree over {} points", n);
        let mut arena: Arena<QNode> = Arena::with_capacity(n.max(1) * 2);
        let root = if n == 0 {
            None
        } else {
            let (center, radius) = bounding_cube(&points);
            let indices: Vec<usize> = (0..n).collect();
            build_recursive(&points, indices, &center, radius, 0, &mut arena, &mut terminal)
        };
        log::debug!("quadtree build complete: {} nodes", arena.len());
        Ok(Quadtree::new(points, arena, root))
    }
}

fn bounding_cube(points: &PointSet) -> (SmallVec<[f64; INLINE_DIMS]>, f64) {
    let dim = points.dim();
    let region = Region::bounding(points);
    let mut center: SmallVec<[f64; INLINE_DIMS]> = SmallVec::with_capacity(dim);
    let mut radius = 0.0f64;
    for k in 0..dim {
        let lo = region.min()[k];
        let hi = region.max()[k];
        center.push((lo + hi) / 2.0);
        radius = radius.max((hi - lo) / 2.0);
    }
    // A degenerate (single-point, or all-coincident-coordinate) input
    // still needs a positive radius so `in_node` and child bucketing are
    // well-defined.
    if radius == 0.0 {
        radius = 1.0;
    }
    (center, radius)
}

fn build_recursive(
    points: &PointSet,
    indices: Vec<usize>,
    center: &SmallVec<[f64; INLINE_DIMS]>,
    radius: f64,
    depth: usize,
    arena: &mut Arena<QNode>,
    terminal: &mut impl QuadtreeTerminalPredicate,
) -> Option<ArenaIndex> {
    if indices.is_empty() {
        return None;
    }
    let dim = center.len();
    let region = cube_region(center, radius);

    if indices.len() == 1 {
        let mut node = QNode {
            center: center.clone(),
            radius,
            point_index: Some(indices[0]),
            children: None,
            terminal: false,
            witness: None,
        };
        // As in the k-d tree builder, a single-point cell has nothing to
        // recurse into — only the predicate's side effect on `node` matters.
        terminal.is_terminal(&mut node, &region, depth);
        return Some(arena.push(node));
    }

    let mut node = QNode {
        center: center.clone(),
        radius,
        point_index: None,
        children: None,
        terminal: false,
        witness: None,
    };
    if terminal.is_terminal(&mut node, &region, depth) {
        return Some(arena.push(node));
    }

    let child_count = 1usize << dim;
    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); child_count];
    for i in indices {
        let idx = node.child_index(points.point(i));
        buckets[idx].push(i);
    }

    let half = radius / 2.0;
    let mut children: Vec<Option<ArenaIndex>> = vec![None; child_count];
    let mut non_empty: Vec<usize> = Vec::new();
    for (bucket_idx, bucket) in buckets.into_iter().enumerate() {
        if bucket.is_empty() {
            continue;
        }
        let mut child_center = center.clone();
        for k in 0..dim {
            child_center[k] += if bucket_idx & (1 << k) != 0 { half } else { -half };
        }
        if let Some(child_arena_idx) =
            build_recursive(points, bucket, &child_center, half, depth + 1, arena, terminal)
        {
            children[bucket_idx] = Some(child_arena_idx);
            non_empty.push(bucket_idx);
        }
    }

    match non_empty.len() {
        0 => None,
        // Path compression (spec.md §4.3): a node with exactly one
        // non-empty child collapses into that child.
        1 => children[non_empty[0]],
        _ => {
            node.children = Some(children);
            Some(arena.push(node))
        }
    }
}

fn cube_region(center: &[f64], radius: f64) -> Region {
    let lo: Vec<f64> = center.iter().map(|c| c - radius).collect();
    let hi: Vec<f64> = center.iter().map(|c| c + radius).collect();
    Region::from_bounds(&lo, &hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_internal_node_has_at_least_two_children() {
        let data = vec![0.0, 0.0, 10.0, 0.0, 0.0, 10.0, 10.0, 10.0, 5.0, 5.0];
        let ps = PointSet::new(&data, 2).unwrap();
        let tree = QuadtreeBuilder::new().build(ps).unwrap();
        tree.assert_compression_invariant();
    }

    #[test]
    fn single_point_builds_one_leaf() {
        let data = vec![1.0, 2.0];
        let ps = PointSet::new(&data, 2).unwrap();
        let tree = QuadtreeBuilder::new().build(ps).unwrap();
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn empty_input_builds_empty_tree() {
        let data: [f64; 0] = [];
        let ps = PointSet::new(&data, 2).unwrap();
        let tree = QuadtreeBuilder::new().build(ps).unwrap();
        assert_eq!(tree.node_count(), 0);
    }
}
