// SPDX-License-Identifier: Apache-2.0

use std::fs::read_to_string;
use std::path::Path;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use yaml_rust::YamlLoader;

use crate::arena::Arena;
use crate::errors::{OddsonError, OddsonResult};
use crate::point::{axis_order, PointSet};
use crate::region::Region;

use super::node::KNode;
use super::tree::KdTree;

/// A terminal predicate (spec.md §4.2, §9): consulted after a node's pivot
/// and median are chosen but before recursing into its children. Returning
/// `true` stops the recursion there and leaves the node's subtree absent
/// (used by the cache builder's interference query, spec.md §4.4). Modeled
/// as an injected `FnMut` capability per spec.md §9 ("a boxed closure or a
/// monomorphized type parameter, not inheritance").
pub trait TerminalPredicate {
    fn is_terminal(&mut self, node: &mut KNode, region: &Region, depth: usize) -> bool;
}

impl<F> TerminalPredicate for F
where
    F: FnMut(&mut KNode, &Region, usize) -> bool,
{
    fn is_terminal(&mut self, node: &mut KNode, region: &Region, depth: usize) -> bool {
        self(node, region, depth)
    }
}

/// Never stops early; builds a complete backing index (spec.md §4.2).
struct NeverTerminal;
impl TerminalPredicate for NeverTerminal {
    fn is_terminal(&mut self, _node: &mut KNode, _region: &Region, _depth: usize) -> bool {
        false
    }
}

/// Construction parameters for a [`KdTree`] (spec.md §4.2 pins the
/// algorithm itself; the only free parameter is the quickselect's
/// randomized-pivot seed). Grounded on `goko::covertree::builders::
/// CoverTreeBuilder`'s `*Builder`-with-setters-and-`from_yaml` shape.
#[derive(Debug, Clone, Default)]
pub struct KdTreeBuilder {
    rng_seed: Option<u64>,
}

impl KdTreeBuilder {
    pub fn new() -> KdTreeBuilder {
        KdTreeBuilder { rng_seed: None }
    }

    /// Creates a builder from a `scale_base`-style YAML document with an
    /// optional `rng_seed` key (teacher: `CoverTreeBuilder::from_yaml`).
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> OddsonResult<KdTreeBuilder> {
        let config = read_to_string(&path)?;
        let docs = YamlLoader::load_from_str(&config).map_err(|e| OddsonError::ParseError {
            line: None,
            message: e.to_string(),
        })?;
        let params = docs
            .get(0)
            .ok_or_else(|| OddsonError::ParseError {
                line: None,
                message: "empty yaml document".to_string(),
            })?;
        Ok(KdTreeBuilder {
            rng_seed: params["rng_seed"].as_i64().map(|i| i as u64),
        })
    }

    pub fn with_rng_seed(&mut self, seed: u64) -> &mut Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Builds a complete backing k-d tree over every point in `points`.
    pub fn build<'p>(&self, points: PointSet<'p>) -> OddsonResult<KdTree<'p>> {
        self.build_with_terminal(points, NeverTerminal)
    }

    /// Builds a k-d tree that stops recursing wherever `terminal` returns
    /// true (the Odds-On cache's construction strategy, spec.md §4.4).
    pub fn build_with_terminal<'p>(
        &self,
        points: PointSet<'p>,
        mut terminal: impl TerminalPredicate,
    ) -> OddsonResult<KdTree<'p>> {
        if points.dim() < 2 {
            return Err(OddsonError::InvalidInput {
                message: format!("dimension must be >= 2, got {}", points.dim()),
            });
        }
        let n = points.len();
        log::debug!(
            "building k-d tree over {} points in {} dimensions",
            n,
            points.dim()
        );
        let mut rng: SmallRng = match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let mut arena: Arena<KNode> = Arena::with_capacity(n);
        let mut indices: Vec<usize> = (0..n).collect();
        let region = if n == 0 {
            Region::unbounded(points.dim())
        } else {
            Region::bounding(&points)
        };
        let root = build_recursive(
            &points,
            &mut indices,
            &region,
            0,
            &mut arena,
            &mut rng,
            &mut terminal,
        );
        log::debug!("k-d tree build complete: {} nodes", arena.len());
        Ok(KdTree::new(points, arena, root, region))
    }
}

#[allow(clippy::too_many_arguments)]
fn build_recursive(
    points: &PointSet,
    indices: &mut [usize],
    region: &Region,
    depth: usize,
    arena: &mut Arena<KNode>,
    rng: &mut SmallRng,
    terminal: &mut impl TerminalPredicate,
) -> Option<crate::arena::ArenaIndex> {
    let n = indices.len();
    if n == 0 {
        return None;
    }
    let dim = points.dim();
    let axis = depth % dim;

    if n == 1 {
        let mut node = KNode::leaf(indices[0], axis);
        // A single-point leaf has nothing left to recurse into, so the
        // predicate's return value carries no information here — only its
        // side effect on `node` (certifying or recording a candidate)
        // matters.
        terminal.is_terminal(&mut node, region, depth);
        return Some(arena.push(node));
    }

    // spec.md §4.2: r = ((n/2) >> 1) << 1, an even-aligned midpoint.
    let rank = ((n / 2) >> 1) << 1;
    let rank = rank.min(n - 1);
    quickselect(indices, points, axis, rank, rng);
    let pivot_index = indices[rank];
    let median = points.point(pivot_index)[axis];

    let mut node = KNode {
        point_index: pivot_index,
        axis,
        median,
        left: None,
        right: None,
        terminal: false,
        witness: None,
    };

    // The predicate's return value means "stop recursing here"; whether the
    // node is *terminal* (certified) or a non-terminal fall-through leaf
    // (spec.md §4.4's depth-cutoff case) is determined by whether the
    // predicate called `certify` on `node` as a side effect.
    if terminal.is_terminal(&mut node, region, depth) {
        node.left = None;
        node.right = None;
        return Some(arena.push(node));
    }

    let (left_region, right_region) = region.split(axis, median);
    let (left_slice, right_slice) = indices.split_at_mut(rank);
    let right_slice = &mut right_slice[1..]; // drop the pivot itself

    let left = build_recursive(points, left_slice, &left_region, depth + 1, arena, rng, terminal);
    let right = build_recursive(
        points,
        right_slice,
        &right_region,
        depth + 1,
        arena,
        rng,
        terminal,
    );
    node.left = left;
    node.right = right;
    Some(arena.push(node))
}

/// Randomized quickselect: rearranges `indices` so that `indices[rank]`
/// holds the element that would be at that rank under `axis_order`, with
/// everything before it `<=` and everything after it `>=` (spec.md §4.2:
/// "linear-time quickselect with randomized pivot"; the comparator's
/// lexicographic tie-break is what makes this terminate on duplicate
/// coordinates).
fn quickselect(indices: &mut [usize], points: &PointSet, axis: usize, rank: usize, rng: &mut SmallRng) {
    let mut lo = 0;
    let mut hi = indices.len() - 1;
    loop {
        if lo == hi {
            return;
        }
        let pivot_pos = lo + rng.gen_range(0..=(hi - lo));
        let p = partition(indices, points, axis, lo, hi, pivot_pos);
        match p.cmp(&rank) {
            std::cmp::Ordering::Equal => return,
            std::cmp::Ordering::Greater => hi = p - 1,
            std::cmp::Ordering::Less => lo = p + 1,
        }
    }
}

fn partition(
    indices: &mut [usize],
    points: &PointSet,
    axis: usize,
    lo: usize,
    hi: usize,
    pivot_pos: usize,
) -> usize {
    indices.swap(pivot_pos, hi);
    let pivot_value = points.point(indices[hi]).to_vec();
    let mut store = lo;
    for i in lo..hi {
        if axis_order(points.point(indices[i]), &pivot_value, axis) == std::cmp::Ordering::Less {
            indices.swap(i, store);
            store += 1;
        }
    }
    indices.swap(store, hi);
    store
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_points() -> Vec<f64> {
        // 10 colinear points at x = 1..10, y = 0 (2D so axis-mod-2 is sane)
        let mut v = Vec::new();
        for x in 1..=10 {
            v.push(x as f64);
            v.push(0.0);
        }
        v
    }

    #[test]
    fn quickselect_places_correct_rank() {
        let data = make_points();
        let ps = PointSet::new(&data, 2).unwrap();
        let mut indices: Vec<usize> = (0..10).collect();
        let mut rng = SmallRng::seed_from_u64(0);
        quickselect(&mut indices, &ps, 0, 4, &mut rng);
        // rank 4 (0-indexed) of x=1..10 sorted ascending is x=5.
        assert_eq!(ps.point(indices[4])[0], 5.0);
        for &i in &indices[..4] {
            assert!(ps.point(i)[0] <= 5.0);
        }
        for &i in &indices[5..] {
            assert!(ps.point(i)[0] >= 5.0);
        }
    }

    #[test]
    fn build_produces_one_node_per_point() {
        let data = make_points();
        let ps = PointSet::new(&data, 2).unwrap();
        let tree = KdTreeBuilder::new().build(ps).unwrap();
        assert_eq!(tree.node_count(), 10);
    }

    #[test]
    fn rejects_dimension_below_two() {
        let data = [1.0, 2.0, 3.0];
        let ps = PointSet::new(&data, 1).unwrap();
        assert!(KdTreeBuilder::new().build(ps).is_err());
    }

    #[test]
    fn empty_input_builds_an_empty_tree() {
        let data: [f64; 0] = [];
        let ps = PointSet::new(&data, 2).unwrap();
        let tree = KdTreeBuilder::new().build(ps).unwrap();
        assert_eq!(tree.node_count(), 0);
    }
}
