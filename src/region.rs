// SPDX-License-Identifier: Apache-2.0

//! The axis-aligned region (cube/box) carried alongside a k-d tree or
//! quadtree descent, used by range queries and by the Odds-On cache's
//! interference query (spec.md §3, §4.4).

use smallvec::SmallVec;

/// Dimensions above this bound still work (the `SmallVec` just spills to
/// the heap) but spec.md's Non-goals cap dimension at "~8" for the
/// interference query's 2^d corner cost, so 8 is the inline capacity.
const INLINE_DIMS: usize = 8;

/// An axis-aligned box, `min[k] <= x[k] <= max[k]` for every axis `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    min: SmallVec<[f64; INLINE_DIMS]>,
    max: SmallVec<[f64; INLINE_DIMS]>,
}

impl Region {
    /// The unbounded region covering all of ℝ^d.
    pub fn unbounded(dim: usize) -> Region {
        Region {
            min: smallvec::smallvec![f64::NEG_INFINITY; dim],
            max: smallvec::smallvec![f64::INFINITY; dim],
        }
    }

    /// A closed box built directly from corner coordinates (used by range
    /// queries, which take raw `lo`/`hi` slices rather than point indices).
    pub fn from_bounds(lo: &[f64], hi: &[f64]) -> Region {
        Region {
            min: SmallVec::from_slice(lo),
            max: SmallVec::from_slice(hi),
        }
    }

    /// The tight bounding box of `points` (spec.md §4.4: the cache's root
    /// region is the sample's bounding box).
    pub fn bounding(points: &crate::point::PointSet) -> Region {
        let dim = points.dim();
        let mut min: SmallVec<[f64; INLINE_DIMS]> = smallvec::smallvec![f64::INFINITY; dim];
        let mut max: SmallVec<[f64; INLINE_DIMS]> = smallvec::smallvec![f64::NEG_INFINITY; dim];
        for i in 0..points.len() {
            let p = points.point(i);
            for k in 0..dim {
                if p[k] < min[k] {
                    min[k] = p[k];
                }
                if p[k] > max[k] {
                    max[k] = p[k];
                }
            }
        }
        Region { min, max }
    }

    pub fn dim(&self) -> usize {
        self.min.len()
    }

    pub fn min(&self) -> &[f64] {
        &self.min
    }

    pub fn max(&self) -> &[f64] {
        &self.max
    }

    /// Splits this region at `median` along `axis`, returning (left, right)
    /// sub-regions (spec.md §4.2: "updating the range window across the
    /// split").
    pub fn split(&self, axis: usize, median: f64) -> (Region, Region) {
        let mut left = self.clone();
        let mut right = self.clone();
        left.max[axis] = median;
        right.min[axis] = median;
        (left, right)
    }

    /// True if `q` lies within this (closed) region.
    pub fn contains(&self, q: &[f64]) -> bool {
        (0..self.dim()).all(|k| self.min[k] <= q[k] && q[k] <= self.max[k])
    }

    /// True if `other` is fully contained in this region (used by range
    /// count's subtree short-circuit, spec.md §4.2).
    pub fn contains_region(&self, other: &Region) -> bool {
        (0..self.dim()).all(|k| self.min[k] <= other.min[k] && other.max[k] <= self.max[k])
    }

    /// True if this region and `other` overlap on every axis.
    pub fn intersects(&self, other: &Region) -> bool {
        (0..self.dim()).all(|k| self.min[k] <= other.max[k] && other.min[k] <= self.max[k])
    }

    /// The 2^d corners of this region, in the bit-pattern order spec.md
    /// §4.4's interference query iterates (bit `k` of the corner index
    /// selects `min[k]` or `max[k]`). Infinite bounds (the unbounded root)
    /// are never passed here — construction always carves a finite window
    /// before certifying, so callers should only invoke this on a region
    /// that has already been bounded by at least one split or by
    /// `Region::bounding`.
    pub fn corners(&self) -> Vec<SmallVec<[f64; INLINE_DIMS]>> {
        let dim = self.dim();
        let count = 1usize << dim;
        let mut out = Vec::with_capacity(count);
        for mask in 0..count {
            let mut corner: SmallVec<[f64; INLINE_DIMS]> = SmallVec::with_capacity(dim);
            for k in 0..dim {
                corner.push(if mask & (1 << k) != 0 {
                    self.max[k]
                } else {
                    self.min[k]
                });
            }
            out.push(corner);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::PointSet;

    #[test]
    fn bounding_box_matches_data() {
        let data = [0.0, 0.0, 10.0, 0.0, 0.0, 10.0, 10.0, 10.0];
        let ps = PointSet::new(&data, 2).unwrap();
        let r = Region::bounding(&ps);
        assert_eq!(r.min(), &[0.0, 0.0]);
        assert_eq!(r.max(), &[10.0, 10.0]);
    }

    #[test]
    fn split_carves_a_window() {
        let r = Region {
            min: smallvec::smallvec![0.0, 0.0],
            max: smallvec::smallvec![10.0, 10.0],
        };
        let (left, right) = r.split(0, 5.0);
        assert_eq!(left.max()[0], 5.0);
        assert_eq!(right.min()[0], 5.0);
        assert_eq!(left.max()[1], 10.0);
    }

    #[test]
    fn corners_enumerate_2_pow_d() {
        let r = Region {
            min: smallvec::smallvec![0.0, 0.0],
            max: smallvec::smallvec![1.0, 1.0],
        };
        let corners = r.corners();
        assert_eq!(corners.len(), 4);
        assert!(corners.contains(&SmallVec::from_slice(&[0.0, 0.0])));
        assert!(corners.contains(&SmallVec::from_slice(&[1.0, 1.0])));
    }

    #[test]
    fn contains_is_closed() {
        let r = Region {
            min: smallvec::smallvec![0.0, 0.0],
            max: smallvec::smallvec![1.0, 1.0],
        };
        assert!(r.contains(&[0.0, 1.0]));
        assert!(!r.contains(&[1.1, 0.0]));
    }
}
