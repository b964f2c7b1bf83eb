// SPDX-License-Identifier: Apache-2.0

//! Z-order (Morton order) comparator for IEEE-754 doubles (spec.md §4.4,
//! used by cache Strategy C). The classic integer Morton comparator
//! interleaves bits; doing that for floats without reinterpreting them as
//! sortable integers first would compare garbage across differently-scaled
//! coordinates. Per spec.md: "(1) the exponent bits to compare magnitudes
//! first, (2) within equal exponents, the bit-position of the most
//! significant differing mantissa bit" — this is the Connor-Kumar
//! technique for a locality-preserving order directly on floats.

use std::cmp::Ordering;

/// Maps an `f64` to a `u64` whose unsigned ordering matches the float's
/// ordering (flip the sign bit for positives, flip all bits for
/// negatives). This turns "compare exponent then mantissa MSB" into a
/// single integer MSB comparison per axis.
#[inline]
fn sortable_bits(x: f64) -> u64 {
    let bits = x.to_bits();
    if bits & (1 << 63) != 0 {
        !bits
    } else {
        bits | (1 << 63)
    }
}

/// True if `x`'s most significant set bit is higher than `y`'s (the
/// standard "which integer has the most significant differing bit"
/// comparator used to interleave dimensions without actually
/// interleaving them).
#[inline]
fn less_msb(x: u64, y: u64) -> bool {
    x < y && x < (x ^ y)
}

/// Compares two `dim`-dimensional points under Z-order: the axis whose
/// sortable-bit representations differ at the highest bit position decides
/// the order (spec.md §4.4 / §8 scenario S6).
pub fn zorder_cmp(a: &[f64], b: &[f64]) -> Ordering {
    let dim = a.len();
    debug_assert_eq!(dim, b.len());
    let mut winning_axis = 0usize;
    let mut winning_xor = sortable_bits(a[0]) ^ sortable_bits(b[0]);
    for axis in 1..dim {
        let xa = sortable_bits(a[axis]);
        let xb = sortable_bits(b[axis]);
        let xor = xa ^ xb;
        if less_msb(winning_xor, xor) {
            winning_axis = axis;
            winning_xor = xor;
        }
    }
    sortable_bits(a[winning_axis]).cmp(&sortable_bits(b[winning_axis]))
}

/// Sorts point indices into a `PointSet` by Z-order, in place.
pub fn sort_by_zorder(points: &crate::point::PointSet, indices: &mut [usize]) {
    indices.sort_by(|&i, &j| zorder_cmp(points.point(i), points.point(j)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::PointSet;

    #[test]
    fn visits_2x2_blocks_contiguously() {
        // spec.md §8 S6.
        let pts: Vec<[f64; 2]> = vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 1.0],
            [2.0, 0.0],
            [3.0, 0.0],
            [2.0, 1.0],
            [3.0, 1.0],
        ];
        let flat: Vec<f64> = pts.iter().flat_map(|p| p.iter().copied()).collect();
        let ps = PointSet::new(&flat, 2).unwrap();
        let mut order: Vec<usize> = (0..pts.len()).collect();
        sort_by_zorder(&ps, &mut order);

        let block_of = |idx: usize| -> (i64, i64) {
            let p = pts[idx];
            ((p[0] as i64) / 2, (p[1] as i64) / 2)
        };
        // Each maximal run of the sorted order stays within one 2x2 block
        // before moving permanently to another: collect block ids in
        // visiting order, collapse consecutive duplicates, and the result
        // must have no block reappear (contiguous visitation).
        let mut seen_blocks = Vec::new();
        let mut last = None;
        for &idx in &order {
            let b = block_of(idx);
            if Some(b) != last {
                assert!(
                    !seen_blocks.contains(&b),
                    "block {:?} was revisited non-contiguously",
                    b
                );
                seen_blocks.push(b);
                last = Some(b);
            }
        }
    }

    #[test]
    fn identical_points_compare_equal() {
        assert_eq!(zorder_cmp(&[1.0, 2.0], &[1.0, 2.0]), Ordering::Equal);
    }

    #[test]
    fn handles_negative_coordinates() {
        assert_eq!(zorder_cmp(&[-1.0, 0.0], &[1.0, 0.0]), Ordering::Less);
    }
}
