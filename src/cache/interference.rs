// SPDX-License-Identifier: Apache-2.0

//! The interference query (spec.md §4.4): certifies a candidate cell as
//! terminal iff the backing index's exact 1-NN agrees at all `2^d` corners.
//! Grounded on `original_source/include/oddson_tree.h`'s
//! `OddsonTreeTerminal::operator()`, which runs exactly this loop over the
//! cell's corners and returns the shared site, or fails as soon as two
//! corners disagree.

use crate::backing::BackingIndex;
use crate::region::Region;

/// Certifies `region`: `Some(site)` iff every corner's exact nearest site is
/// `site`; `None` otherwise (including the degenerate case of an empty
/// backing index, where no corner has a nearest site at all).
///
/// Returns the number of backing NN queries issued alongside the verdict —
/// the source's `build_nn_queries` counter (spec.md §4.4: "pays `2^d` exact-
/// NN queries per candidate cell").
pub fn certify(backing: &BackingIndex, region: &Region) -> (Option<usize>, u64) {
    let corners = region.corners();
    let mut witness: Option<usize> = None;
    let mut queries = 0u64;
    for corner in &corners {
        queries += 1;
        match backing.nn_site(corner) {
            Some(site) => match witness {
                None => witness = Some(site),
                Some(w) if w == site => {}
                Some(_) => return (None, queries),
            },
            None => return (None, queries),
        }
    }
    (witness, queries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::PointSet;

    fn square() -> Vec<f64> {
        vec![0.0, 0.0, 10.0, 0.0, 0.0, 10.0, 10.0, 10.0]
    }

    #[test]
    fn cell_fully_inside_one_voronoi_wedge_certifies() {
        // spec.md §8 S3's complement: a cell that does NOT straddle a
        // bisector certifies cleanly.
        let data = square();
        let ps = PointSet::new(&data, 2).unwrap();
        let backing = BackingIndex::build_kdtree(ps).unwrap();
        let region = Region::from_bounds(&[0.5, 0.5], &[2.0, 2.0]);
        let (witness, queries) = certify(&backing, &region);
        assert_eq!(witness, Some(0));
        assert_eq!(queries, 4);
    }

    #[test]
    fn cell_straddling_a_bisector_fails_to_certify() {
        // spec.md §8 S3: a cell straddling y=5 has corners whose NN differ.
        let data = square();
        let ps = PointSet::new(&data, 2).unwrap();
        let backing = BackingIndex::build_kdtree(ps).unwrap();
        let region = Region::from_bounds(&[4.0, 4.0], &[6.0, 6.0]);
        let (witness, _) = certify(&backing, &region);
        assert_eq!(witness, None);
    }
}
