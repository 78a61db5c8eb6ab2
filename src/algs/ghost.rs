//! Ghost layer detection.
//!
//! Cell `k` of level `L-1` covers cells `[k*r, k*r + r - 1]` of level `L`,
//! `r` being the refinement ratio between the two. A level-`L` box whose
//! low index is past `k*r`, or whose high index stops before `k*r + r - 1`,
//! only partially covers a coarse cell: the uncovered remainder is made of
//! ghost cells. Same-level boxes that partially overlap each other carry
//! ghost cells as well.

use crate::topology::amr_box::{AmrBox, GhostVector};
use crate::topology::hierarchy::Hierarchy;
use itertools::Itertools;

/// Ghost cells of `amr_box` on each face, given the ratio `r` between its
/// level and the next coarser one.
pub fn ghost_vector(amr_box: &AmrBox, r: u32) -> GhostVector {
    if r <= 1 {
        return GhostVector::ZERO;
    }
    let r_i = r as i64;
    let lo = amr_box.lo();
    let hi = amr_box.hi();
    let (clo, chi) = amr_box.coarsened(r);
    let mut ghost = [0usize; 6];
    for a in 0..3 {
        let min_start = i64::from(clo[a]) * r_i;
        if i64::from(lo[a]) > min_start {
            ghost[2 * a] = (min_start + r_i - i64::from(lo[a])) as usize;
        }
        let max_start = i64::from(chi[a]) * r_i;
        if i64::from(hi[a]) < max_start + r_i - 1 {
            ghost[2 * a + 1] = (i64::from(hi[a]) - max_start + 1) as usize;
        }
    }
    GhostVector::new(ghost)
}

/// Quick test for partially overlapping (ghost) cells.
///
/// Starts at the finest level and returns on the first hit: a box that is
/// misaligned with its coarser level (when that level's ratio is known) or
/// two same-level boxes that partially overlap.
pub fn has_partially_overlapping_ghost_cells<G>(hierarchy: &Hierarchy<G>) -> bool {
    let levels = hierarchy.levels();
    for l in (0..levels.len()).rev() {
        let level = &levels[l];
        if l > 0 {
            match hierarchy.refinement_ratio(l - 1) {
                Some(r) => {
                    if let Some((key, _)) = level
                        .boxes()
                        .find(|(_, b)| !ghost_vector(b, r).is_zero())
                    {
                        log::debug!("level {l}: box {key:?} is misaligned with level {}", l - 1);
                        return true;
                    }
                }
                None => log::debug!("level {}: ratio unset, skipping alignment check", l - 1),
            }
        }
        let boxes: Vec<&AmrBox> = level.boxes().map(|(_, b)| b).collect();
        if boxes
            .iter()
            .tuple_combinations()
            .any(|(a, b)| a.partially_overlaps(b))
        {
            log::debug!("level {l}: partially overlapping sibling boxes");
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fine(lo: [i32; 3], hi: [i32; 3]) -> AmrBox {
        AmrBox::new(1, lo, hi, [0.5; 3], 0).unwrap()
    }

    #[test]
    fn aligned_box_has_no_ghosts() {
        assert!(ghost_vector(&fine([0, 2, 4], [7, 5, 9]), 2).is_zero());
    }

    #[test]
    fn high_side_ghosts() {
        // coarse cells 0..=3 cover fine 0..=7; 8 and 9 spill into coarse cell 4
        let g = ghost_vector(&fine([0, 0, 0], [9, 9, 7]), 4);
        assert_eq!(g.as_array(), [0, 2, 0, 2, 0, 0]);
    }

    #[test]
    fn low_side_ghosts_with_negative_indices() {
        // lo -2 with r 4: coarse cell -1 covers -4..=-1, so -2 and -1 are ghosts
        let g = ghost_vector(&fine([-2, 0, 0], [7, 3, 3]), 4);
        assert_eq!(g.as_array(), [2, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn unit_ratio_never_ghosts() {
        assert!(ghost_vector(&fine([1, 1, 1], [2, 2, 2]), 1).is_zero());
    }
}
