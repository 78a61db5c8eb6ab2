//! Box metadata for locally owned grid blocks.
//!
//! Data is cell-centered: a block's box spans its *cell* dimensions, not its
//! node dimensions.

use crate::amr_error::AmrError;
use crate::data::grid::GridBlock;
use crate::topology::amr_box::AmrBox;
use crate::topology::hierarchy::Hierarchy;

/// Box of `grid` on `level`, indexed relative to the dataset `origin`.
pub fn create_amr_box_for_grid<G: GridBlock + ?Sized>(
    origin: [f64; 3],
    grid: &G,
    level: usize,
    rank: usize,
) -> Result<AmrBox, AmrError> {
    let grid_origin = grid.origin();
    let h = grid.spacing();
    let cells = grid.cell_dimensions();
    let mut lo = [0i32; 3];
    let mut hi = [0i32; 3];
    for a in 0..3 {
        if cells[a] == 0 {
            return Err(AmrError::InvalidGrid(format!("axis {a} has no cells")));
        }
        let offset = ((grid_origin[a] - origin[a]) / h[a]).round();
        if !offset.is_finite() || offset.abs() > f64::from(i32::MAX) {
            return Err(AmrError::InvalidGrid(format!(
                "axis {a}: grid origin {} is not addressable from dataset origin {} with spacing {}",
                grid_origin[a], origin[a], h[a]
            )));
        }
        lo[a] = offset as i32;
        let width = i32::try_from(cells[a] - 1).map_err(|_| {
            AmrError::InvalidGrid(format!("axis {a}: {} cells exceed i32", cells[a]))
        })?;
        hi[a] = lo[a].checked_add(width).ok_or_else(|| {
            AmrError::InvalidGrid(format!("axis {a}: extent overflows i32"))
        })?;
    }
    AmrBox::new(level, lo, hi, h, rank)
}

/// Builds boxes for every grid owned by `rank` and stores them under the
/// grids' keys.
///
/// Boxes previously stored for `rank` are replaced; boxes of other ranks
/// are left alone.
pub fn compute_local_metadata<G: GridBlock>(
    origin: [f64; 3],
    hierarchy: &mut Hierarchy<G>,
    rank: usize,
) -> Result<(), AmrError> {
    hierarchy.set_rank(rank);
    hierarchy.clear_boxes_of(rank);
    let mut built = Vec::new();
    for level in 0..hierarchy.number_of_levels() {
        for (key, grid) in hierarchy.local_grids(level) {
            built.push((key, create_amr_box_for_grid(origin, grid.as_ref(), level, rank)?));
        }
    }
    log::debug!("rank {rank}: built {} local boxes", built.len());
    for (key, b) in built {
        hierarchy.insert_box(key, b)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::grid::UniformGrid;
    use crate::topology::hierarchy::BlockKey;

    #[test]
    fn box_uses_cell_dimensions() {
        let g = UniformGrid::from_cells([2.0, 0.0, -1.0], [0.5; 3], [4, 6, 2]).unwrap();
        let b = create_amr_box_for_grid([0.0, 0.0, -1.0], &g, 1, 3).unwrap();
        assert_eq!(b.lo(), [4, 0, 0]);
        assert_eq!(b.hi(), [7, 5, 1]);
        assert_eq!(b.level(), 1);
        assert_eq!(b.rank(), 3);
    }

    #[test]
    fn remote_boxes_untouched() {
        let mut h: Hierarchy = Hierarchy::new(0);
        let key = h.add_grid(0, UniformGrid::from_cells([0.0; 3], [1.0; 3], [2, 2, 2]).unwrap());
        let remote = AmrBox::new(0, [2, 0, 0], [3, 1, 1], [1.0; 3], 1).unwrap();
        h.insert_box(BlockKey::new(1, 0), remote).unwrap();
        compute_local_metadata([0.0; 3], &mut h, 0).unwrap();
        compute_local_metadata([0.0; 3], &mut h, 0).unwrap();
        assert_eq!(h.number_of_boxes(), 2);
        assert_eq!(h.amr_box(0, key).unwrap().extent(), [0, 1, 0, 1, 0, 1]);
        assert_eq!(h.amr_box(0, BlockKey::new(1, 0)), Some(&remote));
    }
}
