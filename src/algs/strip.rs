//! Removing ghost layers from a hierarchy.
//!
//! Stripping is non-destructive: the ghosted hierarchy is read, a new one is
//! returned. Blocks without ghost cells are shallow-copied (their grid is
//! shared through `Arc`); every other block is rebuilt on its real extent
//! with all point and cell arrays re-indexed.
//!
//! The ghosted hierarchy must carry complete metadata and refinement ratios
//! (see [`crate::algs::metadata::generate_metadata`]).

use crate::algs::bounds::compute_global_bounds;
use crate::algs::communicator::{Communicator, NoComm};
use crate::algs::ghost::{ghost_vector, has_partially_overlapping_ghost_cells};
use crate::amr_error::AmrError;
use crate::data::field::copy_field_data;
use crate::data::grid::{GridBlockMut, structured_index};
use crate::topology::amr_box::{AmrBox, GhostVector};
use crate::topology::hierarchy::{BlockKey, Hierarchy, Level};
use itertools::iproduct;
use std::sync::Arc;

/// Stripping behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripOptions {
    /// Skip the fast overlap check and inspect every block.
    pub force: bool,
    /// Turn the first per-block failure into the call's error.
    pub fail_fast: bool,
}

/// A block whose stripping was aborted.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockFailure {
    pub level: usize,
    pub key: BlockKey,
    pub error: AmrError,
}

/// Stripped hierarchy plus the blocks that could not be stripped.
///
/// Failed blocks are absent from `hierarchy`.
#[derive(Debug)]
pub struct StripOutcome<G> {
    pub hierarchy: Hierarchy<G>,
    pub failures: Vec<BlockFailure>,
}

impl<G> StripOutcome<G> {
    /// True if every block made it into the stripped hierarchy.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// [`strip_ghost_layers_with`] using default options.
pub fn strip_ghost_layers<G, C>(
    ghosted: &Hierarchy<G>,
    comm: &C,
) -> Result<StripOutcome<G>, AmrError>
where
    G: GridBlockMut,
    C: Communicator + ?Sized,
{
    strip_ghost_layers_with(ghosted, comm, &StripOptions::default())
}

/// Detects and strips partially overlapping cells.
///
/// Every level but the finest needs its refinement ratio, otherwise
/// [`AmrError::MissingRefinementRatio`] is returned before any
/// communication. Collective: ends with `comm.barrier()` on every other
/// path.
pub fn strip_ghost_layers_with<G, C>(
    ghosted: &Hierarchy<G>,
    comm: &C,
    options: &StripOptions,
) -> Result<StripOutcome<G>, AmrError>
where
    G: GridBlockMut,
    C: Communicator + ?Sized,
{
    // metadata is replicated, so every rank fails here together
    if let Some(level) = missing_ratio(ghosted) {
        return Err(AmrError::MissingRefinementRatio { level });
    }
    if !options.force && !has_partially_overlapping_ghost_cells(ghosted) {
        log::debug!("no partially overlapping cells; shallow copy");
        comm.barrier()?;
        return Ok(StripOutcome {
            hierarchy: ghosted.clone(),
            failures: Vec::new(),
        });
    }

    let mut stripped = Hierarchy::with_levels(ghosted.rank(), ghosted.number_of_levels());
    stripped.set_origin(ghosted.origin());
    let mut failures = Vec::new();
    for (l, level) in ghosted.levels().iter().enumerate() {
        stripped.set_refinement_ratio(l, level.refinement_ratio());
        let ratio = match l {
            0 => 1,
            _ => ghosted
                .refinement_ratio(l - 1)
                .ok_or(AmrError::MissingRefinementRatio { level: l - 1 })?,
        };
        let work: Vec<(BlockKey, &AmrBox)> = level.boxes().collect();
        if level.grids().any(|(key, _)| level.amr_box(key).is_none()) {
            log::warn!("level {l}: grids without metadata are dropped");
        }
        let results = map_blocks(&work, |&(key, b)| strip_block(level, key, b, ratio));
        for ((key, _), result) in work.iter().zip(results) {
            match result {
                Ok((amr_box, grid)) => {
                    stripped.insert_box(*key, amr_box)?;
                    if let Some(grid) = grid {
                        stripped.insert_shared_grid(l, *key, grid);
                    }
                }
                Err(error) => {
                    log::warn!("level {l}: block {key:?} not stripped: {error}");
                    failures.push(BlockFailure {
                        level: l,
                        key: *key,
                        error,
                    });
                }
            }
        }
    }
    // metadata is replicated, so the bounds need no reduction
    let bounds = compute_global_bounds(&stripped, &NoComm)?;
    stripped.set_bounds(bounds);
    comm.barrier()?;

    if options.fail_fast {
        if let Some(first) = failures.first() {
            return Err(first.error.clone());
        }
    }
    Ok(StripOutcome {
        hierarchy: stripped,
        failures,
    })
}

/// First level below the finest whose ratio is unset.
fn missing_ratio<G>(hierarchy: &Hierarchy<G>) -> Option<usize> {
    let levels = hierarchy.number_of_levels();
    (0..levels.saturating_sub(1)).find(|&l| hierarchy.refinement_ratio(l).is_none())
}

type StrippedBlock<G> = (AmrBox, Option<Arc<G>>);

fn strip_block<G: GridBlockMut>(
    level: &Level<G>,
    key: BlockKey,
    amr_box: &AmrBox,
    ratio: u32,
) -> Result<StrippedBlock<G>, AmrError> {
    let ghost = ghost_vector(amr_box, ratio);
    let grid = level.grid(key);
    if ghost.is_zero() {
        return Ok((*amr_box, grid.cloned()));
    }
    let real_box = amr_box.shrink(&ghost)?;
    let grid = match grid {
        Some(g) => {
            if g.cell_dimensions() != amr_box.cell_dimensions() {
                return Err(AmrError::GhostExtent {
                    ghost: ghost.as_array(),
                    cells: g.cell_dimensions(),
                });
            }
            Some(Arc::new(strip_ghost_layers_from_grid(g.as_ref(), &ghost)?))
        }
        None => None,
    };
    Ok((real_box, grid))
}

#[cfg(feature = "rayon")]
fn map_blocks<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    use rayon::prelude::*;
    items.par_iter().map(f).collect()
}

#[cfg(not(feature = "rayon"))]
fn map_blocks<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    F: Fn(&T) -> R,
{
    items.iter().map(f).collect()
}

/// New grid without the `ghost` cells of `grid`, fields included.
///
/// `ghost` counts cells on `{imin, imax, jmin, jmax, kmin, kmax}`.
pub fn strip_ghost_layers_from_grid<G: GridBlockMut>(
    grid: &G,
    ghost: &GhostVector,
) -> Result<G, AmrError> {
    let cells = grid.cell_dimensions();
    if !ghost.fits(cells) {
        return Err(AmrError::GhostExtent {
            ghost: ghost.as_array(),
            cells,
        });
    }
    let dims = grid.dimensions();
    let origin = grid.origin();
    let spacing = grid.spacing();
    let real_dims: [usize; 3] = std::array::from_fn(|a| dims[a] - ghost.lo(a) - ghost.hi(a));
    let real_origin: [f64; 3] =
        std::array::from_fn(|a| origin[a] + ghost.lo(a) as f64 * spacing[a]);
    let real_extent = [
        ghost.lo(0),
        dims[0] - 1 - ghost.hi(0),
        ghost.lo(1),
        dims[1] - 1 - ghost.hi(1),
        ghost.lo(2),
        dims[2] - 1 - ghost.hi(2),
    ];
    let mut stripped = G::with_geometry(real_origin, spacing, real_dims)?;
    copy_fields_within_real_extent(real_extent, grid, &mut stripped)?;
    Ok(stripped)
}

/// Copies point and cell data of `ghosted` inside `real_extent` into
/// `stripped`.
///
/// `real_extent` is a node extent `[i0, i1, j0, j1, k0, k1]` of the ghosted
/// grid; `stripped` must have exactly that many nodes per axis. Existing
/// arrays of `stripped` are replaced.
pub fn copy_fields_within_real_extent<G: GridBlockMut>(
    real_extent: [usize; 6],
    ghosted: &G,
    stripped: &mut G,
) -> Result<(), AmrError> {
    let gdims = ghosted.dimensions();
    let sdims = stripped.dimensions();
    for a in 0..3 {
        let (lo, hi) = (real_extent[2 * a], real_extent[2 * a + 1]);
        if hi < lo || hi >= gdims[a] || hi - lo + 1 != sdims[a] {
            return Err(AmrError::InvalidGrid(format!(
                "axis {a}: real extent {lo}..={hi} does not map {} ghosted nodes onto {} nodes",
                gdims[a], sdims[a]
            )));
        }
    }
    let [i0, i1, j0, j1, k0, k1] = real_extent;

    *stripped.point_data_mut() = ghosted.point_data().empty_like(stripped.number_of_points());
    if !ghosted.point_data().is_empty() {
        for (k, j, i) in iproduct!(k0..=k1, j0..=j1, i0..=i1) {
            let source = structured_index(gdims, [i, j, k]);
            let target = structured_index(sdims, [i - i0, j - j0, k - k0]);
            copy_field_data(stripped.point_data_mut(), target, ghosted.point_data(), source)?;
        }
    }

    let gcells = ghosted.cell_dimensions();
    let scells = stripped.cell_dimensions();
    *stripped.cell_data_mut() = ghosted.cell_data().empty_like(stripped.number_of_cells());
    if !ghosted.cell_data().is_empty() {
        for (k, j, i) in iproduct!(k0..k1, j0..j1, i0..i1) {
            let source = structured_index(gcells, [i, j, k]);
            let target = structured_index(scells, [i - i0, j - j0, k - k0]);
            copy_field_data(stripped.cell_data_mut(), target, ghosted.cell_data(), source)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::field::FieldArray;
    use crate::data::grid::{GridBlock, UniformGrid};

    fn indexed_grid(cells: [usize; 3]) -> UniformGrid {
        let mut g = UniformGrid::from_cells([0.0; 3], [1.0; 3], cells).unwrap();
        let n_cells = g.number_of_cells();
        let n_points = g.number_of_points();
        g.add_cell_array(FieldArray::new("id", 1, (0..n_cells as u64).collect()).unwrap())
            .unwrap();
        g.add_point_array(FieldArray::new("xyz", 3, vec![0.5f32; 3 * n_points]).unwrap())
            .unwrap();
        g.add_point_array(FieldArray::new("node", 1, (0..n_points as u64).collect()).unwrap())
            .unwrap();
        g
    }

    #[test]
    fn grid_shrinks_and_reindexes() {
        let g = indexed_grid([4, 3, 2]);
        let s = strip_ghost_layers_from_grid(&g, &GhostVector::new([1, 1, 0, 1, 0, 0])).unwrap();
        assert_eq!(s.cell_dimensions(), [2, 2, 2]);
        assert_eq!(s.origin(), [1.0, 0.0, 0.0]);
        let ids = s.cell_data().array("id").unwrap().values::<u64>().unwrap();
        // ghosted cell (i, j, k) has id i + 4 * (j + 3 * k)
        assert_eq!(ids, &[1, 2, 5, 6, 13, 14, 17, 18]);
        let xyz = s.point_data().array("xyz").unwrap();
        assert_eq!(xyz.tuples(), 3 * 3 * 3);
        assert_eq!(xyz.components(), 3);
    }

    #[test]
    fn point_data_follows_real_nodes() {
        let g = indexed_grid([4, 3, 2]);
        let gdims = g.dimensions();
        let s = strip_ghost_layers_from_grid(&g, &GhostVector::new([1, 1, 0, 1, 0, 0])).unwrap();
        let sdims = s.dimensions();
        assert_eq!(sdims, [3, 3, 3]);
        let nodes = s.point_data().array("node").unwrap().values::<u64>().unwrap();
        assert_eq!(nodes.len(), 27);
        // real nodes span i in 1..=3, j in 0..=2, k in 0..=2 of the ghosted grid
        for (k, j, i) in iproduct!(0..=2, 0..=2, 1..=3) {
            let stripped = structured_index(sdims, [i - 1, j, k]);
            assert_eq!(
                nodes[stripped],
                structured_index(gdims, [i, j, k]) as u64,
                "node ({i}, {j}, {k})"
            );
        }
        // first real node skips the imin ghost node, last one precedes the jmax layer
        assert_eq!(nodes[0], 1);
        assert_eq!(nodes[26], (3 + 5 * (2 + 4 * 2)) as u64);
    }

    #[test]
    fn swallowing_ghost_vector_rejected() {
        let g = indexed_grid([4, 3, 2]);
        let err = strip_ghost_layers_from_grid(&g, &GhostVector::new([0, 0, 0, 0, 1, 1]))
            .unwrap_err();
        assert_eq!(
            err,
            AmrError::GhostExtent {
                ghost: [0, 0, 0, 0, 1, 1],
                cells: [4, 3, 2]
            }
        );
    }
}
