//! Global origin and bounds of a hierarchy.
//!
//! Both reductions are collective when `comm.size() > 1`. Ranks without any
//! contribution pass the reduction identity (`+inf` for minima, `-inf` for
//! maxima). When no rank contributes anything the result is all zeros.

use crate::algs::communicator::Communicator;
use crate::amr_error::AmrError;
use crate::data::grid::GridBlock;
use crate::topology::hierarchy::Hierarchy;

/// Minimum lower corner over the level-0 grids of every rank.
///
/// Level 0 is assumed to cover the whole domain, so finer levels are not
/// inspected.
pub fn compute_data_set_origin<G, C>(
    hierarchy: &Hierarchy<G>,
    comm: &C,
) -> Result<[f64; 3], AmrError>
where
    G: GridBlock,
    C: Communicator + ?Sized,
{
    let mut origin = [f64::INFINITY; 3];
    for (_, grid) in hierarchy.local_grids(0) {
        let o = grid.origin();
        for a in 0..3 {
            origin[a] = origin[a].min(o[a]);
        }
    }
    if comm.size() > 1 {
        let global = comm.all_reduce_min(&origin)?;
        origin.copy_from_slice(&global);
    }
    if origin.iter().any(|v| !v.is_finite()) {
        log::warn!("no level-0 blocks found; dataset origin defaults to zero");
        return Ok([0.0; 3]);
    }
    Ok(origin)
}

/// `[xmin, ymin, zmin, xmax, ymax, zmax]` over every box of every level.
///
/// World corners are taken relative to the hierarchy origin.
pub fn compute_global_bounds<G, C>(
    hierarchy: &Hierarchy<G>,
    comm: &C,
) -> Result<[f64; 6], AmrError>
where
    C: Communicator + ?Sized,
{
    let origin = hierarchy.origin();
    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    for (_, b) in hierarchy.all_boxes() {
        let (lo, hi) = b.world_bounds(origin);
        for a in 0..3 {
            min[a] = min[a].min(lo[a]);
            max[a] = max[a].max(hi[a]);
        }
    }
    if comm.size() > 1 {
        let global_min = comm.all_reduce_min(&min)?;
        let global_max = comm.all_reduce_max(&max)?;
        min.copy_from_slice(&global_min);
        max.copy_from_slice(&global_max);
    }
    if min.iter().chain(&max).any(|v| !v.is_finite()) {
        log::warn!("hierarchy has no boxes; global bounds default to zero");
        return Ok([0.0; 6]);
    }
    Ok([min[0], min[1], min[2], max[0], max[1], max[2]])
}
