//! One-call metadata generation.

use crate::algs::bounds::compute_global_bounds;
use crate::algs::communicator::Communicator;
use crate::algs::distribute::collect_amr_metadata;
use crate::algs::refinement::compute_level_refinement_ratio;
use crate::amr_error::AmrError;
use crate::data::grid::GridBlock;
use crate::debug_invariants::DebugInvariants;
use crate::topology::hierarchy::Hierarchy;

/// Collects metadata, computes refinement ratios and stores the global
/// bounds.
///
/// Collective when `comm.size() > 1`. On return every rank holds the same
/// boxes, ratios, origin and bounds.
pub fn generate_metadata<G, C>(
    hierarchy: &mut Hierarchy<G>,
    comm: &C,
    origin: Option<[f64; 3]>,
) -> Result<(), AmrError>
where
    G: GridBlock,
    C: Communicator + ?Sized,
{
    collect_amr_metadata(hierarchy, comm, origin)?;
    compute_level_refinement_ratio(hierarchy)?;
    let bounds = compute_global_bounds(hierarchy, comm)?;
    hierarchy.set_bounds(bounds);
    crate::debug_invariants!(hierarchy.validate_invariants(), "generate_metadata");
    log::info!(
        "rank {}: metadata for {} boxes on {} levels, bounds {:?}",
        comm.rank(),
        hierarchy.number_of_boxes(),
        hierarchy.number_of_levels(),
        bounds
    );
    Ok(())
}
