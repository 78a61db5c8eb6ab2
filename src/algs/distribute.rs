//! Replicating box metadata on every rank.
//!
//! Each rank serializes the boxes it owns, the communicator all-gathers the
//! buffers, and every rank merges the other ranks' boxes into its replica.
//! Merged boxes are keyed by `(level, owner rank, ordinal)`, where the
//! ordinal counts the owner's boxes on that level in the order they were
//! sent. Because senders serialize in key order, the ordinal equals the
//! owner's local block index.

use crate::algs::bounds::compute_data_set_origin;
use crate::algs::box_builder::compute_local_metadata;
use crate::algs::communicator::Communicator;
use crate::algs::serialize::{deserialize_metadata, serialize_metadata};
use crate::amr_error::AmrError;
use crate::data::grid::GridBlock;
use crate::topology::hierarchy::{BlockKey, Hierarchy};
use std::collections::BTreeMap;

/// Exchanges local metadata so every rank holds every box.
///
/// Collective: all ranks must call it together. A box whose
/// `(level, rank, index)` slot is already populated is reported as
/// [`AmrError::DuplicateBox`]; a box declaring an owner other than its
/// sender as [`AmrError::OwnershipMismatch`].
pub fn distribute_metadata<G, C>(hierarchy: &mut Hierarchy<G>, comm: &C) -> Result<(), AmrError>
where
    C: Communicator + ?Sized,
{
    let me = comm.rank();
    let local = serialize_metadata(hierarchy)?;
    let gathered = comm.all_gather(&local)?;
    let mut merged = 0usize;
    for (sender, buf) in gathered.iter().enumerate() {
        if sender == me {
            continue;
        }
        let boxes = deserialize_metadata(buf)?;
        let mut ordinal: BTreeMap<usize, usize> = BTreeMap::new();
        for b in boxes {
            if b.rank() != sender {
                return Err(AmrError::OwnershipMismatch {
                    sender,
                    declared: b.rank(),
                });
            }
            let next = ordinal.entry(b.level()).or_insert(0);
            hierarchy.insert_box(BlockKey::new(sender, *next), b)?;
            *next += 1;
            merged += 1;
        }
    }
    log::debug!(
        "rank {me}: merged {merged} remote boxes from {} ranks",
        gathered.len().saturating_sub(1)
    );
    Ok(())
}

/// Collects and constructs the metadata of `hierarchy`.
///
/// Resolves the dataset origin (collectively, unless `origin` is given),
/// builds boxes for the grids owned by `comm.rank()` and, when more than
/// one rank participates, replaces any previously replicated remote boxes
/// with a fresh exchange.
pub fn collect_amr_metadata<G, C>(
    hierarchy: &mut Hierarchy<G>,
    comm: &C,
    origin: Option<[f64; 3]>,
) -> Result<(), AmrError>
where
    G: GridBlock,
    C: Communicator + ?Sized,
{
    let origin = match origin {
        Some(o) => o,
        None => compute_data_set_origin(hierarchy, comm)?,
    };
    hierarchy.set_origin(origin);
    compute_local_metadata(origin, hierarchy, comm.rank())?;
    if comm.size() > 1 {
        hierarchy.clear_remote_boxes();
        distribute_metadata(hierarchy, comm)?;
    }
    Ok(())
}
