#![cfg_attr(docsrs, feature(doc_cfg))]
//! # amr-meta
//!
//! amr-meta manages the metadata of block-structured adaptive mesh
//! refinement (AMR) hierarchies: one box per grid block in a global integer
//! index space, the refinement ratio between consecutive levels, and the
//! dataset origin and bounds. It replicates that metadata on every rank of a
//! distributed run and removes ghost layers whose cells only partially
//! overlap the next coarser level.
//!
//! ## Features
//! - [`Hierarchy`](topology::hierarchy::Hierarchy) of levels holding boxes
//!   and shared grid blocks
//! - Box construction, wire serialization and all-gather replication
//! - Refinement ratio detection and ghost layer detection
//! - Non-destructive ghost stripping with point and cell data re-indexed
//! - Pluggable communication backends (serial, threads, MPI)
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! amr-meta = "0.3"
//! # Optional features:
//! # features = ["mpi-support", "rayon"]
//! ```
//!
//! A typical run builds a hierarchy from local blocks, calls
//! [`generate_metadata`](algs::metadata::generate_metadata) and then
//! [`strip_ghost_layers`](algs::strip::strip_ghost_layers).

pub mod algs;
pub mod amr_error;
pub mod data;
pub mod debug_invariants;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::bounds::{compute_data_set_origin, compute_global_bounds};
    pub use crate::algs::box_builder::{compute_local_metadata, create_amr_box_for_grid};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{Communicator, NoComm, RayonComm, Wait};
    pub use crate::algs::distribute::{collect_amr_metadata, distribute_metadata};
    pub use crate::algs::ghost::{ghost_vector, has_partially_overlapping_ghost_cells};
    pub use crate::algs::metadata::generate_metadata;
    pub use crate::algs::refinement::{
        RefinementOptions, compute_level_refinement_ratio, compute_level_refinement_ratio_with,
    };
    pub use crate::algs::serialize::{deserialize_metadata, serialize_metadata};
    pub use crate::algs::strip::{
        BlockFailure, StripOptions, StripOutcome, copy_fields_within_real_extent,
        strip_ghost_layers, strip_ghost_layers_from_grid, strip_ghost_layers_with,
    };
    pub use crate::amr_error::AmrError;
    pub use crate::data::field::{FieldArray, FieldData, ScalarType, copy_field_data};
    pub use crate::data::grid::{GridBlock, GridBlockMut, UniformGrid};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::topology::amr_box::{AmrBox, GhostVector};
    pub use crate::topology::hierarchy::{BlockKey, Hierarchy, Level};
}
