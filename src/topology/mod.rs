//! Index-space topology of an AMR hierarchy.
//!
//! - [`amr_box::AmrBox`]: the cell extent of one block on its level
//! - [`hierarchy::Hierarchy`]: levels of boxes and grid blocks keyed by
//!   `(owner rank, block index)`

pub mod amr_box;
pub mod hierarchy;

pub use amr_box::{AmrBox, GhostVector};
pub use hierarchy::{BlockKey, Hierarchy, Level};
