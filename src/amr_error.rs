//! AmrError: Unified error type for amr-meta public APIs
//!
//! Every fallible operation in the crate returns `Result<_, AmrError>`.
//! All failures are data-quality or usage errors; none of them is transient,
//! so nothing in the crate retries.

use thiserror::Error;

/// Unified error type for AMR metadata operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AmrError {
    /// Serialized metadata length disagrees with the declared box count.
    #[error(
        "malformed metadata buffer: {declared} boxes declared, expected {expected_bytes} bytes, got {found_bytes}"
    )]
    MalformedBuffer {
        declared: usize,
        expected_bytes: usize,
        found_bytes: usize,
    },
    /// A value cannot be represented on (or was decoded invalid from) the wire.
    #[error("invalid wire value: {0}")]
    InvalidWireValue(String),
    /// Ratio between `level` and `level + 1` is non-integral or inconsistent.
    #[error("refinement ratio mismatch at level {level}: {reason}")]
    RefinementRatioMismatch { level: usize, reason: String },
    /// A ratio was required but never computed for `level`.
    #[error("refinement ratio for level {level} is not set")]
    MissingRefinementRatio { level: usize },
    /// Ghost counts leave no real cells (or disagree with the block size).
    #[error("ghost vector {ghost:?} is invalid for a block with {cells:?} cells")]
    GhostExtent { ghost: [usize; 6], cells: [usize; 3] },
    /// Two boxes claim the same `(level, rank, index)` slot.
    #[error("duplicate box at level {level} for rank {rank}, index {index}")]
    DuplicateBox {
        level: usize,
        rank: usize,
        index: usize,
    },
    /// A rank sent metadata for a box it does not own.
    #[error("rank {sender} sent a box owned by rank {declared}")]
    OwnershipMismatch { sender: usize, declared: usize },
    /// Box extent or spacing violates the box invariants.
    #[error("invalid box: {0}")]
    InvalidBox(String),
    /// Grid geometry is unusable (flat axis, bad spacing, size mismatch).
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
    /// Source and target arrays disagree on name, type or component count.
    #[error("field array `{name}` mismatch: {reason}")]
    FieldArrayMismatch { name: String, reason: String },
    /// Tuple index past the end of an array.
    #[error("field array `{name}`: tuple {index} out of range ({tuples} tuples)")]
    FieldIndexOutOfRange {
        name: String,
        index: usize,
        tuples: usize,
    },
    /// An array with this name already exists in the field data.
    #[error("field array `{0}` already present")]
    DuplicateFieldArray(String),
    /// Level index past the end of the hierarchy.
    #[error("level {level} out of range ({levels} levels)")]
    LevelOutOfRange { level: usize, levels: usize },
    /// Collective or point-to-point communication failed.
    #[error("communication with rank {neighbor} failed: {message}")]
    CommError { neighbor: usize, message: String },
}
