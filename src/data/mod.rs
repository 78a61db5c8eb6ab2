//! Data module: grid blocks and their field arrays
#![warn(missing_docs)]

pub mod field;
pub mod grid;

pub use field::{FieldArray, FieldData, ScalarType};
pub use grid::{GridBlock, GridBlockMut, UniformGrid};
