//! Grid block contract and the uniform (image-data) block used by the crate.
//!
//! The metadata pipeline only needs a block's geometry and its field data;
//! [`GridBlock`] is that read-only contract. Stripping ghost layers builds
//! new blocks, which additionally needs [`GridBlockMut`].

use crate::amr_error::AmrError;
use crate::data::field::{FieldArray, FieldData};

/// Read-only view of one grid block.
pub trait GridBlock: Send + Sync {
    /// World position of node `(0, 0, 0)`.
    fn origin(&self) -> [f64; 3];

    /// Node spacing along each axis.
    fn spacing(&self) -> [f64; 3];

    /// Node counts along each axis.
    fn dimensions(&self) -> [usize; 3];

    /// Point-associated arrays, one tuple per node.
    fn point_data(&self) -> &FieldData;

    /// Cell-associated arrays, one tuple per cell.
    fn cell_data(&self) -> &FieldData;

    /// Node extent `[0, nx-1, 0, ny-1, 0, nz-1]`.
    fn extent(&self) -> [i32; 6] {
        let d = self.dimensions();
        [
            0,
            d[0] as i32 - 1,
            0,
            d[1] as i32 - 1,
            0,
            d[2] as i32 - 1,
        ]
    }

    /// Cell counts along each axis.
    fn cell_dimensions(&self) -> [usize; 3] {
        self.dimensions().map(|n| n.saturating_sub(1))
    }

    /// Total node count.
    fn number_of_points(&self) -> usize {
        self.dimensions().iter().product()
    }

    /// Total cell count.
    fn number_of_cells(&self) -> usize {
        self.cell_dimensions().iter().product()
    }
}

/// Blocks that can be created from geometry and filled field by field.
pub trait GridBlockMut: GridBlock + Sized {
    /// Empty block (no arrays) with the given geometry.
    fn with_geometry(
        origin: [f64; 3],
        spacing: [f64; 3],
        dimensions: [usize; 3],
    ) -> Result<Self, AmrError>;

    /// Mutable point-associated arrays.
    fn point_data_mut(&mut self) -> &mut FieldData;

    /// Mutable cell-associated arrays.
    fn cell_data_mut(&mut self) -> &mut FieldData;
}

/// Axis-aligned block of equally spaced nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformGrid {
    origin: [f64; 3],
    spacing: [f64; 3],
    dimensions: [usize; 3],
    point_data: FieldData,
    cell_data: FieldData,
}

impl UniformGrid {
    /// Creates a block with no arrays. Every axis needs at least two nodes.
    pub fn try_new(
        origin: [f64; 3],
        spacing: [f64; 3],
        dimensions: [usize; 3],
    ) -> Result<Self, AmrError> {
        for axis in 0..3 {
            if dimensions[axis] < 2 {
                return Err(AmrError::InvalidGrid(format!(
                    "axis {axis} has {} nodes; at least 2 are required",
                    dimensions[axis]
                )));
            }
            if !(spacing[axis].is_finite() && spacing[axis] > 0.0) {
                return Err(AmrError::InvalidGrid(format!(
                    "axis {axis} spacing {} must be finite and positive",
                    spacing[axis]
                )));
            }
            if !origin[axis].is_finite() {
                return Err(AmrError::InvalidGrid(format!(
                    "axis {axis} origin is not finite"
                )));
            }
        }
        Ok(Self {
            origin,
            spacing,
            dimensions,
            point_data: FieldData::new(),
            cell_data: FieldData::new(),
        })
    }

    /// Block covering `cells` cells starting at `origin`.
    pub fn from_cells(
        origin: [f64; 3],
        spacing: [f64; 3],
        cells: [usize; 3],
    ) -> Result<Self, AmrError> {
        Self::try_new(origin, spacing, cells.map(|c| c + 1))
    }

    /// Attaches a point-associated array (one tuple per node).
    pub fn add_point_array(&mut self, array: FieldArray) -> Result<(), AmrError> {
        check_tuples(&array, self.number_of_points())?;
        self.point_data.add_array(array)
    }

    /// Attaches a cell-associated array (one tuple per cell).
    pub fn add_cell_array(&mut self, array: FieldArray) -> Result<(), AmrError> {
        check_tuples(&array, self.number_of_cells())?;
        self.cell_data.add_array(array)
    }

    /// Flat point index of node `(i, j, k)`, `i` fastest.
    #[inline]
    pub fn point_index(&self, ijk: [usize; 3]) -> usize {
        structured_index(self.dimensions, ijk)
    }

    /// Flat cell index of cell `(i, j, k)`, `i` fastest.
    #[inline]
    pub fn cell_index(&self, ijk: [usize; 3]) -> usize {
        structured_index(self.cell_dimensions(), ijk)
    }
}

fn check_tuples(array: &FieldArray, expected: usize) -> Result<(), AmrError> {
    if array.tuples() != expected {
        return Err(AmrError::FieldArrayMismatch {
            name: array.name().to_string(),
            reason: format!("{} tuples, block has {expected}", array.tuples()),
        });
    }
    Ok(())
}

/// Flat index of `ijk` in a structured block of `dims`, `i` fastest.
#[inline]
pub fn structured_index(dims: [usize; 3], ijk: [usize; 3]) -> usize {
    ijk[0] + dims[0] * (ijk[1] + dims[1] * ijk[2])
}

impl GridBlock for UniformGrid {
    fn origin(&self) -> [f64; 3] {
        self.origin
    }

    fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    fn dimensions(&self) -> [usize; 3] {
        self.dimensions
    }

    fn point_data(&self) -> &FieldData {
        &self.point_data
    }

    fn cell_data(&self) -> &FieldData {
        &self.cell_data
    }
}

impl GridBlockMut for UniformGrid {
    fn with_geometry(
        origin: [f64; 3],
        spacing: [f64; 3],
        dimensions: [usize; 3],
    ) -> Result<Self, AmrError> {
        Self::try_new(origin, spacing, dimensions)
    }

    fn point_data_mut(&mut self) -> &mut FieldData {
        &mut self.point_data
    }

    fn cell_data_mut(&mut self) -> &mut FieldData {
        &mut self.cell_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_axis_rejected() {
        let err = UniformGrid::try_new([0.0; 3], [1.0; 3], [4, 4, 1]).unwrap_err();
        assert!(matches!(err, AmrError::InvalidGrid(_)));
    }

    #[test]
    fn cell_and_point_counts() {
        let g = UniformGrid::from_cells([0.0; 3], [0.5; 3], [4, 3, 2]).unwrap();
        assert_eq!(g.dimensions(), [5, 4, 3]);
        assert_eq!(g.extent(), [0, 4, 0, 3, 0, 2]);
        assert_eq!(g.number_of_cells(), 24);
        assert_eq!(g.number_of_points(), 60);
        assert_eq!(g.cell_index([1, 2, 1]), 1 + 4 * (2 + 3));
    }

    #[test]
    fn array_size_checked() {
        let mut g = UniformGrid::from_cells([0.0; 3], [1.0; 3], [2, 2, 2]).unwrap();
        let bad = FieldArray::new("pressure", 1, vec![0.0f64; 7]).unwrap();
        assert!(g.add_cell_array(bad).is_err());
        let ok = FieldArray::new("pressure", 1, vec![0.0f64; 8]).unwrap();
        g.add_cell_array(ok).unwrap();
        assert_eq!(g.cell_data().len(), 1);
    }
}
