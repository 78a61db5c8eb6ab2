//! `AmrBox`: index-space descriptor of one grid block.
//!
//! A box is the metadata half of a block: level, cell-centered inclusive
//! index extent, grid spacing and owning rank. Index extents are expressed
//! on the block's own level; world coordinates are recovered with the
//! hierarchy origin:
//!
//! ```text
//! min = origin + lo * h
//! max = origin + (hi + 1) * h
//! ```
//!
//! This module also hosts [`GhostVector`], the per-face ghost cell counts
//! used when stripping overlap layers.

use crate::amr_error::AmrError;
use serde::{Deserialize, Serialize};

/// Metadata for one axis-aligned block of cells.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AmrBox {
    level: usize,
    lo: [i32; 3],
    hi: [i32; 3],
    spacing: [f64; 3],
    rank: usize,
}

impl AmrBox {
    /// Builds a box from corner indices, validating `hi >= lo` and spacing.
    pub fn new(
        level: usize,
        lo: [i32; 3],
        hi: [i32; 3],
        spacing: [f64; 3],
        rank: usize,
    ) -> Result<Self, AmrError> {
        for axis in 0..3 {
            if hi[axis] < lo[axis] {
                return Err(AmrError::InvalidBox(format!(
                    "axis {axis}: hi {} < lo {}",
                    hi[axis], lo[axis]
                )));
            }
            if !(spacing[axis].is_finite() && spacing[axis] > 0.0) {
                return Err(AmrError::InvalidBox(format!(
                    "axis {axis}: spacing {} must be finite and positive",
                    spacing[axis]
                )));
            }
        }
        Ok(Self {
            level,
            lo,
            hi,
            spacing,
            rank,
        })
    }

    /// Builds a box from an `[ilo, ihi, jlo, jhi, klo, khi]` extent.
    pub fn from_extent(
        level: usize,
        extent: [i32; 6],
        spacing: [f64; 3],
        rank: usize,
    ) -> Result<Self, AmrError> {
        Self::new(
            level,
            [extent[0], extent[2], extent[4]],
            [extent[1], extent[3], extent[5]],
            spacing,
            rank,
        )
    }

    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    #[inline]
    pub fn lo(&self) -> [i32; 3] {
        self.lo
    }

    #[inline]
    pub fn hi(&self) -> [i32; 3] {
        self.hi
    }

    #[inline]
    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    /// Rank that owns the backing grid block.
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Extent as `[ilo, ihi, jlo, jhi, klo, khi]`.
    pub fn extent(&self) -> [i32; 6] {
        [
            self.lo[0], self.hi[0], self.lo[1], self.hi[1], self.lo[2], self.hi[2],
        ]
    }

    /// Number of cells along each axis.
    pub fn cell_dimensions(&self) -> [usize; 3] {
        std::array::from_fn(|a| (self.hi[a] as i64 - self.lo[a] as i64 + 1) as usize)
    }

    pub fn number_of_cells(&self) -> usize {
        self.cell_dimensions().iter().product()
    }

    /// World-space `(min, max)` corners relative to `origin`.
    pub fn world_bounds(&self, origin: [f64; 3]) -> ([f64; 3], [f64; 3]) {
        let min = std::array::from_fn(|a| origin[a] + f64::from(self.lo[a]) * self.spacing[a]);
        let max =
            std::array::from_fn(|a| origin[a] + (f64::from(self.hi[a]) + 1.0) * self.spacing[a]);
        (min, max)
    }

    /// Index-space intersection with `other`, if any cell is shared.
    ///
    /// Both boxes must live on the same level; spacing is not compared.
    pub fn intersect(&self, other: &AmrBox) -> Option<([i32; 3], [i32; 3])> {
        let lo: [i32; 3] = std::array::from_fn(|a| self.lo[a].max(other.lo[a]));
        let hi: [i32; 3] = std::array::from_fn(|a| self.hi[a].min(other.hi[a]));
        (0..3).all(|a| lo[a] <= hi[a]).then_some((lo, hi))
    }

    /// True if every cell of `other` is also a cell of `self`.
    pub fn contains(&self, other: &AmrBox) -> bool {
        (0..3).all(|a| self.lo[a] <= other.lo[a] && other.hi[a] <= self.hi[a])
    }

    /// Non-empty overlap where neither box contains the other.
    pub fn partially_overlaps(&self, other: &AmrBox) -> bool {
        self.intersect(other).is_some() && !self.contains(other) && !other.contains(self)
    }

    /// Corners of the coarse cells covering this box for refinement ratio `r`.
    pub fn coarsened(&self, r: u32) -> ([i32; 3], [i32; 3]) {
        let r = r.max(1) as i32;
        (
            std::array::from_fn(|a| self.lo[a].div_euclid(r)),
            std::array::from_fn(|a| self.hi[a].div_euclid(r)),
        )
    }

    /// Box with `ghost` cells removed from each face.
    ///
    /// Fails with [`AmrError::GhostExtent`] when an axis would lose all of
    /// its cells.
    pub fn shrink(&self, ghost: &GhostVector) -> Result<AmrBox, AmrError> {
        let cells = self.cell_dimensions();
        if !ghost.fits(cells) {
            return Err(AmrError::GhostExtent {
                ghost: ghost.as_array(),
                cells,
            });
        }
        let lo = std::array::from_fn(|a| self.lo[a] + ghost.lo(a) as i32);
        let hi = std::array::from_fn(|a| self.hi[a] - ghost.hi(a) as i32);
        AmrBox::new(self.level, lo, hi, self.spacing, self.rank)
    }
}

/// Ghost cell counts on `{imin, imax, jmin, jmax, kmin, kmax}`.
///
/// `{0,2,0,2,0,0}` means two ghost cells on the `imax` and `jmax` faces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GhostVector([usize; 6]);

impl GhostVector {
    pub const ZERO: GhostVector = GhostVector([0; 6]);

    #[inline]
    pub fn new(counts: [usize; 6]) -> Self {
        Self(counts)
    }

    /// Ghost cells on the low face of `axis`.
    #[inline]
    pub fn lo(&self, axis: usize) -> usize {
        self.0[2 * axis]
    }

    /// Ghost cells on the high face of `axis`.
    #[inline]
    pub fn hi(&self, axis: usize) -> usize {
        self.0[2 * axis + 1]
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&g| g == 0)
    }

    #[inline]
    pub fn as_array(&self) -> [usize; 6] {
        self.0
    }

    /// True if at least one real cell survives on every axis.
    pub fn fits(&self, cells: [usize; 3]) -> bool {
        (0..3).all(|a| self.lo(a) + self.hi(a) < cells[a])
    }
}

impl From<[usize; 6]> for GhostVector {
    fn from(counts: [usize; 6]) -> Self {
        Self(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(lo: [i32; 3], hi: [i32; 3]) -> AmrBox {
        AmrBox::new(0, lo, hi, [1.0; 3], 0).unwrap()
    }

    #[test]
    fn rejects_inverted_extent() {
        let err = AmrBox::new(0, [0, 0, 0], [3, -1, 3], [1.0; 3], 0).unwrap_err();
        assert!(matches!(err, AmrError::InvalidBox(_)));
    }

    #[test]
    fn rejects_non_positive_spacing() {
        assert!(AmrBox::new(0, [0; 3], [1; 3], [1.0, 0.0, 1.0], 0).is_err());
        assert!(AmrBox::new(0, [0; 3], [1; 3], [1.0, f64::NAN, 1.0], 0).is_err());
    }

    #[test]
    fn world_bounds_use_cell_faces() {
        let b = AmrBox::new(1, [2, 0, 0], [5, 3, 1], [0.5; 3], 0).unwrap();
        let (min, max) = b.world_bounds([1.0, 0.0, 0.0]);
        assert_eq!(min, [2.0, 0.0, 0.0]);
        assert_eq!(max, [4.0, 2.0, 1.0]);
        assert_eq!(b.cell_dimensions(), [4, 4, 2]);
        assert_eq!(b.number_of_cells(), 32);
    }

    #[test]
    fn overlap_classification() {
        let a = unit_box([0; 3], [9; 3]);
        let inner = unit_box([2; 3], [4; 3]);
        let shifted = unit_box([8, 0, 0], [12, 9, 9]);
        let apart = unit_box([10, 0, 0], [19, 9, 9]);
        assert!(a.contains(&inner));
        assert!(!a.partially_overlaps(&inner));
        assert!(a.partially_overlaps(&shifted));
        assert!(a.intersect(&apart).is_none());
        assert!(!a.partially_overlaps(&apart));
    }

    #[test]
    fn coarsen_floors_negative_indices() {
        let b = unit_box([-3, 0, 5], [-1, 3, 7]);
        let (lo, hi) = b.coarsened(2);
        assert_eq!(lo, [-2, 0, 2]);
        assert_eq!(hi, [-1, 1, 3]);
    }

    #[test]
    fn shrink_by_ghost_vector() {
        let b = unit_box([0; 3], [9; 3]);
        let s = b.shrink(&GhostVector::new([0, 2, 0, 2, 0, 0])).unwrap();
        assert_eq!(s.extent(), [0, 7, 0, 7, 0, 9]);
        let err = b.shrink(&GhostVector::new([5, 5, 0, 0, 0, 0])).unwrap_err();
        assert!(matches!(err, AmrError::GhostExtent { .. }));
    }
}
