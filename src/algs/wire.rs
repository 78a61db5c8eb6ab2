//! Fixed, little-endian wire types for AMR metadata exchange.
//!
//! Layout of a serialized metadata buffer (no padding, no version header):
//!
//! ```text
//! [box_count: u32]
//! box_count × [level: i32][ilo, ihi, jlo, jhi, klo, khi: i32 × 6][dx, dy, dz: f64 × 3][rank: i32]
//! ```
//!
//! All multi-byte values are **little-endian** on the wire. Records are made
//! of byte arrays so they have alignment 1 and can be cast from any offset
//! of a received buffer.

use crate::amr_error::AmrError;
use crate::topology::amr_box::AmrBox;
use bytemuck::{Pod, Zeroable};
use static_assertions::{const_assert_eq, assert_eq_align};
use std::mem::size_of;

pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} bytes, got {actual}"))
    }
}

/// Number of records that follow.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: [u8; 4],
}

impl WireCount {
    pub fn new(n: usize) -> Result<Self, AmrError> {
        let n = u32::try_from(n)
            .map_err(|_| AmrError::InvalidWireValue(format!("count {n} exceeds u32")))?;
        Ok(Self {
            n_le: n.to_le_bytes(),
        })
    }

    pub fn get(&self) -> usize {
        u32::from_le_bytes(self.n_le) as usize
    }
}

/// One box record.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireBox {
    pub level_le: [u8; 4],
    pub extent_le: [[u8; 4]; 6],
    pub spacing_le: [[u8; 8]; 3],
    pub rank_le: [u8; 4],
}

impl WireBox {
    pub const SIZE: usize = 56; // 4 + 6*4 + 3*8 + 4

    pub fn encode(b: &AmrBox) -> Result<Self, AmrError> {
        let level = i32::try_from(b.level())
            .map_err(|_| AmrError::InvalidWireValue(format!("level {} exceeds i32", b.level())))?;
        let rank = i32::try_from(b.rank())
            .map_err(|_| AmrError::InvalidWireValue(format!("rank {} exceeds i32", b.rank())))?;
        Ok(Self {
            level_le: level.to_le_bytes(),
            extent_le: b.extent().map(i32::to_le_bytes),
            spacing_le: b.spacing().map(f64::to_le_bytes),
            rank_le: rank.to_le_bytes(),
        })
    }

    pub fn decode(&self) -> Result<AmrBox, AmrError> {
        let level = i32::from_le_bytes(self.level_le);
        let rank = i32::from_le_bytes(self.rank_le);
        let level = usize::try_from(level)
            .map_err(|_| AmrError::InvalidWireValue(format!("negative level {level}")))?;
        let rank = usize::try_from(rank)
            .map_err(|_| AmrError::InvalidWireValue(format!("negative rank {rank}")))?;
        let extent = self.extent_le.map(i32::from_le_bytes);
        let spacing = self.spacing_le.map(f64::from_le_bytes);
        AmrBox::from_extent(level, extent, spacing, rank)
            .map_err(|e| AmrError::InvalidWireValue(e.to_string()))
    }
}

// ===== Compile-time sanity checks =========================================

const_assert_eq!(size_of::<WireCount>(), 4);
const_assert_eq!(size_of::<WireBox>(), WireBox::SIZE);
assert_eq_align!(WireBox, u8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_layout_is_little_endian() {
        let b = AmrBox::new(2, [-1, 0, 3], [4, 5, 6], [0.25, 0.5, 1.0], 7).unwrap();
        let w = WireBox::encode(&b).unwrap();
        let bytes = bytemuck::bytes_of(&w);
        assert_eq!(bytes.len(), WireBox::SIZE);
        assert_eq!(&bytes[0..4], &[2, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &(-1i32).to_le_bytes());
        assert_eq!(&bytes[28..36], &0.25f64.to_le_bytes());
        assert_eq!(&bytes[52..56], &[7, 0, 0, 0]);
        assert_eq!(w.decode().unwrap(), b);
    }

    #[test]
    fn negative_rank_rejected() {
        let b = AmrBox::new(0, [0; 3], [1; 3], [1.0; 3], 0).unwrap();
        let mut w = WireBox::encode(&b).unwrap();
        w.rank_le = (-3i32).to_le_bytes();
        assert!(matches!(w.decode(), Err(AmrError::InvalidWireValue(_))));
    }

    #[test]
    fn expect_exact_len_err() {
        assert!(expect_exact_len(3, 4).is_err());
        assert!(expect_exact_len(4, 4).is_ok());
    }
}
