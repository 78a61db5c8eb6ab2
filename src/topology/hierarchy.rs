//! Levels and the AMR hierarchy.
//!
//! A [`Hierarchy`] owns the grid blocks of one rank and the box metadata of
//! every block that rank knows about. Blocks are addressed by
//! `(level, BlockKey)`; the key orders boxes rank-major, so once metadata
//! has been distributed every rank iterates each level in the same order.
//!
//! Cloning a hierarchy is shallow: grid blocks sit behind [`Arc`] and are
//! shared between the clones.

use crate::amr_error::AmrError;
use crate::data::grid::{GridBlock, UniformGrid};
use crate::topology::amr_box::AmrBox;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Owner rank and local index of a block within its level.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BlockKey {
    pub rank: usize,
    pub index: usize,
}

impl BlockKey {
    #[inline]
    pub fn new(rank: usize, index: usize) -> Self {
        Self { rank, index }
    }
}

/// One refinement level.
#[derive(Debug)]
pub struct Level<G> {
    grids: BTreeMap<BlockKey, Arc<G>>,
    boxes: BTreeMap<BlockKey, AmrBox>,
    refinement_ratio: Option<u32>,
}

impl<G> Default for Level<G> {
    fn default() -> Self {
        Self {
            grids: BTreeMap::new(),
            boxes: BTreeMap::new(),
            refinement_ratio: None,
        }
    }
}

impl<G> Clone for Level<G> {
    fn clone(&self) -> Self {
        Self {
            grids: self.grids.clone(),
            boxes: self.boxes.clone(),
            refinement_ratio: self.refinement_ratio,
        }
    }
}

impl<G> Level<G> {
    /// Ratio to the next finer level; `None` on the finest level or if unset.
    #[inline]
    pub fn refinement_ratio(&self) -> Option<u32> {
        self.refinement_ratio
    }

    /// Box metadata in key order.
    pub fn boxes(&self) -> impl Iterator<Item = (BlockKey, &AmrBox)> {
        self.boxes.iter().map(|(k, b)| (*k, b))
    }

    pub fn amr_box(&self, key: BlockKey) -> Option<&AmrBox> {
        self.boxes.get(&key)
    }

    /// Locally owned grid blocks in key order.
    pub fn grids(&self) -> impl Iterator<Item = (BlockKey, &Arc<G>)> {
        self.grids.iter().map(|(k, g)| (*k, g))
    }

    pub fn grid(&self, key: BlockKey) -> Option<&Arc<G>> {
        self.grids.get(&key)
    }

    pub fn number_of_boxes(&self) -> usize {
        self.boxes.len()
    }

    pub fn number_of_grids(&self) -> usize {
        self.grids.len()
    }
}

/// Ordered refinement levels plus the global origin and bounds.
#[derive(Debug)]
pub struct Hierarchy<G = UniformGrid> {
    levels: Vec<Level<G>>,
    origin: [f64; 3],
    bounds: [f64; 6],
    rank: usize,
}

impl<G> Clone for Hierarchy<G> {
    fn clone(&self) -> Self {
        Self {
            levels: self.levels.clone(),
            origin: self.origin,
            bounds: self.bounds,
            rank: self.rank,
        }
    }
}

impl<G> Default for Hierarchy<G> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<G> Hierarchy<G> {
    /// Empty hierarchy whose local grids belong to `rank`.
    pub fn new(rank: usize) -> Self {
        Self {
            levels: Vec::new(),
            origin: [0.0; 3],
            bounds: [0.0; 6],
            rank,
        }
    }

    /// Empty hierarchy with `levels` empty levels.
    pub fn with_levels(rank: usize, levels: usize) -> Self {
        let mut h = Self::new(rank);
        h.ensure_levels(levels);
        h
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    #[inline]
    pub fn number_of_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[Level<G>] {
        &self.levels
    }

    pub fn level(&self, level: usize) -> Result<&Level<G>, AmrError> {
        self.levels.get(level).ok_or(AmrError::LevelOutOfRange {
            level,
            levels: self.levels.len(),
        })
    }

    /// Grows the hierarchy to at least `levels` levels.
    pub fn ensure_levels(&mut self, levels: usize) {
        if self.levels.len() < levels {
            self.levels.resize_with(levels, Level::default);
        }
    }

    #[inline]
    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    pub fn set_origin(&mut self, origin: [f64; 3]) {
        self.origin = origin;
    }

    /// `[xmin, ymin, zmin, xmax, ymax, zmax]` as last computed.
    #[inline]
    pub fn bounds(&self) -> [f64; 6] {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: [f64; 6]) {
        self.bounds = bounds;
    }

    pub fn refinement_ratio(&self, level: usize) -> Option<u32> {
        self.levels.get(level).and_then(|l| l.refinement_ratio)
    }

    pub(crate) fn set_refinement_ratio(&mut self, level: usize, ratio: Option<u32>) {
        if let Some(l) = self.levels.get_mut(level) {
            l.refinement_ratio = ratio;
        }
    }

    /// Adds a locally owned grid block to `level`, growing the hierarchy if
    /// needed. Returns the block's key.
    pub fn add_grid(&mut self, level: usize, grid: G) -> BlockKey {
        self.add_shared_grid(level, Arc::new(grid))
    }

    /// Like [`add_grid`](Self::add_grid) for a block that is already shared.
    pub fn add_shared_grid(&mut self, level: usize, grid: Arc<G>) -> BlockKey {
        self.ensure_levels(level + 1);
        let rank = self.rank;
        let lvl = &mut self.levels[level];
        let index = lvl
            .grids
            .keys()
            .filter(|k| k.rank == rank)
            .map(|k| k.index + 1)
            .max()
            .unwrap_or(0);
        let key = BlockKey::new(rank, index);
        lvl.grids.insert(key, grid);
        key
    }

    /// Grid block at `(level, key)` if it is held by this rank.
    pub fn grid(&self, level: usize, key: BlockKey) -> Option<&Arc<G>> {
        self.levels.get(level)?.grids.get(&key)
    }

    pub fn amr_box(&self, level: usize, key: BlockKey) -> Option<&AmrBox> {
        self.levels.get(level)?.boxes.get(&key)
    }

    /// Every box of every level, coarsest first, in key order.
    pub fn all_boxes(&self) -> impl Iterator<Item = (BlockKey, &AmrBox)> {
        self.levels.iter().flat_map(|l| l.boxes())
    }

    /// Total number of boxes over all levels.
    pub fn number_of_boxes(&self) -> usize {
        self.levels.iter().map(|l| l.boxes.len()).sum()
    }

    /// Inserts metadata for `key` at the box's level.
    ///
    /// A key that is already populated is rejected with
    /// [`AmrError::DuplicateBox`].
    pub fn insert_box(&mut self, key: BlockKey, amr_box: AmrBox) -> Result<(), AmrError> {
        let level = amr_box.level();
        self.ensure_levels(level + 1);
        let boxes = &mut self.levels[level].boxes;
        if boxes.contains_key(&key) {
            return Err(AmrError::DuplicateBox {
                level,
                rank: key.rank,
                index: key.index,
            });
        }
        boxes.insert(key, amr_box);
        Ok(())
    }

    /// Drops box metadata owned by `rank` on every level.
    pub fn clear_boxes_of(&mut self, rank: usize) {
        for level in &mut self.levels {
            level.boxes.retain(|k, _| k.rank != rank);
        }
    }

    /// Drops box metadata owned by any rank other than this one.
    pub fn clear_remote_boxes(&mut self) {
        let rank = self.rank;
        for level in &mut self.levels {
            level.boxes.retain(|k, _| k.rank == rank);
        }
    }

    /// Moves local grids (and their boxes) under `rank`.
    pub(crate) fn set_rank(&mut self, rank: usize) {
        let old = self.rank;
        if old == rank {
            return;
        }
        for level in &mut self.levels {
            let (mine, rest): (BTreeMap<_, _>, BTreeMap<_, _>) =
                std::mem::take(&mut level.grids)
                    .into_iter()
                    .partition(|(k, _)| k.rank == old);
            level.grids = rest;
            for (k, g) in mine {
                level.grids.insert(BlockKey::new(rank, k.index), g);
            }
            level.boxes.retain(|k, _| k.rank != old);
        }
        self.rank = rank;
    }

    pub(crate) fn insert_shared_grid(&mut self, level: usize, key: BlockKey, grid: Arc<G>) {
        self.ensure_levels(level + 1);
        self.levels[level].grids.insert(key, grid);
    }
}

impl<G: GridBlock> Hierarchy<G> {
    /// Locally owned grids of `level` with their keys.
    pub fn local_grids(&self, level: usize) -> impl Iterator<Item = (BlockKey, &Arc<G>)> {
        self.levels.get(level).into_iter().flat_map(|l| l.grids())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(level: usize, lo: i32, hi: i32, rank: usize) -> AmrBox {
        AmrBox::new(level, [lo; 3], [hi; 3], [1.0; 3], rank).unwrap()
    }

    #[test]
    fn add_grid_assigns_dense_local_indices() {
        let mut h: Hierarchy = Hierarchy::new(3);
        let g = UniformGrid::from_cells([0.0; 3], [1.0; 3], [2, 2, 2]).unwrap();
        let k0 = h.add_grid(1, g.clone());
        let k1 = h.add_grid(1, g.clone());
        let k2 = h.add_grid(0, g);
        assert_eq!(h.number_of_levels(), 2);
        assert_eq!(k0, BlockKey::new(3, 0));
        assert_eq!(k1, BlockKey::new(3, 1));
        assert_eq!(k2, BlockKey::new(3, 0));
    }

    #[test]
    fn duplicate_box_rejected() {
        let mut h: Hierarchy = Hierarchy::new(0);
        h.insert_box(BlockKey::new(1, 0), cube(0, 0, 3, 1)).unwrap();
        let err = h
            .insert_box(BlockKey::new(1, 0), cube(0, 4, 7, 1))
            .unwrap_err();
        assert_eq!(
            err,
            AmrError::DuplicateBox {
                level: 0,
                rank: 1,
                index: 0
            }
        );
    }

    #[test]
    fn clone_shares_grids() {
        let mut h: Hierarchy = Hierarchy::new(0);
        let key = h.add_grid(0, UniformGrid::from_cells([0.0; 3], [1.0; 3], [1, 1, 1]).unwrap());
        let copy = h.clone();
        assert!(Arc::ptr_eq(
            h.grid(0, key).unwrap(),
            copy.grid(0, key).unwrap()
        ));
    }

    #[test]
    fn clear_remote_keeps_local() {
        let mut h: Hierarchy = Hierarchy::new(0);
        h.insert_box(BlockKey::new(0, 0), cube(0, 0, 3, 0)).unwrap();
        h.insert_box(BlockKey::new(1, 0), cube(0, 4, 7, 1)).unwrap();
        h.clear_remote_boxes();
        assert_eq!(h.number_of_boxes(), 1);
        assert!(h.amr_box(0, BlockKey::new(0, 0)).is_some());
    }
}
