//! Refinement ratios between consecutive levels.
//!
//! For level `l` with spacing `D_l` and successor spacing `D_{l+1}`,
//! `r_l = round(D_l / D_{l+1})`. The ratio must be the same along every
//! axis and, with [`RefinementOptions::check_all_blocks`], every block of a
//! level must share the level's spacing. Distributed hierarchies need their
//! metadata collected first.

use crate::amr_error::AmrError;
use crate::topology::amr_box::AmrBox;
use crate::topology::hierarchy::Hierarchy;

/// Tolerances for ratio detection.
#[derive(Debug, Clone, Copy)]
pub struct RefinementOptions {
    /// Allowed relative deviation from an integral ratio, and between block
    /// spacings of one level.
    pub tolerance: f64,
    /// Compare every block's spacing with the level's first block.
    pub check_all_blocks: bool,
}

impl Default for RefinementOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            check_all_blocks: true,
        }
    }
}

/// [`compute_level_refinement_ratio_with`] using default options.
pub fn compute_level_refinement_ratio<G>(hierarchy: &mut Hierarchy<G>) -> Result<(), AmrError> {
    compute_level_refinement_ratio_with(hierarchy, &RefinementOptions::default())
}

/// Stores the ratio of every level to its successor; the finest level gets
/// `None`.
///
/// Ratios from an earlier call are cleared first. On failure
/// [`AmrError::RefinementRatioMismatch`] is returned; levels before the
/// offending one keep their computed ratios, the rest stay unset.
pub fn compute_level_refinement_ratio_with<G>(
    hierarchy: &mut Hierarchy<G>,
    options: &RefinementOptions,
) -> Result<(), AmrError> {
    let levels = hierarchy.number_of_levels();
    for level in 0..levels {
        hierarchy.set_refinement_ratio(level, None);
    }
    for level in 0..levels.saturating_sub(1) {
        let r = level_ratio(hierarchy, level, options)?;
        hierarchy.set_refinement_ratio(level, Some(r));
    }
    Ok(())
}

fn level_ratio<G>(
    hierarchy: &Hierarchy<G>,
    level: usize,
    options: &RefinementOptions,
) -> Result<u32, AmrError> {
    let coarse = level_spacing(hierarchy, level, options)?;
    let fine = level_spacing(hierarchy, level + 1, options)?;
    let ratios: [f64; 3] = std::array::from_fn(|a| coarse[a] / fine[a]);
    let r = ratios[0].round();
    if r < 1.0 || r > f64::from(u32::MAX) {
        return Err(AmrError::RefinementRatioMismatch {
            level,
            reason: format!("ratio {} is not a positive integer", ratios[0]),
        });
    }
    for (axis, ratio) in ratios.iter().enumerate() {
        if (ratio - r).abs() > options.tolerance * r {
            return Err(AmrError::RefinementRatioMismatch {
                level,
                reason: format!("axis ratios {ratios:?} do not agree on integer {r} (axis {axis})"),
            });
        }
    }
    Ok(r as u32)
}

fn level_spacing<G>(
    hierarchy: &Hierarchy<G>,
    level: usize,
    options: &RefinementOptions,
) -> Result<[f64; 3], AmrError> {
    let mut boxes = hierarchy.level(level)?.boxes().map(|(_, b)| b);
    let first: &AmrBox = boxes.next().ok_or_else(|| AmrError::RefinementRatioMismatch {
        level,
        reason: format!("level {level} has no boxes"),
    })?;
    let spacing = first.spacing();
    if options.check_all_blocks {
        for b in boxes {
            let other = b.spacing();
            if (0..3).any(|a| (other[a] - spacing[a]).abs() > options.tolerance * spacing[a]) {
                return Err(AmrError::RefinementRatioMismatch {
                    level,
                    reason: format!(
                        "block spacing {other:?} differs from level spacing {spacing:?} on level {level}"
                    ),
                });
            }
        }
    }
    Ok(spacing)
}
