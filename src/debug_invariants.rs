//! Structural invariant checks for hierarchies.

use crate::amr_error::AmrError;
use crate::topology::hierarchy::Hierarchy;
use itertools::Itertools;

/// Trait for validating data structure invariants.
pub trait DebugInvariants {
    /// Assert invariants in debug builds or when invariant checking is enabled.
    fn debug_assert_invariants(&self);
    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), AmrError>;
}

/// Helper macro to run a fallible check and panic on error when invariant
/// checking is enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}

impl<G> DebugInvariants for Hierarchy<G> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "hierarchy");
    }

    /// Checks that:
    /// - every box sits on the level that stores it and has the owner its key names,
    /// - no box of a level contains another box of the same level,
    /// - stored ratios are positive and the finest level carries none.
    fn validate_invariants(&self) -> Result<(), AmrError> {
        let levels = self.levels();
        for (l, level) in levels.iter().enumerate() {
            for (key, b) in level.boxes() {
                if b.level() != l {
                    return Err(AmrError::InvalidBox(format!(
                        "box {key:?} stored on level {l} declares level {}",
                        b.level()
                    )));
                }
                if b.rank() != key.rank {
                    return Err(AmrError::OwnershipMismatch {
                        sender: key.rank,
                        declared: b.rank(),
                    });
                }
            }
            let boxes: Vec<_> = level.boxes().collect();
            for ((ka, a), (kb, b)) in boxes.iter().copied().tuple_combinations() {
                if a.contains(b) || b.contains(a) {
                    return Err(AmrError::InvalidBox(format!(
                        "boxes {ka:?} and {kb:?} on level {l} fully overlap"
                    )));
                }
            }
            match level.refinement_ratio() {
                Some(0) => {
                    return Err(AmrError::RefinementRatioMismatch {
                        level: l,
                        reason: "stored ratio is zero".into(),
                    });
                }
                Some(_) if l + 1 == levels.len() => {
                    return Err(AmrError::RefinementRatioMismatch {
                        level: l,
                        reason: "finest level must not carry a ratio".into(),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::amr_box::AmrBox;
    use crate::topology::hierarchy::BlockKey;

    #[test]
    fn nested_same_level_boxes_flagged() {
        let mut h: Hierarchy = Hierarchy::new(0);
        let outer = AmrBox::new(0, [0; 3], [9; 3], [1.0; 3], 0).unwrap();
        let inner = AmrBox::new(0, [2; 3], [3; 3], [1.0; 3], 0).unwrap();
        h.insert_box(BlockKey::new(0, 0), outer).unwrap();
        assert!(h.validate_invariants().is_ok());
        h.insert_box(BlockKey::new(0, 1), inner).unwrap();
        assert!(matches!(
            h.validate_invariants(),
            Err(AmrError::InvalidBox(_))
        ));
    }

    #[test]
    fn key_owner_must_match_box_owner() {
        let mut h: Hierarchy = Hierarchy::new(0);
        let b = AmrBox::new(0, [0; 3], [1; 3], [1.0; 3], 2).unwrap();
        h.insert_box(BlockKey::new(1, 0), b).unwrap();
        assert_eq!(
            h.validate_invariants(),
            Err(AmrError::OwnershipMismatch {
                sender: 1,
                declared: 2
            })
        );
    }
}
