//! Boundary arithmetic for moving one subtree
//!
//! A `RelocationPlan` is everything the two bulk updates need, computed
//! from the target's pre-move coordinates:
//!
//! - the affected range and the step applied to it (gap shift)
//! - the step applied to the subtree's own members (subtree translation)
//!
//! Moving backwards, the nodes in `[boundary + 1, target.left - 1]` slide
//! forward by the subtree width to open room at the destination. Moving
//! forwards, the nodes in `[target.right + 1, boundary]` slide back by the
//! width to close the hole, and the subtree's own step shrinks by the width
//! because its old slot has been given away.

use crate::models::{NodeId, TreeNode};
use crate::services::error::RelocationError;
use crate::services::position_resolver::ResolvedPosition;

/// Precomputed updates for one relocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationPlan {
    /// Lowest boundary shifted by the gap update
    pub affected_low: i64,

    /// Highest boundary shifted by the gap update (below `affected_low` when empty)
    pub affected_high: i64,

    /// Added to every boundary inside the affected range
    pub shift_step: i64,

    /// Added to both boundaries of every subtree member
    pub move_step: i64,

    /// Added to the depth of every subtree member
    pub depth_delta: i64,

    /// Parent of the subtree root after the move
    pub new_parent: Option<NodeId>,
}

impl RelocationPlan {
    /// Compute the plan for moving `target` to `position`
    ///
    /// # Errors
    ///
    /// `IntegrityViolation` if the target interval is inverted or the
    /// insertion boundary falls inside the target's own interval (only
    /// possible when the anchor was inside the subtree).
    pub fn compute(target: &TreeNode, position: &ResolvedPosition) -> Result<Self, RelocationError> {
        if target.left >= target.right {
            return Err(RelocationError::integrity(format!(
                "node {} has left {} >= right {}",
                target.id, target.left, target.right
            )));
        }

        let boundary = position.insertion_boundary;
        if boundary >= target.left && boundary < target.right {
            return Err(RelocationError::integrity(format!(
                "insertion boundary {} falls inside node {} [{}, {}]",
                boundary, target.id, target.left, target.right
            )));
        }

        let width = target.width();
        let raw_step = boundary - target.left + 1;

        // A zero step means "insert right before the current slot" and must take
        // the backward branch; the forward branch would subtract the width.
        let (affected_low, affected_high, shift_step, move_step) = if raw_step <= 0 {
            (boundary + 1, target.left - 1, width, raw_step)
        } else {
            (target.right + 1, boundary, -width, raw_step - width)
        };

        Ok(Self {
            affected_low,
            affected_high,
            shift_step,
            move_step,
            depth_delta: position.depth_delta,
            new_parent: position.new_parent,
        })
    }

    /// True when there are boundaries to shift between old and new location
    pub fn has_gap(&self) -> bool {
        self.affected_low <= self.affected_high
    }

    /// True when applying the plan would change nothing
    pub fn is_identity(&self, target: &TreeNode) -> bool {
        self.move_step == 0 && self.depth_delta == 0 && self.new_parent == target.parent_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(boundary: i64, depth_delta: i64, parent: Option<NodeId>) -> ResolvedPosition {
        ResolvedPosition {
            insertion_boundary: boundary,
            depth_delta,
            new_parent: parent,
        }
    }

    #[test]
    fn test_forward_move_closes_hole() {
        // A [2,5] after B [6,9]
        let a = TreeNode::new(2, Some(1), 2, 5, 1);
        let plan = RelocationPlan::compute(&a, &position(9, 0, Some(1))).unwrap();

        assert_eq!((plan.affected_low, plan.affected_high), (6, 9));
        assert_eq!(plan.shift_step, -4);
        assert_eq!(plan.move_step, 4);
        assert!(plan.has_gap());
    }

    #[test]
    fn test_backward_move_opens_room() {
        // B [6,9] as first child of A [2,5]
        let b = TreeNode::new(4, Some(1), 6, 9, 1);
        let plan = RelocationPlan::compute(&b, &position(2, 1, Some(2))).unwrap();

        assert_eq!((plan.affected_low, plan.affected_high), (3, 5));
        assert_eq!(plan.shift_step, 4);
        assert_eq!(plan.move_step, -3);
        assert_eq!(plan.depth_delta, 1);
    }

    #[test]
    fn test_zero_step_is_identity() {
        // B [6,9] after A [2,5]: already there
        let b = TreeNode::new(4, Some(1), 6, 9, 1);
        let plan = RelocationPlan::compute(&b, &position(5, 0, Some(1))).unwrap();

        assert!(!plan.has_gap());
        assert_eq!(plan.move_step, 0);
        assert!(plan.is_identity(&b));
    }

    #[test]
    fn test_boundary_at_own_right_is_identity() {
        // A [2,5] before B [6,9]: already there
        let a = TreeNode::new(2, Some(1), 2, 5, 1);
        let plan = RelocationPlan::compute(&a, &position(5, 0, Some(1))).unwrap();

        assert!(!plan.has_gap());
        assert_eq!(plan.move_step, 0);
        assert!(plan.is_identity(&a));
    }

    #[test]
    fn test_boundary_inside_target_rejected() {
        let a = TreeNode::new(2, Some(1), 2, 5, 1);
        let result = RelocationPlan::compute(&a, &position(3, 2, Some(3)));
        assert!(matches!(
            result,
            Err(RelocationError::IntegrityViolation { .. })
        ));
    }

    #[test]
    fn test_inverted_target_rejected() {
        let broken = TreeNode::new(9, None, 5, 5, 0);
        let result = RelocationPlan::compute(&broken, &position(10, 0, None));
        assert!(matches!(
            result,
            Err(RelocationError::IntegrityViolation { .. })
        ));
    }
}
