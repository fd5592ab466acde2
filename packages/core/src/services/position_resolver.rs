//! Translates a placement request into nested set coordinates

use crate::models::{NodeId, Placement, TreeNode};

/// Concrete destination of a relocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPosition {
    /// Boundary the subtree is inserted to the right of
    pub insertion_boundary: i64,

    /// Added to the depth of every moved node
    pub depth_delta: i64,

    /// Parent of the subtree root after the move
    pub new_parent: Option<NodeId>,
}

/// Resolve where `target` lands when placed relative to `anchor`
///
/// Pure arithmetic. The caller must already have rejected anchors inside
/// `target`'s own subtree.
pub fn resolve(target: &TreeNode, anchor: &TreeNode, placement: Placement) -> ResolvedPosition {
    let insertion_boundary = match placement {
        Placement::PrecedingSibling => anchor.left - 1,
        Placement::FollowingSibling => anchor.right,
        Placement::FirstChild => anchor.left,
    };

    let (new_parent, new_depth) = if placement.is_sibling() {
        (anchor.parent_id, anchor.depth)
    } else {
        (Some(anchor.id), anchor.depth + 1)
    };

    ResolvedPosition {
        insertion_boundary,
        depth_delta: new_depth - target.depth,
        new_parent,
    }
}
