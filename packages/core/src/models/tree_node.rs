//! Tree Node Model
//!
//! A `TreeNode` is one row of a nested set tree. Its subtree is every node
//! whose boundaries fall inside its own `[left, right]` interval.
//!
//! # Structural Fields
//!
//! - `left`/`right`: interval boundaries, `left < right`
//! - `depth`: number of ancestors (root has depth 0)
//! - `parent_id`: denormalized nearest enclosing node, `None` for the root
//!
//! Non-structural columns (e.g. `title`) are carried through untouched by
//! relocation.

use serde::{Deserialize, Serialize};

/// Stable identity of a node
pub type NodeId = i64;

/// One node of a nested set tree
///
/// # Examples
///
/// ```rust
/// # use nestedset_core::models::TreeNode;
/// let root = TreeNode::new(1, None, 1, 4, 0);
/// let leaf = TreeNode::new(2, Some(1), 2, 3, 1);
///
/// assert!(root.contains(&leaf));
/// assert!(leaf.is_leaf());
/// assert_eq!(root.width(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Unique node identifier
    pub id: NodeId,

    /// Enclosing node, `None` for the root
    pub parent_id: Option<NodeId>,

    /// Left boundary of the subtree interval
    pub left: i64,

    /// Right boundary of the subtree interval
    pub right: i64,

    /// Number of ancestors
    pub depth: i64,

    /// Display title, never touched by relocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl TreeNode {
    /// Create a node with structural fields only
    pub fn new(id: NodeId, parent_id: Option<NodeId>, left: i64, right: i64, depth: i64) -> Self {
        Self {
            id,
            parent_id,
            left,
            right,
            depth,
            title: None,
        }
    }

    /// Attach a display title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Size of the interval in boundary units (`right - left + 1`)
    ///
    /// A subtree of `n` nodes always has width `2n`.
    pub fn width(&self) -> i64 {
        self.right - self.left + 1
    }

    /// True when the node has no descendants
    pub fn is_leaf(&self) -> bool {
        self.right == self.left + 1
    }

    /// True when `other` lies strictly inside this node's interval
    pub fn contains(&self, other: &TreeNode) -> bool {
        self.left < other.left && other.right < self.right
    }

    /// True when `other` is this node or one of its descendants
    pub fn contains_or_is(&self, other: &TreeNode) -> bool {
        self.id == other.id || self.contains(other)
    }

    /// True when this node has no parent
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
