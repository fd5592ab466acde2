//! Service Layer Error Types
//!
//! This module defines error types for relocation, providing detailed
//! error handling for rejected requests and storage failures.

use crate::db::DatabaseError;
use crate::models::NodeId;
use thiserror::Error;

/// Relocation errors
///
/// Every variant is returned only after the relocation's transaction has
/// been rolled back (or before it was opened), so the tree is never left
/// partially shifted.
///
/// # Examples
///
/// ```rust
/// use nestedset_core::services::RelocationError;
///
/// let err = RelocationError::anchor_inside_target(2, 3);
/// assert_eq!(
///     format!("{}", err),
///     "Invalid placement: anchor 3 lies inside the subtree of node 2"
/// );
/// ```
#[derive(Error, Debug)]
pub enum RelocationError {
    /// A storage primitive failed
    ///
    /// `operation` names the step that failed (e.g. "shift affected range").
    #[error("Storage write failed during {operation}: {source}")]
    StorageWriteFailed {
        operation: &'static str,
        #[source]
        source: DatabaseError,
    },

    /// The request cannot be satisfied without corrupting the tree
    ///
    /// Covers anchors inside the moved subtree (cycles) and references to
    /// nodes that do not exist.
    #[error("Invalid placement: {reason}")]
    InvalidPlacement { reason: String },

    /// Stored boundaries contradict nested set validity
    #[error("Tree integrity violation: {reason}")]
    IntegrityViolation { reason: String },
}

impl RelocationError {
    /// Create a storage failure error for the named step
    pub fn storage(operation: &'static str, source: DatabaseError) -> Self {
        Self::StorageWriteFailed { operation, source }
    }

    /// Create an invalid placement error
    pub fn invalid_placement(reason: impl Into<String>) -> Self {
        Self::InvalidPlacement {
            reason: reason.into(),
        }
    }

    /// Invalid placement for a target or anchor that does not exist
    pub fn node_not_found(role: &str, id: NodeId) -> Self {
        Self::invalid_placement(format!("{} node {} does not exist", role, id))
    }

    /// Invalid placement for an anchor inside (or equal to) the moved subtree
    pub fn anchor_inside_target(target_id: NodeId, anchor_id: NodeId) -> Self {
        Self::invalid_placement(format!(
            "anchor {} lies inside the subtree of node {}",
            anchor_id, target_id
        ))
    }

    /// Create an integrity violation error
    pub fn integrity(reason: impl Into<String>) -> Self {
        Self::IntegrityViolation {
            reason: reason.into(),
        }
    }

    /// True if the request was rejected before any write was issued
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::InvalidPlacement { .. })
    }
}
