//! Whole-tree invariant checks
//!
//! Verifies a full snapshot against the nested set rules:
//!
//! - every interval has `left < right`
//! - boundaries are unique and form one contiguous run of integers
//! - any two intervals are disjoint or properly nested
//! - `parent_id` is the smallest enclosing interval
//! - `depth` equals the number of enclosing intervals
//!
//! Leaf width (`right = left + 1`) and descendant contiguity follow from the
//! contiguity and nesting checks and are not tested separately.
//!
//! The check is a single stack walk over the nodes sorted by left boundary,
//! so it stays linear (after sorting) for large trees. Multiple roots are
//! accepted.

use crate::models::{NodeId, TreeNode};
use std::collections::HashSet;
use thiserror::Error;

/// One broken invariant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("Node id {id} appears more than once")]
    DuplicateId { id: NodeId },

    #[error("Node {id} has left {left} >= right {right}")]
    InvertedInterval { id: NodeId, left: i64, right: i64 },

    #[error("Boundary {value} is used more than once")]
    ReusedBoundary { value: i64 },

    #[error("Boundary {value} is missing from the contiguous range")]
    MissingBoundary { value: i64 },

    #[error("Intervals of nodes {first} and {second} partially overlap")]
    PartialOverlap { first: NodeId, second: NodeId },

    #[error("Node {id} has parent {actual:?}, expected {expected:?}")]
    WrongParent {
        id: NodeId,
        expected: Option<NodeId>,
        actual: Option<NodeId>,
    },

    #[error("Node {id} has depth {actual}, expected {expected}")]
    WrongDepth {
        id: NodeId,
        expected: i64,
        actual: i64,
    },
}

/// Stateless invariant checker
pub struct TreeValidator;

impl TreeValidator {
    /// Check every invariant over a complete snapshot
    ///
    /// # Returns
    ///
    /// - `Ok(())` if the snapshot is a valid nested set forest
    /// - `Err(violations)` with every problem found, in discovery order
    pub fn check(nodes: &[TreeNode]) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();

        let mut seen = HashSet::with_capacity(nodes.len());
        for node in nodes {
            if !seen.insert(node.id) {
                violations.push(InvariantViolation::DuplicateId { id: node.id });
            }
            if node.left >= node.right {
                violations.push(InvariantViolation::InvertedInterval {
                    id: node.id,
                    left: node.left,
                    right: node.right,
                });
            }
        }

        Self::check_boundaries(nodes, &mut violations);

        // Nesting, parent and depth only make sense over sane intervals
        if violations.is_empty() {
            Self::check_nesting(nodes, &mut violations);
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    fn check_boundaries(nodes: &[TreeNode], violations: &mut Vec<InvariantViolation>) {
        let mut boundaries: Vec<i64> = nodes.iter().flat_map(|n| [n.left, n.right]).collect();
        boundaries.sort_unstable();

        let Some(&first) = boundaries.first() else {
            return;
        };

        let mut expected = first;
        for pair in boundaries.windows(2) {
            if pair[0] == pair[1] {
                violations.push(InvariantViolation::ReusedBoundary { value: pair[0] });
            }
        }
        boundaries.dedup();
        for value in boundaries {
            while expected < value {
                violations.push(InvariantViolation::MissingBoundary { value: expected });
                expected += 1;
            }
            expected = value + 1;
        }
    }

    fn check_nesting(nodes: &[TreeNode], violations: &mut Vec<InvariantViolation>) {
        let mut sorted: Vec<&TreeNode> = nodes.iter().collect();
        sorted.sort_by_key(|n| n.left);

        let mut ancestors: Vec<&TreeNode> = Vec::new();
        for node in sorted {
            while ancestors.last().is_some_and(|top| top.right < node.left) {
                ancestors.pop();
            }

            if let Some(top) = ancestors.last() {
                if node.right > top.right {
                    violations.push(InvariantViolation::PartialOverlap {
                        first: top.id,
                        second: node.id,
                    });
                    continue;
                }
            }

            let expected_parent = ancestors.last().map(|p| p.id);
            if node.parent_id != expected_parent {
                violations.push(InvariantViolation::WrongParent {
                    id: node.id,
                    expected: expected_parent,
                    actual: node.parent_id,
                });
            }

            let expected_depth = ancestors.len() as i64;
            if node.depth != expected_depth {
                violations.push(InvariantViolation::WrongDepth {
                    id: node.id,
                    expected: expected_depth,
                    actual: node.depth,
                });
            }

            ancestors.push(node);
        }
    }
}
