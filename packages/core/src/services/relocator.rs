//! Relocator - Subtree Relocation Service
//!
//! Moves an existing node, together with its whole subtree, to a new
//! position expressed relative to an anchor node.
//!
//! # Algorithm
//!
//! Every step runs inside one store transaction:
//!
//! 1. Load target and anchor, reject cycles and missing nodes
//! 2. Resolve the placement into an insertion boundary and depth delta
//! 3. Snapshot the subtree member ids (`right` within the target interval),
//!    against pre-move boundaries
//! 4. Gap shift: one conditional range update over the nodes between the
//!    old and new location
//! 5. Subtree translation: one additive update over the snapshotted ids,
//!    then reparent the subtree root
//!
//! The order of 3, 4 and 5 is load-bearing: membership computed after the
//! gap shift would pick up shifted neighbours.
//!
//! # Atomicity
//!
//! Any failure rolls the transaction back before the error is returned, so
//! readers see either the tree before the move or the tree after it.
//!
//! # Examples
//!
//! ```rust,no_run
//! use nestedset_core::db::MemoryTreeStore;
//! use nestedset_core::models::{Placement, TreeNode};
//! use nestedset_core::services::Relocator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryTreeStore::with_nodes(vec![
//!         TreeNode::new(1, None, 1, 6, 0),
//!         TreeNode::new(2, Some(1), 2, 3, 1),
//!         TreeNode::new(3, Some(1), 4, 5, 1),
//!     ]));
//!
//!     let relocator = Relocator::new(store);
//!     relocator.relocate(2, 3, Placement::FollowingSibling).await?;
//!     Ok(())
//! }
//! ```

use crate::config::RelocatorConfig;
use crate::db::{TreeStore, TreeTransaction};
use crate::models::{NodeId, Placement, TreeNode};
use crate::services::error::RelocationError;
use crate::services::position_resolver;
use crate::services::relocation_plan::RelocationPlan;
use crate::services::tree_validator::TreeValidator;
use std::sync::Arc;

/// Result of a successful relocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelocationOutcome {
    /// The subtree was moved
    Moved(RelocationSummary),

    /// The requested position is the current position; nothing was written
    Unchanged,
}

impl RelocationOutcome {
    /// True when the node was already at the requested position
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }
}

/// What a relocation changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationSummary {
    pub target_id: NodeId,
    pub new_parent: Option<NodeId>,
    pub plan: RelocationPlan,

    /// Nodes moved with the target (including the target)
    pub members_moved: usize,

    /// Nodes outside the subtree whose boundaries shifted
    pub neighbours_shifted: u64,
}

/// Subtree relocation service
///
/// Holds the store handle explicitly; no global state.
pub struct Relocator<S: TreeStore + ?Sized> {
    store: Arc<S>,
    config: RelocatorConfig,
}

impl<S: TreeStore + ?Sized> Relocator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, RelocatorConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: RelocatorConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Move `target_id` and its subtree to `placement` relative to `anchor_id`
    ///
    /// # Returns
    ///
    /// - `Ok(RelocationOutcome::Moved(_))` after the transaction committed
    /// - `Ok(RelocationOutcome::Unchanged)` when the node is already there
    ///
    /// # Errors
    ///
    /// - `InvalidPlacement` - missing node, or anchor inside the moved subtree
    /// - `IntegrityViolation` - stored boundaries contradict tree validity
    /// - `StorageWriteFailed` - any storage step failed
    ///
    /// The tree is unmodified whenever an error is returned.
    pub async fn relocate(
        &self,
        target_id: NodeId,
        anchor_id: NodeId,
        placement: Placement,
    ) -> Result<RelocationOutcome, RelocationError> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| RelocationError::storage("begin transaction", e))?;

        let result = self
            .relocate_in(tx.as_mut(), target_id, anchor_id, placement)
            .await;

        match result {
            Ok(outcome) => {
                tx.commit()
                    .await
                    .map_err(|e| RelocationError::storage("commit transaction", e))?;

                if let RelocationOutcome::Moved(summary) = &outcome {
                    tracing::info!(
                        "Relocated node {} ({} members) {} node {}",
                        summary.target_id,
                        summary.members_moved,
                        placement,
                        anchor_id
                    );
                }
                Ok(outcome)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(
                        "Failed to roll back relocation of node {}: {}",
                        target_id,
                        rollback_err
                    );
                }
                tracing::warn!("Relocation of node {} aborted: {}", target_id, err);
                Err(err)
            }
        }
    }

    async fn relocate_in(
        &self,
        tx: &mut dyn TreeTransaction,
        target_id: NodeId,
        anchor_id: NodeId,
        placement: Placement,
    ) -> Result<RelocationOutcome, RelocationError> {
        let target = tx
            .get_node(target_id)
            .await
            .map_err(|e| RelocationError::storage("load target", e))?
            .ok_or_else(|| RelocationError::node_not_found("target", target_id))?;

        let anchor = tx
            .get_node(anchor_id)
            .await
            .map_err(|e| RelocationError::storage("load anchor", e))?
            .ok_or_else(|| RelocationError::node_not_found("anchor", anchor_id))?;

        if target.contains_or_is(&anchor) {
            return Err(RelocationError::anchor_inside_target(target_id, anchor_id));
        }

        let position = position_resolver::resolve(&target, &anchor, placement);
        let plan = RelocationPlan::compute(&target, &position)?;

        tracing::debug!(
            "Relocation plan for node {}: {:?} (placement {} of {})",
            target_id,
            plan,
            placement,
            anchor_id
        );

        if plan.is_identity(&target) {
            tracing::debug!("Node {} already at requested position", target_id);
            return Ok(RelocationOutcome::Unchanged);
        }

        let members = snapshot_members(tx, &target).await?;
        let neighbours_shifted = shift_gap(tx, &plan).await?;
        translate_subtree(tx, &target, &members, &plan).await?;

        if self.config.verify_after_relocate {
            verify_tree(tx).await?;
        }

        Ok(RelocationOutcome::Moved(RelocationSummary {
            target_id,
            new_parent: plan.new_parent,
            plan,
            members_moved: members.len(),
            neighbours_shifted,
        }))
    }
}

/// Ids of every node in `target`'s subtree, taken before any boundary moves
async fn snapshot_members(
    tx: &mut dyn TreeTransaction,
    target: &TreeNode,
) -> Result<Vec<NodeId>, RelocationError> {
    let members = tx
        .find_by_interval_right(target.left, target.right)
        .await
        .map_err(|e| RelocationError::storage("snapshot subtree members", e))?;

    if !members.iter().any(|m| m.id == target.id) {
        return Err(RelocationError::integrity(format!(
            "node {} missing from its own subtree snapshot",
            target.id
        )));
    }

    if let Some(stray) = members.iter().find(|m| m.left < target.left) {
        return Err(RelocationError::integrity(format!(
            "node {} [{}, {}] partially overlaps node {} [{}, {}]",
            stray.id, stray.left, stray.right, target.id, target.left, target.right
        )));
    }

    let expected = target.width() / 2;
    if members.len() as i64 != expected || target.width() % 2 != 0 {
        return Err(RelocationError::integrity(format!(
            "node {} has width {} but {} subtree members",
            target.id,
            target.width(),
            members.len()
        )));
    }

    Ok(members.into_iter().map(|m| m.id).collect())
}

/// Shift every boundary between the old and new location
async fn shift_gap(
    tx: &mut dyn TreeTransaction,
    plan: &RelocationPlan,
) -> Result<u64, RelocationError> {
    if !plan.has_gap() {
        return Ok(0);
    }

    tx.conditional_shift_range(plan.affected_low, plan.affected_high, plan.shift_step)
        .await
        .map_err(|e| RelocationError::storage("shift affected range", e))
}

/// Move the snapshotted members and reparent the subtree root
async fn translate_subtree(
    tx: &mut dyn TreeTransaction,
    target: &TreeNode,
    members: &[NodeId],
    plan: &RelocationPlan,
) -> Result<(), RelocationError> {
    let updated = tx
        .bulk_shift_members(members, plan.move_step, plan.move_step, plan.depth_delta)
        .await
        .map_err(|e| RelocationError::storage("shift subtree members", e))?;

    if updated != members.len() as u64 {
        return Err(RelocationError::integrity(format!(
            "shifted {} of {} subtree members of node {}",
            updated,
            members.len(),
            target.id
        )));
    }

    tx.set_parent(target.id, plan.new_parent)
        .await
        .map_err(|e| RelocationError::storage("reparent subtree root", e))
}

async fn verify_tree(tx: &mut dyn TreeTransaction) -> Result<(), RelocationError> {
    let nodes = tx
        .load_all()
        .await
        .map_err(|e| RelocationError::storage("load tree for verification", e))?;

    TreeValidator::check(&nodes).map_err(|violations| {
        let reasons: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
        RelocationError::integrity(reasons.join("; "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseError, MemoryTreeStore};
    use async_trait::async_trait;

    /// root [1,10]; A [2,5] > A1 [3,4]; B [6,9] > B1 [7,8]
    fn sample_tree() -> Vec<TreeNode> {
        vec![
            TreeNode::new(1, None, 1, 10, 0),
            TreeNode::new(2, Some(1), 2, 5, 1),
            TreeNode::new(3, Some(2), 3, 4, 2),
            TreeNode::new(4, Some(1), 6, 9, 1),
            TreeNode::new(5, Some(4), 7, 8, 2),
        ]
    }

    fn relocator(nodes: Vec<TreeNode>) -> Relocator<MemoryTreeStore> {
        Relocator::new(Arc::new(MemoryTreeStore::with_nodes(nodes)))
    }

    async fn node(relocator: &Relocator<MemoryTreeStore>, id: NodeId) -> TreeNode {
        relocator.store().get_node(id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_swap_siblings() {
        let relocator = relocator(sample_tree());

        let outcome = relocator
            .relocate(2, 4, Placement::FollowingSibling)
            .await
            .unwrap();

        let RelocationOutcome::Moved(summary) = outcome else {
            panic!("expected a move");
        };
        assert_eq!(summary.members_moved, 2);
        assert_eq!(summary.neighbours_shifted, 2);

        let b = node(&relocator, 4).await;
        assert_eq!((b.left, b.right, b.depth), (2, 5, 1));
        let a = node(&relocator, 2).await;
        assert_eq!((a.left, a.right, a.depth, a.parent_id), (6, 9, 1, Some(1)));
        let a1 = node(&relocator, 3).await;
        assert_eq!((a1.left, a1.right, a1.depth), (7, 8, 2));

        let nodes = relocator.store().load_all().await.unwrap();
        assert_eq!(TreeValidator::check(&nodes), Ok(()));
    }

    #[tokio::test]
    async fn test_demote_to_first_child() {
        let relocator = relocator(sample_tree());

        relocator
            .relocate(4, 2, Placement::FirstChild)
            .await
            .unwrap();

        let b = node(&relocator, 4).await;
        assert_eq!(b.parent_id, Some(2));
        assert_eq!((b.left, b.right, b.depth), (3, 6, 2));
        let b1 = node(&relocator, 5).await;
        assert_eq!((b1.left, b1.right, b1.depth), (4, 5, 3));
        let a = node(&relocator, 2).await;
        assert_eq!((a.left, a.right), (2, 9));
        let root = node(&relocator, 1).await;
        assert_eq!((root.left, root.right), (1, 10));

        let nodes = relocator.store().load_all().await.unwrap();
        assert_eq!(TreeValidator::check(&nodes), Ok(()));
    }

    #[tokio::test]
    async fn test_cycle_rejected_without_writes() {
        let relocator = relocator(sample_tree());

        let err = relocator
            .relocate(2, 3, Placement::FirstChild)
            .await
            .unwrap_err();
        assert!(matches!(err, RelocationError::InvalidPlacement { .. }));

        let err = relocator
            .relocate(2, 2, Placement::FollowingSibling)
            .await
            .unwrap_err();
        assert!(err.is_rejection());

        assert_eq!(relocator.store().load_all().await.unwrap(), sample_tree());
    }

    #[tokio::test]
    async fn test_missing_nodes_rejected() {
        let relocator = relocator(sample_tree());

        let err = relocator
            .relocate(99, 2, Placement::FirstChild)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid placement: target node 99 does not exist"
        );

        let err = relocator
            .relocate(2, 99, Placement::FirstChild)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid placement: anchor node 99 does not exist"
        );
    }

    #[tokio::test]
    async fn test_move_to_current_position_is_unchanged() {
        let relocator = relocator(sample_tree());

        for (target, anchor, placement) in [
            (4, 2, Placement::FollowingSibling),
            (2, 4, Placement::PrecedingSibling),
            (2, 1, Placement::FirstChild),
            (3, 2, Placement::FirstChild),
        ] {
            let outcome = relocator.relocate(target, anchor, placement).await.unwrap();
            assert!(
                outcome.is_unchanged(),
                "{} {} {} should be a no-op",
                target,
                placement,
                anchor
            );
        }

        assert_eq!(relocator.store().load_all().await.unwrap(), sample_tree());
    }

    #[tokio::test]
    async fn test_promote_to_sibling_of_root_creates_forest() {
        let relocator = relocator(sample_tree());

        relocator
            .relocate(4, 1, Placement::FollowingSibling)
            .await
            .unwrap();

        let root = node(&relocator, 1).await;
        assert_eq!((root.left, root.right), (1, 6));
        let b = node(&relocator, 4).await;
        assert_eq!((b.left, b.right, b.depth, b.parent_id), (7, 10, 0, None));
        assert!(b.is_root());
        let b1 = node(&relocator, 5).await;
        assert_eq!((b1.left, b1.right, b1.depth), (8, 9, 1));

        let nodes = relocator.store().load_all().await.unwrap();
        assert_eq!(TreeValidator::check(&nodes), Ok(()));
    }

    #[tokio::test]
    async fn test_verify_after_relocate_rejects_corrupt_tree() {
        let mut corrupt = sample_tree();
        // B1 claims the root as parent; boundaries are fine
        corrupt[4].parent_id = Some(1);

        let store = Arc::new(MemoryTreeStore::with_nodes(corrupt.clone()));
        let relocator = Relocator::with_config(
            store,
            RelocatorConfig {
                verify_after_relocate: true,
            },
        );

        let err = relocator
            .relocate(2, 4, Placement::FollowingSibling)
            .await
            .unwrap_err();
        assert!(matches!(err, RelocationError::IntegrityViolation { .. }));
        assert_eq!(relocator.store().load_all().await.unwrap(), corrupt);
    }

    #[tokio::test]
    async fn test_member_count_mismatch_is_integrity_violation() {
        // Root claims width 10 but holds only one child
        let corrupt = vec![
            TreeNode::new(1, None, 1, 10, 0),
            TreeNode::new(2, Some(1), 2, 3, 1),
            TreeNode::new(3, None, 11, 12, 0),
        ];
        let relocator = relocator(corrupt.clone());

        let err = relocator
            .relocate(1, 3, Placement::FollowingSibling)
            .await
            .unwrap_err();
        assert!(matches!(err, RelocationError::IntegrityViolation { .. }));
        assert_eq!(relocator.store().load_all().await.unwrap(), corrupt);
    }

    #[tokio::test]
    async fn test_partial_overlap_in_snapshot_is_integrity_violation() {
        // Node 3 [2,4] straddles the left boundary of node 2 [3,6]
        let corrupt = vec![
            TreeNode::new(1, None, 1, 10, 0),
            TreeNode::new(3, Some(1), 2, 4, 1),
            TreeNode::new(2, Some(1), 3, 6, 1),
            TreeNode::new(4, Some(1), 7, 8, 1),
        ];
        let relocator = relocator(corrupt.clone());

        let err = relocator
            .relocate(2, 4, Placement::FollowingSibling)
            .await
            .unwrap_err();
        match &err {
            RelocationError::IntegrityViolation { reason } => {
                assert!(reason.contains("partially overlaps"), "{}", reason);
            }
            other => panic!("unexpected error: {}", other),
        }

        let mut expected = corrupt;
        expected.sort_by_key(|n| n.left);
        assert_eq!(relocator.store().load_all().await.unwrap(), expected);
    }

    /// Which step a `FaultyStore` transaction sabotages
    #[derive(Clone, Copy)]
    enum Fault {
        /// `set_parent` fails
        Reparent,
        /// `bulk_shift_members` reports one row fewer than it updated
        ShortMemberShift,
    }

    /// Memory store whose transactions misbehave on one step
    struct FaultyStore {
        inner: MemoryTreeStore,
        fault: Fault,
    }

    impl FaultyStore {
        fn new(nodes: Vec<TreeNode>, fault: Fault) -> Self {
            Self {
                inner: MemoryTreeStore::with_nodes(nodes),
                fault,
            }
        }
    }

    struct FaultyTransaction {
        inner: Box<dyn TreeTransaction>,
        fault: Fault,
    }

    #[async_trait]
    impl TreeStore for FaultyStore {
        async fn begin(&self) -> Result<Box<dyn TreeTransaction>, DatabaseError> {
            Ok(Box::new(FaultyTransaction {
                inner: self.inner.begin().await?,
                fault: self.fault,
            }))
        }

        async fn get_node(&self, id: NodeId) -> Result<Option<TreeNode>, DatabaseError> {
            self.inner.get_node(id).await
        }

        async fn load_all(&self) -> Result<Vec<TreeNode>, DatabaseError> {
            self.inner.load_all().await
        }

        async fn seed(&self, nodes: Vec<TreeNode>) -> Result<(), DatabaseError> {
            self.inner.seed(nodes).await
        }
    }

    #[async_trait]
    impl TreeTransaction for FaultyTransaction {
        async fn get_node(&mut self, id: NodeId) -> Result<Option<TreeNode>, DatabaseError> {
            self.inner.get_node(id).await
        }

        async fn load_all(&mut self) -> Result<Vec<TreeNode>, DatabaseError> {
            self.inner.load_all().await
        }

        async fn find_by_interval_right(
            &mut self,
            low: i64,
            high: i64,
        ) -> Result<Vec<TreeNode>, DatabaseError> {
            self.inner.find_by_interval_right(low, high).await
        }

        async fn bulk_shift_members(
            &mut self,
            ids: &[NodeId],
            left_delta: i64,
            right_delta: i64,
            depth_delta: i64,
        ) -> Result<u64, DatabaseError> {
            let updated = self
                .inner
                .bulk_shift_members(ids, left_delta, right_delta, depth_delta)
                .await?;
            match self.fault {
                Fault::ShortMemberShift => Ok(updated.saturating_sub(1)),
                Fault::Reparent => Ok(updated),
            }
        }

        async fn conditional_shift_range(
            &mut self,
            low: i64,
            high: i64,
            step: i64,
        ) -> Result<u64, DatabaseError> {
            self.inner.conditional_shift_range(low, high, step).await
        }

        async fn set_parent(
            &mut self,
            id: NodeId,
            parent_id: Option<NodeId>,
        ) -> Result<(), DatabaseError> {
            match self.fault {
                Fault::Reparent => Err(DatabaseError::sql_execution("simulated write failure")),
                Fault::ShortMemberShift => self.inner.set_parent(id, parent_id).await,
            }
        }

        async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
            self.inner.commit().await
        }

        async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
            self.inner.rollback().await
        }
    }

    #[tokio::test]
    async fn test_storage_failure_rolls_back_earlier_writes() {
        let store = Arc::new(FaultyStore::new(sample_tree(), Fault::Reparent));
        let relocator = Relocator::new(store);

        let err = relocator
            .relocate(4, 2, Placement::FirstChild)
            .await
            .unwrap_err();

        match err {
            RelocationError::StorageWriteFailed { operation, .. } => {
                assert_eq!(operation, "reparent subtree root");
            }
            other => panic!("unexpected error: {}", other),
        }

        // Gap shift and member shift both ran before the failure
        assert_eq!(relocator.store().load_all().await.unwrap(), sample_tree());
    }

    #[tokio::test]
    async fn test_short_member_shift_is_integrity_violation() {
        let store = Arc::new(FaultyStore::new(sample_tree(), Fault::ShortMemberShift));
        let relocator = Relocator::new(store);

        let err = relocator
            .relocate(4, 2, Placement::FirstChild)
            .await
            .unwrap_err();

        match &err {
            RelocationError::IntegrityViolation { reason } => {
                assert_eq!(reason, "shifted 1 of 2 subtree members of node 4");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(relocator.store().load_all().await.unwrap(), sample_tree());
    }
}
