//! MemoryTreeStore - In-process TreeStore
//!
//! Keeps the whole tree in a `BTreeMap` behind a `tokio::sync::Mutex`. A
//! transaction holds the owned lock guard for its lifetime and writes to a
//! private working copy that replaces the shared map only on `commit`.
//! Readers going through `TreeStore::get_node`/`load_all` wait for the lock,
//! so they never observe a half-applied relocation.

use crate::db::tree_store::{TreeStore, TreeTransaction};
use crate::db::DatabaseError;
use crate::models::{NodeId, TreeNode};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type NodeMap = BTreeMap<NodeId, TreeNode>;

/// In-process nested set tree
#[derive(Debug, Clone, Default)]
pub struct MemoryTreeStore {
    nodes: Arc<Mutex<NodeMap>>,
}

impl MemoryTreeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store already holding `nodes`
    pub fn with_nodes(nodes: Vec<TreeNode>) -> Self {
        let map = nodes.into_iter().map(|n| (n.id, n)).collect();
        Self {
            nodes: Arc::new(Mutex::new(map)),
        }
    }
}

fn sorted_by_left<'a>(nodes: impl Iterator<Item = &'a TreeNode>) -> Vec<TreeNode> {
    let mut out: Vec<TreeNode> = nodes.cloned().collect();
    out.sort_by_key(|n| n.left);
    out
}

#[async_trait]
impl TreeStore for MemoryTreeStore {
    async fn begin(&self) -> Result<Box<dyn TreeTransaction>, DatabaseError> {
        let guard = self.nodes.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }

    async fn get_node(&self, id: NodeId) -> Result<Option<TreeNode>, DatabaseError> {
        Ok(self.nodes.lock().await.get(&id).cloned())
    }

    async fn load_all(&self) -> Result<Vec<TreeNode>, DatabaseError> {
        let nodes = self.nodes.lock().await;
        Ok(sorted_by_left(nodes.values()))
    }

    async fn seed(&self, nodes: Vec<TreeNode>) -> Result<(), DatabaseError> {
        let mut map = self.nodes.lock().await;
        for node in &nodes {
            if map.contains_key(&node.id) {
                return Err(DatabaseError::invalid_seed(format!(
                    "Node {} already exists",
                    node.id
                )));
            }
        }
        map.extend(nodes.into_iter().map(|n| (n.id, n)));
        Ok(())
    }
}

/// Transaction over a `MemoryTreeStore`
///
/// Dropping it without `commit` leaves the shared map untouched.
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<NodeMap>,
    working: NodeMap,
}

#[async_trait]
impl TreeTransaction for MemoryTransaction {
    async fn get_node(&mut self, id: NodeId) -> Result<Option<TreeNode>, DatabaseError> {
        Ok(self.working.get(&id).cloned())
    }

    async fn load_all(&mut self) -> Result<Vec<TreeNode>, DatabaseError> {
        Ok(sorted_by_left(self.working.values()))
    }

    async fn find_by_interval_right(
        &mut self,
        low: i64,
        high: i64,
    ) -> Result<Vec<TreeNode>, DatabaseError> {
        Ok(sorted_by_left(
            self.working
                .values()
                .filter(|n| (low..=high).contains(&n.right)),
        ))
    }

    async fn bulk_shift_members(
        &mut self,
        ids: &[NodeId],
        left_delta: i64,
        right_delta: i64,
        depth_delta: i64,
    ) -> Result<u64, DatabaseError> {
        let ids: HashSet<NodeId> = ids.iter().copied().collect();
        let mut updated = 0;
        for node in self.working.values_mut().filter(|n| ids.contains(&n.id)) {
            node.left += left_delta;
            node.right += right_delta;
            node.depth += depth_delta;
            updated += 1;
        }
        Ok(updated)
    }

    async fn conditional_shift_range(
        &mut self,
        low: i64,
        high: i64,
        step: i64,
    ) -> Result<u64, DatabaseError> {
        let range = low..=high;
        let mut updated = 0;
        for node in self.working.values_mut() {
            let left_in = range.contains(&node.left);
            let right_in = range.contains(&node.right);
            if !(left_in || right_in) {
                continue;
            }
            if left_in {
                node.left += step;
            }
            if right_in {
                node.right += step;
            }
            updated += 1;
        }
        Ok(updated)
    }

    async fn set_parent(
        &mut self,
        id: NodeId,
        parent_id: Option<NodeId>,
    ) -> Result<(), DatabaseError> {
        let node = self
            .working
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::sql_execution(format!("Node not found: {}", id)))?;
        node.parent_id = parent_id;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        Ok(())
    }
}
