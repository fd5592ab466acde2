//! TreeStore Trait - Storage Abstraction Layer
//!
//! This module defines the traits the relocation service consumes. The
//! service never talks to a database directly: it opens a `TreeTransaction`
//! through `TreeStore::begin` and issues every read and write of one
//! relocation through that handle.
//!
//! # Architecture
//!
//! - **Abstraction Point**: Between `Relocator` (business logic) and storage
//! - **Multiple Backends**: libsql (`SqliteTreeStore`) and in-process
//!   (`MemoryTreeStore`)
//! - **Atomic Scope**: All writes of a transaction become visible together
//!   on `commit`, or not at all
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async so embedded and networked
//!    backends share one interface
//! 2. **Owned Handles**: `begin` returns a `'static` boxed transaction that
//!    owns its connection or lock guard
//! 3. **Explicit Finish**: Callers must `commit` or `rollback`. Dropping an
//!    unfinished transaction discards its writes
//!
//! # Examples
//!
//! ```rust,no_run
//! use nestedset_core::db::{MemoryTreeStore, TreeStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryTreeStore::new();
//!
//!     let mut tx = store.begin().await?;
//!     let members = tx.find_by_interval_right(2, 5).await?;
//!     tx.rollback().await?;
//!
//!     println!("{} members", members.len());
//!     Ok(())
//! }
//! ```

use crate::db::DatabaseError;
use crate::models::{NodeId, TreeNode};
use async_trait::async_trait;

/// Handle to a nested set tree in some storage backend
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so one store can be shared through
/// an `Arc` across tasks.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Open a write transaction
    ///
    /// The returned handle holds the backend's write lock for its whole
    /// lifetime, so two relocations against the same store never interleave.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::TransactionFailed` if the lock or connection
    /// cannot be acquired.
    async fn begin(&self) -> Result<Box<dyn TreeTransaction>, DatabaseError>;

    /// Get node by ID outside of any transaction
    ///
    /// - `Ok(Some(node))` if node exists
    /// - `Ok(None)` if node doesn't exist (not an error)
    async fn get_node(&self, id: NodeId) -> Result<Option<TreeNode>, DatabaseError>;

    /// Every node in the tree, ordered by left boundary
    async fn load_all(&self) -> Result<Vec<TreeNode>, DatabaseError>;

    /// Insert an already-valid tree
    ///
    /// Used for fixtures and imports. The nodes are written as given; callers
    /// are expected to pass a snapshot that satisfies the nested set
    /// invariants (see `TreeValidator`).
    async fn seed(&self, nodes: Vec<TreeNode>) -> Result<(), DatabaseError>;
}

/// One atomic unit of work against a `TreeStore`
///
/// Exposes the four storage primitives relocation is built from, plus the
/// reads needed to validate a request against the same snapshot the writes
/// will apply to.
#[async_trait]
pub trait TreeTransaction: Send {
    /// Get node by ID as seen by this transaction
    async fn get_node(&mut self, id: NodeId) -> Result<Option<TreeNode>, DatabaseError>;

    /// Every node as seen by this transaction, ordered by left boundary
    async fn load_all(&mut self) -> Result<Vec<TreeNode>, DatabaseError>;

    /// All nodes whose `right` boundary lies in `[low, high]`
    ///
    /// With `low`/`high` set to a node's own boundaries this returns exactly
    /// that node's subtree, ordered by left boundary.
    async fn find_by_interval_right(
        &mut self,
        low: i64,
        high: i64,
    ) -> Result<Vec<TreeNode>, DatabaseError>;

    /// Unconditional additive update over exactly the given ids
    ///
    /// # Returns
    ///
    /// Number of rows updated
    async fn bulk_shift_members(
        &mut self,
        ids: &[NodeId],
        left_delta: i64,
        right_delta: i64,
        depth_delta: i64,
    ) -> Result<u64, DatabaseError>;

    /// Shift every boundary that falls in `[low, high]` by `step`
    ///
    /// Rows are selected by `left in range OR right in range`; on each
    /// selected row `left` and `right` are adjusted independently, each only
    /// when it is itself inside the range.
    ///
    /// # Returns
    ///
    /// Number of rows updated
    async fn conditional_shift_range(
        &mut self,
        low: i64,
        high: i64,
        step: i64,
    ) -> Result<u64, DatabaseError>;

    /// Single-row reparent
    async fn set_parent(
        &mut self,
        id: NodeId,
        parent_id: Option<NodeId>,
    ) -> Result<(), DatabaseError>;

    /// Publish every write made through this handle
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;

    /// Discard every write made through this handle
    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError>;
}
