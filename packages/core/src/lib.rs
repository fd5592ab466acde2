//! NestedSet Core
//!
//! Storage and relocation for trees encoded with the nested set model: each
//! node carries `left`/`right` boundaries whose interval contains exactly its
//! subtree, plus a `depth` counter and a denormalized `parent_id`.
//!
//! # Architecture
//!
//! - **Bulk updates only**: a relocation is one range shift, one member
//!   shift and one reparent, never a recursive walk
//! - **One transaction per move**: readers never see half-shifted boundaries
//! - **libsql**: embedded SQLite-compatible storage, plus an in-memory store
//!
//! # Modules
//!
//! - [`models`] - `TreeNode` and `Placement`
//! - [`db`] - storage traits and backends
//! - [`services`] - `Relocator`, position resolution and validation
//! - [`config`] - store and relocator configuration

pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::{RelocatorConfig, StoreConfig};
pub use db::{DatabaseError, MemoryTreeStore, SqliteTreeStore, TreeStore, TreeTransaction};
pub use models::*;
pub use services::{RelocationError, RelocationOutcome, Relocator, TreeValidator};
