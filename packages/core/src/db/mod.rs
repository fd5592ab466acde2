//! Database Layer
//!
//! This module handles all storage interactions:
//!
//! - The `TreeStore`/`TreeTransaction` abstraction consumed by relocation
//! - `SqliteTreeStore`: libsql-backed storage (WAL, busy timeout, foreign keys)
//! - `MemoryTreeStore`: in-process storage for tests and embedding
//!
//! Every write the relocation service issues goes through a
//! `TreeTransaction`, so backends are responsible for making those writes
//! atomic and invisible until commit.

mod error;
mod memory_store;
mod sqlite_store;
mod tree_store;

pub use error::DatabaseError;
pub use memory_store::{MemoryTransaction, MemoryTreeStore};
pub use sqlite_store::{SqliteTransaction, SqliteTreeStore};
pub use tree_store::{TreeStore, TreeTransaction};
