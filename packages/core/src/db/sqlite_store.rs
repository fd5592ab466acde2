//! SqliteTreeStore - TreeStore Implementation for libsql
//!
//! Stores the tree in a single `tree_nodes` table and implements the
//! relocation primitives as bulk SQL updates.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE tree_nodes (
//!     id INTEGER PRIMARY KEY,
//!     parent_id INTEGER REFERENCES tree_nodes(id),
//!     lft INTEGER NOT NULL,
//!     rgt INTEGER NOT NULL,
//!     depth INTEGER NOT NULL DEFAULT 0,
//!     title TEXT,
//!     CHECK (lft < rgt)
//! )
//! ```
//!
//! # Transactions
//!
//! Every transaction gets its own connection and starts with
//! `BEGIN IMMEDIATE`, which takes SQLite's write lock before the first
//! read. Two relocations against the same file therefore run one after the
//! other; the second waits up to the configured busy timeout.
//!
//! # Examples
//!
//! ```rust,no_run
//! use nestedset_core::db::{SqliteTreeStore, TreeStore};
//! use nestedset_core::StoreConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteTreeStore::open(&StoreConfig::for_path("./data/tree.db")).await?;
//!     let nodes = store.load_all().await?;
//!     println!("{} nodes", nodes.len());
//!     Ok(())
//! }
//! ```

use crate::config::StoreConfig;
use crate::db::tree_store::{TreeStore, TreeTransaction};
use crate::db::DatabaseError;
use crate::models::{NodeId, TreeNode};
use async_trait::async_trait;
use libsql::{Builder, Connection, Database, Row};
use std::path::PathBuf;
use std::sync::Arc;

/// Ids per `IN (...)` list; stays well under SQLite's bound-variable limit
const ID_CHUNK_SIZE: usize = 500;

const SELECT_COLUMNS: &str = "SELECT id, parent_id, lft, rgt, depth, title FROM tree_nodes";

/// libsql-backed nested set tree
#[derive(Debug, Clone)]
pub struct SqliteTreeStore {
    /// libsql database handle (wrapped in Arc for sharing)
    db: Arc<Database>,

    /// Path to the database file
    db_path: PathBuf,

    busy_timeout_ms: u64,
}

impl SqliteTreeStore {
    /// Open (or create) the database described by `config`
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the config is invalid, the directory cannot
    /// be created, the connection fails or schema initialization fails.
    pub async fn open(config: &StoreConfig) -> Result<Self, DatabaseError> {
        config.validate().map_err(DatabaseError::initialization_failed)?;

        let db_path = config.database_path.clone();

        if db_path.is_dir() {
            return Err(DatabaseError::invalid_path(db_path));
        }

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let store = Self {
            db: Arc::new(db),
            db_path,
            busy_timeout_ms: config.busy_timeout_ms,
        };

        store.initialize_schema().await?;

        Ok(store)
    }

    /// Open a database file with default settings
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        Self::open(&StoreConfig::for_path(db_path)).await
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so they go through query() instead of execute().
    async fn execute_pragma(conn: &Connection, pragma: &str) -> Result<(), DatabaseError> {
        conn.query(pragma, ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Roll back after a failed statement; the original error is what callers see
    async fn rollback_after_error(conn: &Connection) {
        if let Err(e) = conn.execute("ROLLBACK", ()).await {
            tracing::warn!("Failed to roll back transaction: {}", e);
        }
    }

    /// Get a connection with busy timeout configured
    ///
    /// Use this for every connection touched from async code: the busy
    /// timeout makes concurrent writers wait instead of failing immediately
    /// with `SQLITE_BUSY`.
    pub async fn connect_with_timeout(&self) -> Result<Connection, DatabaseError> {
        let conn = self.db.connect().map_err(DatabaseError::LibsqlError)?;
        Self::execute_pragma(&conn, &format!("PRAGMA busy_timeout = {}", self.busy_timeout_ms))
            .await?;
        // Foreign key enforcement is per connection
        Self::execute_pragma(&conn, "PRAGMA foreign_keys = ON").await?;
        Ok(conn)
    }

    /// Create the tree table and its indexes
    ///
    /// Idempotent (CREATE ... IF NOT EXISTS), safe to call on every open.
    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        Self::execute_pragma(&conn, "PRAGMA journal_mode = WAL").await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS tree_nodes (
                id INTEGER PRIMARY KEY,
                parent_id INTEGER REFERENCES tree_nodes(id),
                lft INTEGER NOT NULL,
                rgt INTEGER NOT NULL,
                depth INTEGER NOT NULL DEFAULT 0,
                title TEXT,
                CHECK (lft < rgt)
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create tree_nodes table: {}",
                e
            ))
        })?;

        for (name, column) in [
            ("idx_tree_nodes_lft", "lft"),
            ("idx_tree_nodes_rgt", "rgt"),
            ("idx_tree_nodes_parent", "parent_id"),
        ] {
            conn.execute(
                &format!("CREATE INDEX IF NOT EXISTS {} ON tree_nodes({})", name, column),
                (),
            )
            .await
            .map_err(|e| {
                DatabaseError::initialization_failed(format!(
                    "Failed to create index '{}': {}",
                    name, e
                ))
            })?;
        }

        tracing::debug!("Initialized tree_nodes schema at {}", self.db_path.display());
        Ok(())
    }

    /// Convert a `SELECT_COLUMNS` row to a TreeNode
    fn row_to_node(row: &Row) -> Result<TreeNode, DatabaseError> {
        let decode =
            |e: libsql::Error| DatabaseError::sql_execution(format!("Failed to decode row: {}", e));
        Ok(TreeNode {
            id: row.get(0).map_err(decode)?,
            parent_id: row.get(1).map_err(decode)?,
            left: row.get(2).map_err(decode)?,
            right: row.get(3).map_err(decode)?,
            depth: row.get(4).map_err(decode)?,
            title: row.get(5).map_err(decode)?,
        })
    }

    async fn collect_nodes(
        conn: &Connection,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<TreeNode>, DatabaseError> {
        let mut rows = conn
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to execute query: {}", e)))?;

        let mut nodes = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            nodes.push(Self::row_to_node(&row)?);
        }
        Ok(nodes)
    }

    async fn fetch_node(conn: &Connection, id: NodeId) -> Result<Option<TreeNode>, DatabaseError> {
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
        Ok(Self::collect_nodes(conn, &sql, [id]).await?.into_iter().next())
    }

    async fn fetch_all(conn: &Connection) -> Result<Vec<TreeNode>, DatabaseError> {
        let sql = format!("{} ORDER BY lft", SELECT_COLUMNS);
        Self::collect_nodes(conn, &sql, ()).await
    }
}

#[async_trait]
impl TreeStore for SqliteTreeStore {
    async fn begin(&self) -> Result<Box<dyn TreeTransaction>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute("BEGIN IMMEDIATE", ()).await.map_err(|e| {
            DatabaseError::transaction_failed(format!("Failed to begin transaction: {}", e))
        })?;
        Ok(Box::new(SqliteTransaction { conn }))
    }

    async fn get_node(&self, id: NodeId) -> Result<Option<TreeNode>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        Self::fetch_node(&conn, id).await
    }

    async fn load_all(&self) -> Result<Vec<TreeNode>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        Self::fetch_all(&conn).await
    }

    async fn seed(&self, nodes: Vec<TreeNode>) -> Result<(), DatabaseError> {
        if nodes.is_empty() {
            return Ok(());
        }

        let conn = self.connect_with_timeout().await?;

        conn.execute("BEGIN TRANSACTION", ()).await.map_err(|e| {
            DatabaseError::transaction_failed(format!("Failed to begin transaction: {}", e))
        })?;

        // Parents may come after children in the input; check references at commit
        if let Err(e) = Self::execute_pragma(&conn, "PRAGMA defer_foreign_keys = ON").await {
            Self::rollback_after_error(&conn).await;
            return Err(e);
        }

        for node in &nodes {
            let result = conn
                .execute(
                    "INSERT INTO tree_nodes (id, parent_id, lft, rgt, depth, title) VALUES (?, ?, ?, ?, ?, ?)",
                    (
                        node.id,
                        node.parent_id,
                        node.left,
                        node.right,
                        node.depth,
                        node.title.as_deref(),
                    ),
                )
                .await;

            if let Err(e) = result {
                Self::rollback_after_error(&conn).await;
                return Err(DatabaseError::invalid_seed(format!(
                    "Failed to insert node {}: {}",
                    node.id, e
                )));
            }
        }

        if let Err(e) = conn.execute("COMMIT", ()).await {
            Self::rollback_after_error(&conn).await;
            return Err(DatabaseError::transaction_failed(format!(
                "Failed to commit transaction: {}",
                e
            )));
        }

        Ok(())
    }
}

/// Open `BEGIN IMMEDIATE` transaction on a dedicated connection
///
/// Dropping it without `commit` closes the connection, which makes SQLite
/// discard the pending writes.
pub struct SqliteTransaction {
    conn: Connection,
}

#[async_trait]
impl TreeTransaction for SqliteTransaction {
    async fn get_node(&mut self, id: NodeId) -> Result<Option<TreeNode>, DatabaseError> {
        SqliteTreeStore::fetch_node(&self.conn, id).await
    }

    async fn load_all(&mut self) -> Result<Vec<TreeNode>, DatabaseError> {
        SqliteTreeStore::fetch_all(&self.conn).await
    }

    async fn find_by_interval_right(
        &mut self,
        low: i64,
        high: i64,
    ) -> Result<Vec<TreeNode>, DatabaseError> {
        let sql = format!("{} WHERE rgt >= ? AND rgt <= ? ORDER BY lft", SELECT_COLUMNS);
        SqliteTreeStore::collect_nodes(&self.conn, &sql, (low, high)).await
    }

    async fn bulk_shift_members(
        &mut self,
        ids: &[NodeId],
        left_delta: i64,
        right_delta: i64,
        depth_delta: i64,
    ) -> Result<u64, DatabaseError> {
        let mut updated = 0;
        for chunk in ids.chunks(ID_CHUNK_SIZE) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "UPDATE tree_nodes SET lft = lft + ?, rgt = rgt + ?, depth = depth + ? WHERE id IN ({})",
                placeholders
            );

            let params: Vec<i64> = [left_delta, right_delta, depth_delta]
                .into_iter()
                .chain(chunk.iter().copied())
                .collect();

            updated += self
                .conn
                .execute(&sql, libsql::params_from_iter(params))
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to shift subtree members: {}", e))
                })?;
        }
        Ok(updated)
    }

    async fn conditional_shift_range(
        &mut self,
        low: i64,
        high: i64,
        step: i64,
    ) -> Result<u64, DatabaseError> {
        self.conn
            .execute(
                "UPDATE tree_nodes
                 SET lft = CASE WHEN lft BETWEEN ?1 AND ?2 THEN lft + ?3 ELSE lft END,
                     rgt = CASE WHEN rgt BETWEEN ?1 AND ?2 THEN rgt + ?3 ELSE rgt END
                 WHERE (lft BETWEEN ?1 AND ?2) OR (rgt BETWEEN ?1 AND ?2)",
                (low, high, step),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to shift affected range: {}", e)))
    }

    async fn set_parent(
        &mut self,
        id: NodeId,
        parent_id: Option<NodeId>,
    ) -> Result<(), DatabaseError> {
        let updated = self
            .conn
            .execute(
                "UPDATE tree_nodes SET parent_id = ? WHERE id = ?",
                (parent_id, id),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to set parent: {}", e)))?;

        if updated == 0 {
            return Err(DatabaseError::sql_execution(format!("Node not found: {}", id)));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            SqliteTreeStore::rollback_after_error(&self.conn).await;
            return Err(DatabaseError::transaction_failed(format!(
                "Failed to commit transaction: {}",
                e
            )));
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.conn.execute("ROLLBACK", ()).await.map_err(|e| {
            DatabaseError::transaction_failed(format!("Failed to roll back transaction: {}", e))
        })?;
        Ok(())
    }
}
