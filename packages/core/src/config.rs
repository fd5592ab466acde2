//! Store and relocation configuration
//!
//! `StoreConfig` is the single source of truth for how a store is opened and
//! how relocations behave. It can be built in code, deserialized from JSON,
//! or read from `NESTEDSET_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// SQLite busy timeout applied to every connection (milliseconds)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Upper bound for the busy timeout; anything longer is almost certainly a typo
const MAX_BUSY_TIMEOUT_MS: u64 = 10 * 60 * 1000;

/// Configuration for opening a tree store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the database file
    pub database_path: PathBuf,

    /// How long a connection waits on a locked database before failing
    pub busy_timeout_ms: u64,

    /// Re-check every tree invariant inside the relocation transaction and
    /// roll back if any fails
    pub verify_after_relocate: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("nestedset.db"),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            verify_after_relocate: false,
        }
    }
}

impl StoreConfig {
    /// Config for a database file at `path`, other settings default
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: path.into(),
            ..Default::default()
        }
    }

    /// Build a config from the environment
    ///
    /// - `NESTEDSET_DB_PATH` - database file
    /// - `NESTEDSET_BUSY_TIMEOUT_MS` - busy timeout
    /// - `NESTEDSET_VERIFY` - `1`/`true` enables post-relocation verification
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let database_path = std::env::var("NESTEDSET_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let busy_timeout_ms = std::env::var("NESTEDSET_BUSY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.busy_timeout_ms);

        let verify_after_relocate = std::env::var("NESTEDSET_VERIFY")
            .ok()
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.verify_after_relocate);

        Self {
            database_path,
            busy_timeout_ms,
            verify_after_relocate,
        }
    }

    /// Parse a JSON config file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
        serde_json::from_str(&raw)
            .map_err(|e| format!("Failed to parse config {}: {}", path.display(), e))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.database_path.as_os_str().is_empty() {
            return Err("database_path cannot be empty".to_string());
        }

        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(format!(
                "busy_timeout_ms cannot exceed {} ms",
                MAX_BUSY_TIMEOUT_MS
            ));
        }

        Ok(())
    }

    /// Settings the relocation service cares about
    pub fn relocator_config(&self) -> RelocatorConfig {
        RelocatorConfig {
            verify_after_relocate: self.verify_after_relocate,
        }
    }
}

/// Behavior switches for `Relocator`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocatorConfig {
    /// Validate the whole tree before committing each relocation
    pub verify_after_relocate: bool,
}
