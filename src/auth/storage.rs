//! Origin-scoped key-value storage backends
//!
//! The persisted session lives in a small string-to-string store that
//! survives restarts and is partitioned by origin, so two applications that
//! share a database never read each other's tokens.  [`KeyValueStorage`] is
//! the capability injected into [`TokenStore`](super::token_store::TokenStore);
//! two implementations are provided:
//!
//! - [`SledStorage`] -- an embedded `sled` database with one tree per origin.
//! - [`MemoryStorage`] -- a process-local map, used by tests and short-lived
//!   tools.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use sled::{Db, Tree};

use crate::error::{OidcError, Result};

// ---------------------------------------------------------------------------
// KeyValueStorage
// ---------------------------------------------------------------------------

/// Synchronous string storage scoped to a single origin.
///
/// Reads and writes are synchronous and not guarded against concurrent
/// writers in other processes; the last write wins.
pub trait KeyValueStorage: Send + Sync {
    /// Returns the value stored under `key`, or `None` when absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`.  Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// SledStorage
// ---------------------------------------------------------------------------

/// Persistent storage backed by an embedded `sled` database.
///
/// Each origin maps to its own sled tree, mirroring the per-origin isolation
/// of browser local storage.
///
/// # Examples
///
/// ```
/// use implicit_oidc::auth::storage::{KeyValueStorage, SledStorage};
///
/// # fn main() -> implicit_oidc::error::Result<()> {
/// let dir = tempfile::TempDir::new()?;
/// let storage = SledStorage::open(dir.path().join("session.db"), "http://localhost:7000")?;
/// storage.set("idt", "header.payload.signature")?;
/// assert_eq!(storage.get("idt")?.as_deref(), Some("header.payload.signature"));
/// # Ok(())
/// # }
/// ```
pub struct SledStorage {
    db: Db,
    tree: Tree,
    origin: String,
}

impl SledStorage {
    /// Opens (or creates) the database at `path` and selects the tree for
    /// `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::Storage`] if the database or tree cannot be
    /// opened.
    pub fn open(path: impl AsRef<Path>, origin: &str) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| OidcError::Storage(format!("Failed to open database: {}", e)))?;
        let tree = db
            .open_tree(Self::tree_name(origin))
            .map_err(|e| OidcError::Storage(format!("Failed to open origin tree: {}", e)))?;

        Ok(Self {
            db,
            tree,
            origin: origin.to_string(),
        })
    }

    /// The origin this storage is scoped to.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn tree_name(origin: &str) -> String {
        format!("origin:{}", origin)
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| OidcError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}

impl KeyValueStorage for SledStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self
            .tree
            .get(key.as_bytes())
            .map_err(|e| OidcError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => {
                let value = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    OidcError::Storage(format!("Stored value for '{}' is not UTF-8: {}", key, e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.tree
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| OidcError::Storage(format!("Insert failed: {}", e)))?;
        self.flush()
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.tree
            .remove(key.as_bytes())
            .map_err(|e| OidcError::Storage(format!("Remove failed: {}", e)))?;
        self.flush()
    }
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Non-persistent storage held in a process-local map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map still holds consistent string entries.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
