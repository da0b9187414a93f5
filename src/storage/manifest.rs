//! Store manifest
//!
//! `manifest.json` records which tables exist and how many bytes of each table
//! file belong to committed batches. It is rewritten (temp file + rename)
//! after every commit, so a reader never trusts bytes past `committed_bytes`.
//!
//! A store is only queryable once `sealed_at` is set: that happens after both
//! tables are loaded and every ordered copy is written.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{StorageError, StorageResult};
use super::order::{order_key, order_label};
use crate::record::{SortKey, Table};

/// Manifest file name inside the store directory
pub const MANIFEST_FILE: &str = "manifest.json";

const FORMAT_VERSION: u32 = 1;

/// Committed state of one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableManifest {
    pub rows: u64,
    pub batches: u64,
    pub committed_bytes: u64,
}

/// Committed state of one ordered copy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderManifest {
    pub rows: u64,
    pub committed_bytes: u64,
    /// Start offset of every frame, in file order
    pub frame_offsets: Vec<u64>,
}

/// Whole-store state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreManifest {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    /// Set when a commit failed part way; the store must be recreated
    #[serde(default)]
    pub poisoned: bool,
    /// Keyed by table name
    #[serde(default)]
    pub tables: BTreeMap<String, TableManifest>,
    /// Keyed by ordered copy label
    #[serde(default)]
    pub orders: BTreeMap<String, OrderManifest>,
    /// Set once the load finished and the ordered copies are committed
    #[serde(default)]
    pub sealed_at: Option<DateTime<Utc>>,
}

impl StoreManifest {
    /// A manifest for a freshly created, empty store
    pub fn new() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            created_at: Utc::now(),
            poisoned: false,
            tables: BTreeMap::new(),
            orders: BTreeMap::new(),
            sealed_at: None,
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed_at.is_some()
    }

    pub fn order(&self, key: SortKey) -> Option<&OrderManifest> {
        self.orders.get(order_label(key))
    }

    pub fn table(&self, table: Table) -> Option<&TableManifest> {
        self.tables.get(table.name())
    }

    pub fn table_mut(&mut self, table: Table) -> Option<&mut TableManifest> {
        self.tables.get_mut(table.name())
    }

    /// Loads and validates `<dir>/manifest.json`.
    pub fn load(dir: &Path) -> StorageResult<Self> {
        let path = dir.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(dir.to_path_buf())
            } else {
                StorageError::read_failed(format!("failed to read {}", path.display()), e)
            }
        })?;

        let manifest: StoreManifest = serde_json::from_str(&content)
            .map_err(|e| StorageError::Manifest(format!("{}: {}", path.display(), e)))?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(StorageError::Manifest(format!(
                "unsupported format version {}",
                manifest.format_version
            )));
        }
        if let Some(name) = manifest.tables.keys().find(|n| Table::from_name(n).is_none()) {
            return Err(StorageError::Manifest(format!("unknown table '{}'", name)));
        }
        if let Some(name) = manifest.orders.keys().find(|n| order_key(n).is_none()) {
            return Err(StorageError::Manifest(format!("unknown ordered copy '{}'", name)));
        }
        if manifest.is_sealed() {
            if let Some(key) = SortKey::ALL.into_iter().find(|k| manifest.order(*k).is_none()) {
                return Err(StorageError::Manifest(format!(
                    "sealed store is missing ordered copy '{}'",
                    order_label(key)
                )));
            }
        }

        Ok(manifest)
    }

    /// Atomically replaces `<dir>/manifest.json`.
    pub fn save(&self, dir: &Path) -> StorageResult<()> {
        let path = dir.join(MANIFEST_FILE);
        let tmp_path = dir.join(format!("{}.tmp", MANIFEST_FILE));

        let content = serde_json::to_vec_pretty(self)
            .map_err(|e| StorageError::Manifest(e.to_string()))?;

        let mut file = File::create(&tmp_path).map_err(|e| {
            StorageError::write_failed(format!("failed to create {}", tmp_path.display()), e)
        })?;
        file.write_all(&content)
            .and_then(|_| file.sync_all())
            .map_err(|e| {
                StorageError::write_failed(format!("failed to write {}", tmp_path.display()), e)
            })?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            StorageError::write_failed(format!("failed to replace {}", path.display()), e)
        })?;
        Ok(())
    }
}

impl Default for StoreManifest {
    fn default() -> Self {
        Self::new()
    }
}
