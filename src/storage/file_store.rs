//! On-disk store
//!
//! ```text
//! <store_dir>/
//!   manifest.json       tables, ordered copies, committed lengths,
//!                       poisoned flag, seal time
//!   store.lock          held by whichever handle owns the store
//!   title_basics.dat    batch frames
//!   title_ratings.dat   batch frames
//!   order_<key>.dat     joined rows in ascending key order, written on seal
//! ```
//!
//! A store is single-owner: `create`, `recreate` and `open` all take the lock
//! and release it on drop.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, error, info};

use super::codec::{encode_frame, StoredRow};
use super::errors::{StorageError, StorageResult};
use super::manifest::{OrderManifest, StoreManifest, TableManifest, MANIFEST_FILE};
use super::order::{order_frames, order_label, order_path, StableReverse};
use super::reader::{FrameRows, ReverseFrameRows, TableReader};
use super::store::{join_rows, RowIter, TableStore};
use super::writer::TableWriter;
use crate::observability::Event;
use crate::record::{JoinedRecord, SortDirection, SortKey, Table};

/// Lock file name inside the store directory
pub const LOCK_FILE: &str = "store.lock";

/// Exclusive ownership marker, removed on drop.
#[derive(Debug)]
struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    fn acquire(dir: &Path) -> StorageResult<Self> {
        let path = dir.join(LOCK_FILE);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StorageError::Locked(dir.to_path_buf()))
            }
            Err(e) => Err(StorageError::write_failed(
                format!("failed to create {}", path.display()),
                e,
            )),
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Store backed by a directory of append-only table files.
pub struct FileStore {
    dir: PathBuf,
    manifest: StoreManifest,
    writers: HashMap<Table, TableWriter>,
    _lock: StoreLock,
}

impl FileStore {
    /// Returns whether a store has been created at `dir`.
    pub fn exists(dir: &Path) -> bool {
        dir.join(MANIFEST_FILE).exists()
    }

    /// Creates a new, empty store. Fails if one already exists at `dir`.
    pub fn create(dir: &Path) -> StorageResult<Self> {
        if Self::exists(dir) {
            return Err(StorageError::AlreadyExists(dir.to_path_buf()));
        }

        fs::create_dir_all(dir).map_err(|e| {
            StorageError::write_failed(format!("failed to create {}", dir.display()), e)
        })?;

        let lock = StoreLock::acquire(dir)?;
        let manifest = StoreManifest::new();
        manifest.save(dir)?;

        info!(
            event = Event::StoreCreated.as_str(),
            store = %dir.display(),
            "store created"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
            writers: HashMap::new(),
            _lock: lock,
        })
    }

    /// Deletes whatever is at `dir` and creates a new, empty store.
    pub fn recreate(dir: &Path) -> StorageResult<Self> {
        if dir.exists() {
            if dir.join(LOCK_FILE).exists() {
                return Err(StorageError::Locked(dir.to_path_buf()));
            }
            fs::remove_dir_all(dir).map_err(|e| {
                StorageError::write_failed(format!("failed to remove {}", dir.display()), e)
            })?;
            info!(
                event = Event::StoreRecreated.as_str(),
                store = %dir.display(),
                "previous store removed"
            );
        }
        Self::create(dir)
    }

    /// Opens an existing store.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        if !Self::exists(dir) {
            return Err(StorageError::NotFound(dir.to_path_buf()));
        }
        let lock = StoreLock::acquire(dir)?;
        let manifest = StoreManifest::load(dir)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
            writers: HashMap::new(),
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn manifest(&self) -> &StoreManifest {
        &self.manifest
    }

    /// Returns whether a failed commit left the store in a partial state.
    pub fn is_poisoned(&self) -> bool {
        self.manifest.poisoned
    }

    /// Returns whether a load ran to completion and the store can be queried.
    pub fn is_sealed(&self) -> bool {
        self.manifest.is_sealed()
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.manifest.poisoned {
            return Err(StorageError::Poisoned);
        }
        if self.manifest.is_sealed() {
            return Err(StorageError::Sealed);
        }
        Ok(())
    }

    /// Writes the ordered copy for `key`, replacing leftovers of an earlier
    /// failed seal.
    fn write_order(
        &self,
        rows: &[JoinedRecord],
        key: SortKey,
        frame_rows: usize,
    ) -> StorageResult<OrderManifest> {
        let frames = order_frames(rows, key, frame_rows)?;
        let path = order_path(&self.dir, key);
        let mut writer = TableWriter::open_file(path, order_label(key), 0)?;
        let mut entry = OrderManifest {
            rows: rows.len() as u64,
            ..OrderManifest::default()
        };
        for frame in &frames {
            entry.frame_offsets.push(writer.committed_offset());
            writer.append_frame(frame)?;
        }
        entry.committed_bytes = writer.committed_offset();
        debug!(order = order_label(key), frames = frames.len(), "ordered copy written");
        Ok(entry)
    }

    fn table_manifest(&self, table: Table) -> StorageResult<&TableManifest> {
        self.manifest
            .table(table)
            .ok_or(StorageError::UnknownTable(table.name()))
    }

    fn writer(&mut self, table: Table) -> StorageResult<&mut TableWriter> {
        let committed = self.table_manifest(table)?.committed_bytes;
        if !self.writers.contains_key(&table) {
            let writer = TableWriter::open(&self.dir, table, committed)?;
            self.writers.insert(table, writer);
        }
        self.writers
            .get_mut(&table)
            .ok_or(StorageError::UnknownTable(table.name()))
    }

    fn poison(&mut self) {
        self.manifest.poisoned = true;
        if let Err(e) = self.manifest.save(&self.dir) {
            error!(store = %self.dir.display(), error = %e, "failed to record poisoned store");
        }
    }
}

impl TableStore for FileStore {
    fn create_table(&mut self, table: Table) -> StorageResult<()> {
        self.check_writable()?;
        if self.manifest.table(table).is_some() {
            return Err(StorageError::TableExists(table.name()));
        }

        File::create(super::writer::table_path(&self.dir, table)).map_err(|e| {
            StorageError::write_failed(format!("failed to create table {}", table.name()), e)
        })?;

        self.manifest
            .tables
            .insert(table.name().to_string(), TableManifest::default());
        self.manifest.save(&self.dir)
    }

    fn has_table(&self, table: Table) -> bool {
        self.manifest.table(table).is_some()
    }

    fn insert_batch<R: StoredRow>(&mut self, rows: &[R]) -> StorageResult<()> {
        self.check_writable()?;

        let table = R::TABLE;
        // Nothing is written for a batch that cannot be framed
        let frame = encode_frame(rows)?;

        let writer = self.writer(table)?;
        let appended = writer
            .append_frame(&frame)
            .map(|_| writer.committed_offset());
        let committed = match appended {
            Ok(offset) => offset,
            Err(e) => {
                self.poison();
                return Err(e);
            }
        };

        let entry = self
            .manifest
            .table_mut(table)
            .ok_or(StorageError::UnknownTable(table.name()))?;
        entry.rows += rows.len() as u64;
        entry.batches += 1;
        entry.committed_bytes = committed;

        // The frame is durable but invisible until the manifest says so
        if let Err(e) = self.manifest.save(&self.dir) {
            self.poison();
            return Err(e);
        }
        Ok(())
    }

    fn row_count(&self, table: Table) -> StorageResult<u64> {
        Ok(self.table_manifest(table)?.rows)
    }

    fn scan<R: StoredRow + 'static>(&self) -> StorageResult<RowIter<'_, R>> {
        let committed = self.table_manifest(R::TABLE)?.committed_bytes;
        let reader = TableReader::open(&self.dir, R::TABLE, committed)?;
        Ok(Box::new(FrameRows::<R>::new(reader)))
    }

    fn seal(&mut self, frame_rows: usize) -> StorageResult<u64> {
        self.check_writable()?;

        let rows = join_rows(&*self)?;
        let mut orders = BTreeMap::new();
        for key in SortKey::ALL {
            let entry = self.write_order(&rows, key, frame_rows)?;
            orders.insert(order_label(key).to_string(), entry);
        }

        let mut sealed = self.manifest.clone();
        sealed.orders = orders;
        sealed.sealed_at = Some(Utc::now());
        // The store counts as sealed only once this save lands
        sealed.save(&self.dir)?;
        self.manifest = sealed;
        self.writers.clear();
        Ok(rows.len() as u64)
    }

    fn is_sealed(&self) -> bool {
        self.manifest.is_sealed()
    }

    fn scan_ordered(
        &self,
        key: SortKey,
        direction: SortDirection,
    ) -> StorageResult<RowIter<'_, JoinedRecord>> {
        if self.manifest.poisoned {
            return Err(StorageError::Poisoned);
        }
        let order = match self.manifest.order(key) {
            Some(order) if self.manifest.is_sealed() => order,
            _ => return Err(StorageError::NotSealed),
        };

        let reader = TableReader::open_file(
            order_path(&self.dir, key),
            order_label(key),
            order.committed_bytes,
        )?;
        let rows: RowIter<'_, JoinedRecord> = match direction {
            SortDirection::Asc => Box::new(FrameRows::<JoinedRecord>::new(reader)),
            SortDirection::Desc => Box::new(StableReverse::new(
                ReverseFrameRows::<JoinedRecord>::new(reader, order.frame_offsets.clone()),
                key,
            )),
        };
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AdultFlag, RatingRecord, TitleRecord};
    use tempfile::TempDir;

    fn title(id: &str) -> TitleRecord {
        TitleRecord {
            id: id.to_string(),
            title_type: "short".to_string(),
            primary_title: format!("Title {}", id),
            original_title: format!("Title {}", id),
            is_adult: AdultFlag::No,
            start_year: None,
            end_year: None,
            runtime_minutes: None,
            genres: Vec::new(),
        }
    }

    #[test]
    fn test_create_twice_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store");
        {
            FileStore::create(&path).unwrap();
        }
        assert!(matches!(
            FileStore::create(&path),
            Err(StorageError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_second_handle_is_locked_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store");
        let _owner = FileStore::create(&path).unwrap();
        assert!(matches!(FileStore::open(&path), Err(StorageError::Locked(_))));
    }

    #[test]
    fn test_lock_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store");
        {
            FileStore::create(&path).unwrap();
        }
        assert!(!path.join(LOCK_FILE).exists());
        FileStore::open(&path).unwrap();
    }

    #[test]
    fn test_insert_requires_table() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::create(&dir.path().join("store")).unwrap();
        let err = store.insert_batch(&[title("tt1")]).unwrap_err();
        assert!(matches!(err, StorageError::UnknownTable("title_basics")));
    }

    #[test]
    fn test_rows_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store");
        {
            let mut store = FileStore::create(&path).unwrap();
            store.create_table(Table::TitleBasics).unwrap();
            store.insert_batch(&[title("tt1"), title("tt2")]).unwrap();
            store.insert_batch(&[title("tt3")]).unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.row_count(Table::TitleBasics).unwrap(), 3);
        assert_eq!(store.manifest().table(Table::TitleBasics).unwrap().batches, 2);
        let ids: Vec<String> = store
            .scan::<TitleRecord>()
            .unwrap()
            .map(|r| r.unwrap().id)
            .collect();
        assert_eq!(ids, vec!["tt1", "tt2", "tt3"]);
    }

    #[test]
    fn test_recreate_wipes_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store");
        {
            let mut store = FileStore::create(&path).unwrap();
            store.create_table(Table::TitleRatings).unwrap();
            store
                .insert_batch(&[RatingRecord {
                    id: "tt1".to_string(),
                    average_rating: 5.0,
                    num_votes: 3,
                }])
                .unwrap();
        }

        let store = FileStore::recreate(&path).unwrap();
        assert!(!store.has_table(Table::TitleRatings));
    }

    fn rating(id: &str, votes: u64) -> RatingRecord {
        RatingRecord {
            id: id.to_string(),
            average_rating: 6.0,
            num_votes: votes,
        }
    }

    fn loaded(path: &Path) -> FileStore {
        let mut store = FileStore::create(path).unwrap();
        store.create_table(Table::TitleBasics).unwrap();
        store.create_table(Table::TitleRatings).unwrap();
        store
            .insert_batch(&[title("tt1"), title("tt2"), title("tt3")])
            .unwrap();
        store
            .insert_batch(&[rating("tt1", 30), rating("tt3", 10)])
            .unwrap();
        store
    }

    fn ordered_ids(store: &FileStore, key: SortKey, direction: SortDirection) -> Vec<String> {
        store
            .scan_ordered(key, direction)
            .unwrap()
            .map(|r| r.unwrap().title.id)
            .collect()
    }

    #[test]
    fn test_seal_writes_ordered_copies() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store");
        {
            let mut store = loaded(&path);
            assert!(!store.is_sealed());
            assert_eq!(store.seal(1).unwrap(), 2);
        }

        let store = FileStore::open(&path).unwrap();
        assert!(store.is_sealed());
        for key in SortKey::ALL {
            let order = store.manifest().order(key).unwrap();
            assert_eq!(order.rows, 2);
            assert_eq!(order.frame_offsets.len(), 2);
            assert!(order_path(&path, key).exists());
        }
        let asc = ordered_ids(&store, SortKey::NumVotes, SortDirection::Asc);
        assert_eq!(asc, vec!["tt3", "tt1"]);
        let desc = ordered_ids(&store, SortKey::NumVotes, SortDirection::Desc);
        assert_eq!(desc, vec!["tt1", "tt3"]);
    }

    #[test]
    fn test_unsealed_store_has_no_ordered_scan() {
        let dir = TempDir::new().unwrap();
        let store = loaded(&dir.path().join("store"));
        assert!(matches!(
            store.scan_ordered(SortKey::Name, SortDirection::Asc),
            Err(StorageError::NotSealed)
        ));
    }

    #[test]
    fn test_sealed_store_refuses_writes() {
        let dir = TempDir::new().unwrap();
        let mut store = loaded(&dir.path().join("store"));
        store.seal(10).unwrap();

        assert!(matches!(store.insert_batch(&[title("tt9")]), Err(StorageError::Sealed)));
        assert!(matches!(store.seal(10), Err(StorageError::Sealed)));
        assert_eq!(store.row_count(Table::TitleBasics).unwrap(), 3);
    }

    #[test]
    fn test_poisoned_store_refuses_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store");
        {
            let mut store = FileStore::create(&path).unwrap();
            store.create_table(Table::TitleBasics).unwrap();
            store.poison();
        }

        let mut store = FileStore::open(&path).unwrap();
        assert!(store.is_poisoned());
        assert!(matches!(
            store.insert_batch(&[title("tt1")]),
            Err(StorageError::Poisoned)
        ));
    }
}
