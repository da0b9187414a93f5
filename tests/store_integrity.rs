//! Store integrity tests
//!
//! - Corruption is never ignored: a damaged frame fails the query, even
//!   after rows were already returned
//! - Bytes past the committed length are invisible
//! - Only a sealed store answers queries; sealing a damaged store fails
//! - A poisoned store stays poisoned across reopen
//! - One owner at a time

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use tempfile::TempDir;

use reeldb::query::{QueryEngine, QueryError, QueryParams, SortDirection, SortKey};
use reeldb::record::{AdultFlag, RatingRecord, Table, TitleRecord};
use reeldb::storage::{
    order_path, table_path, FileStore, StorageError, StoreManifest, TableStore, LOCK_FILE,
    MANIFEST_FILE,
};

// =============================================================================
// Test Utilities
// =============================================================================

fn title(id: &str, year: u16) -> TitleRecord {
    TitleRecord {
        id: id.to_string(),
        title_type: "movie".to_string(),
        primary_title: format!("Title {id}"),
        original_title: format!("Title {id}"),
        is_adult: AdultFlag::No,
        start_year: Some(year),
        end_year: None,
        runtime_minutes: Some(90),
        genres: vec!["drama".to_string()],
    }
}

fn rating(id: &str, votes: u64) -> RatingRecord {
    RatingRecord {
        id: id.to_string(),
        average_rating: 7.0,
        num_votes: votes,
    }
}

/// Two title batches and one rating batch, left unsealed.
fn populate_tables(dir: &Path) -> FileStore {
    let mut store = FileStore::create(dir).unwrap();
    store.create_table(Table::TitleBasics).unwrap();
    store.create_table(Table::TitleRatings).unwrap();
    store
        .insert_batch(&[title("tt1", 1990), title("tt2", 2000)])
        .unwrap();
    store.insert_batch(&[title("tt3", 2010)]).unwrap();
    store
        .insert_batch(&[rating("tt1", 10), rating("tt2", 20), rating("tt3", 30)])
        .unwrap();
    store
}

/// A complete load: one row per ordered-copy frame. Closes the store.
fn populate(dir: &Path) {
    let mut store = populate_tables(dir);
    assert_eq!(store.seal(1).unwrap(), 3);
}

fn query_ids(store: &FileStore, params: &QueryParams) -> Result<Vec<String>, QueryError> {
    QueryEngine::new(store)
        .execute(params)?
        .map(|r| r.map(|row| row.title.id))
        .collect()
}

fn default_ids(store: &FileStore) -> Result<Vec<String>, QueryError> {
    query_ids(store, &QueryParams::default())
}

/// Flips the last checksum byte, damaging the last frame of a file.
fn damage_last_frame(path: &Path) {
    let mut bytes = fs::read(path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    fs::write(path, bytes).unwrap();
}

// =============================================================================
// Corruption
// =============================================================================

#[test]
fn test_intact_store_queries() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("store");
    populate(&dir);

    let store = FileStore::open(&dir).unwrap();
    assert!(store.is_sealed());
    assert_eq!(default_ids(&store).unwrap(), vec!["tt1", "tt2", "tt3"]);

    let params = QueryParams::new().order_by(SortKey::Year, SortDirection::Desc);
    assert_eq!(query_ids(&store, &params).unwrap(), vec!["tt3", "tt2", "tt1"]);
}

#[test]
fn test_flipped_byte_fails_query() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("store");
    populate(&dir);

    let path = order_path(&dir, SortKey::NumVotes);
    let mut bytes = fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xFF;
    fs::write(&path, bytes).unwrap();

    let store = FileStore::open(&dir).unwrap();
    let err = default_ids(&store).unwrap_err();
    assert_eq!(err.code(), "REEL_DATA_CORRUPTION");
    assert!(err.is_fatal());
}

#[test]
fn test_limit_stops_before_damaged_frame() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("store");
    populate(&dir);
    damage_last_frame(&order_path(&dir, SortKey::NumVotes));

    let store = FileStore::open(&dir).unwrap();
    let params = QueryParams::new().with_limit(1);
    assert_eq!(query_ids(&store, &params).unwrap(), vec!["tt1"]);
}

#[test]
fn test_mid_scan_corruption_ends_results() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("store");
    populate(&dir);
    damage_last_frame(&order_path(&dir, SortKey::NumVotes));

    let store = FileStore::open(&dir).unwrap();
    let mut results = QueryEngine::new(&store)
        .execute(&QueryParams::default())
        .unwrap();
    assert_eq!(results.next().unwrap().unwrap().title.id, "tt1");
    assert_eq!(results.next().unwrap().unwrap().title.id, "tt2");

    let err = results.next().unwrap().unwrap_err();
    assert!(matches!(err, QueryError::Store(StorageError::Corruption { .. })));
    assert!(err.is_fatal());
    assert!(results.next().is_none());
    assert!(results.is_finished());
    assert_eq!(results.total(), 2);
}

#[test]
fn test_descending_scan_reads_damaged_frame_first() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("store");
    populate(&dir);
    damage_last_frame(&order_path(&dir, SortKey::NumVotes));

    let store = FileStore::open(&dir).unwrap();
    let params = QueryParams::new().order_by(SortKey::NumVotes, SortDirection::Desc);
    let mut results = QueryEngine::new(&store).execute(&params).unwrap();
    assert_eq!(results.next().unwrap().unwrap_err().code(), "REEL_DATA_CORRUPTION");
    assert!(results.next().is_none());
    assert_eq!(results.total(), 0);
}

#[test]
fn test_seal_fails_on_damaged_table() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("store");
    drop(populate_tables(&dir));
    damage_last_frame(&table_path(&dir, Table::TitleRatings));

    let mut store = FileStore::open(&dir).unwrap();
    let err = store.seal(10).unwrap_err();
    assert_eq!(err.code(), "REEL_DATA_CORRUPTION");
    assert!(!store.is_sealed());
    drop(store);

    let store = FileStore::open(&dir).unwrap();
    assert!(!store.is_sealed());
    assert!(matches!(
        default_ids(&store),
        Err(QueryError::Store(StorageError::NotSealed))
    ));
}

#[test]
fn test_truncated_order_is_corruption() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("store");
    populate(&dir);

    let path = order_path(&dir, SortKey::NumVotes);
    let len = fs::metadata(&path).unwrap().len();
    OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_len(len - 5)
        .unwrap();

    let store = FileStore::open(&dir).unwrap();
    assert_eq!(default_ids(&store).unwrap_err().code(), "REEL_DATA_CORRUPTION");
}

// =============================================================================
// Commit point
// =============================================================================

#[test]
fn test_uncommitted_tail_is_invisible() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("store");
    drop(populate_tables(&dir));

    // a frame written without its manifest update
    let path = table_path(&dir, Table::TitleBasics);
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&[0xAB; 64]).unwrap();
    drop(file);

    let title_ids = |store: &FileStore| -> Vec<String> {
        store
            .scan::<TitleRecord>()
            .unwrap()
            .map(|r| r.unwrap().id)
            .collect()
    };

    let mut store = FileStore::open(&dir).unwrap();
    assert_eq!(title_ids(&store), vec!["tt1", "tt2", "tt3"]);

    // the next commit discards the tail and lands after the last good frame
    store.insert_batch(&[title("tt4", 2020)]).unwrap();
    assert_eq!(title_ids(&store), vec!["tt1", "tt2", "tt3", "tt4"]);

    store.seal(2).unwrap();
    assert_eq!(default_ids(&store).unwrap(), vec!["tt1", "tt2", "tt3"]);
}

#[test]
fn test_sealed_store_refuses_rows() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("store");
    populate(&dir);

    let mut store = FileStore::open(&dir).unwrap();
    let err = store.insert_batch(&[title("tt9", 2001)]).unwrap_err();
    assert!(matches!(err, StorageError::Sealed));
    assert_eq!(err.code(), "REEL_STORE_STATE");
    assert_eq!(store.row_count(Table::TitleBasics).unwrap(), 3);
}

#[test]
fn test_manifest_counts_match_scans() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("store");
    populate(&dir);

    let manifest = StoreManifest::load(&dir).unwrap();
    let basics = manifest.table(Table::TitleBasics).unwrap();
    assert_eq!(basics.rows, 3);
    assert_eq!(basics.batches, 2);
    let file_len = fs::metadata(table_path(&dir, Table::TitleBasics)).unwrap().len();
    assert_eq!(basics.committed_bytes, file_len);
    assert!(!manifest.poisoned);

    assert!(manifest.is_sealed());
    for key in SortKey::ALL {
        let order = manifest.order(key).unwrap();
        assert_eq!(order.rows, 3);
        assert_eq!(order.frame_offsets.len(), 3);
        assert_eq!(order.frame_offsets[0], 0);
        let order_len = fs::metadata(order_path(&dir, key)).unwrap().len();
        assert_eq!(order.committed_bytes, order_len);
    }
}

// =============================================================================
// Poisoning and ownership
// =============================================================================

#[test]
fn test_poisoned_flag_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("store");
    populate(&dir);

    let manifest_path = dir.join(MANIFEST_FILE);
    let mut manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
    manifest["poisoned"] = serde_json::Value::Bool(true);
    fs::write(&manifest_path, manifest.to_string()).unwrap();

    let mut store = FileStore::open(&dir).unwrap();
    assert!(store.is_poisoned());
    assert!(matches!(
        store.insert_batch(&[title("tt9", 2001)]),
        Err(StorageError::Poisoned)
    ));
    assert!(matches!(
        default_ids(&store),
        Err(QueryError::Store(StorageError::Poisoned))
    ));
    drop(store);

    let store = FileStore::recreate(&dir).unwrap();
    assert!(!store.is_poisoned());
    assert!(!store.has_table(Table::TitleBasics));
}

#[test]
fn test_single_owner() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("store");
    populate(&dir);

    let owner = FileStore::open(&dir).unwrap();
    assert!(dir.join(LOCK_FILE).exists());
    assert!(matches!(FileStore::open(&dir), Err(StorageError::Locked(_))));
    assert!(matches!(FileStore::recreate(&dir), Err(StorageError::Locked(_))));
    drop(owner);

    assert!(!dir.join(LOCK_FILE).exists());
    FileStore::open(&dir).unwrap();
}

#[test]
fn test_missing_store_not_found() {
    let temp = TempDir::new().unwrap();
    assert!(matches!(
        FileStore::open(&temp.path().join("nowhere")),
        Err(StorageError::NotFound(_))
    ));
}
