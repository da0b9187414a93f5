//! Row storage for the title tables
//!
//! Two tables, `title_basics` and `title_ratings`, each an append-only file of
//! checksummed batch frames. The store is write-once, read-many: there is no
//! update or delete path. Sealing ends a load by writing the joined rows once
//! per sort key; queries stream those ordered copies.
//!
//! # Design Principles
//!
//! - One `insert_batch` call = one frame = one atomic commit
//! - Checksum-verified on every read
//! - The manifest is the commit point; bytes it does not cover are ignored
//! - A failed commit poisons the store until it is recreated
//! - Only a sealed store answers ordered scans
//! - Single owner per run (lock file)

mod checksum;
mod codec;
mod errors;
mod file_store;
mod manifest;
mod memory;
mod order;
mod reader;
mod store;
mod writer;

pub use checksum::{compute_checksum, verify_checksum};
pub use codec::{decode_frame, encode_frame, encode_rows, RowCodec, RowReader, StoredRow};
pub use errors::{Severity, StorageError, StorageResult};
pub use file_store::{FileStore, LOCK_FILE};
pub use manifest::{OrderManifest, StoreManifest, TableManifest, MANIFEST_FILE};
pub use memory::MemoryStore;
pub use order::{order_key, order_label, order_path, StableReverse};
pub use reader::{FrameRows, ReverseFrameRows, TableReader};
pub use store::{JoinScan, RowIter, TableStore};
pub use writer::{table_path, TableWriter};
