//! Bulk loading of the compressed title feeds
//!
//! A feed is read as a lazy sequence of lines, decoded record by record, and
//! committed to a [`TableStore`](crate::storage::TableStore) in fixed-size
//! batches. Each batch is one atomic commit, and batches commit in source
//! order.
//!
//! # Failure policy
//!
//! - Unreadable source: abort before anything is written
//! - Malformed line: abort (default) or skip-and-count, see
//!   [`MalformedLinePolicy`]
//! - Failed commit: abort; the store keeps the batches committed so far and
//!   must be recreated before another load

mod batching;
mod config;
mod errors;
#[allow(clippy::module_inception)]
mod loader;
mod source;

pub use batching::RecordBatch;
pub use config::{LoaderConfig, MalformedLinePolicy, DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};
pub use errors::{LoaderError, LoaderResult, DATASET_URL};
pub use loader::{load_dataset, open_sources, BulkLoader, DatasetReport, LoadReport};
pub use source::{DatasetSource, SourceLine};
