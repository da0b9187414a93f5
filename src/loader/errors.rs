//! Loader error types
//!
//! Error codes:
//! - REEL_SOURCE_UNAVAILABLE - the compressed feed could not be opened or read
//! - REEL_MALFORMED_RECORD - a line failed to decode under the abort policy
//! - REEL_STORE_NOT_EMPTY - the target table already holds rows
//! - REEL_STORE_WRITE_FAILED - a batch commit failed; the store is partial
//! - REEL_LOADER_CONFIG - invalid loader configuration
//!
//! Every loader error aborts the load.

use std::io;

use thiserror::Error;

use crate::record::RecordError;
use crate::storage::StorageError;

/// Where the compressed feeds are published
pub const DATASET_URL: &str = "https://datasets.imdbws.com";

/// Why a load stopped
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error(
        "source '{name}' is unavailable: {cause} (download the feeds from https://datasets.imdbws.com)"
    )]
    SourceUnavailable {
        name: String,
        #[source]
        cause: io::Error,
    },

    #[error("source '{name}' has no header line")]
    MissingHeader { name: String },

    #[error("source '{name}' line {line}: {cause}")]
    MalformedRecord {
        name: String,
        line: u64,
        #[source]
        cause: RecordError,
    },

    #[error("table '{table}' already holds {rows} rows; recreate the store to load again")]
    StoreNotEmpty { table: &'static str, rows: u64 },

    #[error(
        "commit to '{table}' failed after {batches_committed} batches ({rows_committed} rows); \
         the store is partially loaded and must be recreated before retrying: {cause}"
    )]
    StoreWriteFailure {
        table: &'static str,
        batches_committed: u64,
        rows_committed: u64,
        #[source]
        cause: StorageError,
    },

    #[error("store error: {0}")]
    Store(#[from] StorageError),

    #[error("invalid loader configuration: {0}")]
    InvalidConfig(String),
}

impl LoaderError {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            LoaderError::SourceUnavailable { .. } | LoaderError::MissingHeader { .. } => {
                "REEL_SOURCE_UNAVAILABLE"
            }
            LoaderError::MalformedRecord { .. } => "REEL_MALFORMED_RECORD",
            LoaderError::StoreNotEmpty { .. } => "REEL_STORE_NOT_EMPTY",
            LoaderError::StoreWriteFailure { .. } => "REEL_STORE_WRITE_FAILED",
            LoaderError::Store(e) => e.code(),
            LoaderError::InvalidConfig(_) => "REEL_LOADER_CONFIG",
        }
    }

    pub(crate) fn source_unavailable(name: &str, cause: io::Error) -> Self {
        LoaderError::SourceUnavailable {
            name: name.to_string(),
            cause,
        }
    }
}

/// Result type for loader operations
pub type LoaderResult<T> = Result<T, LoaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = LoaderError::source_unavailable(
            "title.basics.tsv.gz",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.code(), "REEL_SOURCE_UNAVAILABLE");
        assert!(err.to_string().contains(DATASET_URL));

        let err = LoaderError::MalformedRecord {
            name: "title.ratings.tsv.gz".to_string(),
            line: 7,
            cause: RecordError::InvalidEncoding,
        };
        assert_eq!(err.code(), "REEL_MALFORMED_RECORD");
        assert!(err.to_string().contains("line 7"));
    }

    #[test]
    fn test_write_failure_tells_caller_to_recreate() {
        let err = LoaderError::StoreWriteFailure {
            table: "title_basics",
            batches_committed: 3,
            rows_committed: 15000,
            cause: StorageError::Poisoned,
        };
        let display = err.to_string();
        assert!(display.contains("recreated"));
        assert!(display.contains("15000"));
        assert_eq!(err.code(), "REEL_STORE_WRITE_FAILED");
    }
}
