//! CLI error types
//!
//! Every CLI error ends the process with status 1. The message names the
//! stage that failed; the code is printed alongside it.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::loader::LoaderError;
use crate::query::QueryError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("config: {0}")]
    Config(String),

    #[error("load: {0}")]
    Load(#[from] LoaderError),

    #[error("find: {0}")]
    Query(#[from] QueryError),

    #[error("store: {0}")]
    Store(#[from] StorageError),

    #[error("load: store {} already exists; pass --recreate to replace it", .0.display())]
    StoreExists(PathBuf),

    #[error("output: {0}")]
    Io(#[from] io::Error),

    #[error("output: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) => "REEL_CLI_CONFIG",
            CliError::Load(e) => e.code(),
            CliError::Query(e) => e.code(),
            CliError::Store(e) => e.code(),
            CliError::StoreExists(_) => "REEL_STORE_EXISTS",
            CliError::Io(_) | CliError::Json(_) => "REEL_CLI_IO",
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_pass_through() {
        let err: CliError = QueryError::InvalidParameter {
            parameter: "rating",
            reason: "11 is outside 0.0..=10.0".to_string(),
        }
        .into();
        assert_eq!(err.code(), "REEL_INVALID_QUERY_PARAMETER");
        assert!(err.to_string().starts_with("find:"));
    }

    #[test]
    fn test_store_exists_hint() {
        let err = CliError::StoreExists(PathBuf::from("/data/imdb.store"));
        assert!(err.to_string().contains("--recreate"));
        assert_eq!(err.code(), "REEL_STORE_EXISTS");
    }
}
