//! Query error types
//!
//! Error codes:
//! - REEL_INVALID_QUERY_PARAMETER (ERROR) - rejected before any scan
//! - storage codes pass through unchanged; corruption stays FATAL

use thiserror::Error;

use crate::storage::{Severity, StorageError};

/// Why a query produced no results
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid query parameter '{parameter}': {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },

    #[error("query scan failed: {0}")]
    Store(#[from] StorageError),
}

impl QueryError {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::InvalidParameter { .. } => "REEL_INVALID_QUERY_PARAMETER",
            QueryError::Store(e) => e.code(),
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            QueryError::InvalidParameter { .. } => Severity::Error,
            QueryError::Store(e) => e.severity(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    pub(crate) fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        QueryError::InvalidParameter {
            parameter,
            reason: reason.into(),
        }
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter() {
        let err = QueryError::invalid("order_by", "unknown sort key 'votes'");
        assert_eq!(err.code(), "REEL_INVALID_QUERY_PARAMETER");
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("order_by"));
    }

    #[test]
    fn test_corruption_stays_fatal() {
        let err: QueryError =
            StorageError::corruption_at_offset("title_basics", 64, "checksum mismatch").into();
        assert_eq!(err.code(), "REEL_DATA_CORRUPTION");
        assert!(err.is_fatal());
    }
}
