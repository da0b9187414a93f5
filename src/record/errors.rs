//! Decode-time error types
//!
//! Every decode failure is a `REEL_MALFORMED_RECORD`. Whether it aborts a
//! load is decided by the loader's malformed-line policy, not here.

use thiserror::Error;

/// Why a raw line could not become a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Line split into the wrong number of tab-separated fields
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    /// A present (non-sentinel) value failed type coercion
    #[error("column '{column}': cannot parse {value:?} as {kind}")]
    InvalidValue {
        column: &'static str,
        value: String,
        kind: &'static str,
    },

    /// A column that must always carry a value was absent or empty
    #[error("column '{column}' is required but absent")]
    MissingValue { column: &'static str },

    /// Raw bytes were not UTF-8
    #[error("line is not valid UTF-8")]
    InvalidEncoding,
}

impl RecordError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        "REEL_MALFORMED_RECORD"
    }

    pub(crate) fn invalid(column: &'static str, value: &str, kind: &'static str) -> Self {
        RecordError::InvalidValue {
            column,
            value: value.to_string(),
            kind,
        }
    }
}

/// Result type for decode operations
pub type RecordResult<T> = Result<T, RecordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_variant_is_malformed_record() {
        let errors = [
            RecordError::FieldCount {
                expected: 9,
                found: 3,
            },
            RecordError::invalid("startYear", "19x5", "integer"),
            RecordError::MissingValue { column: "tconst" },
            RecordError::InvalidEncoding,
        ];
        for err in &errors {
            assert_eq!(err.code(), "REEL_MALFORMED_RECORD");
        }
    }

    #[test]
    fn test_display_names_column() {
        let err = RecordError::invalid("numVotes", "many", "integer");
        let display = err.to_string();
        assert!(display.contains("numVotes"));
        assert!(display.contains("\"many\""));
    }
}
