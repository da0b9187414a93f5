//! Observable events
//!
//! Every log line carries one of these as its `event` field, so runs can be
//! grepped and compared without parsing messages.

use std::fmt;

/// Observable events in reeldb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Store lifecycle
    /// Empty store created
    StoreCreated,
    /// Existing store removed before creating a new one
    StoreRecreated,
    /// Load complete, ordered copies written, store queryable
    StoreSealed,

    // Loading
    /// Table load started
    LoadBegin,
    /// One batch committed
    BatchCommitted,
    /// Malformed line dropped under the skip policy
    LineSkipped,
    /// Table load finished
    LoadComplete,
    /// Table load aborted
    LoadFailed,

    // Querying
    /// Query accepted, scan starting
    QueryBegin,
    /// Query result sequence finished
    QueryExecuted,
    /// Query failed during the scan
    QueryFailed,
    /// Parameters rejected before any scan
    QueryRejected,
}

impl Event {
    /// Returns the event name as logged
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StoreCreated => "STORE_CREATED",
            Event::StoreRecreated => "STORE_RECREATED",
            Event::StoreSealed => "STORE_SEALED",

            Event::LoadBegin => "LOAD_BEGIN",
            Event::BatchCommitted => "BATCH_COMMITTED",
            Event::LineSkipped => "LINE_SKIPPED",
            Event::LoadComplete => "LOAD_COMPLETE",
            Event::LoadFailed => "LOAD_FAILED",

            Event::QueryBegin => "QUERY_BEGIN",
            Event::QueryExecuted => "QUERY_EXECUTED",
            Event::QueryFailed => "QUERY_FAILED",
            Event::QueryRejected => "QUERY_REJECTED",
        }
    }

    /// Returns true if this event marks an aborted operation
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::LoadFailed | Event::QueryFailed | Event::QueryRejected
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::LoadBegin.as_str(), "LOAD_BEGIN");
        assert_eq!(Event::BatchCommitted.to_string(), "BATCH_COMMITTED");
        assert_eq!(Event::QueryRejected.as_str(), "QUERY_REJECTED");
        assert_eq!(Event::StoreSealed.as_str(), "STORE_SEALED");
    }

    #[test]
    fn test_failure_events() {
        assert!(Event::LoadFailed.is_failure());
        assert!(Event::QueryRejected.is_failure());
        assert!(!Event::LoadComplete.is_failure());
        assert!(!Event::LineSkipped.is_failure());
    }
}
