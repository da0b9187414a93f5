//! ObservationScope for begin/complete/failed logging around one operation

use std::time::Instant;

use tracing::{error, info, warn};

use super::events::Event;

/// The operations that run inside a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Query,
}

impl Stage {
    fn begin(&self) -> Event {
        match self {
            Stage::Load => Event::LoadBegin,
            Stage::Query => Event::QueryBegin,
        }
    }

    fn complete(&self) -> Event {
        match self {
            Stage::Load => Event::LoadComplete,
            Stage::Query => Event::QueryExecuted,
        }
    }

    fn failed(&self) -> Event {
        match self {
            Stage::Load => Event::LoadFailed,
            Stage::Query => Event::QueryFailed,
        }
    }
}

/// A scope that logs the begin event on creation and exactly one closing
/// event.
///
/// # Usage
///
/// ```ignore
/// let scope = ObservationScope::new(Stage::Load, "title_basics");
/// // ... do work ...
/// scope.complete("rows=42"); // logs LOAD_COMPLETE
/// ```
///
/// - `complete()` logs the stage's completion event at INFO
/// - `fail()` logs the stage's failure event at ERROR
/// - Dropping the scope without either logs a WARN naming the stage
pub struct ObservationScope {
    stage: Stage,
    subject: String,
    started: Instant,
    closed: bool,
}

impl ObservationScope {
    /// Create a scope for `stage` acting on `subject` (a table, a store path).
    pub fn new(stage: Stage, subject: impl Into<String>) -> Self {
        let subject = subject.into();
        info!(event = stage.begin().as_str(), subject = %subject);
        Self {
            stage,
            subject,
            started: Instant::now(),
            closed: false,
        }
    }

    /// Mark the scope as successfully completed
    pub fn complete(mut self, summary: impl AsRef<str>) {
        self.closed = true;
        info!(
            event = self.stage.complete().as_str(),
            subject = %self.subject,
            elapsed_ms = self.elapsed_ms(),
            summary = summary.as_ref()
        );
    }

    /// Mark the scope as failed with a reason
    pub fn fail(mut self, reason: impl AsRef<str>) {
        self.closed = true;
        error!(
            event = self.stage.failed().as_str(),
            subject = %self.subject,
            elapsed_ms = self.elapsed_ms(),
            reason = reason.as_ref()
        );
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                event = self.stage.failed().as_str(),
                subject = %self.subject,
                reason = "scope dropped without completion"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_starts_open() {
        let scope = ObservationScope::new(Stage::Load, "title_basics");
        assert!(!scope.is_closed());
        scope.complete("rows=0");
    }

    #[test]
    fn test_stage_events() {
        assert_eq!(Stage::Load.begin(), Event::LoadBegin);
        assert_eq!(Stage::Load.failed(), Event::LoadFailed);
        assert_eq!(Stage::Query.complete(), Event::QueryExecuted);
    }

    #[test]
    fn test_scope_fail_and_drop_do_not_panic() {
        ObservationScope::new(Stage::Query, "store").fail("bad parameter");
        drop(ObservationScope::new(Stage::Query, "store"));
    }
}
