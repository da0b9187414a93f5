//! Observability for reeldb
//!
//! - Structured logging through `tracing`, one stable `event` field per line
//! - Begin/complete/failed scopes around loads and queries
//!
//! Logs go to stderr; stdout is reserved for query results and load
//! summaries.
//!
//! # Usage
//!
//! ```ignore
//! use reeldb::observability::{init_logging, Event, ObservationScope, Stage};
//!
//! init_logging();
//! tracing::info!(event = Event::StoreCreated.as_str(), "store created");
//!
//! let scope = ObservationScope::new(Stage::Load, "title_ratings");
//! // ... do work ...
//! scope.complete("rows=42");
//! ```

mod events;
mod scope;

pub use events::Event;
pub use scope::{ObservationScope, Stage};

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Install the global subscriber.
///
/// Honors `RUST_LOG`. Calling this more than once is harmless; only the
/// first call installs a subscriber.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        init_logging();
        init_logging();
    }
}
