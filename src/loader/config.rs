//! Loader configuration and the malformed-line policy

use serde::{Deserialize, Serialize};

use super::errors::{LoaderError, LoaderResult};
use crate::record::RecordError;

/// Rows per committed batch unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Largest accepted batch; keeps every batch frame well inside its `u32`
/// length field
pub const MAX_BATCH_SIZE: usize = 1_000_000;

/// What to do with a line the decoder rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MalformedLinePolicy {
    /// Stop the load with `REEL_MALFORMED_RECORD`
    #[default]
    #[serde(rename = "abort")]
    Abort,
    /// Drop the line, count it in the report, keep going
    #[serde(rename = "skip")]
    SkipAndCount,
}

impl MalformedLinePolicy {
    /// Applies the policy to one rejected line.
    ///
    /// Returns `Ok(())` if the line should be skipped.
    pub fn handle(&self, source: &str, line: u64, cause: RecordError) -> LoaderResult<()> {
        match self {
            MalformedLinePolicy::Abort => Err(LoaderError::MalformedRecord {
                name: source.to_string(),
                line,
                cause,
            }),
            MalformedLinePolicy::SkipAndCount => Ok(()),
        }
    }
}

/// Bulk loader settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Rows per atomic commit; bounds loader memory
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub malformed_lines: MalformedLinePolicy,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            malformed_lines: MalformedLinePolicy::Abort,
        }
    }
}

impl LoaderConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_policy(mut self, policy: MalformedLinePolicy) -> Self {
        self.malformed_lines = policy;
        self
    }

    pub fn validate(&self) -> LoaderResult<()> {
        if self.batch_size == 0 {
            return Err(LoaderError::InvalidConfig(
                "batch_size must be > 0".to_string(),
            ));
        }
        if self.batch_size > MAX_BATCH_SIZE {
            return Err(LoaderError::InvalidConfig(format!(
                "batch_size must be at most {}, got {}",
                MAX_BATCH_SIZE, self.batch_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.batch_size, 5000);
        assert_eq!(config.malformed_lines, MalformedLinePolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = LoaderConfig::default().with_batch_size(0);
        assert!(matches!(config.validate(), Err(LoaderError::InvalidConfig(_))));
    }

    #[test]
    fn test_oversized_batch_rejected() {
        assert!(LoaderConfig::default()
            .with_batch_size(MAX_BATCH_SIZE)
            .validate()
            .is_ok());
        let config = LoaderConfig::default().with_batch_size(MAX_BATCH_SIZE + 1);
        assert!(matches!(config.validate(), Err(LoaderError::InvalidConfig(_))));
    }

    #[test]
    fn test_policy_from_json() {
        let config: LoaderConfig = serde_json::from_str(r#"{"malformed_lines": "skip"}"#).unwrap();
        assert_eq!(config.malformed_lines, MalformedLinePolicy::SkipAndCount);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_policy_handling() {
        let abort = MalformedLinePolicy::Abort.handle("src", 4, RecordError::InvalidEncoding);
        assert!(matches!(
            abort,
            Err(LoaderError::MalformedRecord { line: 4, .. })
        ));

        let skip = MalformedLinePolicy::SkipAndCount.handle("src", 4, RecordError::InvalidEncoding);
        assert!(skip.is_ok());
    }
}
