//! Configuration file
//!
//! ```json
//! {
//!   "store_dir": "./imdb.store",
//!   "basics_path": "title.basics.tsv.gz",
//!   "ratings_path": "title.ratings.tsv.gz",
//!   "batch_size": 5000,
//!   "malformed_lines": "abort"
//! }
//! ```
//!
//! Every field is optional. Command-line flags override file values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{CliError, CliResult};
use crate::loader::{LoaderConfig, MalformedLinePolicy, DEFAULT_BATCH_SIZE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    #[serde(default = "default_basics_path")]
    pub basics_path: PathBuf,

    #[serde(default = "default_ratings_path")]
    pub ratings_path: PathBuf,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub malformed_lines: MalformedLinePolicy,
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("./imdb.store")
}
fn default_basics_path() -> PathBuf {
    PathBuf::from("title.basics.tsv.gz")
}
fn default_ratings_path() -> PathBuf {
    PathBuf::from("title.ratings.tsv.gz")
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            basics_path: default_basics_path(),
            ratings_path: default_ratings_path(),
            batch_size: DEFAULT_BATCH_SIZE,
            malformed_lines: MalformedLinePolicy::Abort,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::Config(format!("invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// The file at `path` if given, otherwise the defaults
    pub fn resolve(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.store_dir.as_os_str().is_empty() {
            return Err(CliError::Config("store_dir must not be empty".to_string()));
        }
        self.loader_config()
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig::default()
            .with_batch_size(self.batch_size)
            .with_policy(self.malformed_lines)
    }
}
