//! CLI module for reeldb
//!
//! Provides command-line interface for:
//! - load: Build a store from the two compressed feeds
//! - find: Filter, sort and print titles from a store

mod args;
mod commands;
mod config;
mod errors;
mod output;

pub use args::{Cli, Command, FindArgs, LoadArgs, OrderBy, OutputFormat, StoreArgs};
pub use commands::{find, load, run, run_command, LoadSummary};
pub use config::Config;
pub use errors::{CliError, CliResult};
pub use output::{title_link, truncate, with_thousands, write_json_lines, write_table};
