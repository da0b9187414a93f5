//! CLI command implementations
//!
//! `load` opens both feeds and reads their headers before touching the
//! store, so a missing or non-gzip file never leaves an empty store behind.
//! `find` opens an existing store and refuses one whose load did not run to
//! completion.

use std::io::{self, Write};
use std::path::PathBuf;

use serde::Serialize;

use crate::loader::{open_sources, BulkLoader, DatasetReport, MalformedLinePolicy};
use crate::query::QueryEngine;
use crate::storage::{FileStore, StorageError};

use super::args::{Cli, Command, FindArgs, LoadArgs, OutputFormat, StoreArgs};
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::output::{write_json_lines, write_table};

/// Printed by `load` on success
#[derive(Debug, Serialize)]
pub struct LoadSummary {
    pub store: PathBuf,
    #[serde(flatten)]
    pub report: DatasetReport,
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cmd {
        Command::Load(args) => load(&args, &mut out).map(|_| ()),
        Command::Find(args) => find(&args, &mut out).map(|_| ()),
    }
}

fn resolve_config(common: &StoreArgs) -> CliResult<Config> {
    let mut config = Config::resolve(common.config.as_deref())?;
    if let Some(store) = &common.store {
        config.store_dir = store.clone();
    }
    Ok(config)
}

/// Loads both feeds into a new store and prints a JSON summary.
pub fn load<W: Write>(args: &LoadArgs, out: &mut W) -> CliResult<LoadSummary> {
    let mut config = resolve_config(&args.common)?;
    if let Some(path) = &args.basics {
        config.basics_path = path.clone();
    }
    if let Some(path) = &args.ratings {
        config.ratings_path = path.clone();
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if args.skip_malformed {
        config.malformed_lines = MalformedLinePolicy::SkipAndCount;
    }
    config.validate()?;

    let loader = BulkLoader::new(config.loader_config())?;
    let (titles, ratings) = open_sources(&config.basics_path, &config.ratings_path)?;

    let mut store = if args.recreate {
        FileStore::recreate(&config.store_dir)?
    } else if FileStore::exists(&config.store_dir) {
        return Err(CliError::StoreExists(config.store_dir));
    } else {
        FileStore::create(&config.store_dir)?
    };

    let report = loader.load_sources(&mut store, titles, ratings)?;
    let summary = LoadSummary {
        store: config.store_dir,
        report,
    };
    serde_json::to_writer_pretty(&mut *out, &summary)?;
    writeln!(out)?;
    out.flush()?;
    Ok(summary)
}

/// Runs one query and prints the results. Returns the result count.
pub fn find<W: Write>(args: &FindArgs, out: &mut W) -> CliResult<usize> {
    let config = resolve_config(&args.common)?;
    let params = args.to_params();

    let store = FileStore::open(&config.store_dir)?;
    if store.is_poisoned() {
        return Err(StorageError::Poisoned.into());
    }
    if !store.is_sealed() {
        return Err(StorageError::NotSealed.into());
    }

    let results = QueryEngine::new(&store).execute(&params)?;
    match args.format {
        OutputFormat::Table => write_table(out, results),
        OutputFormat::Json => write_json_lines(out, results),
    }
}
