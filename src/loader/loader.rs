//! Bulk loader
//!
//! Load flow for one table:
//! 1. Create the table if needed; refuse a table that already holds rows
//! 2. Skip the header line
//! 3. Decode each line, applying the malformed-line policy on failure
//! 4. Commit every full batch, in source order, as one atomic insert
//! 5. Commit the trailing partial batch
//!
//! Memory is bounded by one batch of decoded records plus one line. After
//! both tables load, the store is sealed; a store whose load stopped part
//! way stays unsealed and cannot be queried.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::batching::RecordBatch;
use super::config::LoaderConfig;
use super::errors::{LoaderError, LoaderResult};
use super::source::DatasetSource;
use crate::observability::{Event, ObservationScope, Stage};
use crate::record::{RatingRecord, Record, RecordError, RecordResult, Table, TitleRecord};
use crate::storage::{StoredRow, TableStore};

/// Outcome of loading one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub table: &'static str,
    /// Data lines read, header excluded
    pub lines_read: u64,
    pub rows_loaded: u64,
    /// Lines dropped under the skip policy
    pub lines_skipped: u64,
    pub batches_committed: u64,
}

impl LoadReport {
    fn new(table: &'static str) -> Self {
        Self {
            table,
            lines_read: 0,
            rows_loaded: 0,
            lines_skipped: 0,
            batches_committed: 0,
        }
    }
}

/// Outcome of loading both tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetReport {
    pub titles: LoadReport,
    pub ratings: LoadReport,
    /// Rows in the title/rating join written out on seal
    pub joined_rows: u64,
}

/// Streams a feed into one table in batched commits.
#[derive(Debug, Clone)]
pub struct BulkLoader {
    config: LoaderConfig,
}

impl BulkLoader {
    pub fn new(config: LoaderConfig) -> LoaderResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Loads every data line of `source` into `R::TABLE`.
    ///
    /// # Errors
    ///
    /// - `StoreNotEmpty` if the table already has rows (nothing is read)
    /// - `SourceUnavailable` / `MissingHeader` if the stream cannot be read
    /// - `MalformedRecord` under the abort policy
    /// - `StoreWriteFailure` if a commit fails; earlier batches stay committed
    pub fn load<R, S, Src>(&self, store: &mut S, source: DatasetSource<Src>) -> LoaderResult<LoadReport>
    where
        R: StoredRow,
        S: TableStore,
        Src: Read,
    {
        let scope = ObservationScope::new(Stage::Load, R::TABLE.name());
        match self.load_table::<R, S, Src>(store, source) {
            Ok(report) => {
                scope.complete(format!(
                    "rows={} skipped={} batches={}",
                    report.rows_loaded, report.lines_skipped, report.batches_committed
                ));
                Ok(report)
            }
            Err(e) => {
                scope.fail(format!("{}: {}", e.code(), e));
                Err(e)
            }
        }
    }

    fn load_table<R, S, Src>(&self, store: &mut S, mut source: DatasetSource<Src>) -> LoaderResult<LoadReport>
    where
        R: StoredRow,
        S: TableStore,
        Src: Read,
    {
        let table = R::TABLE;
        let source_name = source.name().to_string();

        if !store.has_table(table) {
            store.create_table(table)?;
        }
        let existing = store.row_count(table)?;
        if existing > 0 {
            return Err(LoaderError::StoreNotEmpty {
                table: table.name(),
                rows: existing,
            });
        }

        source.skip_header()?;

        let mut report = LoadReport::new(table.name());
        let mut batch = RecordBatch::new(self.config.batch_size);

        for line in source.by_ref() {
            let line = line?;
            report.lines_read += 1;

            match decode_line::<R>(&line.bytes) {
                Ok(record) => {
                    batch.push(record, line.number);
                    if batch.is_full() {
                        Self::commit(store, &mut batch, &mut report)?;
                    }
                }
                Err(cause) => {
                    let reason = cause.to_string();
                    self.config
                        .malformed_lines
                        .handle(&source_name, line.number, cause)?;
                    report.lines_skipped += 1;
                    warn!(
                        event = Event::LineSkipped.as_str(),
                        source = %source_name,
                        line = line.number,
                        reason = %reason,
                        "malformed line skipped"
                    );
                }
            }
        }

        if !batch.is_empty() {
            Self::commit(store, &mut batch, &mut report)?;
        }
        Ok(report)
    }

    fn commit<R, S>(
        store: &mut S,
        batch: &mut RecordBatch<R>,
        report: &mut LoadReport,
    ) -> LoaderResult<()>
    where
        R: StoredRow,
        S: TableStore,
    {
        store
            .insert_batch(batch.records())
            .map_err(|cause| LoaderError::StoreWriteFailure {
                table: R::TABLE.name(),
                batches_committed: report.batches_committed,
                rows_committed: report.rows_loaded,
                cause,
            })?;

        report.batches_committed += 1;
        report.rows_loaded += batch.len() as u64;

        if let Some((first, last)) = batch.line_range() {
            debug!(
                event = Event::BatchCommitted.as_str(),
                table = R::TABLE.name(),
                rows = batch.len(),
                first_line = first,
                last_line = last,
                "batch committed"
            );
        }
        batch.clear();
        Ok(())
    }

    /// Loads titles, then ratings, from already-open sources, then seals the
    /// store.
    ///
    /// Any failure leaves the store unsealed.
    pub fn load_sources<S, A, B>(
        &self,
        store: &mut S,
        titles: DatasetSource<A>,
        ratings: DatasetSource<B>,
    ) -> LoaderResult<DatasetReport>
    where
        S: TableStore,
        A: Read,
        B: Read,
    {
        for table in Table::ALL {
            if !store.has_table(table) {
                store.create_table(table)?;
            }
        }
        let titles = self.load::<TitleRecord, _, _>(store, titles)?;
        let ratings = self.load::<RatingRecord, _, _>(store, ratings)?;

        let joined_rows = store.seal(self.config.batch_size)?;
        info!(
            event = Event::StoreSealed.as_str(),
            joined_rows,
            "store sealed"
        );
        Ok(DatasetReport {
            titles,
            ratings,
            joined_rows,
        })
    }
}

/// Loads both feed files into `store`.
///
/// Both files are opened and their headers decompressed before the store is
/// touched, so a missing or non-gzip file leaves the store exactly as it was.
pub fn load_dataset<S: TableStore>(
    store: &mut S,
    basics_path: &Path,
    ratings_path: &Path,
    config: &LoaderConfig,
) -> LoaderResult<DatasetReport> {
    let loader = BulkLoader::new(config.clone())?;
    let (titles, ratings) = open_sources(basics_path, ratings_path)?;
    loader.load_sources(store, titles, ratings)
}

/// Opens both feeds and reads past their header lines.
pub fn open_sources(
    basics_path: &Path,
    ratings_path: &Path,
) -> LoaderResult<(DatasetSource<File>, DatasetSource<File>)> {
    let mut titles = DatasetSource::open(basics_path)?;
    let mut ratings = DatasetSource::open(ratings_path)?;
    titles.skip_header()?;
    ratings.skip_header()?;
    Ok((titles, ratings))
}

fn decode_line<R: Record>(bytes: &[u8]) -> RecordResult<R> {
    let line = std::str::from_utf8(bytes).map_err(|_| RecordError::InvalidEncoding)?;
    R::decode(line)
}
