//! Table writer with one fsync per batch
//!
//! - A batch is written as one frame with a single `write_all`, then synced
//! - Bytes past the last committed frame are never trusted; opening a writer
//!   truncates them away
//! - A failed write rolls the file back to the last committed offset

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::errors::{StorageError, StorageResult};
use crate::record::Table;

/// File name of a table inside the store directory
pub fn table_path(dir: &Path, table: Table) -> PathBuf {
    dir.join(format!("{}.dat", table.name()))
}

/// Append-only writer for one frame file.
pub struct TableWriter {
    label: &'static str,
    path: PathBuf,
    file: File,
    committed_offset: u64,
}

impl TableWriter {
    /// Opens (or creates) the table file positioned at `committed_offset`.
    ///
    /// Any bytes after `committed_offset` belong to an incomplete commit and
    /// are discarded.
    pub fn open(dir: &Path, table: Table, committed_offset: u64) -> StorageResult<Self> {
        Self::open_file(table_path(dir, table), table.name(), committed_offset)
    }

    /// Opens (or creates) any frame file; `label` names it in errors and logs.
    pub fn open_file(
        path: PathBuf,
        label: &'static str,
        committed_offset: u64,
    ) -> StorageResult<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                StorageError::write_failed(format!("failed to open {}", path.display()), e)
            })?;

        let len = file
            .metadata()
            .map_err(|e| StorageError::write_failed("failed to read table metadata", e))?
            .len();

        if len < committed_offset {
            return Err(StorageError::corruption_at_offset(
                label,
                len,
                format!(
                    "table file is {} bytes but {} bytes are committed",
                    len, committed_offset
                ),
            ));
        }
        if len > committed_offset {
            warn!(
                table = label,
                discarded = len - committed_offset,
                "discarding uncommitted tail"
            );
            file.set_len(committed_offset)
                .map_err(|e| StorageError::write_failed("failed to truncate table file", e))?;
        }

        file.seek(SeekFrom::Start(committed_offset))
            .map_err(|e| StorageError::write_failed("failed to seek table file", e))?;

        Ok(Self {
            label,
            path,
            file,
            committed_offset,
        })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Offset just past the last durable frame
    pub fn committed_offset(&self) -> u64 {
        self.committed_offset
    }

    /// Writes one frame and syncs it.
    ///
    /// Returns the offset the frame starts at. On failure the file is rolled
    /// back to the previous committed offset before the error is returned.
    pub fn append_frame(&mut self, frame: &[u8]) -> StorageResult<u64> {
        let offset = self.committed_offset;

        let result = self
            .file
            .write_all(frame)
            .and_then(|_| self.file.sync_data());

        if let Err(e) = result {
            self.rollback();
            return Err(StorageError::write_failed(
                format!(
                    "failed to commit {} byte batch to {}",
                    frame.len(),
                    self.label
                ),
                e,
            ));
        }

        self.committed_offset += frame.len() as u64;
        Ok(offset)
    }

    fn rollback(&mut self) {
        let restored = self
            .file
            .set_len(self.committed_offset)
            .and_then(|_| self.file.seek(SeekFrom::Start(self.committed_offset)));
        if let Err(e) = restored {
            warn!(
                table = self.label,
                error = %e,
                "rollback after failed commit did not complete"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_writer_creates_table_file() {
        let dir = TempDir::new().unwrap();
        let writer = TableWriter::open(dir.path(), Table::TitleBasics, 0).unwrap();
        assert!(writer.path().exists());
        assert_eq!(writer.path(), dir.path().join("title_basics.dat"));
        assert_eq!(writer.committed_offset(), 0);
    }

    #[test]
    fn test_offset_tracking() {
        let dir = TempDir::new().unwrap();
        let mut writer = TableWriter::open(dir.path(), Table::TitleRatings, 0).unwrap();

        let first = writer.append_frame(b"0123456789").unwrap();
        let second = writer.append_frame(b"abc").unwrap();

        assert_eq!(first, 0);
        assert_eq!(second, 10);
        assert_eq!(writer.committed_offset(), 13);
    }

    #[test]
    fn test_reopen_discards_uncommitted_tail() {
        let dir = TempDir::new().unwrap();
        {
            let mut writer = TableWriter::open(dir.path(), Table::TitleBasics, 0).unwrap();
            writer.append_frame(b"committed").unwrap();
            writer.append_frame(b"torn").unwrap();
        }

        let writer = TableWriter::open(dir.path(), Table::TitleBasics, 9).unwrap();
        assert_eq!(writer.committed_offset(), 9);
        assert_eq!(fs::read(writer.path()).unwrap(), b"committed");
    }

    #[test]
    fn test_short_file_is_corruption() {
        let dir = TempDir::new().unwrap();
        {
            TableWriter::open(dir.path(), Table::TitleBasics, 0).unwrap();
        }
        let err = match TableWriter::open(dir.path(), Table::TitleBasics, 100) {
            Err(e) => e,
            Ok(_) => panic!("expected corruption"),
        };
        assert!(err.is_fatal());
    }
}
