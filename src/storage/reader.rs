//! Frame file reader
//!
//! - Reads frames in commit order, never past the committed length
//! - Verifies every frame checksum before decoding rows
//! - Any mismatch is `REEL_DATA_CORRUPTION` and ends the scan
//! - Ordered copies can also be read back to front, one frame at a time

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::codec::{decode_frame, frame_length, RowCodec, FRAME_OVERHEAD};
use super::errors::{StorageError, StorageResult};
use super::writer::table_path;
use crate::record::Table;

/// Frame-at-a-time reader over one frame file.
pub struct TableReader {
    label: &'static str,
    reader: BufReader<File>,
    current_offset: u64,
    committed_bytes: u64,
}

impl TableReader {
    /// Opens `<dir>/<table>.dat` for reading up to `committed_bytes`.
    pub fn open(dir: &Path, table: Table, committed_bytes: u64) -> StorageResult<Self> {
        Self::open_file(table_path(dir, table), table.name(), committed_bytes)
    }

    /// Opens any frame file; `label` names it in errors.
    pub fn open_file(
        path: PathBuf,
        label: &'static str,
        committed_bytes: u64,
    ) -> StorageResult<Self> {
        let file = File::open(&path).map_err(|e| {
            StorageError::read_failed(format!("failed to open {}", path.display()), e)
        })?;

        let file_size = file
            .metadata()
            .map_err(|e| StorageError::read_failed("failed to read table metadata", e))?
            .len();

        if file_size < committed_bytes {
            return Err(StorageError::corruption_at_offset(
                label,
                file_size,
                format!(
                    "table file is {} bytes but {} bytes are committed",
                    file_size, committed_bytes
                ),
            ));
        }

        Ok(Self {
            label,
            reader: BufReader::new(file),
            current_offset: 0,
            committed_bytes,
        })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Returns whether committed frames remain.
    pub fn has_more(&self) -> bool {
        self.current_offset < self.committed_bytes
    }

    /// Reads and decodes the next frame.
    ///
    /// - `Ok(Some(rows))` for a valid frame
    /// - `Ok(None)` at the end of committed data
    /// - `Err(REEL_DATA_CORRUPTION)` on any framing or checksum failure
    pub fn read_frame<R: RowCodec>(&mut self) -> StorageResult<Option<Vec<R>>> {
        if !self.has_more() {
            return Ok(None);
        }

        let label = self.label;
        let remaining = self.committed_bytes - self.current_offset;

        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf).map_err(|e| {
            StorageError::corruption_at_offset(
                label,
                self.current_offset,
                format!("failed to read frame length: {}", e),
            )
        })?;
        let length = frame_length(&len_buf);

        if length < FRAME_OVERHEAD || length as u64 > remaining {
            return Err(StorageError::corruption_at_offset(
                label,
                self.current_offset,
                format!(
                    "invalid frame length {} with {} committed bytes remaining",
                    length, remaining
                ),
            ));
        }

        let mut frame = vec![0u8; length];
        frame[0..4].copy_from_slice(&len_buf);
        self.reader.read_exact(&mut frame[4..]).map_err(|e| {
            StorageError::corruption_at_offset(
                label,
                self.current_offset,
                format!("failed to read frame body: {}", e),
            )
        })?;

        let rows = decode_frame::<R>(&frame, label, self.current_offset)?;
        self.current_offset += length as u64;
        Ok(Some(rows))
    }

    /// Reads and decodes the frame starting at `offset`.
    ///
    /// The next sequential read continues after that frame.
    pub fn read_frame_at<R: RowCodec>(&mut self, offset: u64) -> StorageResult<Vec<R>> {
        if offset >= self.committed_bytes {
            return Err(StorageError::corruption_at_offset(
                self.label,
                offset,
                format!(
                    "frame offset past {} committed bytes",
                    self.committed_bytes
                ),
            ));
        }
        self.reader.seek(SeekFrom::Start(offset)).map_err(|e| {
            StorageError::read_failed(format!("failed to seek {} to {}", self.label, offset), e)
        })?;
        self.current_offset = offset;
        match self.read_frame::<R>()? {
            Some(rows) => Ok(rows),
            None => Err(StorageError::corruption_at_offset(
                self.label,
                offset,
                "no frame at recorded offset",
            )),
        }
    }
}

/// Lazy row iterator over a frame file, one frame in memory at a time.
pub struct FrameRows<R: RowCodec> {
    reader: TableReader,
    current: std::vec::IntoIter<R>,
    done: bool,
}

impl<R: RowCodec> FrameRows<R> {
    pub fn new(reader: TableReader) -> Self {
        Self {
            reader,
            current: Vec::new().into_iter(),
            done: false,
        }
    }
}

impl<R: RowCodec> Iterator for FrameRows<R> {
    type Item = StorageResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.current.next() {
                return Some(Ok(row));
            }
            if self.done {
                return None;
            }
            match self.reader.read_frame::<R>() {
                Ok(Some(rows)) => self.current = rows.into_iter(),
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Back-to-front row iterator: frames in reverse commit order, rows within
/// a frame reversed.
///
/// `frame_offsets` lists the start of every committed frame in commit order.
pub struct ReverseFrameRows<R: RowCodec> {
    reader: TableReader,
    frame_offsets: Vec<u64>,
    current: std::iter::Rev<std::vec::IntoIter<R>>,
    done: bool,
}

impl<R: RowCodec> ReverseFrameRows<R> {
    pub fn new(reader: TableReader, frame_offsets: Vec<u64>) -> Self {
        Self {
            reader,
            frame_offsets,
            current: Vec::new().into_iter().rev(),
            done: false,
        }
    }
}

impl<R: RowCodec> Iterator for ReverseFrameRows<R> {
    type Item = StorageResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.current.next() {
                return Some(Ok(row));
            }
            if self.done {
                return None;
            }
            let Some(offset) = self.frame_offsets.pop() else {
                self.done = true;
                return None;
            };
            match self.reader.read_frame_at::<R>(offset) {
                Ok(rows) => self.current = rows.into_iter().rev(),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
