//! Ordered copies of the joined rows
//!
//! Sealing a store writes the title/rating join once per sort key, as
//! checksummed frames in ascending key order with ties in title storage
//! order. A query then streams the copy for its key: forwards for ascending
//! results, back to front for descending ones.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use super::codec::encode_rows;
use super::errors::{StorageError, StorageResult};
use crate::record::{JoinedRecord, RowOrder, SortKey};

/// Name of the ordered copy for `key`, used in the manifest and in errors
pub fn order_label(key: SortKey) -> &'static str {
    match key {
        SortKey::Name => "order_name",
        SortKey::Year => "order_year",
        SortKey::Rating => "order_rating",
        SortKey::NumVotes => "order_num_votes",
    }
}

/// Sort key of an ordered copy label
pub fn order_key(label: &str) -> Option<SortKey> {
    SortKey::ALL.into_iter().find(|key| order_label(*key) == label)
}

/// File of the ordered copy for `key` inside the store directory
pub fn order_path(dir: &Path, key: SortKey) -> PathBuf {
    dir.join(format!("{}.dat", order_label(key)))
}

/// Encodes `rows` in ascending `key` order, at most `frame_rows` rows per
/// frame.
pub fn order_frames(
    rows: &[JoinedRecord],
    key: SortKey,
    frame_rows: usize,
) -> StorageResult<Vec<Vec<u8>>> {
    RowOrder::ascending_positions(rows, key)
        .chunks(frame_rows.max(1))
        .map(|chunk| encode_rows(chunk.iter().map(|&i| &rows[i])))
        .collect()
}

/// Turns a back-to-front read of an ascending copy into a descending order
/// whose ties keep storage order.
///
/// Rows with equal keys arrive reversed; each run of them is buffered and
/// re-emitted in the order it was written. The first error ends the
/// sequence.
pub struct StableReverse<I> {
    inner: I,
    key: SortKey,
    run: Vec<JoinedRecord>,
    next_run: Option<JoinedRecord>,
    exhausted: bool,
    done: bool,
}

impl<I> StableReverse<I>
where
    I: Iterator<Item = StorageResult<JoinedRecord>>,
{
    pub fn new(inner: I, key: SortKey) -> Self {
        Self {
            inner,
            key,
            run: Vec::new(),
            next_run: None,
            exhausted: false,
            done: false,
        }
    }

    fn fail(&mut self, err: StorageError) -> Option<StorageResult<JoinedRecord>> {
        self.run.clear();
        self.next_run = None;
        self.done = true;
        Some(Err(err))
    }
}

impl<I> Iterator for StableReverse<I>
where
    I: Iterator<Item = StorageResult<JoinedRecord>>,
{
    type Item = StorageResult<JoinedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        // `run` holds a reversed run, so popping restores storage order
        if let Some(row) = self.run.pop() {
            return Some(Ok(row));
        }

        let first = match self.next_run.take() {
            Some(row) => row,
            None if self.exhausted => {
                self.done = true;
                return None;
            }
            None => match self.inner.next() {
                Some(Ok(row)) => row,
                Some(Err(e)) => return self.fail(e),
                None => {
                    self.done = true;
                    return None;
                }
            },
        };

        self.run.push(first);
        loop {
            match self.inner.next() {
                Some(Ok(row)) => {
                    if RowOrder::compare(&self.run[0], &row, self.key) == Ordering::Equal {
                        self.run.push(row);
                    } else {
                        self.next_run = Some(row);
                        break;
                    }
                }
                Some(Err(e)) => return self.fail(e),
                None => {
                    self.exhausted = true;
                    break;
                }
            }
        }
        self.run.pop().map(Ok)
    }
}
