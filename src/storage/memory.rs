//! In-memory store
//!
//! Holds the same checksummed frames a [`FileStore`](super::FileStore) writes,
//! just in `Vec`s. Used by tests and by callers that want to load and query
//! without touching disk. Commits can be made to fail on demand.

use std::collections::BTreeMap;
use std::io;

use super::codec::{decode_frame, encode_frame, RowCodec, StoredRow};
use super::errors::{StorageError, StorageResult};
use super::order::{order_frames, order_label, StableReverse};
use super::store::{join_rows, RowIter, TableStore};
use crate::record::{JoinedRecord, SortDirection, SortKey, Table};

#[derive(Debug, Default)]
struct MemoryTable {
    frames: Vec<Vec<u8>>,
    rows: u64,
}

/// Decodes frames one at a time, stopping at the first bad one.
struct MemoryFrames<'a, R, F> {
    frames: F,
    label: &'static str,
    offset: u64,
    current: std::vec::IntoIter<R>,
    reversed: bool,
    done: bool,
    _frames: std::marker::PhantomData<&'a ()>,
}

impl<'a, R, F> MemoryFrames<'a, R, F>
where
    R: RowCodec,
    F: Iterator<Item = &'a Vec<u8>>,
{
    fn new(frames: F, label: &'static str, reversed: bool) -> Self {
        Self {
            frames,
            label,
            offset: 0,
            current: Vec::new().into_iter(),
            reversed,
            done: false,
            _frames: std::marker::PhantomData,
        }
    }
}

impl<'a, R, F> Iterator for MemoryFrames<'a, R, F>
where
    R: RowCodec,
    F: Iterator<Item = &'a Vec<u8>>,
{
    type Item = StorageResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = if self.reversed {
                self.current.next_back()
            } else {
                self.current.next()
            };
            if let Some(row) = row {
                return Some(Ok(row));
            }
            if self.done {
                return None;
            }
            let Some(frame) = self.frames.next() else {
                self.done = true;
                return None;
            };
            let frame_offset = self.offset;
            self.offset += frame.len() as u64;
            match decode_frame::<R>(frame, self.label, frame_offset) {
                Ok(rows) => self.current = rows.into_iter(),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Store that keeps every table in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<Table, MemoryTable>,
    orders: BTreeMap<SortKey, Vec<Vec<u8>>>,
    commits: usize,
    fail_at_commit: Option<usize>,
    poisoned: bool,
    sealed: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `n`-th `insert_batch` call (1-based, across tables) fail.
    pub fn fail_at_commit(mut self, n: usize) -> Self {
        self.fail_at_commit = Some(n);
        self
    }

    /// Number of successful commits so far
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Number of committed batches in a table
    pub fn batch_count(&self, table: Table) -> usize {
        self.tables.get(&table).map_or(0, |t| t.frames.len())
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.poisoned {
            return Err(StorageError::Poisoned);
        }
        if self.sealed {
            return Err(StorageError::Sealed);
        }
        Ok(())
    }
}

impl TableStore for MemoryStore {
    fn create_table(&mut self, table: Table) -> StorageResult<()> {
        self.check_writable()?;
        if self.tables.contains_key(&table) {
            return Err(StorageError::TableExists(table.name()));
        }
        self.tables.insert(table, MemoryTable::default());
        Ok(())
    }

    fn has_table(&self, table: Table) -> bool {
        self.tables.contains_key(&table)
    }

    fn insert_batch<R: StoredRow>(&mut self, rows: &[R]) -> StorageResult<()> {
        self.check_writable()?;
        if !self.tables.contains_key(&R::TABLE) {
            return Err(StorageError::UnknownTable(R::TABLE.name()));
        }

        let attempt = self.commits + 1;
        if self.fail_at_commit == Some(attempt) {
            self.poisoned = true;
            return Err(StorageError::write_failed(
                format!("injected failure at commit {}", attempt),
                io::Error::other("injected"),
            ));
        }

        let frame = encode_frame(rows)?;
        let table = self
            .tables
            .get_mut(&R::TABLE)
            .ok_or(StorageError::UnknownTable(R::TABLE.name()))?;
        table.frames.push(frame);
        table.rows += rows.len() as u64;
        self.commits = attempt;
        Ok(())
    }

    fn row_count(&self, table: Table) -> StorageResult<u64> {
        self.tables
            .get(&table)
            .map(|t| t.rows)
            .ok_or(StorageError::UnknownTable(table.name()))
    }

    fn scan<R: StoredRow + 'static>(&self) -> StorageResult<RowIter<'_, R>> {
        let table = self
            .tables
            .get(&R::TABLE)
            .ok_or(StorageError::UnknownTable(R::TABLE.name()))?;

        Ok(Box::new(MemoryFrames::<R, _>::new(
            table.frames.iter(),
            R::TABLE.name(),
            false,
        )))
    }

    fn seal(&mut self, frame_rows: usize) -> StorageResult<u64> {
        self.check_writable()?;

        let rows = join_rows(&*self)?;
        let mut orders = BTreeMap::new();
        for key in SortKey::ALL {
            orders.insert(key, order_frames(&rows, key, frame_rows)?);
        }
        self.orders = orders;
        self.sealed = true;
        Ok(rows.len() as u64)
    }

    fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn scan_ordered(
        &self,
        key: SortKey,
        direction: SortDirection,
    ) -> StorageResult<RowIter<'_, JoinedRecord>> {
        if self.poisoned {
            return Err(StorageError::Poisoned);
        }
        let frames = match self.orders.get(&key) {
            Some(frames) if self.sealed => frames,
            _ => return Err(StorageError::NotSealed),
        };

        let label = order_label(key);
        let rows: RowIter<'_, JoinedRecord> = match direction {
            SortDirection::Asc => Box::new(MemoryFrames::<JoinedRecord, _>::new(
                frames.iter(),
                label,
                false,
            )),
            SortDirection::Desc => Box::new(StableReverse::new(
                MemoryFrames::<JoinedRecord, _>::new(frames.iter().rev(), label, true),
                key,
            )),
        };
        Ok(rows)
    }
}
