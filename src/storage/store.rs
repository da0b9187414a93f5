//! The store interface the loader and query engine depend on
//!
//! Three primitives: create a table, insert a batch atomically, scan a table
//! lazily. The fixed inner join of titles and ratings is built on the scan
//! primitive, so every store gets the same join semantics. Sealing finishes
//! a load by writing the join once per sort key; ordered reads come from
//! those copies.

use std::collections::{HashMap, VecDeque};

use super::codec::StoredRow;
use super::errors::StorageResult;
use crate::record::{
    JoinedRecord, RatingRecord, Record, SortDirection, SortKey, Table, TitleRecord,
};

/// Lazy, fallible row sequence
pub type RowIter<'a, R> = Box<dyn Iterator<Item = StorageResult<R>> + 'a>;

/// Row storage for the two title tables.
pub trait TableStore {
    /// Creates an empty table. Fails if it already exists or the store is
    /// sealed.
    fn create_table(&mut self, table: Table) -> StorageResult<()>;

    /// Returns whether the table has been created.
    fn has_table(&self, table: Table) -> bool;

    /// Appends `rows` to `R::TABLE` as one atomic commit.
    ///
    /// Either every row becomes visible to later scans or none does. A sealed
    /// store accepts no more rows.
    fn insert_batch<R: StoredRow>(&mut self, rows: &[R]) -> StorageResult<()>;

    /// Number of committed rows in a table.
    fn row_count(&self, table: Table) -> StorageResult<u64>;

    /// Scans every committed row of `R::TABLE` in commit order.
    fn scan<R: StoredRow + 'static>(&self) -> StorageResult<RowIter<'_, R>>;

    /// Marks the load complete.
    ///
    /// Joins both tables, writes one ordered copy per [`SortKey`] in frames of
    /// at most `frame_rows` rows, and only then records the store as sealed.
    /// Returns the number of joined rows. A failure leaves the store unsealed.
    fn seal(&mut self, frame_rows: usize) -> StorageResult<u64>;

    /// Returns whether [`seal`](Self::seal) completed.
    fn is_sealed(&self) -> bool;

    /// Streams the joined rows ordered by `key`.
    ///
    /// Ties keep title storage order in both directions. Rows are read a frame
    /// at a time, so dropping the iterator early stops all further I/O.
    fn scan_ordered(
        &self,
        key: SortKey,
        direction: SortDirection,
    ) -> StorageResult<RowIter<'_, JoinedRecord>>;

    /// Inner join of titles and ratings on `id`.
    ///
    /// Ratings are read fully into a hash table (they are the smaller side);
    /// titles stream through in storage order. Titles without a rating are
    /// dropped, as are ratings without a title. A title with several ratings
    /// yields one row per rating, in rating storage order.
    fn scan_join(&self) -> StorageResult<JoinScan<'_>> {
        let mut ratings: HashMap<String, Vec<RatingRecord>> = HashMap::new();
        let mut build_size = 0;
        for rating in self.scan::<RatingRecord>()? {
            let rating = rating?;
            ratings.entry(rating.id.clone()).or_default().push(rating);
            build_size += 1;
        }
        Ok(JoinScan {
            ratings,
            build_size,
            titles: self.scan::<TitleRecord>()?,
            pending: VecDeque::new(),
            failed: false,
        })
    }
}

/// Lazy join iterator; see [`TableStore::scan_join`].
pub struct JoinScan<'a> {
    ratings: HashMap<String, Vec<RatingRecord>>,
    build_size: usize,
    titles: RowIter<'a, TitleRecord>,
    pending: VecDeque<JoinedRecord>,
    failed: bool,
}

impl JoinScan<'_> {
    /// Number of ratings on the build side
    pub fn build_size(&self) -> usize {
        self.build_size
    }
}

impl Iterator for JoinScan<'_> {
    type Item = StorageResult<JoinedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(row) = self.pending.pop_front() {
            return Some(Ok(row));
        }
        if self.failed {
            return None;
        }
        for title in self.titles.by_ref() {
            match title {
                Ok(title) => {
                    let Some((last, rest)) = self
                        .ratings
                        .get(title.id())
                        .and_then(|matches| matches.split_last())
                    else {
                        continue;
                    };
                    for rating in rest {
                        self.pending
                            .push_back(JoinedRecord::new(title.clone(), rating.clone()));
                    }
                    self.pending
                        .push_back(JoinedRecord::new(title, last.clone()));
                    return self.pending.pop_front().map(Ok);
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

/// Collects the join for sealing.
pub(crate) fn join_rows<S: TableStore>(store: &S) -> StorageResult<Vec<JoinedRecord>> {
    store.scan_join()?.collect()
}
