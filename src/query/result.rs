//! Query results
//!
//! Rows are pulled from the store's ordered copy on demand. Nothing past the
//! last requested row is read, and reaching the limit stops all reads.

use std::fmt;

use tracing::debug;

use super::errors::{QueryError, QueryResult};
use super::filters::PredicateSet;
use crate::observability::ObservationScope;
use crate::record::JoinedRecord;
use crate::storage::RowIter;

/// Lazy rows of an executed query, in final order.
///
/// A store error mid-scan is yielded once as `Err`, after which the sequence
/// ends. [`total`](Self::total) counts the rows returned so far, so it is the
/// query's result count once iteration has finished.
pub struct QueryResults<'a> {
    rows: RowIter<'a, JoinedRecord>,
    predicates: PredicateSet,
    limit: Option<usize>,
    scope: Option<ObservationScope>,
    returned: usize,
    scanned: u64,
    done: bool,
}

impl<'a> QueryResults<'a> {
    pub(crate) fn new(
        rows: RowIter<'a, JoinedRecord>,
        predicates: PredicateSet,
        limit: Option<usize>,
        scope: ObservationScope,
    ) -> Self {
        Self {
            rows,
            predicates,
            limit,
            scope: Some(scope),
            returned: 0,
            scanned: 0,
            done: false,
        }
    }

    /// Number of rows returned so far
    pub fn total(&self) -> usize {
        self.returned
    }

    /// Number of joined rows read from the store so far
    pub fn scanned(&self) -> u64 {
        self.scanned
    }

    /// Returns true once the sequence has ended, by exhaustion, limit, or
    /// error.
    pub fn is_finished(&self) -> bool {
        self.done
    }

    fn finish(&mut self, failure: Option<String>) {
        self.done = true;
        if let Some(scope) = self.scope.take() {
            match failure {
                Some(reason) => scope.fail(reason),
                None => scope.complete(format!(
                    "scanned={} returned={}",
                    self.scanned, self.returned
                )),
            }
        }
    }
}

impl fmt::Debug for QueryResults<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResults")
            .field("limit", &self.limit)
            .field("returned", &self.returned)
            .field("scanned", &self.scanned)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl Iterator for QueryResults<'_> {
    type Item = QueryResult<JoinedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.limit.is_some_and(|limit| self.returned >= limit) {
            debug!(returned = self.returned, "limit reached");
            self.finish(None);
            return None;
        }

        loop {
            match self.rows.next() {
                Some(Ok(row)) => {
                    self.scanned += 1;
                    if self.predicates.matches(&row) {
                        self.returned += 1;
                        return Some(Ok(row));
                    }
                }
                Some(Err(e)) => {
                    let err = QueryError::from(e);
                    self.finish(Some(format!("{}: {}", err.code(), err)));
                    return Some(Err(err));
                }
                None => {
                    self.finish(None);
                    return None;
                }
            }
        }
    }
}

impl Drop for QueryResults<'_> {
    fn drop(&mut self) {
        // Abandoning the rows early is not a failure
        self.finish(None);
    }
}
