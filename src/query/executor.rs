//! Query engine
//!
//! Execution flow:
//! 1. Validate parameters; nothing is read if they are rejected
//! 2. Open the store's ordered copy of the join for the sort key
//! 3. Filter each row as it streams past
//! 4. Stop reading once the limit is reached
//!
//! Filtering an ordered stream gives the same rows in the same order as
//! sorting the filtered join: predicates are row-local, and the ordered
//! copies keep ties in title storage order in both directions.

use tracing::{debug, warn};

use super::errors::QueryResult;
use super::filters::PredicateSet;
use super::params::QueryParams;
use super::result::QueryResults;
use crate::observability::{Event, ObservationScope, Stage};
use crate::storage::TableStore;

/// Runs queries against a loaded store.
pub struct QueryEngine<'a, S: TableStore> {
    store: &'a S,
}

impl<'a, S: TableStore> QueryEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Executes a query.
    ///
    /// Same parameters and same store contents give the same rows in the
    /// same order. Rows are produced lazily; the first one is available
    /// without reading the rest of the store.
    pub fn execute(&self, params: &QueryParams) -> QueryResult<QueryResults<'a>> {
        if let Err(e) = params.validate() {
            warn!(event = Event::QueryRejected.as_str(), reason = %e);
            return Err(e);
        }

        let scope = ObservationScope::new(
            Stage::Query,
            format!("order_by={} {:?}", params.sort_key, params.direction),
        );
        let rows = match self.store.scan_ordered(params.sort_key, params.direction) {
            Ok(rows) => rows,
            Err(e) => {
                scope.fail(format!("{}: {}", e.code(), e));
                return Err(e.into());
            }
        };
        debug!(limit = ?params.effective_limit(), "ordered scan opened");

        Ok(QueryResults::new(
            rows,
            PredicateSet::from_params(params),
            params.effective_limit(),
            scope,
        ))
    }
}
