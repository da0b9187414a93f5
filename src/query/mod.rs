//! Query engine for the joined title/rating rows
//!
//! One fixed query shape: inner join on title id, seven ANDed filters, one
//! sort key, optional limit.
//!
//! # Guarantees
//!
//! - Deterministic: same store, same parameters, same output
//! - Parameters are validated before any store read
//! - Rows stream from the store's ordered copies; the first row does not wait
//!   for the rest of the result, and nothing is read past the limit
//! - A store error mid-scan is fatal and ends the result sequence

mod errors;
mod executor;
mod filters;
mod params;
mod result;

pub use errors::{QueryError, QueryResult};
pub use executor::QueryEngine;
pub use filters::{normalize_title_type, Predicate, PredicateSet};
pub use params::{QueryParams, MAX_RATING, TYPE_TAGS};
pub use result::QueryResults;
pub use crate::record::{RowOrder, SortDirection, SortKey};
