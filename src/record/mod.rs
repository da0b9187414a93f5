//! Record decoding for the title feeds
//!
//! Turns one raw tab-separated line into a typed record. Decoding is a pure
//! function: no I/O, no state, and the feed's `\N` sentinel never survives
//! into a decoded value.
//!
//! - `title.basics`: 9 fields → [`TitleRecord`]
//! - `title.ratings`: 3 fields → [`RatingRecord`]
//!
//! Also holds the sort order of joined rows, which the store uses to keep
//! one ordered copy of the join per sort key.

mod errors;
mod field;
mod order;
mod types;

pub use errors::{RecordError, RecordResult};
pub use field::{split_fields, Field, FIELD_DELIMITER, GENRE_DELIMITER, NULL_SENTINEL};
pub use order::{RowOrder, SortDirection, SortKey};
pub use types::{AdultFlag, JoinedRecord, RatingRecord, Record, Table, TitleRecord};
