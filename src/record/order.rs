//! Result ordering
//!
//! Sorting is stable, so rows with equal keys keep title storage order in
//! both directions.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use super::types::JoinedRecord;

/// Column results are ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    Name,
    Year,
    Rating,
    #[default]
    NumVotes,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::Name,
        SortKey::Year,
        SortKey::Rating,
        SortKey::NumVotes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Year => "year",
            SortKey::Rating => "rating",
            SortKey::NumVotes => "num-ratings",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Orders joined rows by one key
pub struct RowOrder;

impl RowOrder {
    /// Compares two rows in ascending order of `key`.
    ///
    /// - Names compare byte-wise, case preserved
    /// - A missing start year sorts after every present year
    /// - Ratings use IEEE total ordering
    pub fn compare(a: &JoinedRecord, b: &JoinedRecord, key: SortKey) -> Ordering {
        match key {
            SortKey::Name => a.title.primary_title.cmp(&b.title.primary_title),
            SortKey::Year => match (a.title.start_year, b.title.start_year) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Rating => a.rating.average_rating.total_cmp(&b.rating.average_rating),
            SortKey::NumVotes => a.rating.num_votes.cmp(&b.rating.num_votes),
        }
    }

    /// Sorts rows in place. Stable.
    pub fn sort(rows: &mut [JoinedRecord], key: SortKey, direction: SortDirection) {
        rows.sort_by(|a, b| {
            let ordering = Self::compare(a, b, key);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }

    /// Positions of `rows` in ascending `key` order, ties in input order.
    pub fn ascending_positions(rows: &[JoinedRecord], key: SortKey) -> Vec<usize> {
        let mut positions: Vec<usize> = (0..rows.len()).collect();
        positions.sort_by(|&a, &b| Self::compare(&rows[a], &rows[b], key));
        positions
    }
}
