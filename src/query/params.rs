//! Query parameters
//!
//! Defaults select every non-adult rated title, ordered by vote count
//! ascending, with no limit.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::Serialize;

use super::errors::{QueryError, QueryResult};
use crate::record::{SortDirection, SortKey};

/// Accepted type filter values
pub const TYPE_TAGS: [&str; 3] = ["tv", "movie", "short"];

/// Upper bound of the rating scale
pub const MAX_RATING: f64 = 10.0;

/// Sort keys as typed by a caller: `name`, `year`, `rating`, `num-ratings`
impl FromStr for SortKey {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| {
                QueryError::invalid(
                    "order_by",
                    format!("unknown sort key '{}', expected name, year, rating or num-ratings", s),
                )
            })
    }
}

/// Everything a query can ask for.
///
/// Built with the `with_*` methods, which normalize case; checked by
/// [`QueryParams::validate`] before execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryParams {
    /// Normalized title types; empty means any
    pub types: BTreeSet<String>,
    /// Lowercase title prefix; empty means any
    pub name_prefix: String,
    pub adult: bool,
    /// Minimum start year; titles without one always pass
    pub min_year: u16,
    /// Lowercase genres; empty means any
    pub genres: BTreeSet<String>,
    /// Inclusive
    pub min_rating: f64,
    /// Exclusive
    pub min_votes: u64,
    pub sort_key: SortKey,
    pub direction: SortDirection,
    /// `None` and `Some(0)` both mean unlimited
    pub limit: Option<usize>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            types: BTreeSet::new(),
            name_prefix: String::new(),
            adult: false,
            min_year: 0,
            genres: BTreeSet::new(),
            min_rating: 0.0,
            min_votes: 0,
            sort_key: SortKey::NumVotes,
            direction: SortDirection::Asc,
            limit: None,
        }
    }
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_types<I, T>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.types = types
            .into_iter()
            .map(|t| t.as_ref().to_lowercase())
            .collect();
        self
    }

    pub fn with_name_prefix(mut self, prefix: &str) -> Self {
        self.name_prefix = prefix.to_lowercase();
        self
    }

    pub fn with_adult(mut self, adult: bool) -> Self {
        self.adult = adult;
        self
    }

    pub fn with_min_year(mut self, year: u16) -> Self {
        self.min_year = year;
        self
    }

    pub fn with_genres<I, T>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.genres = genres
            .into_iter()
            .map(|g| g.as_ref().to_lowercase())
            .collect();
        self
    }

    pub fn with_min_rating(mut self, rating: f64) -> Self {
        self.min_rating = rating;
        self
    }

    pub fn with_min_votes(mut self, votes: u64) -> Self {
        self.min_votes = votes;
        self
    }

    pub fn order_by(mut self, key: SortKey, direction: SortDirection) -> Self {
        self.sort_key = key;
        self.direction = direction;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Limit with the zero case folded into "unlimited"
    pub fn effective_limit(&self) -> Option<usize> {
        self.limit.filter(|&n| n > 0)
    }

    /// Rejects out-of-domain values. Runs before any row is read.
    pub fn validate(&self) -> QueryResult<()> {
        for t in &self.types {
            if !TYPE_TAGS.contains(&t.as_str()) {
                return Err(QueryError::invalid(
                    "type",
                    format!("unknown title type '{}', expected tv, movie or short", t),
                ));
            }
        }
        if !self.min_rating.is_finite() || !(0.0..=MAX_RATING).contains(&self.min_rating) {
            return Err(QueryError::invalid(
                "rating",
                format!("{} is outside 0.0..=10.0", self.min_rating),
            ));
        }
        if self.genres.iter().any(|g| g.is_empty()) {
            return Err(QueryError::invalid("genres", "empty genre name"));
        }
        Ok(())
    }
}
