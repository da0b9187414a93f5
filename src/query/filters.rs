//! Row predicates
//!
//! Each predicate looks at one joined row and nothing else. A row is kept
//! iff every predicate passes.

use std::collections::BTreeSet;

use super::params::QueryParams;
use crate::record::JoinedRecord;

/// Collapses every `tv*` type (`tvSeries`, `tvEpisode`, ...) to `tv` and
/// lowercases the rest.
pub fn normalize_title_type(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower.starts_with("tv") {
        "tv".to_string()
    } else {
        lower
    }
}

/// One filter rule
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Normalized type is in the set; empty set passes everything
    TypeIn(BTreeSet<String>),
    /// Lowercased primary title starts with the prefix
    NameStartsWith(String),
    /// Adult flag resolves to exactly this value; unknown never matches
    AdultEquals(bool),
    /// Start year absent or at least this
    YearAtLeast(u16),
    /// Any genre in the set; empty set passes everything
    GenresIntersect(BTreeSet<String>),
    /// Inclusive
    RatingAtLeast(f64),
    /// Strict
    NumVotesGreaterThan(u64),
}

impl Predicate {
    pub fn name(&self) -> &'static str {
        match self {
            Predicate::TypeIn(_) => "type_in",
            Predicate::NameStartsWith(_) => "name_starts_with",
            Predicate::AdultEquals(_) => "adult_equals",
            Predicate::YearAtLeast(_) => "year_at_least",
            Predicate::GenresIntersect(_) => "genres_intersect",
            Predicate::RatingAtLeast(_) => "rating_at_least",
            Predicate::NumVotesGreaterThan(_) => "num_votes_greater_than",
        }
    }

    pub fn matches(&self, record: &JoinedRecord) -> bool {
        let title = &record.title;
        match self {
            Predicate::TypeIn(types) => {
                types.is_empty() || types.contains(&normalize_title_type(&title.title_type))
            }
            Predicate::NameStartsWith(prefix) => {
                prefix.is_empty() || title.primary_title.to_lowercase().starts_with(prefix.as_str())
            }
            Predicate::AdultEquals(flag) => title.is_adult.as_bool() == Some(*flag),
            Predicate::YearAtLeast(min) => title.start_year.map_or(true, |year| year >= *min),
            Predicate::GenresIntersect(genres) => {
                genres.is_empty() || title.genres.iter().any(|g| genres.contains(g))
            }
            Predicate::RatingAtLeast(min) => record.rating.average_rating >= *min,
            Predicate::NumVotesGreaterThan(min) => record.rating.num_votes > *min,
        }
    }
}

/// Conjunction of predicates, evaluated in order with short-circuit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PredicateSet {
    predicates: Vec<Predicate>,
}

impl PredicateSet {
    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self { predicates }
    }

    /// All seven rules, built from query parameters.
    pub fn from_params(params: &QueryParams) -> Self {
        let lower = |set: &BTreeSet<String>| -> BTreeSet<String> {
            set.iter().map(|s| s.to_lowercase()).collect()
        };
        Self::new(vec![
            Predicate::TypeIn(lower(&params.types)),
            Predicate::NameStartsWith(params.name_prefix.to_lowercase()),
            Predicate::AdultEquals(params.adult),
            Predicate::YearAtLeast(params.min_year),
            Predicate::GenresIntersect(lower(&params.genres)),
            Predicate::RatingAtLeast(params.min_rating),
            Predicate::NumVotesGreaterThan(params.min_votes),
        ])
    }

    pub fn matches(&self, record: &JoinedRecord) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }

    /// First predicate that rejects `record`, if any
    pub fn first_failure(&self, record: &JoinedRecord) -> Option<&Predicate> {
        self.predicates.iter().find(|p| !p.matches(record))
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}
