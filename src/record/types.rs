//! Typed records for the two feeds and their join

use serde::Serialize;

use super::errors::{RecordError, RecordResult};
use super::field::{split_fields, Field, GENRE_DELIMITER};

/// The two row sets the store holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    /// `title.basics.tsv.gz`
    TitleBasics,
    /// `title.ratings.tsv.gz`
    TitleRatings,
}

impl Table {
    /// Every table, in load order
    pub const ALL: [Table; 2] = [Table::TitleBasics, Table::TitleRatings];

    /// Table name as stored on disk
    pub fn name(&self) -> &'static str {
        match self {
            Table::TitleBasics => "title_basics",
            Table::TitleRatings => "title_ratings",
        }
    }

    /// Parses a stored table name
    pub fn from_name(name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Tri-state adult-content flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdultFlag {
    Yes,
    No,
    Unknown,
}

impl AdultFlag {
    /// Resolves to a boolean; `Unknown` has none.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AdultFlag::Yes => Some(true),
            AdultFlag::No => Some(false),
            AdultFlag::Unknown => None,
        }
    }
}

/// A record type decoded from one feed line and stored in one table.
pub trait Record: Sized {
    /// Table the record lives in
    const TABLE: Table;
    /// Number of tab-separated fields per line
    const ARITY: usize;

    /// Builds the record from exactly `ARITY` normalized fields.
    fn from_fields(fields: &[Field<'_>]) -> RecordResult<Self>;

    /// Join key
    fn id(&self) -> &str;

    /// Decodes one raw line. Pure: same line, same result.
    fn decode(line: &str) -> RecordResult<Self> {
        let fields = split_fields(line, Self::ARITY)?;
        Self::from_fields(&fields)
    }
}

/// One row of `title.basics`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleRecord {
    pub id: String,
    pub title_type: String,
    pub primary_title: String,
    pub original_title: String,
    pub is_adult: AdultFlag,
    pub start_year: Option<u16>,
    pub end_year: Option<u16>,
    pub runtime_minutes: Option<u32>,
    /// Lowercased, in feed order
    pub genres: Vec<String>,
}

impl Record for TitleRecord {
    const TABLE: Table = Table::TitleBasics;
    const ARITY: usize = 9;

    fn from_fields(fields: &[Field<'_>]) -> RecordResult<Self> {
        Ok(Self {
            id: fields[0].required("tconst")?.to_string(),
            title_type: fields[1].text(),
            primary_title: fields[2].text(),
            original_title: fields[3].text(),
            is_adult: fields[4].flag("isAdult")?,
            start_year: fields[5].int("startYear")?,
            end_year: fields[6].int("endYear")?,
            runtime_minutes: fields[7].int("runtimeMinutes")?,
            genres: fields[8].list(GENRE_DELIMITER),
        })
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// One row of `title.ratings`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingRecord {
    pub id: String,
    pub average_rating: f64,
    pub num_votes: u64,
}

impl Record for RatingRecord {
    const TABLE: Table = Table::TitleRatings;
    const ARITY: usize = 3;

    fn from_fields(fields: &[Field<'_>]) -> RecordResult<Self> {
        // Both measures are required; there is no absent rating.
        Ok(Self {
            id: fields[0].required("tconst")?.to_string(),
            average_rating: fields[1]
                .real("averageRating")?
                .ok_or(RecordError::MissingValue {
                    column: "averageRating",
                })?,
            num_votes: fields[2]
                .int("numVotes")?
                .ok_or(RecordError::MissingValue { column: "numVotes" })?,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// A title joined with its rating. Only exists at query time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRecord {
    pub title: TitleRecord,
    pub rating: RatingRecord,
}

impl JoinedRecord {
    /// Joins a title with its rating; both must share an id.
    pub fn new(title: TitleRecord, rating: RatingRecord) -> Self {
        debug_assert_eq!(title.id, rating.id);
        Self { title, rating }
    }

    pub fn id(&self) -> &str {
        &self.title.id
    }
}
