//! Field splitting and null-sentinel normalization
//!
//! The feed writes `\N` for "unknown". Every raw field passes through
//! [`Field::from_raw`] exactly once, so the sentinel never survives past this
//! module: it becomes [`Field::Absent`] and each coercion helper maps that to
//! the type's absent value.

use std::str::FromStr;

use super::errors::{RecordError, RecordResult};
use super::types::AdultFlag;

/// The feed's null marker
pub const NULL_SENTINEL: &str = "\\N";

/// Column delimiter of the feed
pub const FIELD_DELIMITER: char = '\t';

/// Delimiter inside the genres column
pub const GENRE_DELIMITER: char = ',';

/// One trimmed, null-normalized field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<'a> {
    /// The raw value was the null sentinel
    Absent,
    /// Any other value, trimmed
    Present(&'a str),
}

impl<'a> Field<'a> {
    /// Normalizes one raw field.
    pub fn from_raw(raw: &'a str) -> Self {
        let trimmed = raw.trim();
        if trimmed == NULL_SENTINEL {
            Field::Absent
        } else {
            Field::Present(trimmed)
        }
    }

    /// Returns true if the field was the sentinel
    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    /// Text value; absent becomes the empty string.
    pub fn text(self) -> String {
        match self {
            Field::Absent => String::new(),
            Field::Present(s) => s.to_string(),
        }
    }

    /// Text value that must be present and non-empty.
    pub fn required(self, column: &'static str) -> RecordResult<&'a str> {
        match self {
            Field::Present(s) if !s.is_empty() => Ok(s),
            _ => Err(RecordError::MissingValue { column }),
        }
    }

    /// Integer value; absent becomes `None`.
    pub fn int<T: FromStr>(self, column: &'static str) -> RecordResult<Option<T>> {
        match self {
            Field::Absent => Ok(None),
            Field::Present(s) => s
                .parse::<T>()
                .map(Some)
                .map_err(|_| RecordError::invalid(column, s, "integer")),
        }
    }

    /// Finite real value; absent becomes `None`.
    pub fn real(self, column: &'static str) -> RecordResult<Option<f64>> {
        match self {
            Field::Absent => Ok(None),
            Field::Present(s) => match s.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(Some(v)),
                _ => Err(RecordError::invalid(column, s, "real")),
            },
        }
    }

    /// Tri-state flag: `0`/`f`/`false`, `1`/`t`/`true`, or absent.
    pub fn flag(self, column: &'static str) -> RecordResult<AdultFlag> {
        match self {
            Field::Absent => Ok(AdultFlag::Unknown),
            Field::Present(s) => match s.to_ascii_lowercase().as_str() {
                "0" | "f" | "false" => Ok(AdultFlag::No),
                "1" | "t" | "true" => Ok(AdultFlag::Yes),
                _ => Err(RecordError::invalid(column, s, "boolean")),
            },
        }
    }

    /// Lowercased list split on `delimiter`; absent becomes an empty list.
    pub fn list(self, delimiter: char) -> Vec<String> {
        match self {
            Field::Absent => Vec::new(),
            Field::Present(s) => s
                .split(delimiter)
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_lowercase)
                .collect(),
        }
    }
}

/// Splits a raw line into exactly `arity` normalized fields.
pub fn split_fields(line: &str, arity: usize) -> RecordResult<Vec<Field<'_>>> {
    let line = line.trim_end_matches(&['\n', '\r'][..]);
    let fields: Vec<Field<'_>> = line.split(FIELD_DELIMITER).map(Field::from_raw).collect();
    if fields.len() != arity {
        return Err(RecordError::FieldCount {
            expected: arity,
            found: fields.len(),
        });
    }
    Ok(fields)
}
