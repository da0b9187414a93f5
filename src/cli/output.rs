//! Result presentation
//!
//! Formatting belongs here and nowhere else: column widths, truncation,
//! thousands separators and title links.

use std::io::Write;

use serde::Serialize;

use super::errors::CliResult;
use crate::query::{normalize_title_type, QueryResults};
use crate::record::{AdultFlag, JoinedRecord};

const TITLE_LINK_PREFIX: &str = "https://www.imdb.com/title/";

/// (heading, width) per column; the last column is not padded
const COLUMNS: [(&str, usize); 8] = [
    ("Type", 8),
    ("Name", 60),
    ("Adult", 10),
    ("Year", 10),
    ("Genres", 30),
    ("Rating", 10),
    ("Votes", 15),
    ("Link", 38),
];

/// Public page of a title
pub fn title_link(id: &str) -> String {
    format!("{}{}/", TITLE_LINK_PREFIX, id)
}

/// `1234567` → `1,234,567`
pub fn with_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Cuts `text` to at most `width` characters, marking the cut with `...`.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let keep = width.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

fn adult_label(flag: AdultFlag) -> &'static str {
    match flag {
        AdultFlag::Yes => "yes",
        AdultFlag::No => "no",
        AdultFlag::Unknown => "unknown",
    }
}

fn cell(out: &mut String, text: &str, width: usize) {
    // one space of gutter between columns
    let text = truncate(text, width.saturating_sub(1));
    out.push_str(&format!("{:<width$}", text, width = width));
}

fn table_row(record: &JoinedRecord) -> String {
    let title = &record.title;
    let values = [
        normalize_title_type(&title.title_type),
        title.primary_title.clone(),
        adult_label(title.is_adult).to_string(),
        title.start_year.map(|y| y.to_string()).unwrap_or_default(),
        title.genres.join(", "),
        format!("{:.1}", record.rating.average_rating),
        with_thousands(record.rating.num_votes),
        title_link(&title.id),
    ];

    let mut line = String::new();
    for (value, (_, width)) in values.iter().zip(COLUMNS.iter()).take(COLUMNS.len() - 1) {
        cell(&mut line, value, *width);
    }
    line.push_str(&values[COLUMNS.len() - 1]);
    line
}

/// Writes results as aligned columns followed by the result count.
///
/// Rows are written as they arrive; a store error mid-scan stops the output
/// before the count line.
pub fn write_table<W: Write>(
    out: &mut W,
    mut results: QueryResults<'_>,
) -> CliResult<usize> {
    let mut header = String::new();
    for (heading, width) in COLUMNS.iter().take(COLUMNS.len() - 1) {
        cell(&mut header, heading, *width);
    }
    header.push_str(COLUMNS[COLUMNS.len() - 1].0);
    writeln!(out, "{}", header.trim_end())?;

    let rule: usize = COLUMNS.iter().map(|(_, w)| w).sum();
    writeln!(out, "{}", "-".repeat(rule))?;

    for record in results.by_ref() {
        writeln!(out, "{}", table_row(&record?))?;
    }
    let total = results.total();
    writeln!(out)?;
    writeln!(out, "Total results found: {}", total)?;
    out.flush()?;
    Ok(total)
}

#[derive(Serialize)]
struct JsonRow<'a> {
    id: &'a str,
    title_type: &'a str,
    primary_title: &'a str,
    is_adult: AdultFlag,
    start_year: Option<u16>,
    genres: &'a [String],
    average_rating: f64,
    num_votes: u64,
    link: String,
}

#[derive(Serialize)]
struct JsonTotal {
    total: usize,
}

/// Writes one JSON object per result, then `{"total": N}`.
pub fn write_json_lines<W: Write>(
    out: &mut W,
    mut results: QueryResults<'_>,
) -> CliResult<usize> {
    for record in results.by_ref() {
        let record = record?;
        let title = &record.title;
        let row = JsonRow {
            id: &title.id,
            title_type: &title.title_type,
            primary_title: &title.primary_title,
            is_adult: title.is_adult,
            start_year: title.start_year,
            genres: &title.genres,
            average_rating: record.rating.average_rating,
            num_votes: record.rating.num_votes,
            link: title_link(&title.id),
        };
        serde_json::to_writer(&mut *out, &row)?;
        writeln!(out)?;
    }
    let total = results.total();
    serde_json::to_writer(&mut *out, &JsonTotal { total })?;
    writeln!(out)?;
    out.flush()?;
    Ok(total)
}
