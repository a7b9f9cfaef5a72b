use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::{AppError, Result};
use crate::types::{Coder, Level, LevelResult, RatingHistoryEntry, RoundResultEntry};

/// Date layouts seen in rating history documents.
const DATE_FORMATS: &[&str] = &["%Y.%m.%d", "%m.%d.%Y", "%Y-%m-%d"];

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One record element of a document: its child elements flattened to
/// name → trimmed text. Empty elements are dropped, so absent and empty
/// read the same.
#[derive(Debug, Clone)]
pub struct Row {
    doc: &'static str,
    index: usize,
    fields: HashMap<String, String>,
}

impl Row {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn required_text(&self, name: &str) -> Result<&str> {
        self.text(name)
            .ok_or_else(|| AppError::parse(self.context(name), "missing required field"))
    }

    pub fn number<T: FieldNumber>(&self, name: &str) -> Result<Option<T>> {
        match self.text(name) {
            None => Ok(None),
            Some(raw) => parse_number(raw)
                .map(Some)
                .ok_or_else(|| AppError::parse(self.context(name), format!("not a number: {raw:?}"))),
        }
    }

    pub fn required_number<T: FieldNumber>(&self, name: &str) -> Result<T> {
        self.number(name)?
            .ok_or_else(|| AppError::parse(self.context(name), "missing required field"))
    }

    fn context(&self, name: &str) -> String {
        format!("{} row {} field {name}", self.doc, self.index)
    }
}

/// Numeric field types. Floats must be finite, so `NaN` and `inf` fail like any other non-number.
pub trait FieldNumber: FromStr {
    fn is_valid(&self) -> bool {
        true
    }
}

impl FieldNumber for u8 {}
impl FieldNumber for u64 {}
impl FieldNumber for i64 {}

impl FieldNumber for f64 {
    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}

/// Accepts integral values written with a trailing `.0` for integer fields.
fn parse_number<T: FieldNumber>(raw: &str) -> Option<T> {
    raw.parse::<T>()
        .ok()
        .or_else(|| raw.strip_suffix(".0").and_then(|s| s.parse::<T>().ok()))
        .filter(T::is_valid)
}

/// Parse a document into its record rows (the root element's element children).
pub fn parse_rows(bytes: &[u8], doc: &'static str) -> Result<Vec<Row>> {
    let text = std::str::from_utf8(bytes).map_err(|e| AppError::parse(doc, e.to_string()))?;
    let tree = roxmltree::Document::parse(text).map_err(|e| AppError::parse(doc, e.to_string()))?;

    let rows = tree
        .root_element()
        .children()
        .filter(|n| n.is_element())
        .enumerate()
        .map(|(index, record)| {
            let fields = record
                .children()
                .filter(|n| n.is_element())
                .filter_map(|field| {
                    let value = field.text().map(str::trim).unwrap_or("");
                    if value.is_empty() {
                        None
                    } else {
                        Some((field.tag_name().name().to_string(), value.to_string()))
                    }
                })
                .collect();
            Row { doc, index, fields }
        })
        .collect();

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Typed documents
// ---------------------------------------------------------------------------

pub fn parse_coders(bytes: &[u8]) -> Result<Vec<Coder>> {
    parse_rows(bytes, "coder directory")?
        .iter()
        .map(|row| {
            Ok(Coder {
                coder_id: row.required_number("coder_id")?,
                handle: row.required_text("handle")?.to_string(),
            })
        })
        .collect()
}

/// Round ids listed in the round directory. Rows without a round id are skipped.
pub fn parse_round_ids(bytes: &[u8]) -> Result<Vec<u64>> {
    let mut ids = Vec::new();
    for row in parse_rows(bytes, "round directory")? {
        if let Some(id) = row.number::<u64>("round_id")? {
            ids.push(id);
        }
    }
    Ok(ids)
}

pub fn parse_rating_history(bytes: &[u8]) -> Result<Vec<RatingHistoryEntry>> {
    parse_rows(bytes, "rating history")?
        .iter()
        .map(|row| {
            let raw_date = row.required_text("date")?;
            let date = parse_match_date(raw_date)
                .ok_or_else(|| AppError::parse(row.context("date"), format!("unrecognised date: {raw_date:?}")))?;
            Ok(RatingHistoryEntry {
                round_id: row.required_number("round_id")?,
                short_name: row.text("short_name").unwrap_or_default().to_string(),
                date,
                old_rating: row.number("old_rating")?,
                new_rating: row.number("new_rating")?,
                volatility: row.number("volatility")?,
                rank: row.number("rank")?,
                percentile: row.number("percentile")?,
            })
        })
        .collect()
}

/// Parse a date, ignoring any trailing time part.
pub fn parse_match_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.split_whitespace().next()?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
}

/// All competitor rows of one round's result document.
#[derive(Debug, Clone)]
pub struct RoundDocument {
    pub round_id: u64,
    pub entries: Vec<RoundResultEntry>,
}

impl RoundDocument {
    pub fn parse(round_id: u64, bytes: &[u8]) -> Result<Self> {
        let entries = parse_rows(bytes, "round results")?
            .iter()
            .map(|row| round_result_entry(round_id, row))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { round_id, entries })
    }

    pub fn entry_for(&self, coder_id: u64) -> Result<&RoundResultEntry> {
        self.entries
            .iter()
            .find(|e| e.coder_id == coder_id)
            .ok_or(AppError::JoinMiss {
                round_id: self.round_id,
                coder_id,
            })
    }
}

fn round_result_entry(round_id: u64, row: &Row) -> Result<RoundResultEntry> {
    let [one, two, three] = Level::ALL;
    Ok(RoundResultEntry {
        round_id,
        coder_id: row.required_number("coder_id")?,
        division: row.required_number("division")?,
        division_placed: row.number("division_placed")?,
        challenge_points: row.number("challenge_points")?,
        final_points: row.number("final_points")?,
        problems_presented: row.number("problems_presented")?,
        problems_submitted: row.number("problems_submitted")?,
        problems_correct: row.number("problems_correct")?,
        levels: [
            level_result(row, one)?,
            level_result(row, two)?,
            level_result(row, three)?,
        ],
    })
}

fn level_result(row: &Row, level: Level) -> Result<LevelResult> {
    let prefix = level.field_prefix();
    let field = |name: &str| format!("{prefix}_{name}");
    Ok(LevelResult {
        problem_id: row.number(&field("problem_id"))?,
        submission_points: row.number(&field("submission_points"))?,
        final_points: row.number(&field("final_points"))?,
        status: row.text(&field("status")).map(str::to_string),
        time_elapsed: row.number(&field("time_elapsed"))?,
        placed: row.number(&field("placed"))?,
        language: row.text(&field("language")).map(str::to_string),
    })
}
