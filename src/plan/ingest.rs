//! Plan ingestion - raw JSON or CSV bytes to a validated [`Plan`]
//!
//! CSV layout:
//! - line 1: `Plan Name, Total Days`
//! - line 2: header row (skipped)
//! - line 3+: `Day, Workout Name, Notes, Exercise Name, Sets, Reps, Exercise Notes`

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde_json::{Value, json};
use thiserror::Error;

use super::{Plan, validate};

/// Columns every CSV data row must provide
const CSV_COLUMNS: usize = 7;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported file type {0:?}, please upload a JSON or CSV file")]
    UnsupportedFormat(String),

    #[error("file is not valid UTF-8 text")]
    NotUtf8(#[from] std::str::Utf8Error),

    #[error("invalid JSON file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid plan at `{path}`: expected {expected}")]
    Schema { path: String, expected: &'static str },

    #[error("CSV file must contain at least 3 lines")]
    TooFewLines,

    #[error("first line must contain: Workout Plan Name, Total Days")]
    PlanHeader,

    #[error("total days must be a number, got {0:?}")]
    TotalDays(String),

    #[error(
        "line {line} has insufficient columns, expected: Day, Workout Name, Notes, Exercise Name, Sets, Reps, Exercise Notes"
    )]
    InsufficientColumns { line: usize },

    #[error("day in line {line} must be a number, got {value:?}")]
    Day { line: usize, value: String },

    #[error("sets in line {line} must be a number, got {value:?}")]
    Sets { line: usize, value: String },
}

/// Declared format of an uploaded plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Csv,
}

impl FileFormat {
    /// Format from a file name's extension (case-insensitive)
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.parse()
    }
}

impl FromStr for FileFormat {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(FileFormat::Json),
            "csv" => Ok(FileFormat::Csv),
            other => Err(IngestError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Json => write!(f, "json"),
            FileFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Parse and validate plan bytes in the given format
pub fn ingest(bytes: &[u8], format: FileFormat) -> Result<Plan, IngestError> {
    let text = std::str::from_utf8(bytes)?;
    match format {
        FileFormat::Json => parse_json(text),
        FileFormat::Csv => parse_csv(text),
    }
}

/// Ingest using the format implied by `file_name`
pub fn ingest_file(file_name: &str, bytes: &[u8]) -> Result<Plan, IngestError> {
    ingest(bytes, FileFormat::from_path(file_name)?)
}

fn parse_json(text: &str) -> Result<Plan, IngestError> {
    let value: Value = serde_json::from_str(text)?;
    validate(&value)
}

/// Workouts grouped by day, in first-seen order
struct DayGroup {
    day: i64,
    name: String,
    notes: String,
    exercises: Vec<Value>,
}

fn parse_csv(text: &str) -> Result<Plan, IngestError> {
    let lines: Vec<&str> = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.len() < 3 {
        return Err(IngestError::TooFewLines);
    }

    let header = split_line(lines[0]);
    if header.len() < 2 {
        return Err(IngestError::PlanHeader);
    }
    let plan_name = header[0].clone();
    let total_days = parse_int(&header[1]).ok_or_else(|| IngestError::TotalDays(header[1].clone()))?;

    // lines[1] is the column header
    let mut groups: Vec<DayGroup> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for (i, line) in lines.iter().enumerate().skip(2) {
        let line_no = i + 1;
        let row = split_line(line);
        if row.len() < CSV_COLUMNS {
            return Err(IngestError::InsufficientColumns { line: line_no });
        }

        let day = parse_int(&row[0]).ok_or_else(|| IngestError::Day {
            line: line_no,
            value: row[0].clone(),
        })?;
        let sets = parse_int(&row[4]).ok_or_else(|| IngestError::Sets {
            line: line_no,
            value: row[4].clone(),
        })?;

        let slot = *index.entry(day).or_insert_with(|| {
            groups.push(DayGroup {
                day,
                name: row[1].clone(),
                notes: row[2].clone(),
                exercises: Vec::new(),
            });
            groups.len() - 1
        });

        groups[slot].exercises.push(json!({
            "name": row[3],
            "sets": sets,
            "reps": row[5],
            "notes": row[6],
        }));
    }

    let workouts: Vec<Value> = groups
        .into_iter()
        .map(|g| {
            json!({
                "day": g.day,
                "name": g.name,
                "notes": g.notes,
                "exercises": g.exercises,
            })
        })
        .collect();

    // Same schema as the JSON path
    validate(&json!({
        "name": plan_name,
        "totalDays": total_days,
        "workouts": workouts,
    }))
}

fn parse_int(field: &str) -> Option<i64> {
    field.trim().parse().ok()
}

/// Split a CSV line on commas outside double quotes.
///
/// Quote characters only toggle the quoted state and are dropped, so
/// `""` inside a quoted field is not an escaped quote.
fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);

    fields
}
