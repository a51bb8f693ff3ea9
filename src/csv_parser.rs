//! CSV parser with automatic type inference.
//!
//! Parses CSV text into a [`DataFrame`](crate::dataframe::DataFrame),
//! inferring each column's kind from its present cells in the order
//! Numeric → Datetime → Categorical.
//!
//! # Features
//!
//! - RFC 4180 quoting (quoted fields, escaped quotes, delimiters and
//!   newlines inside quotes)
//! - Null markers: empty, `NA`, `N/A`, `null`, `NULL`, `None`, `.`, `NaN`, `#N/A`
//! - Datetimes in `%Y-%m-%d`, `%Y-%m-%d %H:%M:%S` or `%Y-%m-%dT%H:%M:%S`
//! - Configurable delimiter, header handling and null markers
//!
//! # Example
//!
//! ```
//! use sigma_insight::csv_parser::CsvParser;
//! use sigma_insight::dataframe::DataType;
//!
//! let csv = "batch,date,diameter\nA,2024-03-01,10.02\nB,2024-03-02,9.97\nA,2024-03-03,NA\n";
//! let df = CsvParser::new().parse_str(csv).unwrap();
//! assert_eq!(df.row_count(), 3);
//! assert_eq!(df.column(0).unwrap().data_type(), DataType::Categorical);
//! assert_eq!(df.column(1).unwrap().data_type(), DataType::Datetime);
//! assert_eq!(df.column(2).unwrap().data_type(), DataType::Numeric);
//! assert_eq!(df.column(2).unwrap().null_count(), 1);
//! ```

use std::collections::HashMap;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::dataframe::{Column, DataFrame, DataType, ValidityBitmap};
use crate::error::AnalysisError;

/// Null markers recognized when none are configured.
const DEFAULT_NULL_MARKERS: &[&str] = &[
    "", "NA", "N/A", "na", "n/a", "null", "NULL", "None", "none", ".", "NaN", "nan", "NAN",
    "#N/A", "#NA",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// CSV parser configuration and entry point.
///
/// ```
/// use sigma_insight::csv_parser::CsvParser;
///
/// let df = CsvParser::new().delimiter(b';').parse_str("a;b\n1;2\n3;4\n").unwrap();
/// assert_eq!(df.row_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct CsvParser {
    delimiter: u8,
    has_header: bool,
    null_markers: Vec<String>,
}

impl CsvParser {
    /// Creates a parser with a comma delimiter, a header row and the
    /// standard null markers.
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            null_markers: DEFAULT_NULL_MARKERS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Sets the field delimiter.
    pub fn delimiter(mut self, delim: u8) -> Self {
        self.delimiter = delim;
        self
    }

    /// Sets whether the first row is a header. Without one, columns are
    /// named `col_0`, `col_1`, ...
    pub fn has_header(mut self, header: bool) -> Self {
        self.has_header = header;
        self
    }

    /// Replaces the null markers.
    pub fn null_markers(mut self, markers: Vec<String>) -> Self {
        self.null_markers = markers;
        self
    }

    /// Parses CSV text into a DataFrame.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::CsvParse`] when a row has the wrong number of fields,
    /// a header name repeats, or a quoted field is never closed.
    pub fn parse_str(&self, input: &str) -> Result<DataFrame, AnalysisError> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);

        let raw_rows = self.parse_raw(input)?;
        let Some(first) = raw_rows.first() else {
            return Ok(DataFrame::new());
        };

        let (headers, data_rows): (Vec<String>, &[Vec<String>]) = if self.has_header {
            let headers = first.iter().map(|h| h.trim().to_string()).collect();
            (headers, &raw_rows[1..])
        } else {
            ((0..first.len()).map(|i| format!("col_{i}")).collect(), &raw_rows[..])
        };
        if data_rows.is_empty() {
            return Ok(DataFrame::new());
        }

        let n_cols = headers.len();
        let first_data_line = if self.has_header { 2 } else { 1 };
        let mut raw_columns: Vec<Vec<&str>> = vec![Vec::with_capacity(data_rows.len()); n_cols];
        for (offset, row) in data_rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(AnalysisError::CsvParse {
                    line: first_data_line + offset,
                    message: format!("expected {n_cols} fields, got {}", row.len()),
                });
            }
            for (col_idx, field) in row.iter().enumerate() {
                raw_columns[col_idx].push(field.trim());
            }
        }

        let mut df = DataFrame::new();
        for (name, raw) in headers.into_iter().zip(&raw_columns) {
            if df.column_by_name(&name).is_some() {
                return Err(AnalysisError::CsvParse {
                    line: 1,
                    message: format!("duplicate column name '{name}'"),
                });
            }
            let column = self.build_column(raw);
            debug!(column = %name, data_type = %column.data_type(), "inferred column type");
            df.add_column(name, column)?;
        }
        Ok(df)
    }

    /// Reads and parses a CSV file.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<DataFrame, AnalysisError> {
        let content = std::fs::read_to_string(path)?;
        self.parse_str(&content)
    }

    // ── Internal parsing ─────────────────────────────────────────

    /// Splits text into rows of unquoted fields.
    fn parse_raw(&self, input: &str) -> Result<Vec<Vec<String>>, AnalysisError> {
        let delim = self.delimiter as char;
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut row: Vec<String> = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut line = 1usize;
        let mut quote_line = 0usize;
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            if in_quotes {
                match c {
                    '"' if chars.peek() == Some(&'"') => {
                        chars.next();
                        field.push('"');
                    }
                    '"' => in_quotes = false,
                    _ => {
                        if c == '\n' {
                            line += 1;
                        }
                        field.push(c);
                    }
                }
            } else if c == '"' && field.is_empty() {
                in_quotes = true;
                quote_line = line;
            } else if c == delim {
                row.push(std::mem::take(&mut field));
            } else if c == '\n' || c == '\r' {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(std::mem::take(&mut field));
                end_row(&mut row, &mut rows);
                line += 1;
            } else {
                field.push(c);
            }
        }
        if in_quotes {
            return Err(AnalysisError::CsvParse {
                line: quote_line,
                message: "unterminated quoted field".to_string(),
            });
        }
        if !field.is_empty() || !row.is_empty() {
            row.push(field);
            end_row(&mut row, &mut rows);
        }

        while rows.last().is_some_and(|r| r.iter().all(String::is_empty)) {
            rows.pop();
        }
        Ok(rows)
    }

    fn is_null(&self, value: &str) -> bool {
        self.null_markers.iter().any(|m| m == value)
    }

    /// Infers the column kind and builds the typed column.
    fn build_column(&self, values: &[&str]) -> Column {
        let present: Vec<Option<&str>> = values
            .iter()
            .map(|&v| (!self.is_null(v)).then_some(v))
            .collect();

        match infer_type(present.iter().flatten().copied()) {
            DataType::Numeric => {
                let parsed: Vec<Option<f64>> = present
                    .iter()
                    .map(|v| v.and_then(parse_number))
                    .collect();
                Column::from_options(&parsed)
            }
            DataType::Datetime => {
                let parsed: Vec<Option<NaiveDateTime>> = present
                    .iter()
                    .map(|v| v.and_then(parse_datetime))
                    .collect();
                Column::from_timestamps(&parsed)
            }
            DataType::Categorical => build_categorical(&present),
        }
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

// ── Helper functions ──────────────────────────────────────────────────

/// Closes a row; leading blank lines are skipped.
fn end_row(row: &mut Vec<String>, rows: &mut Vec<Vec<String>>) {
    if rows.is_empty() && row.iter().all(String::is_empty) {
        row.clear();
    } else {
        rows.push(std::mem::take(row));
    }
}

/// Most specific kind that every present value fits. An all-null column
/// is numeric.
fn infer_type<'a>(mut present: impl Iterator<Item = &'a str> + Clone) -> DataType {
    if present.clone().all(|v| parse_number(v).is_some()) {
        DataType::Numeric
    } else if present.all(|v| parse_datetime(v).is_some()) {
        DataType::Datetime
    } else {
        DataType::Categorical
    }
}

/// Finite numbers only; `inf` and friends are not measurements.
fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn build_categorical(present: &[Option<&str>]) -> Column {
    let mut lookup: HashMap<&str, u32> = HashMap::new();
    let mut dictionary: Vec<String> = Vec::new();
    let mut indices = Vec::with_capacity(present.len());
    let mut validity = ValidityBitmap::empty();

    for value in present {
        match value {
            Some(label) => {
                let idx = *lookup.entry(*label).or_insert_with(|| {
                    dictionary.push((*label).to_string());
                    (dictionary.len() - 1) as u32
                });
                indices.push(idx);
                validity.push(true);
            }
            None => {
                indices.push(0);
                validity.push(false);
            }
        }
    }
    Column::categorical(dictionary, indices, validity)
}

// ── Tests ─────────────────────────────────────────────────────────────
