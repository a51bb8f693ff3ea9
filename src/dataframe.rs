//! Column-major DataFrame for tabular data.
//!
//! The [`DataFrame`] stores data in column-major order with typed columns
//! and a compact validity bitmap for tracking missing values. It is the
//! tabular data source every analysis reads from.
//!
//! # Column Types
//!
//! | Type | Storage | Use case |
//! |------|---------|----------|
//! | [`Numeric`](Column::Numeric) | `Vec<f64>` + bitmap | Measurements, counts, KPIs |
//! | [`Categorical`](Column::Categorical) | Dictionary + `Vec<u32>` | Groups, shifts, defect causes |
//! | [`Datetime`](Column::Datetime) | `Vec<NaiveDateTime>` + bitmap | Sampling timestamps |
//!
//! # Example
//!
//! ```
//! use sigma_insight::dataframe::{DataFrame, Column};
//!
//! let mut df = DataFrame::new();
//! df.add_column("diameter", Column::from_values(vec![20.5, 21.3, 19.8])).unwrap();
//! df.add_column("line", Column::from_labels(&[Some("A"), Some("B"), None])).unwrap();
//! assert_eq!(df.row_count(), 3);
//! assert_eq!(df.column_count(), 2);
//! assert_eq!(df.numeric_column_names(), vec!["diameter"]);
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::error::AnalysisError;

// ── ValidityBitmap ────────────────────────────────────────────────────

/// Bit-packed validity bitmap using `Vec<u64>`.
///
/// Each bit indicates whether the corresponding row is valid (1) or
/// missing (0).
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityBitmap {
    bits: Vec<u64>,
    len: usize,
}

impl ValidityBitmap {
    /// Creates a bitmap where all `len` positions are valid.
    pub fn all_valid(len: usize) -> Self {
        let n_words = len.div_ceil(64);
        let mut bits = vec![u64::MAX; n_words];
        let trailing = len % 64;
        if trailing != 0 && n_words > 0 {
            bits[n_words - 1] = (1u64 << trailing) - 1;
        }
        Self { bits, len }
    }

    /// Creates a bitmap where all `len` positions are missing.
    pub fn all_invalid(len: usize) -> Self {
        Self {
            bits: vec![0u64; len.div_ceil(64)],
            len,
        }
    }

    /// Creates an empty bitmap with no rows.
    pub fn empty() -> Self {
        Self {
            bits: Vec::new(),
            len: 0,
        }
    }

    /// Returns `true` if the value at `idx` is present.
    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len, "index {idx} out of bounds (len={})", self.len);
        let (word, bit) = (idx / 64, idx % 64);
        (self.bits[word] >> bit) & 1 == 1
    }

    /// Marks position `idx` as missing.
    #[inline]
    pub fn set_invalid(&mut self, idx: usize) {
        debug_assert!(idx < self.len, "index {idx} out of bounds (len={})", self.len);
        let (word, bit) = (idx / 64, idx % 64);
        self.bits[word] &= !(1u64 << bit);
    }

    /// Appends a new position.
    pub fn push(&mut self, valid: bool) {
        let idx = self.len;
        self.len += 1;
        let (word, bit) = (idx / 64, idx % 64);
        if word >= self.bits.len() {
            self.bits.push(0);
        }
        if valid {
            self.bits[word] |= 1u64 << bit;
        }
    }

    /// Returns the total number of tracked positions.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the bitmap tracks zero positions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Counts the number of missing positions.
    pub fn null_count(&self) -> usize {
        let valid_count: usize = self.bits.iter().map(|w| w.count_ones() as usize).sum();
        self.len - valid_count
    }

    /// Counts the number of present positions.
    pub fn valid_count(&self) -> usize {
        self.len - self.null_count()
    }

    /// Returns an iterator over indices of present positions.
    pub fn valid_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.is_valid(i))
    }
}

// ── DataType ──────────────────────────────────────────────────────────

/// Declared kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DataType {
    /// Continuous or integer numeric values (stored as `f64`).
    Numeric,
    /// Dictionary-encoded labels.
    Categorical,
    /// Calendar timestamps without timezone.
    Datetime,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric => write!(f, "Numeric"),
            Self::Categorical => write!(f, "Categorical"),
            Self::Datetime => write!(f, "Datetime"),
        }
    }
}

// ── GroupKey ──────────────────────────────────────────────────────────

/// A single cell value used as a grouping key.
///
/// Keys from one column always share a variant; ordering within a variant
/// is numeric, lexicographic, or chronological respectively. Equality
/// follows the same total order, so sorting and bucketing agree.
#[derive(Debug, Clone)]
pub enum GroupKey {
    Number(f64),
    Label(String),
    Time(NaiveDateTime),
}

impl GroupKey {
    fn rank(&self) -> u8 {
        match self {
            Self::Number(_) => 0,
            Self::Label(_) => 1,
            Self::Time(_) => 2,
        }
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Label(a), Self::Label(b)) => a.cmp(b),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Label(s) => write!(f, "{s}"),
            Self::Time(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

// ── Column ────────────────────────────────────────────────────────────

/// A typed column with validity bitmap for missing values.
///
/// Missing positions hold a placeholder (0.0, index 0, or the Unix epoch)
/// that must be ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Dense `f64` values. Missing positions hold `0.0`.
    Numeric {
        values: Vec<f64>,
        validity: ValidityBitmap,
    },
    /// Dictionary-encoded categorical column.
    ///
    /// `dictionary` contains unique labels in first-seen order and
    /// `indices` maps each row to a dictionary entry.
    Categorical {
        dictionary: Vec<String>,
        indices: Vec<u32>,
        validity: ValidityBitmap,
    },
    /// Timestamps. Missing positions hold the Unix epoch.
    Datetime {
        values: Vec<NaiveDateTime>,
        validity: ValidityBitmap,
    },
}

impl Column {
    /// Creates a numeric column.
    pub fn numeric(values: Vec<f64>, validity: ValidityBitmap) -> Self {
        Self::Numeric { values, validity }
    }

    /// Creates a categorical column from a dictionary and indices.
    pub fn categorical(dictionary: Vec<String>, indices: Vec<u32>, validity: ValidityBitmap) -> Self {
        Self::Categorical {
            dictionary,
            indices,
            validity,
        }
    }

    /// Creates a datetime column.
    pub fn datetime(values: Vec<NaiveDateTime>, validity: ValidityBitmap) -> Self {
        Self::Datetime { values, validity }
    }

    /// Creates a numeric column from raw values; `NaN` marks a missing cell.
    pub fn from_values(values: Vec<f64>) -> Self {
        let mut validity = ValidityBitmap::empty();
        let values = values
            .into_iter()
            .map(|v| {
                validity.push(!v.is_nan());
                if v.is_nan() {
                    0.0
                } else {
                    v
                }
            })
            .collect();
        Self::Numeric { values, validity }
    }

    /// Creates a numeric column where `None` marks a missing cell.
    pub fn from_options(values: &[Option<f64>]) -> Self {
        let mut validity = ValidityBitmap::empty();
        let values = values
            .iter()
            .map(|v| {
                validity.push(v.is_some());
                v.unwrap_or(0.0)
            })
            .collect();
        Self::Numeric { values, validity }
    }

    /// Creates a categorical column from labels; `None` marks a missing cell.
    pub fn from_labels(labels: &[Option<&str>]) -> Self {
        let mut lookup: HashMap<&str, u32> = HashMap::new();
        let mut dictionary = Vec::new();
        let mut indices = Vec::with_capacity(labels.len());
        let mut validity = ValidityBitmap::empty();
        for label in labels.iter().copied() {
            match label {
                Some(l) => {
                    let idx = *lookup.entry(l).or_insert_with(|| {
                        dictionary.push(l.to_string());
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
        Self::Categorical {
            dictionary,
            indices,
            validity,
        }
    }

    /// Creates a datetime column where `None` marks a missing cell.
    pub fn from_timestamps(values: &[Option<NaiveDateTime>]) -> Self {
        let mut validity = ValidityBitmap::empty();
        let values = values
            .iter()
            .map(|v| {
                validity.push(v.is_some());
                v.unwrap_or_default()
            })
            .collect();
        Self::Datetime { values, validity }
    }

    /// Returns the data type of this column.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Numeric { .. } => DataType::Numeric,
            Self::Categorical { .. } => DataType::Categorical,
            Self::Datetime { .. } => DataType::Datetime,
        }
    }

    /// Returns the number of rows in this column.
    pub fn len(&self) -> usize {
        self.validity().len()
    }

    /// Returns `true` if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a reference to the validity bitmap.
    pub fn validity(&self) -> &ValidityBitmap {
        match self {
            Self::Numeric { validity, .. }
            | Self::Categorical { validity, .. }
            | Self::Datetime { validity, .. } => validity,
        }
    }

    /// Returns the number of missing values.
    pub fn null_count(&self) -> usize {
        self.validity().null_count()
    }

    /// Returns the number of present values.
    pub fn valid_count(&self) -> usize {
        self.validity().valid_count()
    }

    /// Returns `true` if the value at `idx` is present.
    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity().is_valid(idx)
    }

    /// Returns the numeric value at `idx`, or `None` if missing or not numeric.
    pub fn numeric_at(&self, idx: usize) -> Option<f64> {
        match self {
            Self::Numeric { values, validity } if validity.is_valid(idx) => Some(values[idx]),
            _ => None,
        }
    }

    /// Returns present numeric values (missing excluded), or `None` if not numeric.
    pub fn valid_numeric_values(&self) -> Option<Vec<f64>> {
        match self {
            Self::Numeric { values, validity } => {
                Some(validity.valid_indices().map(|i| values[i]).collect())
            }
            _ => None,
        }
    }

    /// Returns present numeric values paired with their row index.
    pub fn indexed_numeric_values(&self) -> Option<Vec<(usize, f64)>> {
        match self {
            Self::Numeric { values, validity } => {
                Some(validity.valid_indices().map(|i| (i, values[i])).collect())
            }
            _ => None,
        }
    }

    /// Returns the label for a row of a categorical column.
    pub fn category_at(&self, idx: usize) -> Option<&str> {
        match self {
            Self::Categorical {
                dictionary,
                indices,
                validity,
            } if validity.is_valid(idx) => dictionary.get(indices[idx] as usize).map(String::as_str),
            _ => None,
        }
    }

    /// Returns the grouping key for a row, or `None` if the cell is missing.
    pub fn key_at(&self, idx: usize) -> Option<GroupKey> {
        if !self.is_valid(idx) {
            return None;
        }
        match self {
            // -0.0 + 0.0 is +0.0, so signed zeros share a group.
            Self::Numeric { values, .. } => Some(GroupKey::Number(values[idx] + 0.0)),
            Self::Categorical { .. } => self.category_at(idx).map(|s| GroupKey::Label(s.to_string())),
            Self::Datetime { values, .. } => Some(GroupKey::Time(values[idx])),
        }
    }
}

// ── DataFrame ─────────────────────────────────────────────────────────

/// Column-major tabular data structure.
///
/// All columns have the same number of rows.
#[derive(Debug, Clone)]
pub struct DataFrame {
    names: Vec<String>,
    columns: Vec<Column>,
    row_count: usize,
}

impl DataFrame {
    /// Creates an empty DataFrame with no columns or rows.
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            columns: Vec::new(),
            row_count: 0,
        }
    }

    /// Adds a named column to the DataFrame.
    ///
    /// Returns an error if the column length doesn't match the existing
    /// row count (unless this is the first column).
    pub fn add_column(&mut self, name: impl Into<String>, column: Column) -> Result<(), AnalysisError> {
        let col_len = column.len();
        if self.columns.is_empty() {
            self.row_count = col_len;
        } else if col_len != self.row_count {
            return Err(AnalysisError::DimensionMismatch {
                expected: self.row_count,
                actual: col_len,
            });
        }
        self.names.push(name.into());
        self.columns.push(column);
        Ok(())
    }

    /// Builder-style variant of [`add_column`](Self::add_column).
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self, AnalysisError> {
        self.add_column(name, column)?;
        Ok(self)
    }

    /// Returns the number of rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the number of columns.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the DataFrame has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns column names.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Returns a reference to the column at `index`.
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Returns a reference to the column with the given `name`.
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    /// Looks up a column, failing with [`AnalysisError::ColumnNotFound`].
    pub fn require(&self, name: &str) -> Result<&Column, AnalysisError> {
        self.column_by_name(name)
            .ok_or_else(|| AnalysisError::ColumnNotFound {
                name: name.to_string(),
            })
    }

    /// Looks up a column that must be numeric.
    pub fn require_numeric(&self, name: &str) -> Result<&Column, AnalysisError> {
        let col = self.require(name)?;
        if col.data_type() != DataType::Numeric {
            return Err(AnalysisError::NonNumericColumn {
                column: name.to_string(),
            });
        }
        Ok(col)
    }

    /// Returns an iterator over (name, column) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    /// Returns the names of all numeric columns, in column order.
    pub fn numeric_column_names(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, c)| c.data_type() == DataType::Numeric)
            .map(|(n, _)| n)
            .collect()
    }

    /// Returns a summary of column data types.
    pub fn schema(&self) -> Vec<(&str, DataType)> {
        self.iter().map(|(n, c)| (n, c.data_type())).collect()
    }

    /// Partitions the present values of `value_col` by the keys of `group_col`.
    ///
    /// Rows where either cell is missing are skipped. Groups are returned
    /// in ascending key order.
    pub fn grouped_values(
        &self,
        value_col: &str,
        group_col: &str,
    ) -> Result<Vec<(GroupKey, Vec<f64>)>, AnalysisError> {
        let values = self.require_numeric(value_col)?;
        let groups = self.require(group_col)?;

        let mut buckets: Vec<(GroupKey, Vec<f64>)> = Vec::new();
        for row in 0..self.row_count {
            let (Some(key), Some(v)) = (groups.key_at(row), values.numeric_at(row)) else {
                continue;
            };
            match buckets.iter_mut().find(|(k, _)| *k == key) {
                Some((_, bucket)) => bucket.push(v),
                None => buckets.push((key, vec![v])),
            }
        }
        buckets.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(buckets)
    }
}

impl Default for DataFrame {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
