//! Descriptive statistics for numeric columns.
//!
//! Missing values are expected input here: they are counted and reported,
//! never treated as zeros. Statistics that cannot be computed for a
//! column (a spread from one value, a CV around a zero mean) are `None`
//! and explained by a [`SummaryFlag`] instead of being clamped.
//!
//! ```
//! use sigma_insight::dataframe::{Column, DataFrame};
//! use sigma_insight::descriptive::descriptive_statistics;
//!
//! let df = DataFrame::new()
//!     .with_column("cycle_time", Column::from_options(&[Some(4.0), Some(6.0), None, Some(5.0)]))
//!     .unwrap();
//! let stats = descriptive_statistics(&df, None).unwrap();
//!
//! assert_eq!(stats[0].count, 3);
//! assert_eq!(stats[0].missing, 1);
//! assert_eq!(stats[0].mean, Some(5.0));
//! assert_eq!(stats[0].median, Some(5.0));
//! ```

use serde::Serialize;
use tracing::debug;

use crate::dataframe::DataFrame;
use crate::error::AnalysisError;

/// Condition that left one or more statistics of a column undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SummaryFlag {
    /// Every cell is missing.
    AllMissing,
    /// Only one value present; standard deviation needs two.
    SingleValue,
    /// All present values are identical.
    ConstantColumn,
    /// Mean is zero, so the coefficient of variation is undefined.
    ZeroMean,
}

impl std::fmt::Display for SummaryFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllMissing => write!(f, "ALL_MISSING"),
            Self::SingleValue => write!(f, "SINGLE_VALUE"),
            Self::ConstantColumn => write!(f, "CONSTANT_COLUMN"),
            Self::ZeroMean => write!(f, "ZERO_MEAN"),
        }
    }
}

/// Summary statistics for one numeric column (computed over present values).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    /// Column name.
    pub name: String,
    /// Number of present values.
    pub count: usize,
    /// Number of missing values.
    pub missing: usize,
    /// Missing values as a percentage of the dataset row count.
    pub missing_pct: f64,
    /// Arithmetic mean.
    pub mean: Option<f64>,
    /// Sample standard deviation (n − 1 denominator).
    pub std_dev: Option<f64>,
    /// Minimum.
    pub min: Option<f64>,
    /// First quartile (linear interpolation).
    pub q1: Option<f64>,
    /// Median.
    pub median: Option<f64>,
    /// Third quartile (linear interpolation).
    pub q3: Option<f64>,
    /// Maximum.
    pub max: Option<f64>,
    /// Coefficient of variation in percent: std / mean × 100.
    pub cv_pct: Option<f64>,
    /// Conditions that left statistics undefined.
    pub flags: Vec<SummaryFlag>,
}

/// Computes descriptive statistics for numeric columns.
///
/// With `columns = None` every numeric column is summarized, in column
/// order. Explicitly named columns must exist and be numeric.
///
/// # Errors
///
/// - [`AnalysisError::ColumnNotFound`] / [`AnalysisError::NonNumericColumn`]
///   for a bad explicit selection.
/// - [`AnalysisError::NoNumericColumns`] if nothing numeric is selected.
pub fn descriptive_statistics(
    df: &DataFrame,
    columns: Option<&[&str]>,
) -> Result<Vec<ColumnSummary>, AnalysisError> {
    let selected: Vec<&str> = match columns {
        Some(names) => {
            for name in names {
                df.require_numeric(name)?;
            }
            names.to_vec()
        }
        None => df.numeric_column_names(),
    };

    if selected.is_empty() {
        return Err(AnalysisError::NoNumericColumns);
    }
    debug!(columns = selected.len(), rows = df.row_count(), "descriptive statistics");

    selected
        .into_iter()
        .map(|name| {
            let col = df.require_numeric(name)?;
            let values = col.valid_numeric_values().unwrap_or_default();
            Ok(summarize(name, &values, col.null_count(), df.row_count()))
        })
        .collect()
}

fn summarize(name: &str, values: &[f64], missing: usize, row_count: usize) -> ColumnSummary {
    let count = values.len();
    let missing_pct = if row_count > 0 {
        missing as f64 / row_count as f64 * 100.0
    } else {
        0.0
    };

    let mut flags = Vec::new();
    match count {
        0 => flags.push(SummaryFlag::AllMissing),
        1 => flags.push(SummaryFlag::SingleValue),
        _ => {}
    }

    let mean = u_numflow::stats::mean(values);
    let std_dev = u_numflow::stats::std_dev(values);
    let min = u_numflow::stats::min(values);
    let max = u_numflow::stats::max(values);

    if count > 1 && min == max {
        flags.push(SummaryFlag::ConstantColumn);
    }

    let cv_pct = match (mean, std_dev) {
        (Some(m), Some(s)) if m != 0.0 => Some(s / m * 100.0),
        (Some(_), Some(_)) => {
            debug!(column = name, "coefficient of variation undefined for zero mean");
            flags.push(SummaryFlag::ZeroMean);
            None
        }
        _ => None,
    };

    ColumnSummary {
        name: name.to_string(),
        count,
        missing,
        missing_pct,
        mean,
        std_dev,
        min,
        q1: u_numflow::stats::quantile(values, 0.25),
        median: u_numflow::stats::median(values),
        q3: u_numflow::stats::quantile(values, 0.75),
        max,
        cv_pct,
        flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataframe::Column;
    use proptest::prelude::*;

    fn frame() -> DataFrame {
        DataFrame::new()
            .with_column("x", Column::from_values(vec![1.0, 2.0, 3.0, 4.0, f64::NAN]))
            .unwrap()
            .with_column(
                "shift",
                Column::from_labels(&[Some("A"), Some("B"), Some("A"), Some("B"), Some("A")]),
            )
            .unwrap()
            .with_column("centered", Column::from_values(vec![-2.0, -1.0, 0.0, 1.0, 2.0]))
            .unwrap()
    }

    #[test]
    fn auto_selects_numeric_columns() {
        let stats = descriptive_statistics(&frame(), None).unwrap();
        let names: Vec<&str> = stats.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["x", "centered"]);
    }

    #[test]
    fn basic_statistics() {
        let stats = descriptive_statistics(&frame(), Some(&["x"])).unwrap();
        let x = &stats[0];
        assert_eq!(x.count, 4);
        assert_eq!(x.missing, 1);
        assert!((x.missing_pct - 20.0).abs() < 1e-12);
        assert_eq!(x.mean, Some(2.5));
        assert!((x.std_dev.unwrap() - 1.290_994_448_735_805_6).abs() < 1e-12);
        assert_eq!(x.min, Some(1.0));
        assert_eq!(x.q1, Some(1.75));
        assert_eq!(x.median, Some(2.5));
        assert_eq!(x.q3, Some(3.25));
        assert_eq!(x.max, Some(4.0));
        let cv = x.cv_pct.unwrap();
        assert!((cv - 51.639_777_949_432_22).abs() < 1e-9);
        assert!(x.flags.is_empty());
    }

    #[test]
    fn zero_mean_cv_is_surfaced() {
        let stats = descriptive_statistics(&frame(), Some(&["centered"])).unwrap();
        assert_eq!(stats[0].mean, Some(0.0));
        assert!(stats[0].cv_pct.is_none());
        assert!(stats[0].flags.contains(&SummaryFlag::ZeroMean));
    }

    #[test]
    fn single_value_has_no_spread() {
        let df = DataFrame::new()
            .with_column("x", Column::from_options(&[Some(7.0), None]))
            .unwrap();
        let stats = descriptive_statistics(&df, None).unwrap();
        assert_eq!(stats[0].mean, Some(7.0));
        assert!(stats[0].std_dev.is_none());
        assert!(stats[0].cv_pct.is_none());
        assert_eq!(stats[0].flags, vec![SummaryFlag::SingleValue]);
    }

    #[test]
    fn all_missing_column() {
        let df = DataFrame::new()
            .with_column("x", Column::from_options(&[None, None]))
            .unwrap();
        let stats = descriptive_statistics(&df, None).unwrap();
        assert_eq!(stats[0].count, 0);
        assert!(stats[0].mean.is_none());
        assert_eq!(stats[0].missing_pct, 100.0);
        assert!(stats[0].flags.contains(&SummaryFlag::AllMissing));
    }

    #[test]
    fn constant_column_flagged() {
        let df = DataFrame::new()
            .with_column("x", Column::from_values(vec![5.0, 5.0, 5.0]))
            .unwrap();
        let stats = descriptive_statistics(&df, None).unwrap();
        assert_eq!(stats[0].std_dev, Some(0.0));
        assert_eq!(stats[0].cv_pct, Some(0.0));
        assert!(stats[0].flags.contains(&SummaryFlag::ConstantColumn));
    }

    #[test]
    fn selection_errors() {
        let df = frame();
        assert!(matches!(
            descriptive_statistics(&df, Some(&["shift"])),
            Err(AnalysisError::NonNumericColumn { .. })
        ));
        assert!(matches!(
            descriptive_statistics(&df, Some(&["nope"])),
            Err(AnalysisError::ColumnNotFound { .. })
        ));
        let labels_only = DataFrame::new()
            .with_column("g", Column::from_labels(&[Some("a")]))
            .unwrap();
        assert_eq!(
            descriptive_statistics(&labels_only, None).unwrap_err(),
            AnalysisError::NoNumericColumns
        );
    }

    proptest! {
        #[test]
        fn quartiles_are_ordered(values in prop::collection::vec(-1.0e6..1.0e6f64, 2..200)) {
            let df = DataFrame::new().with_column("v", Column::from_values(values)).unwrap();
            let s = &descriptive_statistics(&df, None).unwrap()[0];
            let (min, q1, med, q3, max) = (
                s.min.unwrap(), s.q1.unwrap(), s.median.unwrap(), s.q3.unwrap(), s.max.unwrap(),
            );
            prop_assert!(min <= q1);
            prop_assert!(q1 <= med);
            prop_assert!(med <= q3);
            prop_assert!(q3 <= max);
        }

        #[test]
        fn repeated_calls_are_identical(values in prop::collection::vec(-100.0..100.0f64, 0..50)) {
            let df = DataFrame::new().with_column("v", Column::from_values(values)).unwrap();
            let first = descriptive_statistics(&df, None).unwrap();
            let second = descriptive_statistics(&df, None).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
