//! Univariate outlier detection.
//!
//! Missing and non-finite cells are excluded before any bound is computed
//! and are never flagged. Reported indices are row positions in the
//! original column.
//!
//! ```
//! use sigma_insight::config::AnalysisConfig;
//! use sigma_insight::dataframe::Column;
//! use sigma_insight::outliers::{detect_outliers, OutlierMethod};
//!
//! let col = Column::from_values(vec![1.0, 2.0, 3.0, 2.5, 100.0, 2.0, 3.0, 2.0]);
//! let result = detect_outliers(&col, OutlierMethod::Iqr, &AnalysisConfig::default()).unwrap();
//! assert_eq!(result.indices, vec![4]);
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::dataframe::Column;
use crate::error::AnalysisError;

/// Smallest number of present values for which bounds are computed.
pub const MIN_OUTLIER_SAMPLE: usize = 4;

/// Method for univariate outlier detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    /// Tukey fences: outlier if value < Q1 − k·IQR or > Q3 + k·IQR.
    Iqr,
    /// Outlier if |x − mean| / σ exceeds the threshold (population σ).
    Zscore,
}

impl FromStr for OutlierMethod {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iqr" => Ok(Self::Iqr),
            "zscore" | "z-score" | "z_score" => Ok(Self::Zscore),
            _ => Err(AnalysisError::UnsupportedMethod {
                method: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Iqr => write!(f, "iqr"),
            Self::Zscore => write!(f, "zscore"),
        }
    }
}

/// Acceptance interval; values strictly outside are outliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutlierBounds {
    pub lower: f64,
    pub upper: f64,
}

/// Result of outlier detection on a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierResult {
    /// Method used.
    pub method: OutlierMethod,
    /// Number of values the bounds were computed from.
    pub n_valid: usize,
    /// Acceptance interval, or `None` when too few values or zero spread.
    pub bounds: Option<OutlierBounds>,
    /// Row indices of detected outliers, ascending.
    pub indices: Vec<usize>,
    /// Flagged values, aligned with `indices`.
    pub values: Vec<f64>,
    /// Outlier scores: distance past the fence in IQR units, or |z|.
    pub scores: Vec<f64>,
    /// Number of outliers detected.
    pub count: usize,
    /// Percentage of outliers among valid values.
    pub pct: f64,
}

impl OutlierResult {
    fn empty(method: OutlierMethod, n_valid: usize) -> Self {
        Self {
            method,
            n_valid,
            bounds: None,
            indices: Vec::new(),
            values: Vec::new(),
            scores: Vec::new(),
            count: 0,
            pct: 0.0,
        }
    }
}

/// Detects outliers in a numeric column.
///
/// Fewer than [`MIN_OUTLIER_SAMPLE`] present values yields an empty
/// result, as does a column with zero spread under the z-score method.
///
/// # Errors
///
/// [`AnalysisError::NonNumericColumn`] if `col` is not numeric.
pub fn detect_outliers(
    col: &Column,
    method: OutlierMethod,
    config: &AnalysisConfig,
) -> Result<OutlierResult, AnalysisError> {
    let valid: Vec<(usize, f64)> = col
        .indexed_numeric_values()
        .ok_or_else(|| AnalysisError::NonNumericColumn {
            column: format!("<{} column>", col.data_type()),
        })?
        .into_iter()
        .filter(|(_, v)| v.is_finite())
        .collect();

    if valid.len() < MIN_OUTLIER_SAMPLE {
        debug!(n = valid.len(), %method, "too few values for outlier bounds");
        return Ok(OutlierResult::empty(method, valid.len()));
    }

    let vals: Vec<f64> = valid.iter().map(|&(_, v)| v).collect();
    let result = match method {
        OutlierMethod::Iqr => detect_iqr(&valid, &vals, config.iqr_fence),
        OutlierMethod::Zscore => detect_zscore(&valid, &vals, config.zscore_threshold),
    };
    debug!(n = valid.len(), %method, outliers = result.count, "outlier detection");
    Ok(result)
}

fn detect_iqr(valid: &[(usize, f64)], vals: &[f64], k: f64) -> OutlierResult {
    let (Some(q1), Some(q3)) = (
        u_numflow::stats::quantile(vals, 0.25),
        u_numflow::stats::quantile(vals, 0.75),
    ) else {
        return OutlierResult::empty(OutlierMethod::Iqr, valid.len());
    };
    let iqr = q3 - q1;
    let bounds = OutlierBounds {
        lower: q1 - k * iqr,
        upper: q3 + k * iqr,
    };

    collect(OutlierMethod::Iqr, valid, bounds, |v| {
        let past = if v < bounds.lower {
            bounds.lower - v
        } else {
            v - bounds.upper
        };
        if iqr > 0.0 {
            past / iqr
        } else {
            past
        }
    })
}

fn detect_zscore(valid: &[(usize, f64)], vals: &[f64], threshold: f64) -> OutlierResult {
    let n = vals.len() as f64;
    let mean = vals.iter().sum::<f64>() / n;
    let std = (vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();

    if std == 0.0 {
        return OutlierResult::empty(OutlierMethod::Zscore, valid.len());
    }

    let bounds = OutlierBounds {
        lower: mean - threshold * std,
        upper: mean + threshold * std,
    };
    collect(OutlierMethod::Zscore, valid, bounds, |v| ((v - mean) / std).abs())
}

fn collect(
    method: OutlierMethod,
    valid: &[(usize, f64)],
    bounds: OutlierBounds,
    score: impl Fn(f64) -> f64,
) -> OutlierResult {
    let mut result = OutlierResult::empty(method, valid.len());
    result.bounds = Some(bounds);
    for &(idx, v) in valid {
        if v < bounds.lower || v > bounds.upper {
            result.indices.push(idx);
            result.values.push(v);
            result.scores.push(score(v));
        }
    }
    result.count = result.indices.len();
    result.pct = result.count as f64 / valid.len() as f64 * 100.0;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataframe::ValidityBitmap;

    fn config() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    #[test]
    fn iqr_flags_extreme_value() {
        let col = Column::from_values(vec![1.0, 2.0, 2.5, 3.0, 2.0, 3.0, 2.5, 100.0]);
        let result = detect_outliers(&col, OutlierMethod::Iqr, &config()).unwrap();
        assert_eq!(result.indices, vec![7]);
        assert_eq!(result.values, vec![100.0]);
        assert_eq!(result.count, 1);
        assert!((result.pct - 12.5).abs() < 1e-12);
        let bounds = result.bounds.unwrap();
        // Q1 = 2.0, Q3 = 3.0
        assert!((bounds.lower - 0.5).abs() < 1e-12);
        assert!((bounds.upper - 4.5).abs() < 1e-12);
        assert!((result.scores[0] - 95.5).abs() < 1e-12);
    }

    #[test]
    fn zscore_flags_extreme_value() {
        let mut data: Vec<f64> = (0..50).map(f64::from).collect();
        data.push(500.0);
        let col = Column::from_values(data);
        let result = detect_outliers(&col, OutlierMethod::Zscore, &config()).unwrap();
        assert_eq!(result.indices, vec![50]);
        assert!(result.scores[0] > 3.0);
    }

    #[test]
    fn zscore_uses_population_deviation() {
        // mean 0, population σ = 1 exactly; ±1 are within any positive threshold.
        let col = Column::from_values(vec![-1.0, 1.0, -1.0, 1.0]);
        let tight = config().with_zscore_threshold(0.99);
        let result = detect_outliers(&col, OutlierMethod::Zscore, &tight).unwrap();
        assert_eq!(result.count, 4);
        let loose = config().with_zscore_threshold(1.0);
        let result = detect_outliers(&col, OutlierMethod::Zscore, &loose).unwrap();
        assert_eq!(result.count, 0);
    }

    #[test]
    fn missing_values_never_flagged() {
        let mut validity = ValidityBitmap::all_valid(6);
        validity.set_invalid(2);
        let col = Column::numeric(vec![1.0, 2.0, 999.0, 3.0, 2.0, 100.0], validity);
        let result = detect_outliers(&col, OutlierMethod::Iqr, &config()).unwrap();
        assert_eq!(result.n_valid, 5);
        assert!(result.indices.contains(&5));
        assert!(!result.indices.contains(&2));
    }

    #[test]
    fn fewer_than_four_values_is_empty_not_error() {
        let col = Column::from_values(vec![1.0, 50.0, 1000.0]);
        for method in [OutlierMethod::Iqr, OutlierMethod::Zscore] {
            let result = detect_outliers(&col, method, &config()).unwrap();
            assert_eq!(result.count, 0);
            assert!(result.indices.is_empty());
            assert!(result.bounds.is_none());
        }
    }

    #[test]
    fn zero_spread_has_no_zscore_outliers() {
        let col = Column::from_values(vec![5.0; 10]);
        let result = detect_outliers(&col, OutlierMethod::Zscore, &config()).unwrap();
        assert_eq!(result.count, 0);
        assert!(result.bounds.is_none());
    }

    #[test]
    fn custom_fence_widens_bounds() {
        let col = Column::from_values(vec![1.0, 2.0, 2.5, 3.0, 2.0, 3.0, 2.5, 6.0]);
        let default = detect_outliers(&col, OutlierMethod::Iqr, &config()).unwrap();
        assert_eq!(default.count, 1);
        let wide = detect_outliers(&col, OutlierMethod::Iqr, &config().with_iqr_fence(3.0)).unwrap();
        assert_eq!(wide.count, 0);
    }

    #[test]
    fn non_numeric_column_rejected() {
        let col = Column::from_labels(&[Some("a"), Some("b"), Some("c"), Some("d")]);
        assert!(matches!(
            detect_outliers(&col, OutlierMethod::Iqr, &config()),
            Err(AnalysisError::NonNumericColumn { .. })
        ));
    }

    #[test]
    fn method_parsing() {
        assert_eq!("IQR".parse::<OutlierMethod>().unwrap(), OutlierMethod::Iqr);
        assert_eq!("zscore".parse::<OutlierMethod>().unwrap(), OutlierMethod::Zscore);
        let err = "mad".parse::<OutlierMethod>().unwrap_err();
        assert_eq!(err, AnalysisError::UnsupportedMethod { method: "mad".into() });
    }
}
