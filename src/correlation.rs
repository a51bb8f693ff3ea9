//! Correlation matrices with pairwise significance tests.
//!
//! Every numeric column takes part. Each pair uses the rows where both
//! cells are present, so different pairs may rest on different sample
//! sizes. Coefficients come from `u_analytics::correlation`. The p-value
//! comes from the test matching the method: the t-test on r for Pearson
//! and on ρ for Spearman, and the normal approximation to Kendall's τ-b
//! with full tie correction.
//!
//! ```
//! use sigma_insight::config::AnalysisConfig;
//! use sigma_insight::correlation::{correlation_analysis, CorrelationMethod};
//! use sigma_insight::dataframe::{Column, DataFrame};
//!
//! let df = DataFrame::new()
//!     .with_column("x", Column::from_values(vec![1.0, 2.0, 3.0, 4.0, 5.0]))
//!     .unwrap()
//!     .with_column("y", Column::from_values(vec![2.1, 3.9, 6.1, 7.9, 10.1]))
//!     .unwrap();
//!
//! let result = correlation_analysis(&df, CorrelationMethod::Pearson, &AnalysisConfig::default()).unwrap();
//! assert!(result.get("x", "y").unwrap() > 0.99);
//! assert_eq!(result.get("x", "y"), result.get("y", "x"));
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use u_analytics::correlation::{kendall_tau_b, pearson, spearman};

use crate::config::AnalysisConfig;
use crate::dataframe::DataFrame;
use crate::error::AnalysisError;
use crate::special::normal_sf;

/// Fewest complete rows for which a pair gets a coefficient.
pub const MIN_PAIR_ROWS: usize = 3;

/// Method for correlation computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    /// Pearson product-moment correlation.
    Pearson,
    /// Spearman rank correlation (average ranks for ties).
    Spearman,
    /// Kendall's τ-b.
    Kendall,
}

impl FromStr for CorrelationMethod {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pearson" => Ok(Self::Pearson),
            "spearman" => Ok(Self::Spearman),
            "kendall" => Ok(Self::Kendall),
            _ => Err(AnalysisError::UnsupportedMethod {
                method: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pearson => write!(f, "pearson"),
            Self::Spearman => write!(f, "spearman"),
            Self::Kendall => write!(f, "kendall"),
        }
    }
}

/// A column pair whose correlation is significant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationPair {
    pub col_a: String,
    pub col_b: String,
    pub r: f64,
    pub p_value: f64,
    /// Complete rows used for this pair.
    pub n: usize,
}

/// Result of correlation analysis.
///
/// Matrices are indexed in `names` order and are symmetric. An entry is
/// `None` when the pair has fewer than 3 complete rows or one side is
/// constant over them. The diagonal is r = 1, p = 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationAnalysis {
    pub method: CorrelationMethod,
    /// Column names.
    pub names: Vec<String>,
    /// Correlation coefficients.
    pub matrix: Vec<Vec<Option<f64>>>,
    /// Two-sided p-values.
    pub p_values: Vec<Vec<Option<f64>>>,
    /// Complete rows behind each entry.
    pub n_observations: Vec<Vec<usize>>,
    /// Off-diagonal pairs with p < α, sorted by |r| descending.
    pub significant_pairs: Vec<CorrelationPair>,
}

impl CorrelationAnalysis {
    fn index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Coefficient between two named columns.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        self.matrix[self.index(a)?][self.index(b)?]
    }

    /// p-value between two named columns.
    pub fn p_value(&self, a: &str, b: &str) -> Option<f64> {
        self.p_values[self.index(a)?][self.index(b)?]
    }
}

/// Computes the correlation and p-value matrices over all numeric columns.
///
/// # Errors
///
/// - [`AnalysisError::NoNumericColumns`] when the frame has no numeric column.
/// - [`AnalysisError::InsufficientData`] with a single numeric column.
pub fn correlation_analysis(
    df: &DataFrame,
    method: CorrelationMethod,
    config: &AnalysisConfig,
) -> Result<CorrelationAnalysis, AnalysisError> {
    let names = df.numeric_column_names();
    if names.is_empty() {
        return Err(AnalysisError::NoNumericColumns);
    }
    if names.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            min_required: 2,
            actual: names.len(),
        });
    }
    debug!(columns = names.len(), rows = df.row_count(), %method, "correlation analysis");

    let columns = names
        .iter()
        .map(|name| df.require_numeric(name))
        .collect::<Result<Vec<_>, _>>()?;

    let k = names.len();
    let mut matrix = vec![vec![None; k]; k];
    let mut p_values = vec![vec![None; k]; k];
    let mut n_observations = vec![vec![0usize; k]; k];
    let mut significant_pairs = Vec::new();

    for i in 0..k {
        let own = columns[i].valid_count();
        matrix[i][i] = (own > 0).then_some(1.0);
        p_values[i][i] = (own > 0).then_some(0.0);
        n_observations[i][i] = own;

        for j in (i + 1)..k {
            let (x, y): (Vec<f64>, Vec<f64>) = (0..df.row_count())
                .filter_map(|row| Some((columns[i].numeric_at(row)?, columns[j].numeric_at(row)?)))
                .filter(|(a, b)| a.is_finite() && b.is_finite())
                .unzip();
            let n = x.len();
            n_observations[i][j] = n;
            n_observations[j][i] = n;

            let Some((r, p)) = pair_correlation(&x, &y, method) else {
                warn!(a = names[i], b = names[j], n, "correlation undefined for pair");
                continue;
            };
            matrix[i][j] = Some(r);
            matrix[j][i] = Some(r);
            p_values[i][j] = Some(p);
            p_values[j][i] = Some(p);

            if p < config.significance_level {
                significant_pairs.push(CorrelationPair {
                    col_a: names[i].to_string(),
                    col_b: names[j].to_string(),
                    r,
                    p_value: p,
                    n,
                });
            }
        }
    }

    significant_pairs.sort_by(|a, b| b.r.abs().total_cmp(&a.r.abs()));

    Ok(CorrelationAnalysis {
        method,
        names: names.iter().map(|n| n.to_string()).collect(),
        matrix,
        p_values,
        n_observations,
        significant_pairs,
    })
}

/// Coefficient and two-sided p-value for one pair of complete samples.
fn pair_correlation(x: &[f64], y: &[f64], method: CorrelationMethod) -> Option<(f64, f64)> {
    if x.len() < MIN_PAIR_ROWS {
        return None;
    }
    match method {
        CorrelationMethod::Pearson => pearson(x, y).map(|c| (c.r, c.p_value)),
        CorrelationMethod::Spearman => spearman(x, y).map(|c| (c.r, c.p_value)),
        CorrelationMethod::Kendall => {
            let tau = kendall_tau_b(x, y)?.r;
            Some((tau, kendall_p_value(tau, x, y)))
        }
    }
}

/// Tie sums over groups of equal values: Σt(t−1)/2, Σt(t−1)(t−2), Σt(t−1)(2t+5).
fn tie_sums(values: &[f64]) -> (f64, f64, f64) {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut sums = (0.0, 0.0, 0.0);
    let mut start = 0;
    while start < sorted.len() {
        let mut end = start + 1;
        while end < sorted.len() && sorted[end] == sorted[start] {
            end += 1;
        }
        let t = (end - start) as f64;
        if t > 1.0 {
            sums.0 += t * (t - 1.0) / 2.0;
            sums.1 += t * (t - 1.0) * (t - 2.0);
            sums.2 += t * (t - 1.0) * (2.0 * t + 5.0);
        }
        start = end;
    }
    sums
}

/// Two-sided p-value of τ-b under the full tie-corrected variance of S
/// (Kendall 1970), including the joint tie terms.
fn kendall_p_value(tau: f64, x: &[f64], y: &[f64]) -> f64 {
    let nf = x.len() as f64;
    let n0 = nf * (nf - 1.0) / 2.0;
    let (x_ties, x_t2, x_t5) = tie_sums(x);
    let (y_ties, y_t2, y_t5) = tie_sums(y);
    let s = (tau * ((n0 - x_ties) * (n0 - y_ties)).sqrt()).round();

    let m = nf * (nf - 1.0);
    let var = (m * (2.0 * nf + 5.0) - x_t5 - y_t5) / 18.0
        + 2.0 * x_ties * y_ties / m
        + x_t2 * y_t2 / (9.0 * m * (nf - 2.0));
    if var <= 0.0 {
        return 1.0;
    }
    (2.0 * normal_sf(s.abs() / var.sqrt())).min(1.0)
}
