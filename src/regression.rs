//! Ordinary least squares regression with an intercept.
//!
//! The fit itself is `u_analytics::regression::multiple_linear_regression`;
//! this module selects complete rows, guards degenerate designs and adds
//! the residual diagnostics.
//!
//! Rows with a missing cell in the response or any predictor are dropped
//! before fitting. The fit needs at least k + 5 complete rows for k
//! predictors. Diagnostics cover overall model significance, coefficient
//! tests, residual normality and residual autocorrelation.
//!
//! ```
//! use sigma_insight::config::AnalysisConfig;
//! use sigma_insight::dataframe::{Column, DataFrame};
//! use sigma_insight::regression::linear_regression;
//!
//! let df = DataFrame::new()
//!     .with_column("temp", Column::from_values(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]))
//!     .unwrap()
//!     .with_column("yield", Column::from_values(vec![2.1, 3.9, 6.1, 7.9, 10.1, 12.0]))
//!     .unwrap();
//!
//! let fit = linear_regression(&df, "yield", &["temp"], &AnalysisConfig::default()).unwrap();
//! assert!(fit.r_squared > 0.99);
//! assert_eq!(fit.coefficients[0].name, "intercept");
//! assert_eq!(fit.n_observations, 6);
//! ```

use serde::Serialize;
use tracing::debug;
use u_analytics::regression::multiple_linear_regression;
use u_numflow::matrix::Matrix;

use crate::config::AnalysisConfig;
use crate::dataframe::DataFrame;
use crate::error::AnalysisError;
use crate::normality::{shapiro_outcome, ShapiroWilk};
use crate::outcome::{Interpretation, Outcome};
use crate::special::{f_survival, t_two_sided_p};

/// Rows required beyond one per predictor.
pub const EXTRA_ROWS_REQUIRED: usize = 5;

/// One estimated coefficient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficient {
    /// `"intercept"` or the predictor column name.
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_statistic: f64,
    pub p_value: f64,
    pub significant: bool,
    /// Variance inflation factor; `None` for the intercept.
    pub vif: Option<f64>,
}

/// Result of an OLS fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearRegression {
    pub response: String,
    pub predictors: Vec<String>,
    /// Complete rows used in the fit.
    pub n_observations: usize,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    pub f_p_value: f64,
    pub df_model: usize,
    pub df_residual: usize,
    /// Residual standard error √(SSE / df_residual).
    pub residual_std_error: f64,
    /// Intercept first, then predictors in request order.
    pub coefficients: Vec<Coefficient>,
    /// Shapiro–Wilk on the residuals.
    pub residual_normality: Outcome<ShapiroWilk>,
    /// Durbin–Watson statistic in row order; `None` for a perfect fit.
    pub durbin_watson: Option<f64>,
    pub significant: bool,
    pub interpretation: Interpretation,
}

/// Fits `response ~ 1 + predictors` by least squares.
///
/// # Errors
///
/// - Column selection errors for unknown or non-numeric columns, and
///   [`AnalysisError::InvalidParameter`] for an empty predictor list.
/// - [`AnalysisError::InsufficientData`] with fewer than k + 5 complete rows.
/// - [`AnalysisError::DegenerateInput`] for a constant response, a
///   constant predictor, or collinear predictors.
pub fn linear_regression(
    df: &DataFrame,
    response: &str,
    predictors: &[&str],
    config: &AnalysisConfig,
) -> Result<LinearRegression, AnalysisError> {
    if predictors.is_empty() {
        return Err(AnalysisError::invalid_parameter(
            "predictors",
            "at least one predictor is required",
        ));
    }
    let y_col = df.require_numeric(response)?;
    let x_cols = predictors
        .iter()
        .map(|name| df.require_numeric(name))
        .collect::<Result<Vec<_>, _>>()?;

    // Complete rows only.
    let mut y = Vec::new();
    let mut x: Vec<Vec<f64>> = vec![Vec::new(); predictors.len()];
    'rows: for row in 0..df.row_count() {
        let Some(yv) = y_col.numeric_at(row).filter(|v| v.is_finite()) else {
            continue;
        };
        let mut cells = Vec::with_capacity(x_cols.len());
        for col in &x_cols {
            match col.numeric_at(row).filter(|v| v.is_finite()) {
                Some(v) => cells.push(v),
                None => continue 'rows,
            }
        }
        y.push(yv);
        for (dst, v) in x.iter_mut().zip(cells) {
            dst.push(v);
        }
    }

    let n = y.len();
    let k = predictors.len();
    let min_required = k + EXTRA_ROWS_REQUIRED;
    if n < min_required {
        return Err(AnalysisError::InsufficientData {
            min_required,
            actual: n,
        });
    }
    debug!(response, predictors = k, n, dropped = df.row_count() - n, "linear regression");

    let y_mean = y.iter().sum::<f64>() / n as f64;
    let sst: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    if sst == 0.0 {
        return Err(AnalysisError::degenerate(format!("response '{response}' is constant")));
    }
    check_collinearity(&x, predictors)?;

    let refs: Vec<&[f64]> = x.iter().map(Vec::as_slice).collect();
    let fit = multiple_linear_regression(&refs, &y)
        .ok_or_else(|| AnalysisError::degenerate("design matrix is singular"))?;
    if fit.coefficients.iter().any(|b| !b.is_finite()) {
        return Err(AnalysisError::degenerate("design matrix is numerically singular"));
    }

    let residuals = fit.residuals;
    let sse: f64 = residuals.iter().map(|e| e * e).sum();

    let df_model = k;
    let df_residual = n - k - 1;
    let mse = sse / df_residual as f64;
    let r_squared = fit.r_squared.clamp(0.0, 1.0);
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n - 1) as f64 / df_residual as f64;

    let (f_statistic, f_p_value) = if sse == 0.0 {
        (f64::INFINITY, 0.0)
    } else {
        let f = ((sst - sse) / df_model as f64) / mse;
        (f, f_survival(f, df_model as f64, df_residual as f64))
    };

    let alpha = config.significance_level;
    let coefficients = fit
        .coefficients
        .iter()
        .zip(&fit.std_errors)
        .enumerate()
        .map(|(j, (&estimate, &std_error))| {
            let std_error = if std_error.is_nan() { 0.0 } else { std_error };
            let (t_statistic, p_value) = coefficient_test(estimate, std_error, df_residual as f64);
            Coefficient {
                name: if j == 0 {
                    "intercept".to_string()
                } else {
                    predictors[j - 1].to_string()
                },
                estimate,
                std_error,
                t_statistic,
                p_value,
                significant: p_value < alpha,
                vif: if j == 0 { None } else { fit.vif.get(j - 1).copied() },
            }
        })
        .collect();

    let significant = f_p_value < alpha;
    Ok(LinearRegression {
        response: response.to_string(),
        predictors: predictors.iter().map(|s| s.to_string()).collect(),
        n_observations: n,
        r_squared,
        adj_r_squared,
        f_statistic,
        f_p_value,
        df_model,
        df_residual,
        residual_std_error: mse.sqrt(),
        coefficients,
        residual_normality: shapiro_outcome(&residuals, alpha)?,
        durbin_watson: durbin_watson(&residuals),
        significant,
        interpretation: if significant {
            Interpretation::SignificantModel
        } else {
            Interpretation::NonSignificantModel
        },
    })
}

/// Rejects constant predictors and predictors that are linear
/// combinations of each other (near-zero eigenvalue of their correlation matrix).
fn check_collinearity(x: &[Vec<f64>], names: &[&str]) -> Result<(), AnalysisError> {
    let n = x[0].len() as f64;
    let centered: Vec<(Vec<f64>, f64)> = x
        .iter()
        .map(|col| {
            let m = col.iter().sum::<f64>() / n;
            let dev: Vec<f64> = col.iter().map(|v| v - m).collect();
            let norm = dev.iter().map(|d| d * d).sum::<f64>().sqrt();
            (dev, norm)
        })
        .collect();

    if let Some(j) = centered.iter().position(|(_, norm)| *norm == 0.0) {
        return Err(AnalysisError::degenerate(format!(
            "predictor '{}' is constant",
            names[j]
        )));
    }
    let k = x.len();
    if k == 1 {
        return Ok(());
    }

    let mut corr = vec![0.0; k * k];
    for i in 0..k {
        for j in i..k {
            let dot: f64 = centered[i].0.iter().zip(&centered[j].0).map(|(a, b)| a * b).sum();
            let r = dot / (centered[i].1 * centered[j].1);
            corr[i * k + j] = r;
            corr[j * k + i] = r;
        }
    }
    let singular = Matrix::new(k, k, corr)
        .ok()
        .and_then(|m| m.eigen_symmetric().ok())
        .map_or(true, |(eigenvalues, _)| {
            eigenvalues.iter().copied().fold(f64::INFINITY, f64::min) < 1e-10
        });
    if singular {
        return Err(AnalysisError::degenerate("predictors are collinear"));
    }
    Ok(())
}

fn coefficient_test(estimate: f64, std_error: f64, df: f64) -> (f64, f64) {
    if std_error > 0.0 {
        let t = estimate / std_error;
        (t, t_two_sided_p(t, df))
    } else if estimate == 0.0 {
        (0.0, 1.0)
    } else {
        (estimate.signum() * f64::INFINITY, 0.0)
    }
}

/// Σ(eₜ − eₜ₋₁)² / Σeₜ².
fn durbin_watson(residuals: &[f64]) -> Option<f64> {
    let ss: f64 = residuals.iter().map(|e| e * e).sum();
    if ss == 0.0 {
        return None;
    }
    let diff: f64 = residuals.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
    Some(diff / ss)
}
