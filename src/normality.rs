//! Normality tests: Shapiro–Wilk and Anderson–Darling.
//!
//! Statistics and p-values come from `u_analytics::testing`; this module
//! adds the sample-size preconditions, skip outcomes and the tabulated
//! Anderson–Darling critical values.
//!
//! The two tests use different decision conventions. Shapiro–Wilk
//! compares its p-value against the significance level; Anderson–Darling
//! compares its statistic against a tabulated critical value. Each test
//! has its own minimum sample size and is reported as skipped below it.
//!
//! ```
//! use sigma_insight::config::AnalysisConfig;
//! use sigma_insight::normality::normality_tests;
//!
//! let values = [2.1, 3.4, 1.9, 5.6, 4.2, 3.3, 2.8, 4.9, 3.9, 4.4];
//! let report = normality_tests(&values, &AnalysisConfig::default()).unwrap();
//!
//! let sw = report.shapiro_wilk.computed().unwrap();
//! assert!(sw.normal);
//! let ad = report.anderson_darling.computed().unwrap();
//! assert!(ad.statistic < ad.critical_value);
//! ```

use serde::Serialize;
use tracing::{debug, warn};
use u_analytics::testing::{anderson_darling_test, shapiro_wilk_test};

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::outcome::{Interpretation, Outcome, SkipReason};

/// Minimum sample size for Shapiro–Wilk.
pub const SHAPIRO_MIN_SAMPLE: usize = 3;
/// Largest sample the Royston approximation supports.
pub const SHAPIRO_MAX_SAMPLE: usize = 5000;
/// Minimum sample size for Anderson–Darling.
pub const ANDERSON_MIN_SAMPLE: usize = 8;

// ── Result types ──────────────────────────────────────────────────────

/// Shapiro–Wilk W test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapiroWilk {
    pub statistic: f64,
    pub p_value: f64,
    /// `p_value > α`.
    pub normal: bool,
    pub interpretation: Interpretation,
}

/// Tabulated Anderson–Darling critical value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CriticalValue {
    /// Significance level in percent.
    pub significance_pct: f64,
    pub value: f64,
}

/// Anderson–Darling A² test for normality with estimated mean and σ.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AndersonDarling {
    pub statistic: f64,
    /// Approximate p-value of the size-corrected statistic (D'Agostino & Stephens).
    /// Informational; the verdict uses the critical value.
    pub p_value: f64,
    /// Critical value at the 5% significance level.
    pub critical_value: f64,
    /// Critical values at 15, 10, 5, 2.5 and 1 percent.
    pub critical_values: Vec<CriticalValue>,
    /// `statistic < critical_value`.
    pub normal: bool,
    pub interpretation: Interpretation,
}

/// Both normality tests on one sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalityReport {
    pub n: usize,
    pub shapiro_wilk: Outcome<ShapiroWilk>,
    pub anderson_darling: Outcome<AndersonDarling>,
}

// ── Entry point ───────────────────────────────────────────────────────

/// Runs Shapiro–Wilk and Anderson–Darling on `values`.
///
/// A test whose sample-size range is not met, or that cannot run on a
/// constant sample, is reported as [`Outcome::Skipped`].
///
/// # Errors
///
/// [`AnalysisError::InvalidParameter`] if any value is non-finite.
pub fn normality_tests(
    values: &[f64],
    config: &AnalysisConfig,
) -> Result<NormalityReport, AnalysisError> {
    ensure_finite(values)?;
    debug!(n = values.len(), "normality tests");

    Ok(NormalityReport {
        n: values.len(),
        shapiro_wilk: shapiro_outcome(values, config.significance_level)?,
        anderson_darling: Outcome::from_result(anderson_darling(values))?,
    })
}

/// Shapiro–Wilk as a sub-test: too few, too many or constant values skip it.
pub(crate) fn shapiro_outcome(
    values: &[f64],
    alpha: f64,
) -> Result<Outcome<ShapiroWilk>, AnalysisError> {
    if values.len() > SHAPIRO_MAX_SAMPLE {
        warn!(
            n = values.len(),
            max = SHAPIRO_MAX_SAMPLE,
            "Shapiro-Wilk skipped: sample above supported size"
        );
        return Ok(Outcome::skipped(SkipReason::SampleTooLarge {
            max_supported: SHAPIRO_MAX_SAMPLE,
            actual: values.len(),
        }));
    }
    Outcome::from_result(shapiro_wilk(values, alpha))
}

fn ensure_finite(values: &[f64]) -> Result<(), AnalysisError> {
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(AnalysisError::invalid_parameter(
            "values",
            format!("must be finite, found {bad}"),
        ));
    }
    Ok(())
}

fn verdict(normal: bool) -> Interpretation {
    if normal {
        Interpretation::Normal
    } else {
        Interpretation::NotNormal
    }
}

// ── Shapiro–Wilk ──────────────────────────────────────────────────────

/// Shapiro–Wilk test at significance level `alpha` (Royston 1995, AS R94).
///
/// # Errors
///
/// - [`AnalysisError::InsufficientData`] for fewer than 3 values.
/// - [`AnalysisError::InvalidParameter`] above 5000 values or for non-finite values.
/// - [`AnalysisError::DegenerateInput`] when all values are equal.
pub fn shapiro_wilk(values: &[f64], alpha: f64) -> Result<ShapiroWilk, AnalysisError> {
    let n = values.len();
    if n < SHAPIRO_MIN_SAMPLE {
        return Err(AnalysisError::InsufficientData {
            min_required: SHAPIRO_MIN_SAMPLE,
            actual: n,
        });
    }
    if n > SHAPIRO_MAX_SAMPLE {
        return Err(AnalysisError::invalid_parameter(
            "values",
            format!("Shapiro-Wilk supports at most {SHAPIRO_MAX_SAMPLE} observations, got {n}"),
        ));
    }
    ensure_finite(values)?;
    if is_constant(values) {
        return Err(AnalysisError::degenerate("Shapiro-Wilk on constant data"));
    }

    let result = shapiro_wilk_test(values)
        .ok_or_else(|| AnalysisError::degenerate("Shapiro-Wilk weights undefined"))?;

    let normal = result.p_value > alpha;
    Ok(ShapiroWilk {
        statistic: result.w,
        p_value: result.p_value,
        normal,
        interpretation: verdict(normal),
    })
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

// ── Anderson–Darling ──────────────────────────────────────────────────

const AD_SIGNIFICANCE_PCT: [f64; 5] = [15.0, 10.0, 5.0, 2.5, 1.0];
const AD_CRITICAL_BASE: [f64; 5] = [0.576, 0.656, 0.787, 0.918, 1.092];

/// Anderson–Darling test for normality.
///
/// Mean and standard deviation (n − 1) are estimated from the sample,
/// so critical values carry the Stephens (1974) small-sample correction.
///
/// # Errors
///
/// - [`AnalysisError::InsufficientData`] for fewer than 8 values.
/// - [`AnalysisError::InvalidParameter`] for non-finite values.
/// - [`AnalysisError::DegenerateInput`] when all values are equal.
pub fn anderson_darling(values: &[f64]) -> Result<AndersonDarling, AnalysisError> {
    let n = values.len();
    if n < ANDERSON_MIN_SAMPLE {
        return Err(AnalysisError::InsufficientData {
            min_required: ANDERSON_MIN_SAMPLE,
            actual: n,
        });
    }
    ensure_finite(values)?;
    if is_constant(values) {
        return Err(AnalysisError::degenerate("Anderson-Darling on constant data"));
    }

    let result = anderson_darling_test(values)
        .ok_or_else(|| AnalysisError::degenerate("Anderson-Darling on zero-spread data"))?;

    let nf = n as f64;
    let correction = 1.0 + 4.0 / nf - 25.0 / (nf * nf);
    let critical_values: Vec<CriticalValue> = AD_SIGNIFICANCE_PCT
        .iter()
        .zip(AD_CRITICAL_BASE)
        .map(|(&significance_pct, base)| CriticalValue {
            significance_pct,
            value: (base / correction * 1000.0).round() / 1000.0,
        })
        .collect();
    let critical_value = critical_values[2].value;

    let normal = result.statistic < critical_value;
    Ok(AndersonDarling {
        statistic: result.statistic,
        p_value: result.p_value,
        critical_value,
        critical_values,
        normal,
        interpretation: verdict(normal),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEIGHTS: [f64; 11] = [
        148.0, 154.0, 158.0, 160.0, 161.0, 162.0, 166.0, 170.0, 182.0, 195.0, 236.0,
    ];
    const SYMMETRIC: [f64; 10] = [2.1, 3.4, 1.9, 5.6, 4.2, 3.3, 2.8, 4.9, 3.9, 4.4];

    #[test]
    fn shapiro_classic_weights() {
        // Shapiro & Wilk (1965) weights example.
        let sw = shapiro_wilk(&WEIGHTS, 0.05).unwrap();
        assert!((sw.statistic - 0.78881).abs() < 1e-4, "W = {}", sw.statistic);
        assert!((sw.p_value - 0.006704).abs() < 2e-4, "p = {}", sw.p_value);
        assert!(!sw.normal);
        assert_eq!(sw.interpretation, Interpretation::NotNormal);
    }

    #[test]
    fn shapiro_large_sample_branch() {
        let values: Vec<f64> = (1..=20).map(f64::from).collect();
        let sw = shapiro_wilk(&values, 0.05).unwrap();
        assert!((sw.statistic - 0.96038).abs() < 1e-4);
        assert!((sw.p_value - 0.5514).abs() < 2e-3);
        assert!(sw.normal);
    }

    #[test]
    fn shapiro_three_points() {
        let sw = shapiro_wilk(&[1.0, 2.0, 4.0], 0.05).unwrap();
        assert!((sw.statistic - 0.964_285_714).abs() < 1e-6);
        assert!((sw.p_value - 0.6369).abs() < 1e-3);

        let even = shapiro_wilk(&[1.0, 2.0, 3.0], 0.05).unwrap();
        assert!((even.statistic - 1.0).abs() < 1e-12);
        assert!((even.p_value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn shapiro_rejects_skewed_sample() {
        let mut values = vec![1.0; 9];
        values.push(50.0);
        let sw = shapiro_wilk(&values, 0.05).unwrap();
        assert!(sw.statistic < 0.4);
        assert!(sw.p_value < 1e-5);
    }

    #[test]
    fn shapiro_preconditions() {
        assert_eq!(
            shapiro_wilk(&[1.0, 2.0], 0.05).unwrap_err(),
            AnalysisError::InsufficientData {
                min_required: 3,
                actual: 2
            }
        );
        assert!(matches!(
            shapiro_wilk(&[4.0; 6], 0.05),
            Err(AnalysisError::DegenerateInput { .. })
        ));
    }

    #[test]
    fn anderson_statistic_and_critical_values() {
        let ad = anderson_darling(&SYMMETRIC).unwrap();
        assert!((ad.statistic - 0.13281).abs() < 1e-4, "A2 = {}", ad.statistic);
        assert!(ad.p_value > 0.5);
        assert_eq!(ad.critical_value, 0.684);
        let table: Vec<f64> = ad.critical_values.iter().map(|c| c.value).collect();
        assert_eq!(table, vec![0.501, 0.57, 0.684, 0.798, 0.95]);
        assert!(ad.normal);
    }

    #[test]
    fn anderson_detects_departure() {
        let ad = anderson_darling(&WEIGHTS).unwrap();
        assert!((ad.statistic - 0.94677).abs() < 1e-4);
        assert_eq!(ad.critical_value, 0.68);
        assert!(!ad.normal);
        assert!(ad.p_value < 0.05);
        assert_eq!(ad.interpretation, Interpretation::NotNormal);
    }

    #[test]
    fn report_skips_small_samples() {
        let report = normality_tests(&[1.0, 2.0, 4.0, 3.0, 5.0], &AnalysisConfig::default()).unwrap();
        assert_eq!(report.n, 5);
        assert!(report.shapiro_wilk.is_computed());
        assert_eq!(
            report.anderson_darling,
            Outcome::Skipped {
                reason: SkipReason::InsufficientData {
                    min_required: 8,
                    actual: 5
                }
            }
        );

        let tiny = normality_tests(&[1.0, 2.0], &AnalysisConfig::default()).unwrap();
        assert!(!tiny.shapiro_wilk.is_computed());
        assert!(!tiny.anderson_darling.is_computed());
    }

    #[test]
    fn report_skips_constant_sample() {
        let report = normality_tests(&[3.0; 12], &AnalysisConfig::default()).unwrap();
        assert_eq!(
            report.shapiro_wilk,
            Outcome::Skipped {
                reason: SkipReason::ZeroVariance
            }
        );
        assert_eq!(
            report.anderson_darling,
            Outcome::Skipped {
                reason: SkipReason::ZeroVariance
            }
        );
    }

    #[test]
    fn shapiro_skipped_above_supported_size() {
        let values: Vec<f64> = (0..=SHAPIRO_MAX_SAMPLE).map(|i| (i % 97) as f64).collect();
        let report = normality_tests(&values, &AnalysisConfig::default()).unwrap();
        assert_eq!(
            report.shapiro_wilk,
            Outcome::Skipped {
                reason: SkipReason::SampleTooLarge {
                    max_supported: 5000,
                    actual: 5001
                }
            }
        );
        assert!(report.anderson_darling.is_computed());
        assert!(matches!(
            shapiro_wilk(&values, 0.05),
            Err(AnalysisError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn report_rejects_non_finite() {
        let err = normality_tests(&[1.0, f64::NAN, 2.0], &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter { .. }));
    }

    #[test]
    fn significance_level_drives_shapiro_verdict() {
        let strict = AnalysisConfig::default().with_significance_level(0.001);
        let report = normality_tests(&WEIGHTS, &strict).unwrap();
        assert!(report.shapiro_wilk.computed().unwrap().normal);
    }
}
