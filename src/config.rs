//! Engine-wide analysis configuration.
//!
//! Every threshold that turns a statistic into a verdict lives here so
//! the host application can tune it in one place (or load it from JSON/TOML
//! through serde). All operations read the configuration; none mutate it.
//!
//! ```
//! use sigma_insight::config::AnalysisConfig;
//!
//! let config = AnalysisConfig::default().with_significance_level(0.01);
//! assert!(config.validate().is_ok());
//! assert_eq!(config.capable_cpk, 1.33);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Thresholds used to derive flags and interpretations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Significance level α for every hypothesis test. Default: 0.05.
    pub significance_level: f64,
    /// Minimum Cpk for a process to be reported as capable. Default: 1.33.
    pub capable_cpk: f64,
    /// Sample size below which capability results carry a warning. Default: 30.
    pub capability_min_sample: usize,
    /// Tukey fence multiplier for IQR outliers. Default: 1.5.
    pub iqr_fence: f64,
    /// Absolute z-score above which a point is an outlier. Default: 3.0.
    pub zscore_threshold: f64,
    /// Cumulative percentage delimiting the "vital few" in Pareto analysis. Default: 80.0.
    pub pareto_cutoff_pct: f64,
    /// Control limits sit this many σ from the center line. Default: 3.0.
    pub control_limit_sigma: f64,
    /// Warning band half-width in σ; must stay below `control_limit_sigma`. Default: 2.0.
    pub warning_limit_sigma: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            significance_level: 0.05,
            capable_cpk: 1.33,
            capability_min_sample: 30,
            iqr_fence: 1.5,
            zscore_threshold: 3.0,
            pareto_cutoff_pct: 80.0,
            control_limit_sigma: 3.0,
            warning_limit_sigma: 2.0,
        }
    }
}

impl AnalysisConfig {
    /// Sets the significance level.
    pub fn with_significance_level(mut self, alpha: f64) -> Self {
        self.significance_level = alpha;
        self
    }

    /// Sets the capability threshold for Cpk.
    pub fn with_capable_cpk(mut self, cpk: f64) -> Self {
        self.capable_cpk = cpk;
        self
    }

    /// Sets the IQR fence multiplier.
    pub fn with_iqr_fence(mut self, k: f64) -> Self {
        self.iqr_fence = k;
        self
    }

    /// Sets the z-score outlier threshold.
    pub fn with_zscore_threshold(mut self, z: f64) -> Self {
        self.zscore_threshold = z;
        self
    }

    /// Sets the control and warning band widths in σ units.
    pub fn with_chart_sigmas(mut self, control: f64, warning: f64) -> Self {
        self.control_limit_sigma = control;
        self.warning_limit_sigma = warning;
        self
    }

    /// Checks that every threshold is in its meaningful range.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let alpha = self.significance_level;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(AnalysisError::invalid_parameter(
                "significance_level",
                format!("must lie in (0, 1), got {alpha}"),
            ));
        }
        for (name, value) in [
            ("capable_cpk", self.capable_cpk),
            ("iqr_fence", self.iqr_fence),
            ("zscore_threshold", self.zscore_threshold),
            ("control_limit_sigma", self.control_limit_sigma),
            ("warning_limit_sigma", self.warning_limit_sigma),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(AnalysisError::invalid_parameter(
                    name,
                    format!("must be a positive number, got {value}"),
                ));
            }
        }
        if self.warning_limit_sigma >= self.control_limit_sigma {
            return Err(AnalysisError::invalid_parameter(
                "warning_limit_sigma",
                format!(
                    "must be below control_limit_sigma ({} >= {})",
                    self.warning_limit_sigma, self.control_limit_sigma
                ),
            ));
        }
        let cutoff = self.pareto_cutoff_pct;
        if !(cutoff > 0.0 && cutoff <= 100.0) {
            return Err(AnalysisError::invalid_parameter(
                "pareto_cutoff_pct",
                format!("must lie in (0, 100], got {cutoff}"),
            ));
        }
        Ok(())
    }
}
