//! Process capability indices against specification limits.
//!
//! Mean and sample standard deviation are always reported. Every other
//! block depends on which of `lsl`, `usl` and `target` were supplied:
//!
//! | Supplied | Block |
//! |----------|-------|
//! | `lsl` and `usl` | Cp, Cpu, Cpl, Cpk, PPM below/above/total |
//! | only one limit | the one-sided index (Cpu or Cpl) as Cpk, and its PPM tail |
//! | `target` | bias = mean − target |
//! | `target`, `lsl` and `usl` | Cpm |
//!
//! Cp, Cpu, Cpl and Cpk come from `u_analytics::capability::ProcessCapability`
//! with the sample standard deviation as σ. Defect rates assume a normal
//! process distribution.
//!
//! ```
//! use sigma_insight::capability::{process_capability, SpecLimits};
//! use sigma_insight::config::AnalysisConfig;
//!
//! let values = [9.0, 10.0, 11.0, 10.0, 9.0, 11.0, 10.0, 10.0];
//! let limits = SpecLimits::two_sided(7.0, 13.0);
//! let report = process_capability(&values, &limits, &AnalysisConfig::default()).unwrap();
//!
//! let indices = report.indices.unwrap();
//! assert!((indices.cp.unwrap() - 1.3229).abs() < 1e-4);
//! assert_eq!(indices.cp, Some(indices.cpk));
//! assert!(!indices.capable);
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use u_analytics::capability::ProcessCapability;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::outcome::Interpretation;
use crate::special::{normal_cdf, normal_sf};

/// Specification limits and nominal target; each is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecLimits {
    pub lsl: Option<f64>,
    pub usl: Option<f64>,
    pub target: Option<f64>,
}

impl SpecLimits {
    /// Both limits, no target.
    pub fn two_sided(lsl: f64, usl: f64) -> Self {
        Self {
            lsl: Some(lsl),
            usl: Some(usl),
            target: None,
        }
    }

    /// Sets the nominal target.
    pub fn with_target(mut self, target: f64) -> Self {
        self.target = Some(target);
        self
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        for (name, value) in [("lsl", self.lsl), ("usl", self.usl), ("target", self.target)] {
            if let Some(v) = value.filter(|v| !v.is_finite()) {
                return Err(AnalysisError::invalid_parameter(
                    name,
                    format!("must be finite, got {v}"),
                ));
            }
        }
        if let (Some(lsl), Some(usl)) = (self.lsl, self.usl) {
            if lsl >= usl {
                return Err(AnalysisError::invalid_parameter(
                    "lsl",
                    format!("must be below usl ({lsl} >= {usl})"),
                ));
            }
        }
        Ok(())
    }
}

/// Capability indices and normal-model defect rates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityIndices {
    /// (usl − lsl) / 6σ; needs both limits.
    pub cp: Option<f64>,
    /// (usl − mean) / 3σ.
    pub cpu: Option<f64>,
    /// (mean − lsl) / 3σ.
    pub cpl: Option<f64>,
    /// min(Cpu, Cpl) over the limits supplied.
    pub cpk: f64,
    /// Expected parts per million below `lsl`.
    pub ppm_below: Option<f64>,
    /// Expected parts per million above `usl`.
    pub ppm_above: Option<f64>,
    pub ppm_total: f64,
    /// `cpk >= capable_cpk`.
    pub capable: bool,
}

/// Centering relative to the nominal target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetMetrics {
    pub target: f64,
    /// mean − target.
    pub bias: f64,
    /// (usl − lsl) / (6·√(σ² + (mean − target)²)); needs both limits.
    pub cpm: Option<f64>,
}

/// Result of a capability study.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityReport {
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation (n − 1).
    pub std_dev: f64,
    pub limits: SpecLimits,
    /// Set when n is below the configured minimum sample size.
    pub small_sample: bool,
    /// Present when at least one limit was supplied.
    pub indices: Option<CapabilityIndices>,
    /// Present when a target was supplied.
    pub target: Option<TargetMetrics>,
    pub interpretation: Interpretation,
}

/// Computes capability statistics of `values` against `limits`.
///
/// A sample smaller than `config.capability_min_sample` is analysed but
/// flagged through [`CapabilityReport::small_sample`] and a warning.
///
/// # Errors
///
/// - [`AnalysisError::InsufficientData`] for fewer than 2 values.
/// - [`AnalysisError::InvalidParameter`] for non-finite inputs or `lsl >= usl`.
/// - [`AnalysisError::DegenerateInput`] when σ = 0 and a limit is supplied.
pub fn process_capability(
    values: &[f64],
    limits: &SpecLimits,
    config: &AnalysisConfig,
) -> Result<CapabilityReport, AnalysisError> {
    limits.validate()?;
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(AnalysisError::invalid_parameter(
            "values",
            format!("must be finite, found {bad}"),
        ));
    }
    let n = values.len();
    let (Some(mean), Some(std_dev)) = (
        u_numflow::stats::mean(values),
        u_numflow::stats::std_dev(values),
    ) else {
        return Err(AnalysisError::InsufficientData {
            min_required: 2,
            actual: n,
        });
    };

    let small_sample = n < config.capability_min_sample;
    if small_sample {
        warn!(
            n,
            min = config.capability_min_sample,
            "capability estimates from a small sample are unreliable"
        );
    }
    debug!(n, mean, std_dev, "process capability");

    let has_limits = limits.lsl.is_some() || limits.usl.is_some();
    if has_limits && std_dev == 0.0 {
        return Err(AnalysisError::degenerate(
            "zero standard deviation; capability indices are undefined",
        ));
    }

    let indices = if has_limits {
        let process = ProcessCapability::new(limits.usl, limits.lsl)
            .map_err(|reason| AnalysisError::invalid_parameter("limits", reason))?;
        let short_term = process
            .compute(values, std_dev)
            .ok_or_else(|| AnalysisError::degenerate("capability indices undefined for these values"))?;
        let cpk = short_term.cpk.unwrap_or(f64::NAN);
        let ppm_below = limits
            .lsl
            .map(|lsl| normal_cdf((lsl - mean) / std_dev) * 1e6);
        let ppm_above = limits
            .usl
            .map(|usl| normal_sf((usl - mean) / std_dev) * 1e6);
        Some(CapabilityIndices {
            cp: short_term.cp,
            cpu: short_term.cpu,
            cpl: short_term.cpl,
            cpk,
            ppm_below,
            ppm_above,
            ppm_total: ppm_below.unwrap_or(0.0) + ppm_above.unwrap_or(0.0),
            capable: cpk >= config.capable_cpk,
        })
    } else {
        None
    };

    // Cpm uses σ² + bias² rather than the spread about the target.
    let target = limits.target.map(|target| {
        let bias = mean - target;
        let cpm = limits
            .lsl
            .zip(limits.usl)
            .map(|(lsl, usl)| (usl - lsl) / (6.0 * (std_dev * std_dev + bias * bias).sqrt()));
        TargetMetrics { target, bias, cpm }
    });

    let interpretation = match &indices {
        Some(ix) if ix.capable => Interpretation::Capable,
        Some(_) => Interpretation::NotCapable,
        None => Interpretation::NoSpecification,
    };

    Ok(CapabilityReport {
        n,
        mean,
        std_dev,
        limits: *limits,
        small_sample,
        indices,
        target,
        interpretation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::special::normal_quantile;
    use proptest::prelude::*;

    const CENTERED: [f64; 8] = [9.0, 10.0, 11.0, 10.0, 9.0, 11.0, 10.0, 10.0];

    fn config() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    /// Normal scores rescaled to an exact sample mean and standard deviation.
    fn normal_sample(n: usize, mean: f64, sd: f64) -> Vec<f64> {
        let z: Vec<f64> = (1..=n)
            .map(|i| normal_quantile((i as f64 - 0.5) / n as f64))
            .collect();
        let s = u_numflow::stats::std_dev(&z).unwrap();
        let m = u_numflow::stats::mean(&z).unwrap();
        z.iter().map(|v| mean + (v - m) / s * sd).collect()
    }

    #[test]
    fn centered_process_indices() {
        let report = process_capability(&CENTERED, &SpecLimits::two_sided(7.0, 13.0), &config()).unwrap();
        let sd = (4.0f64 / 7.0).sqrt();
        assert_eq!(report.n, 8);
        assert_eq!(report.mean, 10.0);
        assert!((report.std_dev - sd).abs() < 1e-12);
        assert!(report.small_sample);

        let ix = report.indices.unwrap();
        assert!((ix.cp.unwrap() - 1.0 / sd).abs() < 1e-12);
        assert!((ix.cpu.unwrap() - ix.cpl.unwrap()).abs() < 1e-12);
        assert_eq!(ix.cpk, ix.cpu.unwrap());
        let tail = normal_cdf(-3.0 / sd) * 1e6;
        assert!((ix.ppm_below.unwrap() - tail).abs() < 1e-6);
        assert!((ix.ppm_above.unwrap() - tail).abs() < 1e-6);
        assert!((ix.ppm_total - 2.0 * tail).abs() < 1e-6);
        assert!(!ix.capable);
        assert_eq!(report.interpretation, Interpretation::NotCapable);
        assert!(report.target.is_none());
    }

    #[test]
    fn reference_process_cp() {
        let values = normal_sample(200, 15.0, 1.0);
        let report = process_capability(&values, &SpecLimits::two_sided(10.0, 20.0), &config()).unwrap();
        let ix = report.indices.unwrap();
        assert!((ix.cp.unwrap() - 1.667).abs() < 0.05);
        assert!(ix.cpk <= ix.cp.unwrap() + 1e-12);
        assert!(ix.capable);
        assert!(!report.small_sample);
        assert_eq!(report.interpretation, Interpretation::Capable);
    }

    #[test]
    fn off_center_process() {
        let shifted: Vec<f64> = CENTERED.iter().map(|v| v + 1.0).collect();
        let report = process_capability(&shifted, &SpecLimits::two_sided(7.0, 13.0), &config()).unwrap();
        let ix = report.indices.unwrap();
        assert!(ix.cpu.unwrap() < ix.cpl.unwrap());
        assert_eq!(ix.cpk, ix.cpu.unwrap());
        assert!(ix.ppm_above.unwrap() > ix.ppm_below.unwrap());
    }

    #[test]
    fn target_block() {
        let limits = SpecLimits::two_sided(7.0, 13.0).with_target(11.0);
        let report = process_capability(&CENTERED, &limits, &config()).unwrap();
        let t = report.target.unwrap();
        assert_eq!(t.bias, -1.0);
        let expected = 6.0 / (6.0 * (4.0f64 / 7.0 + 1.0).sqrt());
        assert!((t.cpm.unwrap() - expected).abs() < 1e-12);

        let on_target = process_capability(&CENTERED, &SpecLimits::two_sided(7.0, 13.0).with_target(10.0), &config())
            .unwrap();
        let cp = on_target.indices.as_ref().unwrap().cp.unwrap();
        assert!((on_target.target.unwrap().cpm.unwrap() - cp).abs() < 1e-12);
    }

    #[test]
    fn target_without_limits_reports_bias_only() {
        let limits = SpecLimits {
            target: Some(9.5),
            ..SpecLimits::default()
        };
        let report = process_capability(&CENTERED, &limits, &config()).unwrap();
        assert!(report.indices.is_none());
        let t = report.target.unwrap();
        assert_eq!(t.bias, 0.5);
        assert!(t.cpm.is_none());
        assert_eq!(report.interpretation, Interpretation::NoSpecification);
    }

    #[test]
    fn one_sided_upper_limit() {
        let limits = SpecLimits {
            usl: Some(13.0),
            ..SpecLimits::default()
        };
        let ix = process_capability(&CENTERED, &limits, &config())
            .unwrap()
            .indices
            .unwrap();
        assert!(ix.cp.is_none());
        assert!(ix.cpl.is_none());
        assert_eq!(Some(ix.cpk), ix.cpu);
        assert!(ix.ppm_below.is_none());
        assert_eq!(Some(ix.ppm_total), ix.ppm_above);
    }

    #[test]
    fn no_limits_reports_moments() {
        let report = process_capability(&CENTERED, &SpecLimits::default(), &config()).unwrap();
        assert_eq!(report.mean, 10.0);
        assert!(report.indices.is_none());
        assert!(report.target.is_none());

        let flat = process_capability(&[4.0; 5], &SpecLimits::default(), &config()).unwrap();
        assert_eq!(flat.std_dev, 0.0);
    }

    #[test]
    fn preconditions() {
        assert_eq!(
            process_capability(&[1.0], &SpecLimits::default(), &config()).unwrap_err(),
            AnalysisError::InsufficientData {
                min_required: 2,
                actual: 1
            }
        );
        assert!(matches!(
            process_capability(&CENTERED, &SpecLimits::two_sided(13.0, 7.0), &config()),
            Err(AnalysisError::InvalidParameter { .. })
        ));
        assert!(matches!(
            process_capability(&[5.0; 10], &SpecLimits::two_sided(1.0, 9.0), &config()),
            Err(AnalysisError::DegenerateInput { .. })
        ));
        assert!(matches!(
            process_capability(&CENTERED, &SpecLimits::two_sided(f64::NAN, 9.0), &config()),
            Err(AnalysisError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn configurable_capability_threshold() {
        let lenient = config().with_capable_cpk(1.0);
        let report = process_capability(&CENTERED, &SpecLimits::two_sided(7.0, 13.0), &lenient).unwrap();
        assert!(report.indices.unwrap().capable);
    }

    proptest! {
        #[test]
        fn cpk_never_exceeds_cp(
            values in prop::collection::vec(-100.0..100.0f64, 2..60),
            lsl in -150.0..0.0f64,
            width in 1.0..300.0f64,
        ) {
            let limits = SpecLimits::two_sided(lsl, lsl + width);
            match process_capability(&values, &limits, &AnalysisConfig::default()) {
                Ok(report) => {
                    let ix = report.indices.unwrap();
                    prop_assert!(ix.cpk <= ix.cp.unwrap() + 1e-9);
                    prop_assert!(ix.ppm_total >= 0.0 && ix.ppm_total <= 2e6);
                }
                Err(e) => prop_assert!(
                    matches!(e, AnalysisError::DegenerateInput { .. }),
                    "unexpected error {:?}",
                    e
                ),
            }
        }
    }
}
