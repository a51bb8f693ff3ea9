//! Building blocks shared by every analysis result.

use serde::Serialize;

use crate::error::AnalysisError;

/// Result of an optional sub-test: either computed, or skipped with a reason.
///
/// A skipped sub-test is not an error; the containing analysis still
/// succeeds and reports the reason alongside its other outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Computed(T),
    Skipped { reason: SkipReason },
}

impl<T> Outcome<T> {
    pub(crate) fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }

    /// Turns a sub-test's small-sample or zero-variance failure into a skip;
    /// any other error still fails the containing analysis.
    pub(crate) fn from_result(result: Result<T, AnalysisError>) -> Result<Self, AnalysisError> {
        match result {
            Ok(v) => Ok(Self::Computed(v)),
            Err(AnalysisError::InsufficientData {
                min_required,
                actual,
            }) => Ok(Self::skipped(SkipReason::InsufficientData {
                min_required,
                actual,
            })),
            Err(AnalysisError::DegenerateInput { .. }) => Ok(Self::skipped(SkipReason::ZeroVariance)),
            Err(e) => Err(e),
        }
    }

    /// Returns the computed value, if any.
    pub fn computed(&self) -> Option<&T> {
        match self {
            Self::Computed(v) => Some(v),
            Self::Skipped { .. } => None,
        }
    }

    /// Returns `true` if the sub-test ran.
    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }
}

/// Why a sub-test was not computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Fewer observations than the test requires.
    InsufficientData { min_required: usize, actual: usize },
    /// All observations are identical.
    ZeroVariance,
    /// More observations than the approximation supports.
    SampleTooLarge { max_supported: usize, actual: usize },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientData {
                min_required,
                actual,
            } => write!(f, "not computed: needs {min_required} observations, got {actual}"),
            Self::ZeroVariance => write!(f, "not computed: zero variance"),
            Self::SampleTooLarge {
                max_supported,
                actual,
            } => write!(f, "not computed: supports at most {max_supported} observations, got {actual}"),
        }
    }
}

/// Human-readable verdict attached to a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Interpretation {
    Normal,
    NotNormal,
    EqualVariances,
    UnequalVariances,
    SignificantDifference,
    NoSignificantDifference,
    GroupsDiffer,
    NoGroupDifference,
    SignificantModel,
    NonSignificantModel,
    Capable,
    NotCapable,
    NoSpecification,
    InControl,
    OutOfControl,
}

impl std::fmt::Display for Interpretation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Normal => "Normal",
            Self::NotNormal => "Not normal",
            Self::EqualVariances => "Equal variances",
            Self::UnequalVariances => "Unequal variances",
            Self::SignificantDifference => "Significant difference",
            Self::NoSignificantDifference => "No significant difference",
            Self::GroupsDiffer => "Difference between groups",
            Self::NoGroupDifference => "No difference between groups",
            Self::SignificantModel => "Significant model",
            Self::NonSignificantModel => "Model not significant",
            Self::Capable => "Process capable",
            Self::NotCapable => "Process not capable",
            Self::NoSpecification => "No specification limits",
            Self::InControl => "In statistical control",
            Self::OutOfControl => "Out of statistical control",
        };
        f.write_str(label)
    }
}
