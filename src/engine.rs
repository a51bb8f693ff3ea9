//! Request/result dispatch over every analysis.
//!
//! [`AnalysisRequest`] names one operation and its parameters;
//! [`analyze`] validates the configuration, runs the operation and wraps
//! its typed result in [`AnalysisResult`]. Both enums are serde-tagged so
//! a host can accept requests as JSON and hand results to a presentation
//! layer without ad hoc key/value maps.
//!
//! ```
//! use sigma_insight::config::AnalysisConfig;
//! use sigma_insight::csv_parser::CsvParser;
//! use sigma_insight::engine::{analyze, AnalysisRequest, AnalysisResult};
//!
//! let df = CsvParser::new()
//!     .parse_str("line,yield\nA,91.2\nA,90.8\nA,91.5\nB,88.1\nB,88.9\nB,87.6\n")
//!     .unwrap();
//! let request = AnalysisRequest::GroupComparison {
//!     value_column: "yield".into(),
//!     group_column: "line".into(),
//! };
//!
//! match analyze(&df, &request, &AnalysisConfig::default()).unwrap() {
//!     AnalysisResult::GroupComparison(anova) => assert!(anova.significant),
//!     other => panic!("unexpected result {other:?}"),
//! }
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capability::{process_capability, CapabilityReport, SpecLimits};
use crate::config::AnalysisConfig;
use crate::control::{control_limits, ControlChart};
use crate::correlation::{correlation_analysis, CorrelationAnalysis, CorrelationMethod};
use crate::dataframe::DataFrame;
use crate::descriptive::{descriptive_statistics, ColumnSummary};
use crate::error::AnalysisError;
use crate::hypothesis::{
    group_comparison_test, homogeneity_test, two_sample_test, Anova, LeveneTest, TwoSampleTest,
};
use crate::normality::{normality_tests, NormalityReport};
use crate::outliers::{detect_outliers, OutlierMethod, OutlierResult};
use crate::pareto::{pareto_analysis, ParetoAnalysis};
use crate::regression::{linear_regression, LinearRegression};

// ── Request ───────────────────────────────────────────────────────────

/// One analysis to run against a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum AnalysisRequest {
    /// Summary statistics; every numeric column when `columns` is `None`.
    Descriptive {
        #[serde(default)]
        columns: Option<Vec<String>>,
    },
    Outliers {
        column: String,
        method: OutlierMethod,
    },
    Normality {
        column: String,
    },
    /// Levene's test for equal variances.
    Homogeneity {
        value_column: String,
        group_column: String,
    },
    /// Two-group t-test with a Levene-selected variance assumption.
    TwoSample {
        value_column: String,
        group_column: String,
        group_a: String,
        group_b: String,
    },
    /// One-way ANOVA, Tukey HSD when significant.
    GroupComparison {
        value_column: String,
        group_column: String,
    },
    Correlation {
        method: CorrelationMethod,
    },
    Regression {
        response: String,
        predictors: Vec<String>,
    },
    Capability {
        column: String,
        #[serde(default)]
        limits: SpecLimits,
    },
    ControlChart {
        column: String,
        #[serde(default)]
        order_column: Option<String>,
    },
    Pareto {
        category_column: String,
        #[serde(default)]
        value_column: Option<String>,
    },
}

impl AnalysisRequest {
    /// Snake-case name of the operation.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Descriptive { .. } => "descriptive",
            Self::Outliers { .. } => "outliers",
            Self::Normality { .. } => "normality",
            Self::Homogeneity { .. } => "homogeneity",
            Self::TwoSample { .. } => "two_sample",
            Self::GroupComparison { .. } => "group_comparison",
            Self::Correlation { .. } => "correlation",
            Self::Regression { .. } => "regression",
            Self::Capability { .. } => "capability",
            Self::ControlChart { .. } => "control_chart",
            Self::Pareto { .. } => "pareto",
        }
    }
}

// ── Result ────────────────────────────────────────────────────────────

/// Typed result of one [`AnalysisRequest`], tagged by `kind` when serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisResult {
    Descriptive { columns: Vec<ColumnSummary> },
    Outliers(OutlierResult),
    Normality(NormalityReport),
    Homogeneity(LeveneTest),
    TwoSample(TwoSampleTest),
    GroupComparison(Anova),
    Correlation(CorrelationAnalysis),
    Regression(LinearRegression),
    Capability(CapabilityReport),
    ControlChart(ControlChart),
    Pareto(ParetoAnalysis),
}

// ── Dispatch ──────────────────────────────────────────────────────────

/// Runs `request` against `df`.
///
/// # Errors
///
/// [`AnalysisError::InvalidParameter`] for an invalid `config`, otherwise
/// whatever the selected operation reports.
pub fn analyze(
    df: &DataFrame,
    request: &AnalysisRequest,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    config.validate()?;
    debug!(
        operation = request.operation(),
        rows = df.row_count(),
        columns = df.column_count(),
        "analyze"
    );

    let result = match request {
        AnalysisRequest::Descriptive { columns } => {
            let names: Option<Vec<&str>> = columns
                .as_ref()
                .map(|cols| cols.iter().map(String::as_str).collect());
            AnalysisResult::Descriptive {
                columns: descriptive_statistics(df, names.as_deref())?,
            }
        }
        AnalysisRequest::Outliers { column, method } => {
            let col = df.require_numeric(column)?;
            AnalysisResult::Outliers(detect_outliers(col, *method, config)?)
        }
        AnalysisRequest::Normality { column } => {
            let values = present_values(df, column)?;
            AnalysisResult::Normality(normality_tests(&values, config)?)
        }
        AnalysisRequest::Homogeneity {
            value_column,
            group_column,
        } => AnalysisResult::Homogeneity(homogeneity_test(df, value_column, group_column, config)?),
        AnalysisRequest::TwoSample {
            value_column,
            group_column,
            group_a,
            group_b,
        } => AnalysisResult::TwoSample(two_sample_test(
            df,
            value_column,
            group_column,
            group_a,
            group_b,
            config,
        )?),
        AnalysisRequest::GroupComparison {
            value_column,
            group_column,
        } => AnalysisResult::GroupComparison(group_comparison_test(
            df,
            value_column,
            group_column,
            config,
        )?),
        AnalysisRequest::Correlation { method } => {
            AnalysisResult::Correlation(correlation_analysis(df, *method, config)?)
        }
        AnalysisRequest::Regression {
            response,
            predictors,
        } => {
            let predictors: Vec<&str> = predictors.iter().map(String::as_str).collect();
            AnalysisResult::Regression(linear_regression(df, response, &predictors, config)?)
        }
        AnalysisRequest::Capability { column, limits } => {
            let values = present_values(df, column)?;
            AnalysisResult::Capability(process_capability(&values, limits, config)?)
        }
        AnalysisRequest::ControlChart {
            column,
            order_column,
        } => AnalysisResult::ControlChart(control_limits(
            df,
            column,
            order_column.as_deref(),
            config,
        )?),
        AnalysisRequest::Pareto {
            category_column,
            value_column,
        } => AnalysisResult::Pareto(pareto_analysis(
            df,
            category_column,
            value_column.as_deref(),
            config,
        )?),
    };
    Ok(result)
}

/// Present values of a numeric column, missing cells dropped.
fn present_values(df: &DataFrame, column: &str) -> Result<Vec<f64>, AnalysisError> {
    df.require_numeric(column)?
        .valid_numeric_values()
        .ok_or_else(|| AnalysisError::NonNumericColumn {
            column: column.to_string(),
        })
}
