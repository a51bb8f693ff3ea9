//! Individuals control chart limits.
//!
//! Points are taken in row order, or stably sorted by an order column
//! (numeric, datetime or categorical). Limits sit at the mean ± 3σ and the
//! warning band at ± 2σ, where σ is the sample standard deviation; both
//! widths come from [`AnalysisConfig`].
//!
//! ```
//! use sigma_insight::config::AnalysisConfig;
//! use sigma_insight::control::control_limits;
//! use sigma_insight::dataframe::{Column, DataFrame};
//!
//! let df = DataFrame::new()
//!     .with_column("thickness", Column::from_values(vec![5.0, 5.1, 4.9, 5.0, 5.2, 4.8]))
//!     .unwrap();
//! let chart = control_limits(&df, "thickness", None, &AnalysisConfig::default()).unwrap();
//! assert!(chart.in_control);
//! assert!(chart.ucl > chart.upper_warning);
//! ```

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::dataframe::DataFrame;
use crate::error::AnalysisError;
use crate::outcome::Interpretation;

/// Position of a point relative to the chart bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    /// Inside the warning band.
    Normal,
    /// Between the warning band and the control limits.
    Warning,
    /// Beyond the control limits.
    OutOfControl,
}

/// One plotted observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Row position in the source dataset.
    pub row: usize,
    pub value: f64,
    pub zone: Zone,
}

/// Individuals chart for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlChart {
    pub column: String,
    pub order_column: Option<String>,
    pub n: usize,
    /// Center line.
    pub mean: f64,
    pub std_dev: f64,
    pub ucl: f64,
    pub lcl: f64,
    pub upper_warning: f64,
    pub lower_warning: f64,
    /// Observations in plotting order.
    pub points: Vec<ChartPoint>,
    /// Rows beyond the control limits, in plotting order.
    pub out_of_control: Vec<usize>,
    /// Rows in the warning band, in plotting order.
    pub warnings: Vec<usize>,
    pub in_control: bool,
    pub interpretation: Interpretation,
}

/// Computes control and warning limits for `value_col`.
///
/// When `order_col` is given, observations are plotted in ascending order
/// of that column; ties and rows with a missing order key keep their
/// relative row order, missing keys last. Missing and non-finite values
/// are dropped. Band widths are `config.control_limit_sigma` and
/// `config.warning_limit_sigma`.
///
/// # Errors
///
/// - [`AnalysisError::ColumnNotFound`] / [`AnalysisError::NonNumericColumn`]
///   for a bad `value_col`, `ColumnNotFound` for a bad `order_col`.
/// - [`AnalysisError::InsufficientData`] with fewer than 2 observations.
pub fn control_limits(
    df: &DataFrame,
    value_col: &str,
    order_col: Option<&str>,
    config: &AnalysisConfig,
) -> Result<ControlChart, AnalysisError> {
    let values = df.require_numeric(value_col)?;
    let order = order_col.map(|name| df.require(name)).transpose()?;

    let mut rows: Vec<(usize, f64)> = (0..df.row_count())
        .filter_map(|row| values.numeric_at(row).map(|v| (row, v)))
        .filter(|(_, v)| v.is_finite())
        .collect();
    if let Some(order) = order {
        // Missing order keys sort last.
        rows.sort_by(|a, b| match (order.key_at(a.0), order.key_at(b.0)) {
            (Some(ka), Some(kb)) => ka.cmp(&kb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
    }

    let n = rows.len();
    let series: Vec<f64> = rows.iter().map(|&(_, v)| v).collect();
    let (Some(mean), Some(std_dev)) = (
        u_numflow::stats::mean(&series),
        u_numflow::stats::std_dev(&series),
    ) else {
        return Err(AnalysisError::InsufficientData {
            min_required: 2,
            actual: n,
        });
    };
    debug!(column = value_col, n, mean, std_dev, "control limits");

    let control = config.control_limit_sigma * std_dev;
    let warning = config.warning_limit_sigma * std_dev;
    let (ucl, lcl) = (mean + control, mean - control);
    let (upper_warning, lower_warning) = (mean + warning, mean - warning);

    let points: Vec<ChartPoint> = rows
        .iter()
        .map(|&(row, value)| {
            let zone = if value > ucl || value < lcl {
                Zone::OutOfControl
            } else if value > upper_warning || value < lower_warning {
                Zone::Warning
            } else {
                Zone::Normal
            };
            ChartPoint { row, value, zone }
        })
        .collect();
    let rows_in = |zone: Zone| -> Vec<usize> {
        points
            .iter()
            .filter(|p| p.zone == zone)
            .map(|p| p.row)
            .collect()
    };
    let out_of_control = rows_in(Zone::OutOfControl);
    let warnings = rows_in(Zone::Warning);

    let in_control = out_of_control.is_empty();
    if !in_control {
        warn!(
            column = value_col,
            count = out_of_control.len(),
            "points beyond control limits"
        );
    }

    Ok(ControlChart {
        column: value_col.to_string(),
        order_column: order_col.map(str::to_string),
        n,
        mean,
        std_dev,
        ucl,
        lcl,
        upper_warning,
        lower_warning,
        points,
        out_of_control,
        warnings,
        in_control,
        interpretation: if in_control {
            Interpretation::InControl
        } else {
            Interpretation::OutOfControl
        },
    })
}
