//! Pareto ranking of categories by total contribution.

use serde::Serialize;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::dataframe::{DataFrame, GroupKey};
use crate::error::AnalysisError;

/// One ranked category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoItem {
    pub category: String,
    /// Sum of the value column, or the occurrence count.
    pub total: f64,
    /// Share of the grand total, in percent.
    pub pct: f64,
    /// Running share including this category, in percent.
    pub cumulative_pct: f64,
    /// Cumulative share is within the cutoff.
    pub vital: bool,
}

/// Categories ranked by descending contribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoAnalysis {
    pub category_column: String,
    /// `None` when occurrences were counted.
    pub value_column: Option<String>,
    pub grand_total: f64,
    pub cutoff_pct: f64,
    pub items: Vec<ParetoItem>,
    /// Labels of the vital categories, in rank order.
    pub vital_few: Vec<String>,
}

/// Ranks the categories of `category_col`.
///
/// With `value_col` the contribution of a category is the sum of its
/// present values, otherwise the number of rows carrying it. Rows with a
/// missing category or value are skipped. Equal totals keep ascending
/// category order.
///
/// ```
/// use sigma_insight::config::AnalysisConfig;
/// use sigma_insight::dataframe::{Column, DataFrame};
/// use sigma_insight::pareto::pareto_analysis;
///
/// let defects = Column::from_labels(&[
///     Some("scratch"), Some("dent"), Some("scratch"), Some("crack"), Some("scratch"),
/// ]);
/// let df = DataFrame::new().with_column("defect", defects).unwrap();
/// let pareto = pareto_analysis(&df, "defect", None, &AnalysisConfig::default()).unwrap();
///
/// assert_eq!(pareto.items[0].category, "scratch");
/// assert_eq!(pareto.items[0].cumulative_pct, 60.0);
/// assert_eq!(pareto.vital_few, vec!["scratch", "crack"]);
/// ```
///
/// # Errors
///
/// - [`AnalysisError::ColumnNotFound`] / [`AnalysisError::NonNumericColumn`]
///   for bad column selections.
/// - [`AnalysisError::InsufficientData`] when no row has both cells present.
/// - [`AnalysisError::InvalidParameter`] when a category total is negative.
/// - [`AnalysisError::DegenerateInput`] when the grand total is zero.
pub fn pareto_analysis(
    df: &DataFrame,
    category_col: &str,
    value_col: Option<&str>,
    config: &AnalysisConfig,
) -> Result<ParetoAnalysis, AnalysisError> {
    let categories = df.require(category_col)?;
    let values = value_col.map(|name| df.require_numeric(name)).transpose()?;

    let mut totals: Vec<(GroupKey, f64)> = Vec::new();
    for row in 0..df.row_count() {
        let Some(key) = categories.key_at(row) else {
            continue;
        };
        let contribution = match values {
            Some(col) => match col.numeric_at(row) {
                Some(v) if v.is_finite() => v,
                _ => continue,
            },
            None => 1.0,
        };
        match totals.iter_mut().find(|(k, _)| *k == key) {
            Some((_, total)) => *total += contribution,
            None => totals.push((key, contribution)),
        }
    }
    if totals.is_empty() {
        return Err(AnalysisError::InsufficientData {
            min_required: 1,
            actual: 0,
        });
    }
    if let Some((key, total)) = totals.iter().find(|(_, t)| *t < 0.0) {
        return Err(AnalysisError::invalid_parameter(
            value_col.unwrap_or(category_col),
            format!("category {key} has negative total {total}"),
        ));
    }

    let grand_total: f64 = totals.iter().map(|(_, t)| t).sum();
    if grand_total == 0.0 {
        return Err(AnalysisError::degenerate("all category totals are zero"));
    }
    debug!(
        column = category_col,
        categories = totals.len(),
        grand_total,
        "pareto analysis"
    );

    totals.sort_by(|a, b| a.0.cmp(&b.0));
    totals.sort_by(|a, b| b.1.total_cmp(&a.1));

    let cutoff_pct = config.pareto_cutoff_pct;
    let mut running = 0.0;
    let items: Vec<ParetoItem> = totals
        .into_iter()
        .map(|(key, total)| {
            running += total;
            let cumulative_pct = 100.0 * running / grand_total;
            ParetoItem {
                category: key.to_string(),
                total,
                pct: 100.0 * total / grand_total,
                cumulative_pct,
                vital: cumulative_pct <= cutoff_pct,
            }
        })
        .collect();
    let vital_few = items
        .iter()
        .filter(|item| item.vital)
        .map(|item| item.category.clone())
        .collect();

    Ok(ParetoAnalysis {
        category_column: category_col.to_string(),
        value_column: value_col.map(str::to_string),
        grand_total,
        cutoff_pct,
        items,
        vital_few,
    })
}
