//! Group comparison tests: Levene, two-sample t and one-way ANOVA with
//! Tukey HSD post-hoc comparisons.
//!
//! The ANOVA table and Welch's t-test come from `u_analytics::testing`.
//! The Brown–Forsythe statistic, the pooled t-test and Tukey HSD are
//! computed here.
//!
//! Groups are formed from a value column and a grouping column of any
//! type; rows missing either cell are skipped. Group labels are the
//! display form of the grouping cell (`"A"`, `"3"`, `"2024-03-01 08:00:00"`).
//!
//! ```
//! use sigma_insight::config::AnalysisConfig;
//! use sigma_insight::dataframe::{Column, DataFrame};
//! use sigma_insight::hypothesis::group_comparison_test;
//!
//! let df = DataFrame::new()
//!     .with_column("y", Column::from_values(vec![4.0, 5.0, 6.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0]))
//!     .unwrap()
//!     .with_column("line", Column::from_labels(&[
//!         Some("A"), Some("A"), Some("A"),
//!         Some("B"), Some("B"), Some("B"),
//!         Some("C"), Some("C"), Some("C"),
//!     ]))
//!     .unwrap();
//!
//! let anova = group_comparison_test(&df, "y", "line", &AnalysisConfig::default()).unwrap();
//! assert!((anova.f_statistic - 19.0).abs() < 1e-9);
//! assert!(anova.significant);
//! assert_eq!(anova.post_hoc.unwrap().comparisons.len(), 3);
//! ```

use serde::Serialize;
use tracing::{debug, warn};
use u_analytics::testing::{one_way_anova, two_sample_t_test};

use crate::config::AnalysisConfig;
use crate::dataframe::{DataFrame, GroupKey};
use crate::error::AnalysisError;
use crate::outcome::Interpretation;
use crate::special::{f_survival, studentized_range_cdf, studentized_range_quantile, t_two_sided_p};

/// Minimum observations per group for the t-test and ANOVA.
pub const MIN_GROUP_SIZE: usize = 3;

// ── Shared helpers ────────────────────────────────────────────────────

/// Size, mean and spread of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub label: String,
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` for a single observation.
    pub std_dev: Option<f64>,
}

struct Group {
    label: String,
    values: Vec<f64>,
}

impl Group {
    fn from_key((key, values): (GroupKey, Vec<f64>)) -> Self {
        Self {
            label: key.to_string(),
            values,
        }
    }

    fn n(&self) -> usize {
        self.values.len()
    }

    fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.n() as f64
    }

    /// Sample variance (n − 1); zero for a single value.
    fn variance(&self) -> f64 {
        if self.n() < 2 {
            return 0.0;
        }
        let m = self.mean();
        self.values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (self.n() - 1) as f64
    }

    fn summary(&self) -> GroupSummary {
        GroupSummary {
            label: self.label.clone(),
            n: self.n(),
            mean: self.mean(),
            std_dev: u_numflow::stats::std_dev(&self.values),
        }
    }
}

fn collect_groups(
    df: &DataFrame,
    value_col: &str,
    group_col: &str,
) -> Result<Vec<Group>, AnalysisError> {
    Ok(df
        .grouped_values(value_col, group_col)?
        .into_iter()
        .map(Group::from_key)
        .collect())
}

/// Whether any row of `group_col` carries `label`, present value or not.
fn label_in_column(df: &DataFrame, group_col: &str, label: &str) -> bool {
    df.column_by_name(group_col).is_some_and(|col| {
        (0..df.row_count()).any(|row| col.key_at(row).is_some_and(|k| k.to_string() == label))
    })
}

fn verdict(condition: bool, yes: Interpretation, no: Interpretation) -> Interpretation {
    if condition {
        yes
    } else {
        no
    }
}

// ── Levene ────────────────────────────────────────────────────────────

/// Levene's test for equal variances (median-centred, Brown–Forsythe).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeveneTest {
    pub groups: Vec<GroupSummary>,
    pub statistic: f64,
    pub p_value: f64,
    pub df_between: usize,
    pub df_within: usize,
    /// `p_value > α`.
    pub equal_variances: bool,
    pub interpretation: Interpretation,
}

/// Brown–Forsythe W statistic and p-value, or `None` when every absolute
/// deviation from the group medians is identical.
fn levene_statistic(groups: &[&[f64]]) -> Option<(f64, f64)> {
    let k = groups.len();
    let total: usize = groups.iter().map(|g| g.len()).sum();

    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| {
            let median = u_numflow::stats::median(g).unwrap_or(0.0);
            g.iter().map(|v| (v - median).abs()).collect()
        })
        .collect();
    let group_means: Vec<f64> = deviations
        .iter()
        .map(|z| z.iter().sum::<f64>() / z.len() as f64)
        .collect();
    let grand = deviations.iter().flatten().sum::<f64>() / total as f64;

    let between: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(z, m)| z.len() as f64 * (m - grand).powi(2))
        .sum();
    let within: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(z, m)| z.iter().map(|v| (v - m).powi(2)).sum::<f64>())
        .sum();

    let (df1, df2) = ((k - 1) as f64, (total - k) as f64);
    if within == 0.0 {
        return if between == 0.0 {
            None
        } else {
            Some((f64::INFINITY, 0.0))
        };
    }
    let w = (df2 / df1) * between / within;
    Some((w, f_survival(w, df1, df2)))
}

/// Tests whether `value_col` has equal variance across the groups of `group_col`.
///
/// # Errors
///
/// - [`AnalysisError::InsufficientData`] with fewer than two non-empty
///   groups, or when every group holds a single value.
/// - [`AnalysisError::DegenerateInput`] when all absolute deviations from
///   the group medians are equal.
/// - Column selection errors from the [`DataFrame`].
pub fn homogeneity_test(
    df: &DataFrame,
    value_col: &str,
    group_col: &str,
    config: &AnalysisConfig,
) -> Result<LeveneTest, AnalysisError> {
    let groups = collect_groups(df, value_col, group_col)?;
    if groups.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            min_required: 2,
            actual: groups.len(),
        });
    }
    let total: usize = groups.iter().map(Group::n).sum();
    if total <= groups.len() {
        return Err(AnalysisError::InsufficientData {
            min_required: groups.len() + 1,
            actual: total,
        });
    }
    debug!(groups = groups.len(), n = total, "Levene test");

    let slices: Vec<&[f64]> = groups.iter().map(|g| g.values.as_slice()).collect();
    let (statistic, p_value) = levene_statistic(&slices)
        .ok_or_else(|| AnalysisError::degenerate("identical spread in every group"))?;

    let equal_variances = p_value > config.significance_level;
    Ok(LeveneTest {
        groups: groups.iter().map(Group::summary).collect(),
        statistic,
        p_value,
        df_between: groups.len() - 1,
        df_within: total - groups.len(),
        equal_variances,
        interpretation: verdict(
            equal_variances,
            Interpretation::EqualVariances,
            Interpretation::UnequalVariances,
        ),
    })
}

// ── Two-sample t-test ─────────────────────────────────────────────────

/// Independent two-sample t-test with a Levene-driven variance assumption.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwoSampleTest {
    pub group_a: GroupSummary,
    pub group_b: GroupSummary,
    /// mean_a − mean_b.
    pub mean_diff: f64,
    pub t_statistic: f64,
    /// Degrees of freedom; fractional under the Welch correction.
    pub df: f64,
    pub p_value: f64,
    /// (mean_a − mean_b) / √((var_a + var_b) / 2).
    pub cohens_d: f64,
    /// Levene p-value, `None` when Levene's statistic is undefined.
    pub levene_p_value: Option<f64>,
    /// Pooled (`true`) or Welch (`false`) variance.
    pub equal_var: bool,
    pub significant: bool,
    pub interpretation: Interpretation,
}

/// Compares the means of two named groups.
///
/// Levene's test runs first; the pooled-variance t-test is used when it
/// does not reject equal variances, Welch's test otherwise.
///
/// # Errors
///
/// - [`AnalysisError::GroupNotFound`] if a label does not occur in `group_col`.
/// - [`AnalysisError::InsufficientData`] if either group has fewer than 3
///   present values (0 when every row of the group is missing its value).
/// - [`AnalysisError::DegenerateInput`] if both groups have zero variance.
/// - [`AnalysisError::InvalidParameter`] if both labels name the same group.
pub fn two_sample_test(
    df: &DataFrame,
    value_col: &str,
    group_col: &str,
    group_a: &str,
    group_b: &str,
    config: &AnalysisConfig,
) -> Result<TwoSampleTest, AnalysisError> {
    if group_a == group_b {
        return Err(AnalysisError::invalid_parameter(
            "group_b",
            format!("must differ from group_a ('{group_a}')"),
        ));
    }
    let mut groups = collect_groups(df, value_col, group_col)?;
    let mut take = |label: &str| match groups.iter().position(|g| g.label == label) {
        Some(i) => Ok(groups.swap_remove(i)),
        None if label_in_column(df, group_col, label) => Err(AnalysisError::InsufficientData {
            min_required: MIN_GROUP_SIZE,
            actual: 0,
        }),
        None => Err(AnalysisError::GroupNotFound {
            column: group_col.to_string(),
            group: label.to_string(),
        }),
    };
    let a = take(group_a)?;
    let b = take(group_b)?;

    for g in [&a, &b] {
        if g.n() < MIN_GROUP_SIZE {
            return Err(AnalysisError::InsufficientData {
                min_required: MIN_GROUP_SIZE,
                actual: g.n(),
            });
        }
    }

    let (va, vb) = (a.variance(), b.variance());
    if va == 0.0 && vb == 0.0 {
        return Err(AnalysisError::degenerate(
            "both groups have zero variance; t statistic and Cohen's d are undefined",
        ));
    }

    let levene_p_value = levene_statistic(&[a.values.as_slice(), b.values.as_slice()]).map(|(_, p)| p);
    let equal_var = levene_p_value.map_or(true, |p| p > config.significance_level);

    let mean_diff = a.mean() - b.mean();
    let (t_statistic, dof, p_value) = if equal_var {
        let (na, nb) = (a.n() as f64, b.n() as f64);
        let pooled = ((na - 1.0) * va + (nb - 1.0) * vb) / (na + nb - 2.0);
        let se = (pooled * (1.0 / na + 1.0 / nb)).sqrt();
        let dof = na + nb - 2.0;
        let t = mean_diff / se;
        (t, dof, t_two_sided_p(t, dof))
    } else {
        let welch = two_sample_t_test(&a.values, &b.values)
            .ok_or_else(|| AnalysisError::degenerate("Welch t-test undefined for these values"))?;
        (welch.statistic, welch.df, welch.p_value)
    };
    let cohens_d = mean_diff / ((va + vb) / 2.0).sqrt();

    debug!(
        group_a,
        group_b,
        equal_var,
        t = t_statistic,
        p = p_value,
        "two-sample t-test"
    );

    let significant = p_value < config.significance_level;
    Ok(TwoSampleTest {
        group_a: a.summary(),
        group_b: b.summary(),
        mean_diff,
        t_statistic,
        df: dof,
        p_value,
        cohens_d,
        levene_p_value,
        equal_var,
        significant,
        interpretation: verdict(
            significant,
            Interpretation::SignificantDifference,
            Interpretation::NoSignificantDifference,
        ),
    })
}

// ── One-way ANOVA ─────────────────────────────────────────────────────

/// One-way ANOVA across every group with at least 3 observations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anova {
    /// Qualifying groups, in ascending label order.
    pub groups: Vec<GroupSummary>,
    /// Labels of groups dropped for having fewer than 3 observations.
    pub dropped_groups: Vec<String>,
    pub ss_between: f64,
    pub ss_within: f64,
    pub df_between: usize,
    pub df_within: usize,
    /// F statistic; `+∞` when every group is internally constant.
    pub f_statistic: f64,
    pub p_value: f64,
    pub significant: bool,
    pub interpretation: Interpretation,
    /// Tukey HSD comparisons, present only when the ANOVA is significant.
    pub post_hoc: Option<TukeyHsd>,
}

/// Runs one-way ANOVA of `value_col` across the groups of `group_col`.
///
/// Groups with fewer than 3 observations are dropped (and listed in
/// [`Anova::dropped_groups`]). A significant result triggers Tukey HSD
/// over the qualifying groups.
///
/// # Errors
///
/// - [`AnalysisError::InsufficientData`] with fewer than two qualifying groups.
/// - [`AnalysisError::DegenerateInput`] when there is no variation at all.
pub fn group_comparison_test(
    df: &DataFrame,
    value_col: &str,
    group_col: &str,
    config: &AnalysisConfig,
) -> Result<Anova, AnalysisError> {
    let (groups, dropped): (Vec<Group>, Vec<Group>) = collect_groups(df, value_col, group_col)?
        .into_iter()
        .partition(|g| g.n() >= MIN_GROUP_SIZE);

    let dropped_groups: Vec<String> = dropped.into_iter().map(|g| g.label).collect();
    if !dropped_groups.is_empty() {
        warn!(
            dropped = ?dropped_groups,
            "groups with fewer than {MIN_GROUP_SIZE} observations excluded from ANOVA"
        );
    }
    if groups.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            min_required: 2,
            actual: groups.len(),
        });
    }

    let total: usize = groups.iter().map(Group::n).sum();
    debug!(groups = groups.len(), n = total, "one-way ANOVA");

    let slices: Vec<&[f64]> = groups.iter().map(|g| g.values.as_slice()).collect();
    let table = one_way_anova(&slices)
        .ok_or_else(|| AnalysisError::invalid_parameter("values", "must be finite"))?;
    if table.f_statistic.is_infinite() && table.ss_between == 0.0 {
        return Err(AnalysisError::degenerate(
            "zero variance within and between groups",
        ));
    }

    let significant = table.p_value < config.significance_level;
    let post_hoc = significant.then(|| {
        tukey_hsd(
            &groups,
            table.ms_within,
            table.df_within,
            config.significance_level,
        )
    });

    Ok(Anova {
        groups: groups.iter().map(Group::summary).collect(),
        dropped_groups,
        ss_between: table.ss_between,
        ss_within: table.ss_within,
        df_between: table.df_between,
        df_within: table.df_within,
        f_statistic: table.f_statistic,
        p_value: table.p_value,
        significant,
        interpretation: verdict(
            significant,
            Interpretation::GroupsDiffer,
            Interpretation::NoGroupDifference,
        ),
        post_hoc,
    })
}

// ── Tukey HSD ─────────────────────────────────────────────────────────

/// One pairwise comparison of a Tukey HSD table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TukeyComparison {
    pub group1: String,
    pub group2: String,
    /// mean(group2) − mean(group1).
    pub mean_diff: f64,
    /// Studentized range statistic |mean_diff| / SE.
    pub q_statistic: f64,
    /// Family-wise adjusted p-value.
    pub p_adj: f64,
    pub lower: f64,
    pub upper: f64,
    pub reject: bool,
}

/// Tukey's honestly significant difference test over all group pairs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TukeyHsd {
    /// Family-wise error rate.
    pub alpha: f64,
    /// Error degrees of freedom.
    pub df: usize,
    /// Critical studentized range value at 1 − α.
    pub q_critical: f64,
    pub comparisons: Vec<TukeyComparison>,
}

fn tukey_hsd(groups: &[Group], mse: f64, df: usize, alpha: f64) -> TukeyHsd {
    let k = groups.len() as f64;
    let dff = df as f64;
    let q_critical = studentized_range_quantile(1.0 - alpha, k, dff);

    let mut comparisons = Vec::with_capacity(groups.len() * (groups.len() - 1) / 2);
    for (i, g1) in groups.iter().enumerate() {
        for g2 in &groups[i + 1..] {
            let mean_diff = g2.mean() - g1.mean();
            let se = (mse / 2.0 * (1.0 / g1.n() as f64 + 1.0 / g2.n() as f64)).sqrt();
            let (q_statistic, p_adj) = if se > 0.0 {
                let q = mean_diff.abs() / se;
                (q, (1.0 - studentized_range_cdf(q, k, dff)).clamp(0.0, 1.0))
            } else if mean_diff == 0.0 {
                (0.0, 1.0)
            } else {
                (f64::INFINITY, 0.0)
            };
            let half_width = q_critical * se;
            comparisons.push(TukeyComparison {
                group1: g1.label.clone(),
                group2: g2.label.clone(),
                mean_diff,
                q_statistic,
                p_adj,
                lower: mean_diff - half_width,
                upper: mean_diff + half_width,
                reject: p_adj < alpha,
            });
        }
    }

    TukeyHsd {
        alpha,
        df,
        q_critical,
        comparisons,
    }
}

impl std::fmt::Display for TukeyHsd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header = format!(
            "{:>10} {:>10} {:>10} {:>8} {:>10} {:>10} {:>6}",
            "group1", "group2", "meandiff", "p-adj", "lower", "upper", "reject"
        );
        let rule_len = header.len();
        writeln!(f, "Multiple Comparison of Means - Tukey HSD, FWER={:.2}", self.alpha)?;
        writeln!(f, "{}", "=".repeat(rule_len))?;
        writeln!(f, "{header}")?;
        writeln!(f, "{}", "-".repeat(rule_len))?;
        for c in &self.comparisons {
            writeln!(
                f,
                "{:>10} {:>10} {:>10.4} {:>8.4} {:>10.4} {:>10.4} {:>6}",
                c.group1, c.group2, c.mean_diff, c.p_adj, c.lower, c.upper, c.reject
            )?;
        }
        write!(f, "{}", "-".repeat(rule_len))
    }
}
