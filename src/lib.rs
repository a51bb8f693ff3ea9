//! # sigma-insight
//!
//! Statistics engine for Lean Six Sigma process analysis.
//!
//! Every operation is a pure function over an in-memory [`DataFrame`]:
//! no I/O, no global state, identical inputs give identical outputs.
//! Results are typed, serde-serializable structs carrying the statistic,
//! its p-value where one applies, a derived flag and an [`Interpretation`].
//! Sub-tests that cannot run on the given sample are reported as
//! [`Outcome::Skipped`] rather than failing the whole call.
//!
//! ## Modules
//!
//! - [`dataframe`]: Column-major tabular data (Numeric, Categorical, Datetime) with missing values
//! - [`csv_parser`]: CSV parsing with type inference
//! - [`config`]: Significance level and decision thresholds
//! - [`descriptive`]: Count, mean, spread, quartiles, missing share, CV
//! - [`outliers`]: IQR fences and z-scores
//! - [`normality`]: Shapiro–Wilk and Anderson–Darling
//! - [`hypothesis`]: Levene, two-sample t-test, one-way ANOVA with Tukey HSD
//! - [`correlation`]: Pearson, Spearman and Kendall matrices with p-values
//! - [`regression`]: OLS with R², F test, coefficient table, residual diagnostics
//! - [`capability`]: Cp, Cpk, Cpm and PPM defect rates
//! - [`control`]: Individuals control chart limits
//! - [`pareto`]: Pareto ranking and the vital few
//! - [`engine`]: Tagged request/result types and the [`analyze`] dispatcher
//! - [`special`]: Distribution functions used by the tests
//! - [`error`]: Error types
//!
//! ## Quick Start
//!
//! ```
//! use sigma_insight::config::AnalysisConfig;
//! use sigma_insight::csv_parser::CsvParser;
//! use sigma_insight::capability::{process_capability, SpecLimits};
//!
//! let csv = "part,bore\n1,25.01\n2,24.98\n3,25.02\n4,24.99\n5,25.00\n6,25.01\n";
//! let df = CsvParser::new().parse_str(csv).unwrap();
//! let bore = df.require_numeric("bore").unwrap().valid_numeric_values().unwrap();
//!
//! let spec = SpecLimits::two_sided(24.9, 25.1).with_target(25.0);
//! let report = process_capability(&bore, &spec, &AnalysisConfig::default()).unwrap();
//!
//! let indices = report.indices.unwrap();
//! assert!(indices.cpk <= indices.cp.unwrap());
//! assert!(report.small_sample);
//! ```

pub mod capability;
pub mod config;
pub mod control;
pub mod correlation;
pub mod csv_parser;
pub mod dataframe;
pub mod descriptive;
pub mod engine;
pub mod error;
pub mod hypothesis;
pub mod normality;
pub mod outcome;
pub mod outliers;
pub mod pareto;
pub mod regression;
pub mod special;

pub use config::AnalysisConfig;
pub use dataframe::DataFrame;
pub use engine::{analyze, AnalysisRequest, AnalysisResult};
pub use error::{AnalysisError, ErrorKind};
pub use outcome::{Interpretation, Outcome, SkipReason};
