//! Error types for sigma-insight.

use thiserror::Error;

/// Coarse classification of an [`AnalysisError`], suitable for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ErrorKind {
    /// Sample size below the statistical minimum of the requested test.
    InsufficientData,
    /// Requested column(s) missing, non-numeric, or parameters out of range.
    InvalidSelection,
    /// Mathematically undefined operation on valid-looking data.
    DegenerateInput,
    /// Unrecognized method selector.
    UnsupportedMethod,
    /// Malformed input from the data source itself.
    Input,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientData => write!(f, "InsufficientData"),
            Self::InvalidSelection => write!(f, "InvalidSelection"),
            Self::DegenerateInput => write!(f, "DegenerateInput"),
            Self::UnsupportedMethod => write!(f, "UnsupportedMethod"),
            Self::Input => write!(f, "Input"),
        }
    }
}

/// All errors produced by sigma-insight operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Insufficient data for the requested operation.
    #[error("need at least {min_required} observations, got {actual}")]
    InsufficientData { min_required: usize, actual: usize },
    /// Column not found in the DataFrame.
    #[error("column '{name}' not found")]
    ColumnNotFound { name: String },
    /// Column is not numeric where numeric data is required.
    #[error("column '{column}' is not numeric")]
    NonNumericColumn { column: String },
    /// The DataFrame has no numeric columns to analyze.
    #[error("no numeric columns available")]
    NoNumericColumns,
    /// A requested group label does not occur in the grouping column.
    #[error("group '{group}' not found in column '{column}'")]
    GroupNotFound { column: String, group: String },
    /// A caller-supplied parameter is out of range.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
    /// The computation is mathematically undefined for this input.
    #[error("degenerate input: {reason}")]
    DegenerateInput { reason: String },
    /// Unrecognized method selector.
    #[error("unsupported method '{method}'")]
    UnsupportedMethod { method: String },
    /// Dimension mismatch.
    #[error("expected {expected} elements, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// CSV parsing failed.
    #[error("CSV parse error at line {line}: {message}")]
    CsvParse { line: usize, message: String },
    /// I/O error during file reading.
    #[error("I/O error: {0}")]
    Io(String),
}

impl AnalysisError {
    /// Returns the taxonomy bucket this error belongs to.
    ///
    /// ```
    /// use sigma_insight::error::{AnalysisError, ErrorKind};
    ///
    /// let err = AnalysisError::ColumnNotFound { name: "x".into() };
    /// assert_eq!(err.kind(), ErrorKind::InvalidSelection);
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientData { .. } => ErrorKind::InsufficientData,
            Self::ColumnNotFound { .. }
            | Self::NonNumericColumn { .. }
            | Self::NoNumericColumns
            | Self::GroupNotFound { .. }
            | Self::InvalidParameter { .. } => ErrorKind::InvalidSelection,
            Self::DegenerateInput { .. } => ErrorKind::DegenerateInput,
            Self::UnsupportedMethod { .. } => ErrorKind::UnsupportedMethod,
            Self::DimensionMismatch { .. } | Self::CsvParse { .. } | Self::Io(_) => {
                ErrorKind::Input
            }
        }
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = AnalysisError::InsufficientData {
            min_required: 3,
            actual: 1,
        };
        assert_eq!(err.to_string(), "need at least 3 observations, got 1");

        let err = AnalysisError::UnsupportedMethod {
            method: "cosine".into(),
        };
        assert_eq!(err.to_string(), "unsupported method 'cosine'");
    }

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            AnalysisError::NoNumericColumns.kind(),
            ErrorKind::InvalidSelection
        );
        assert_eq!(
            AnalysisError::degenerate("zero variance").kind(),
            ErrorKind::DegenerateInput
        );
        assert_eq!(
            AnalysisError::invalid_parameter("lsl", "must be below usl").kind(),
            ErrorKind::InvalidSelection
        );
        assert_eq!(
            AnalysisError::CsvParse {
                line: 2,
                message: "bad".into()
            }
            .kind(),
            ErrorKind::Input
        );
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: AnalysisError = io.into();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(err.to_string().contains("missing.csv"));
    }
}
