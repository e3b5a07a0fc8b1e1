//! Classifiable failures of the [pipeline](crate::run).
//!
//! Everything else travels as a [`color_eyre::Report`] with context attached; these
//! variants are the ones a user must be able to tell apart ("bad filter syntax" versus
//! "filter too strict").

use std::path::PathBuf;
use thiserror::Error;

/// Broad class of an [`Error`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    InputMissing,
    MalformedFilter,
    EmptyResult,
    OutputPathInvalid,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("No file named {path:?}")]
    InputMissing { path: PathBuf },

    #[error("Quantile must be between 0 and 100 (got {quantile})")]
    QuantileOutOfRange { quantile: f64 },

    #[error("Quantile filtering requires a floating-point column, but '{column}' is not")]
    QuantileNotFloat { column: String },

    #[error("Column '{column}' contains the non-numeric value '{value}' and cannot be compared")]
    NonNumericValue { column: String, value: String },

    #[error("Invalid numeric filter '{token}': {reason}")]
    InvalidComparator { token: String, reason: String },

    #[error("None of the values {values:?} were found in column '{column}'")]
    ValuesNotFound { values: Vec<String>, column: String },

    #[error("Empty result: {reason}")]
    EmptyResult { reason: String },

    #[error("Output path {path:?} must end in '.{extension}'")]
    OutputPathInvalid { path: PathBuf, extension: String },
}

impl Error {
    /// Returns the broad class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InputMissing { .. } => ErrorKind::InputMissing,
            Error::QuantileOutOfRange { .. }
            | Error::QuantileNotFloat { .. }
            | Error::NonNumericValue { .. }
            | Error::InvalidComparator { .. }
            | Error::ValuesNotFound { .. } => ErrorKind::MalformedFilter,
            Error::EmptyResult { .. } => ErrorKind::EmptyResult,
            Error::OutputPathInvalid { .. } => ErrorKind::OutputPathInvalid,
        }
    }

    /// Returns the [`ErrorKind`] of a report, if it carries an [`Error`].
    pub fn kind_of(report: &color_eyre::Report) -> Option<ErrorKind> {
        report.downcast_ref::<Error>().map(Error::kind)
    }
}
