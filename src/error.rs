//! Error taxonomy for the insight engine
//!
//! Only schema resolution and I/O abort the pipeline. Empty filter results
//! and invalid rows are absorbed locally (see `filter::EmptyResultWarning`
//! and `data::SkipStats`) and never surface as errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InsightError {
    /// A required canonical field had no matching source column. Raised
    /// during normalization, before any aggregation is attempted.
    #[error("required column '{0}' not found: no accepted alias matched the input headers")]
    MissingColumn(&'static str),

    #[error("failed to read CSV input: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Date range where the start falls after the end.
    #[error("invalid date range: {from} is after {to}")]
    InvalidDateRange {
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    },

    /// A command-line date that did not parse.
    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),
}
