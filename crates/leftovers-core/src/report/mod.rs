//! Time-windowed statistics over leftover preparations and their exports.

mod export;
mod stats;
mod window;

pub use stats::*;
pub use window::*;

use thiserror::Error;

/// Export errors.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Export is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type ReportResult<T> = Result<T, ReportError>;
