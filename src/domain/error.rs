//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for equisim.
///
/// Only configuration problems, invalid pre-fetched prices, cancellation and
/// I/O failures reach the caller. Missing data during a run is recovered by the
/// simulator and recorded as a [`Diagnostic`](crate::domain::diagnostics::Diagnostic).
#[derive(Debug, thiserror::Error)]
pub enum EquisimError {
    #[error("invalid configuration {key}: {reason}")]
    InvalidConfiguration { key: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid price {price} for {instrument} on {date}")]
    InvalidPrice {
        instrument: String,
        date: NaiveDate,
        price: f64,
    },

    #[error("data unavailable for {instrument}: {reason}")]
    DataUnavailable { instrument: String, reason: String },

    #[error("simulation cancelled at {date}")]
    Cancelled { date: NaiveDate },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EquisimError {
    pub fn invalid_config(key: &str, reason: impl Into<String>) -> Self {
        EquisimError::InvalidConfiguration {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&EquisimError> for std::process::ExitCode {
    fn from(err: &EquisimError) -> Self {
        let code: u8 = match err {
            EquisimError::Io(_) | EquisimError::Json(_) => 1,
            EquisimError::InvalidConfiguration { .. }
            | EquisimError::ConfigParse { .. }
            | EquisimError::ConfigMissing { .. } => 2,
            EquisimError::Csv(_) => 3,
            EquisimError::InvalidPrice { .. } | EquisimError::DataUnavailable { .. } => 5,
            EquisimError::Cancelled { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
