//! Non-fatal conditions recorded during a simulation run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticKind {
    /// No bar on the period date; the instrument sat the period out.
    PriceUnavailable,
    FundamentalsUnavailable,
    SentimentUnavailable,
    /// The price provider failed or returned nothing; the instrument is
    /// excluded from the run.
    DataUnavailable,
    /// The indicator windows were clipped for this evaluation.
    InsufficientHistory,
    /// A sized entry could not be filled.
    EntryRejected,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticKind::PriceUnavailable => "PRICE_UNAVAILABLE",
            DiagnosticKind::FundamentalsUnavailable => "FUNDAMENTALS_UNAVAILABLE",
            DiagnosticKind::SentimentUnavailable => "SENTIMENT_UNAVAILABLE",
            DiagnosticKind::DataUnavailable => "DATA_UNAVAILABLE",
            DiagnosticKind::InsufficientHistory => "INSUFFICIENT_HISTORY",
            DiagnosticKind::EntryRejected => "ENTRY_REJECTED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub date: NaiveDate,
    pub instrument: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        date: NaiveDate,
        instrument: &str,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            date,
            instrument: instrument.to_string(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}: {}",
            self.date, self.instrument, self.kind, self.message
        )
    }
}
