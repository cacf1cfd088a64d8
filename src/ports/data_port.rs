//! Market data ports.
//!
//! Implementations are synchronous, already-populated caches: the simulator
//! fetches price history once before the run and queries snapshots inside
//! the period loop. "Nothing known" is `Ok(None)` or an empty history, not
//! an error.

use crate::domain::bar::PriceBar;
use crate::domain::error::EquisimError;
use crate::domain::snapshot::{FundamentalSnapshot, SentimentSnapshot};
use chrono::NaiveDate;

pub trait PriceHistoryProvider {
    /// Bars for `instrument` dated within `[start, end]`, oldest first.
    fn price_history(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, EquisimError>;
}

pub trait FundamentalsProvider {
    /// Latest snapshot published on or before `as_of`.
    fn fundamentals(
        &self,
        instrument: &str,
        as_of: NaiveDate,
    ) -> Result<Option<FundamentalSnapshot>, EquisimError>;
}

pub trait SentimentProvider {
    /// Aggregated sentiment as of `as_of`.
    fn sentiment(
        &self,
        instrument: &str,
        as_of: NaiveDate,
    ) -> Result<Option<SentimentSnapshot>, EquisimError>;
}
