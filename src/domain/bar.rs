//! Price bar representation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One OHLCV bar for an instrument. Histories are ordered by date and
/// append-only; the engine never fabricates bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub instrument: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<i64>,
}

impl PriceBar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Returns the first bar whose close is not a positive finite number.
pub fn first_invalid_close(bars: &[PriceBar]) -> Option<&PriceBar> {
    bars.iter().find(|b| !(b.close.is_finite() && b.close > 0.0))
}
