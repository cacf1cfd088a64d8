//! Point-in-time fundamental and sentiment metrics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Valuation metrics as of a date. Missing fields are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    pub instrument: String,
    pub as_of: NaiveDate,
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub market_cap: Option<f64>,
    pub sector: Option<String>,
}

/// Aggregated sentiment over a trailing window ending at `as_of`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSnapshot {
    pub instrument: String,
    pub as_of: NaiveDate,
    /// Mean polarity, nominally in [-1, 1].
    pub mean_score: f64,
    /// Nominally in [0, 1].
    pub confidence: f64,
    pub sample_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketCapTier {
    Large,
    Mid,
    Small,
    Micro,
}

impl MarketCapTier {
    pub const LARGE_MIN: f64 = 10e9;
    pub const MID_MIN: f64 = 2e9;
    pub const SMALL_MIN: f64 = 300e6;

    pub fn from_market_cap(cap: f64) -> Self {
        if cap >= Self::LARGE_MIN {
            MarketCapTier::Large
        } else if cap >= Self::MID_MIN {
            MarketCapTier::Mid
        } else if cap >= Self::SMALL_MIN {
            MarketCapTier::Small
        } else {
            MarketCapTier::Micro
        }
    }
}
