#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use equisim::adapters::memory_adapter::MemoryProvider;
use equisim::domain::config::{EngineConfig, RiskParams};
use equisim::domain::error::EquisimError;
pub use equisim::domain::bar::PriceBar;
use equisim::domain::scoring::FactorWeights;
use equisim::domain::snapshot::{FundamentalSnapshot, SentimentSnapshot};
use equisim::ports::data_port::{FundamentalsProvider, PriceHistoryProvider, SentimentProvider};
use std::collections::HashMap;

/// In-memory provider with per-instrument failures.
pub struct MockProvider {
    pub inner: MemoryProvider,
    pub price_errors: HashMap<String, String>,
    pub fundamental_errors: HashMap<String, String>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            inner: MemoryProvider::new(),
            price_errors: HashMap::new(),
            fundamental_errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, bars: Vec<PriceBar>) -> Self {
        self.inner.insert_bars(bars);
        self
    }

    pub fn with_fundamentals(mut self, snapshot: FundamentalSnapshot) -> Self {
        self.inner.insert_fundamentals(snapshot);
        self
    }

    pub fn with_sentiment(mut self, snapshot: SentimentSnapshot) -> Self {
        self.inner.insert_sentiment(snapshot);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.price_errors
            .insert(instrument.to_string(), reason.to_string());
        self
    }

    pub fn with_fundamentals_error(mut self, instrument: &str, reason: &str) -> Self {
        self.fundamental_errors
            .insert(instrument.to_string(), reason.to_string());
        self
    }
}

impl PriceHistoryProvider for MockProvider {
    fn price_history(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, EquisimError> {
        if let Some(reason) = self.price_errors.get(instrument) {
            return Err(EquisimError::DataUnavailable {
                instrument: instrument.to_string(),
                reason: reason.clone(),
            });
        }
        self.inner.price_history(instrument, start, end)
    }
}

impl FundamentalsProvider for MockProvider {
    fn fundamentals(
        &self,
        instrument: &str,
        as_of: NaiveDate,
    ) -> Result<Option<FundamentalSnapshot>, EquisimError> {
        if let Some(reason) = self.fundamental_errors.get(instrument) {
            return Err(EquisimError::DataUnavailable {
                instrument: instrument.to_string(),
                reason: reason.clone(),
            });
        }
        self.inner.fundamentals(instrument, as_of)
    }
}

impl SentimentProvider for MockProvider {
    fn sentiment(
        &self,
        instrument: &str,
        as_of: NaiveDate,
    ) -> Result<Option<SentimentSnapshot>, EquisimError> {
        self.inner.sentiment(instrument, as_of)
    }
}

/// Day `i` counted from 2024-01-01.
pub fn day(i: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i)
}

pub fn make_bar(instrument: &str, date: NaiveDate, close: f64) -> PriceBar {
    PriceBar {
        instrument: instrument.to_string(),
        date,
        open: close,
        high: close,
        low: close,
        close,
        volume: None,
    }
}

/// One bar per consecutive day from 2024-01-01.
pub fn make_bars(instrument: &str, closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(instrument, day(i as i64), close))
        .collect()
}

pub fn make_bar_with_range(
    instrument: &str,
    date: NaiveDate,
    close: f64,
    spread: f64,
    volume: i64,
) -> PriceBar {
    PriceBar {
        instrument: instrument.to_string(),
        date,
        open: close,
        high: close + spread,
        low: close - spread,
        close,
        volume: Some(volume),
    }
}

/// A snapshot with no fields set; scores zero.
pub fn neutral_fundamentals(instrument: &str) -> FundamentalSnapshot {
    FundamentalSnapshot {
        instrument: instrument.to_string(),
        as_of: day(0),
        pe_ratio: None,
        pb_ratio: None,
        market_cap: None,
        sector: None,
    }
}

/// Full-confidence sentiment with enough samples for full weight.
pub fn sentiment(instrument: &str, as_of: NaiveDate, mean_score: f64) -> SentimentSnapshot {
    SentimentSnapshot {
        instrument: instrument.to_string(),
        as_of,
        mean_score,
        confidence: 1.0,
        sample_count: 20,
    }
}

/// Scores on sentiment alone so entries can be driven by the sentiment
/// snapshot. Mean 0.5 scores 1.0 (strong buy).
pub fn sentiment_driven_config() -> EngineConfig {
    EngineConfig {
        weights: FactorWeights {
            technical: 0.0,
            fundamental: 0.0,
            sentiment: 1.0,
        },
        risk: RiskParams {
            risk_per_trade: 0.1,
            max_position_size: 0.5,
            stop_loss_pct: 0.02,
            take_profit_pct: 0.04,
            commission_rate: 0.001,
            slippage_rate: 0.0,
            ..RiskParams::default()
        },
        ..EngineConfig::default()
    }
}

/// Provider with bars for `instrument` plus neutral fundamentals and
/// positive sentiment from day 0.
pub fn bullish_provider(instrument: &str, closes: &[f64]) -> MockProvider {
    MockProvider::new()
        .with_bars(make_bars(instrument, closes))
        .with_fundamentals(neutral_fundamentals(instrument))
        .with_sentiment(sentiment(instrument, day(0), 0.5))
}

pub fn instruments(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
