//! In-memory as-of cache implementing all three data ports.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::bar::PriceBar;
use crate::domain::error::EquisimError;
use crate::domain::snapshot::{FundamentalSnapshot, SentimentSnapshot};
use crate::ports::data_port::{FundamentalsProvider, PriceHistoryProvider, SentimentProvider};

/// Pre-populated market data. Histories are kept sorted by date; snapshot
/// lookups return the latest entry dated on or before the query date.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    bars: BTreeMap<String, Vec<PriceBar>>,
    fundamentals: BTreeMap<String, Vec<FundamentalSnapshot>>,
    sentiment: BTreeMap<String, Vec<SentimentSnapshot>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds bars to each bar's instrument history. A bar dated like an
    /// existing one replaces it.
    pub fn insert_bars(&mut self, bars: impl IntoIterator<Item = PriceBar>) {
        for bar in bars {
            let history = self.bars.entry(bar.instrument.clone()).or_default();
            match history.binary_search_by_key(&bar.date, |b| b.date) {
                Ok(pos) => history[pos] = bar,
                Err(pos) => history.insert(pos, bar),
            }
        }
    }

    pub fn insert_fundamentals(&mut self, snapshot: FundamentalSnapshot) {
        let list = self
            .fundamentals
            .entry(snapshot.instrument.clone())
            .or_default();
        match list.binary_search_by_key(&snapshot.as_of, |s| s.as_of) {
            Ok(pos) => list[pos] = snapshot,
            Err(pos) => list.insert(pos, snapshot),
        }
    }

    pub fn insert_sentiment(&mut self, snapshot: SentimentSnapshot) {
        let list = self
            .sentiment
            .entry(snapshot.instrument.clone())
            .or_default();
        match list.binary_search_by_key(&snapshot.as_of, |s| s.as_of) {
            Ok(pos) => list[pos] = snapshot,
            Err(pos) => list.insert(pos, snapshot),
        }
    }

    /// Instruments with price history, sorted.
    pub fn instruments(&self) -> Vec<String> {
        self.bars.keys().cloned().collect()
    }

    /// First and last bar date over every instrument.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.bars.values().filter_map(|h| h.first()).map(|b| b.date).min()?;
        let last = self.bars.values().filter_map(|h| h.last()).map(|b| b.date).max()?;
        Some((first, last))
    }
}

fn latest_on_or_before<T: Clone>(
    list: Option<&Vec<T>>,
    as_of: NaiveDate,
    date_of: impl Fn(&T) -> NaiveDate,
) -> Option<T> {
    let list = list?;
    let upto = list.partition_point(|item| date_of(item) <= as_of);
    upto.checked_sub(1).map(|i| list[i].clone())
}

impl PriceHistoryProvider for MemoryProvider {
    fn price_history(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, EquisimError> {
        Ok(self
            .bars
            .get(instrument)
            .map(|history| {
                history
                    .iter()
                    .filter(|b| b.date >= start && b.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl FundamentalsProvider for MemoryProvider {
    fn fundamentals(
        &self,
        instrument: &str,
        as_of: NaiveDate,
    ) -> Result<Option<FundamentalSnapshot>, EquisimError> {
        Ok(latest_on_or_before(
            self.fundamentals.get(instrument),
            as_of,
            |s| s.as_of,
        ))
    }
}

impl SentimentProvider for MemoryProvider {
    fn sentiment(
        &self,
        instrument: &str,
        as_of: NaiveDate,
    ) -> Result<Option<SentimentSnapshot>, EquisimError> {
        Ok(latest_on_or_before(
            self.sentiment.get(instrument),
            as_of,
            |s| s.as_of,
        ))
    }
}
