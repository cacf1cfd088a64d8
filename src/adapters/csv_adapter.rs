//! CSV data directory adapter.
//!
//! Layout:
//!
//! ```text
//! data/
//!   AAPL.csv            date,open,high,low,close[,volume]
//!   MSFT.csv
//!   fundamentals.csv    instrument,as_of,pe_ratio,pb_ratio,market_cap,sector
//!   sentiment.csv       instrument,as_of,mean_score,confidence,sample_count
//! ```
//!
//! Empty cells in optional columns are read as missing values. Both snapshot
//! files are optional.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::adapters::memory_adapter::MemoryProvider;
use crate::domain::bar::PriceBar;
use crate::domain::error::EquisimError;
use crate::domain::snapshot::{FundamentalSnapshot, SentimentSnapshot};

const FUNDAMENTALS_FILE: &str = "fundamentals.csv";
const SENTIMENT_FILE: &str = "sentiment.csv";

#[derive(Debug, Deserialize)]
struct PriceRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct FundamentalRow {
    instrument: String,
    as_of: NaiveDate,
    pe_ratio: Option<f64>,
    pb_ratio: Option<f64>,
    market_cap: Option<f64>,
    sector: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentimentRow {
    instrument: String,
    as_of: NaiveDate,
    mean_score: f64,
    confidence: f64,
    sample_count: u32,
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn price_path(&self, instrument: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", instrument))
    }

    /// Instruments with a price file, sorted.
    pub fn list_instruments(&self) -> Result<Vec<String>, EquisimError> {
        let mut instruments = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if name == FUNDAMENTALS_FILE || name == SENTIMENT_FILE {
                continue;
            }
            if let Some(stem) = name.strip_suffix(".csv") {
                instruments.push(stem.to_string());
            }
        }
        instruments.sort();
        Ok(instruments)
    }

    /// Reads the price history of one instrument, sorted by date.
    pub fn read_prices(&self, instrument: &str) -> Result<Vec<PriceBar>, EquisimError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(self.price_path(instrument))?;
        let mut bars = Vec::new();
        for row in rdr.deserialize() {
            let row: PriceRow = row?;
            bars.push(PriceBar {
                instrument: instrument.to_string(),
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, EquisimError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        rdr.deserialize()
            .map(|row| row.map_err(EquisimError::from))
            .collect()
    }

    /// Loads the given instruments (every price file when `instruments` is
    /// empty) plus the snapshot files into a [`MemoryProvider`]. A missing
    /// price file is logged and skipped; the simulator reports the instrument
    /// as unavailable.
    pub fn load(&self, instruments: &[String]) -> Result<MemoryProvider, EquisimError> {
        let instruments = if instruments.is_empty() {
            self.list_instruments()?
        } else {
            instruments.to_vec()
        };

        let mut provider = MemoryProvider::new();
        for instrument in &instruments {
            if !self.price_path(instrument).exists() {
                warn!(instrument = %instrument, "no price file");
                continue;
            }
            let bars = self.read_prices(instrument)?;
            debug!(instrument = %instrument, bars = bars.len(), "loaded prices");
            provider.insert_bars(bars);
        }

        let fundamentals_path = self.base_path.join(FUNDAMENTALS_FILE);
        if fundamentals_path.exists() {
            for row in Self::read_rows::<FundamentalRow>(&fundamentals_path)? {
                provider.insert_fundamentals(FundamentalSnapshot {
                    instrument: row.instrument,
                    as_of: row.as_of,
                    pe_ratio: row.pe_ratio,
                    pb_ratio: row.pb_ratio,
                    market_cap: row.market_cap,
                    sector: row.sector.filter(|s| !s.is_empty()),
                });
            }
        }

        let sentiment_path = self.base_path.join(SENTIMENT_FILE);
        if sentiment_path.exists() {
            for row in Self::read_rows::<SentimentRow>(&sentiment_path)? {
                provider.insert_sentiment(SentimentSnapshot {
                    instrument: row.instrument,
                    as_of: row.as_of,
                    mean_score: row.mean_score,
                    confidence: row.confidence,
                    sample_count: row.sample_count,
                });
            }
        }

        Ok(provider)
    }
}
