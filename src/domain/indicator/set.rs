//! Per-instrument indicator set and the per-bar snapshot the scorer reads.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::bar::PriceBar;
use crate::domain::indicator::atr::calculate_atr;
use crate::domain::indicator::bollinger::{calculate_bollinger, multiplier_x100};
use crate::domain::indicator::cci::calculate_cci;
use crate::domain::indicator::macd::calculate_macd;
use crate::domain::indicator::momentum::{calculate_momentum, calculate_volume_ratio};
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::stochastic::{calculate_stochastic, calculate_williams_r};
use crate::domain::indicator::trend::{calculate_support_resistance, calculate_trend_strength};
use crate::domain::indicator::volatility::calculate_volatility;
use crate::domain::indicator::{
    calculate_ema, IndicatorParams, IndicatorSeries, IndicatorType, IndicatorValue,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdReading {
    pub fast: usize,
    pub slow: usize,
    pub signal_period: usize,
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
    pub prev_histogram: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BollingerReading {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Every indicator value at one bar of one instrument.
///
/// Oscillators are in percent points (RSI, %K, %D, %R), CCI in index points,
/// volatility, trend strength and momentum as fractions, the rest in price
/// units. Maps are keyed by period so iteration runs shortest horizon first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub instrument: String,
    pub date: NaiveDate,
    pub close: f64,
    pub prev_close: Option<f64>,
    pub bars_available: usize,
    /// Some series were computed on a clipped window.
    pub reduced_confidence: bool,
    pub sma: BTreeMap<usize, f64>,
    /// Every SMA had its full window.
    pub sma_full: bool,
    pub ema: BTreeMap<usize, f64>,
    pub rsi: BTreeMap<usize, f64>,
    /// Primary timeframe first.
    pub macd: Vec<MacdReading>,
    pub bollinger: BollingerReading,
    pub stochastic_k: f64,
    pub stochastic_d: f64,
    pub williams_r: f64,
    pub cci: f64,
    pub atr: f64,
    pub volatility: f64,
    pub trend_strength: f64,
    pub support: f64,
    pub resistance: f64,
    pub momentum: BTreeMap<usize, f64>,
    pub volume_ratio: Option<f64>,
}

/// All indicator series for one instrument's history. Indicators are causal,
/// so the set is computed once and read bar by bar.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    instrument: String,
    params: IndicatorParams,
    bars: Vec<PriceBar>,
    series: HashMap<IndicatorType, IndicatorSeries>,
    volume_ratio: Vec<Option<f64>>,
}

impl IndicatorSet {
    /// `bars` must be sorted by date.
    pub fn compute(instrument: &str, bars: Vec<PriceBar>, params: &IndicatorParams) -> Self {
        let mut series: Vec<IndicatorSeries> = Vec::new();

        series.extend(params.sma_periods.iter().map(|&p| calculate_sma(&bars, p)));
        series.extend(params.ema_periods.iter().map(|&p| calculate_ema(&bars, p)));
        series.extend(params.rsi_periods.iter().map(|&p| calculate_rsi(&bars, p)));
        series.extend(
            params
                .macd
                .iter()
                .map(|m| calculate_macd(&bars, m.fast, m.slow, m.signal)),
        );
        series.extend(
            params
                .momentum_periods
                .iter()
                .map(|&p| calculate_momentum(&bars, p)),
        );
        series.push(calculate_bollinger(
            &bars,
            params.bollinger_period,
            multiplier_x100(params.bollinger_k),
        ));
        series.push(calculate_stochastic(
            &bars,
            params.stochastic_k_period,
            params.stochastic_d_period,
        ));
        series.push(calculate_williams_r(&bars, params.williams_period));
        series.push(calculate_cci(&bars, params.cci_period));
        series.push(calculate_atr(&bars, params.atr_period));
        series.push(calculate_volatility(&bars, params.volatility_period));
        series.push(calculate_trend_strength(&bars, params.trend_period));
        series.push(calculate_support_resistance(
            &bars,
            params.support_resistance_period,
        ));

        let volume_ratio = calculate_volume_ratio(&bars, params.volume_period);

        IndicatorSet {
            instrument: instrument.to_string(),
            params: params.clone(),
            series: series
                .into_iter()
                .map(|s| (s.indicator_type.clone(), s))
                .collect(),
            bars,
            volume_ratio,
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn series(&self, indicator_type: &IndicatorType) -> Option<&IndicatorSeries> {
        self.series.get(indicator_type)
    }

    /// Index of the bar dated `date`.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by_key(&date, |b| b.date).ok()
    }

    /// Index of the latest bar on or before `date`.
    pub fn last_index_on_or_before(&self, date: NaiveDate) -> Option<usize> {
        match self.bars.binary_search_by_key(&date, |b| b.date) {
            Ok(i) => Some(i),
            Err(0) => None,
            Err(i) => Some(i - 1),
        }
    }

    pub fn snapshot_at(&self, date: NaiveDate) -> Option<IndicatorSnapshot> {
        self.snapshot(self.index_of(date)?)
    }

    /// Snapshot of bar `index`. `None` past the end of the history or when a
    /// configured period is zero.
    pub fn snapshot(&self, index: usize) -> Option<IndicatorSnapshot> {
        let bar = self.bars.get(index)?;
        let p = &self.params;
        let mut full = true;

        let mut simple = |t: IndicatorType| -> Option<f64> {
            let s = self.series.get(&t)?;
            full &= s.full_window_at(index);
            s.simple_at(index)
        };

        let mut sma = BTreeMap::new();
        let mut sma_full = true;
        for &period in &p.sma_periods {
            sma.insert(period, simple(IndicatorType::Sma(period))?);
            sma_full &= self.full(&IndicatorType::Sma(period), index);
        }
        let mut ema = BTreeMap::new();
        for &period in &p.ema_periods {
            ema.insert(period, simple(IndicatorType::Ema(period))?);
        }
        let mut rsi = BTreeMap::new();
        for &period in &p.rsi_periods {
            rsi.insert(period, simple(IndicatorType::Rsi(period))?);
        }
        let mut momentum = BTreeMap::new();
        for &period in &p.momentum_periods {
            momentum.insert(period, simple(IndicatorType::Momentum(period))?);
        }
        let williams_r = simple(IndicatorType::WilliamsR(p.williams_period))?;
        let cci = simple(IndicatorType::Cci(p.cci_period))?;
        let atr = simple(IndicatorType::Atr(p.atr_period))?;
        let volatility = simple(IndicatorType::Volatility(p.volatility_period))?;
        let trend_strength = simple(IndicatorType::TrendStrength(p.trend_period))?;

        let mut macd = Vec::with_capacity(p.macd.len());
        for m in &p.macd {
            let t = IndicatorType::Macd {
                fast: m.fast,
                slow: m.slow,
                signal: m.signal,
            };
            full &= self.full(&t, index);
            let s = self.series.get(&t)?;
            let (line, signal, histogram) = macd_at(s, index)?;
            let prev_histogram = index
                .checked_sub(1)
                .and_then(|prev| macd_at(s, prev))
                .map(|(_, _, h)| h);
            macd.push(MacdReading {
                fast: m.fast,
                slow: m.slow,
                signal_period: m.signal,
                line,
                signal,
                histogram,
                prev_histogram,
            });
        }

        let bollinger_type = IndicatorType::Bollinger {
            period: p.bollinger_period,
            stddev_mult_x100: multiplier_x100(p.bollinger_k),
        };
        full &= self.full(&bollinger_type, index);
        let bollinger = match self.series.get(&bollinger_type)?.values.get(index)?.value {
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } => BollingerReading {
                upper,
                middle,
                lower,
            },
            _ => return None,
        };

        let stochastic_type = IndicatorType::Stochastic {
            k_period: p.stochastic_k_period,
            d_period: p.stochastic_d_period,
        };
        full &= self.full(&stochastic_type, index);
        let (stochastic_k, stochastic_d) =
            match self.series.get(&stochastic_type)?.values.get(index)?.value {
                IndicatorValue::Stochastic { k, d } => (k, d),
                _ => return None,
            };

        let sr_type = IndicatorType::SupportResistance(p.support_resistance_period);
        full &= self.full(&sr_type, index);
        let (support, resistance) = match self.series.get(&sr_type)?.values.get(index)?.value {
            IndicatorValue::Range {
                support,
                resistance,
            } => (support, resistance),
            _ => return None,
        };

        Some(IndicatorSnapshot {
            instrument: self.instrument.clone(),
            date: bar.date,
            close: bar.close,
            prev_close: index.checked_sub(1).map(|prev| self.bars[prev].close),
            bars_available: index + 1,
            reduced_confidence: !full,
            sma,
            sma_full,
            ema,
            rsi,
            macd,
            bollinger,
            stochastic_k,
            stochastic_d,
            williams_r,
            cci,
            atr,
            volatility,
            trend_strength,
            support,
            resistance,
            momentum,
            volume_ratio: self.volume_ratio.get(index).copied().flatten(),
        })
    }

    fn full(&self, indicator_type: &IndicatorType, index: usize) -> bool {
        self.series
            .get(indicator_type)
            .is_some_and(|s| s.full_window_at(index))
    }
}

fn macd_at(series: &IndicatorSeries, index: usize) -> Option<(f64, f64, f64)> {
    match series.values.get(index)?.value {
        IndicatorValue::Macd {
            line,
            signal,
            histogram,
        } => Some((line, signal, histogram)),
        _ => None,
    }
}

/// Computes the indicator sets of several instruments in parallel. The result
/// is keyed by instrument so downstream iteration order is fixed.
pub fn compute_indicator_sets(
    histories: BTreeMap<String, Vec<PriceBar>>,
    params: &IndicatorParams,
) -> BTreeMap<String, IndicatorSet> {
    histories
        .into_par_iter()
        .map(|(instrument, bars)| {
            let set = IndicatorSet::compute(&instrument, bars, params);
            (instrument, set)
        })
        .collect()
}
