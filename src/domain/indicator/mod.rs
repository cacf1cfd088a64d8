//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values
//! - `IndicatorParams`: the parameter sets for every indicator family
//!
//! Every series has one point per input bar. When fewer bars than the nominal
//! period exist, the statistic is computed on the bars that are available and
//! the point is marked `full_window = false`. Bars are never synthesized.

pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod ema;
pub mod macd;
pub mod momentum;
pub mod rsi;
pub mod set;
pub mod sma;
pub mod stochastic;
pub mod trend;
pub mod volatility;

pub use ema::{calculate_ema, ema_values};
pub use set::{BollingerReading, IndicatorSet, IndicatorSnapshot, MacdReading, compute_indicator_sets};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub full_window: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Stochastic {
        k: f64,
        d: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
    Range {
        support: f64,
        resistance: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    Cci(usize),
    WilliamsR(usize),
    Volatility(usize),
    TrendStrength(usize),
    Momentum(usize),
    SupportResistance(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Stochastic {
        k_period: usize,
        d_period: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn empty(indicator_type: IndicatorType) -> Self {
        IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        }
    }

    pub fn simple_at(&self, index: usize) -> Option<f64> {
        match self.values.get(index)?.value {
            IndicatorValue::Simple(v) => Some(v),
            _ => None,
        }
    }

    pub fn full_window_at(&self, index: usize) -> bool {
        self.values.get(index).is_some_and(|p| p.full_window)
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Cci(period) => write!(f, "CCI({})", period),
            IndicatorType::WilliamsR(period) => write!(f, "WILLIAMS_R({})", period),
            IndicatorType::Volatility(period) => write!(f, "VOLATILITY({})", period),
            IndicatorType::TrendStrength(period) => write!(f, "TREND({})", period),
            IndicatorType::Momentum(period) => write!(f, "MOMENTUM({})", period),
            IndicatorType::SupportResistance(period) => write!(f, "SR({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Stochastic { k_period, d_period } => {
                write!(f, "STOCHASTIC({},{})", k_period, d_period)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

/// Parameter sets for every indicator family computed by [`IndicatorSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub sma_periods: Vec<usize>,
    pub ema_periods: Vec<usize>,
    pub rsi_periods: Vec<usize>,
    /// First entry is the primary timeframe.
    pub macd: Vec<MacdParams>,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    pub stochastic_k_period: usize,
    pub stochastic_d_period: usize,
    pub williams_period: usize,
    pub cci_period: usize,
    pub atr_period: usize,
    pub volatility_period: usize,
    pub trend_period: usize,
    pub support_resistance_period: usize,
    /// Shortest horizon first.
    pub momentum_periods: Vec<usize>,
    pub volume_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        IndicatorParams {
            sma_periods: vec![5, 10, 20, 50, 200],
            ema_periods: vec![12, 26, 50],
            rsi_periods: vec![7, 14, 21],
            macd: vec![
                MacdParams {
                    fast: 12,
                    slow: 26,
                    signal: 9,
                },
                MacdParams {
                    fast: 5,
                    slow: 35,
                    signal: 5,
                },
            ],
            bollinger_period: 20,
            bollinger_k: 2.0,
            stochastic_k_period: 14,
            stochastic_d_period: 3,
            williams_period: 14,
            cci_period: 20,
            atr_period: 14,
            volatility_period: 20,
            trend_period: 20,
            support_resistance_period: 20,
            momentum_periods: vec![5, 20, 60],
            volume_period: 20,
        }
    }
}

impl IndicatorParams {
    /// Longest nominal window any indicator asks for.
    pub fn longest_window(&self) -> usize {
        let macd = self.macd.iter().map(|m| m.slow.max(m.fast) + m.signal - 1);
        self.sma_periods
            .iter()
            .chain(&self.ema_periods)
            .chain(&self.rsi_periods)
            .chain(&self.momentum_periods)
            .copied()
            .chain(macd)
            .chain([
                self.bollinger_period,
                self.stochastic_k_period + self.stochastic_d_period - 1,
                self.williams_period,
                self.cci_period,
                self.atr_period,
                self.volatility_period,
                self.trend_period,
                self.support_resistance_period,
            ])
            .max()
            .unwrap_or(0)
    }
}

/// Start index of the clipped window ending at `index`, and whether the full
/// nominal `period` was available.
pub(crate) fn clipped_window(index: usize, period: usize) -> (usize, bool) {
    let start = (index + 1).saturating_sub(period);
    (start, index + 1 >= period)
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub(crate) fn population_stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
