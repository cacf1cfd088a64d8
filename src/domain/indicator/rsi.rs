//! RSI (Relative Strength Index) indicator.
//!
//! Rolling simple averages of the last n close-to-close gains and losses:
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//!
//! Sentinels:
//! - first bar (no price change yet): 50
//! - avg_gain == avg_loss == 0 (flat window): 50
//! - avg_loss == 0: 100
//!
//! With fewer than n changes the averages use the changes available.

use crate::domain::bar::PriceBar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub const NEUTRAL_RSI: f64 = 50.0;

pub fn calculate_rsi(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::empty(IndicatorType::Rsi(period));
    }

    let mut gains: Vec<f64> = Vec::with_capacity(bars.len());
    let mut losses: Vec<f64> = Vec::with_capacity(bars.len());
    for w in bars.windows(2) {
        let change = w[1].close - w[0].close;
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let mut values = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            values.push(IndicatorPoint {
                date: bar.date,
                full_window: false,
                value: IndicatorValue::Simple(NEUTRAL_RSI),
            });
            continue;
        }

        // Changes 0..i exist at bar i; change j sits between bars j and j+1.
        let end = i;
        let start = end.saturating_sub(period);
        let n = (end - start) as f64;
        let avg_gain = gains[start..end].iter().sum::<f64>() / n;
        let avg_loss = losses[start..end].iter().sum::<f64>() / n;

        values.push(IndicatorPoint {
            date: bar.date,
            full_window: end >= period,
            value: IndicatorValue::Simple(rsi_from_averages(avg_gain, avg_loss)),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { NEUTRAL_RSI } else { 100.0 }
    } else {
        let rsi = 100.0 - (100.0 / (1.0 + avg_gain / avg_loss));
        rsi.clamp(0.0, 100.0)
    }
}
