//! Trend strength and support / resistance levels.
//!
//! Trend strength is the least-squares slope of the closes in the clipped
//! window divided by the latest close, so it reads as a fraction per bar.
//!
//! Support and resistance are the lowest low and highest high of the `n` bars
//! strictly before the current bar. The first bar has no prior bars and uses
//! its own range.

use crate::domain::bar::PriceBar;
use crate::domain::indicator::{
    clipped_window, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};

/// Ordinary least-squares slope of `ys` against 0, 1, 2, ...
pub fn least_squares_slope(ys: &[f64]) -> f64 {
    let n = ys.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = ys.iter().sum::<f64>() / n as f64;

    let (num, den) = ys
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (x, y)| {
            let dx = x as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });

    if den == 0.0 { 0.0 } else { num / den }
}

pub fn calculate_trend_strength(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::empty(IndicatorType::TrendStrength(period));
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let (start, full_window) = clipped_window(i, period);
            let slope = least_squares_slope(&closes[start..=i]);
            let strength = if bar.close > 0.0 { slope / bar.close } else { 0.0 };
            IndicatorPoint {
                date: bar.date,
                full_window,
                value: IndicatorValue::Simple(strength),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::TrendStrength(period),
        values,
    }
}

pub fn calculate_support_resistance(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::empty(IndicatorType::SupportResistance(period));
    }

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let prior = if i == 0 {
                &bars[0..1]
            } else {
                &bars[i.saturating_sub(period)..i]
            };
            let support = prior.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
            let resistance = prior
                .iter()
                .map(|b| b.high)
                .fold(f64::NEG_INFINITY, f64::max);
            IndicatorPoint {
                date: bar.date,
                full_window: i >= period,
                value: IndicatorValue::Range {
                    support,
                    resistance,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::SupportResistance(period),
        values,
    }
}
