//! Commodity Channel Index.
//!
//! CCI = (TP - SMA(TP)) / (0.015 × meanDeviation), TP = (H + L + C) / 3.
//! A window with zero mean deviation yields 0.

use crate::domain::bar::PriceBar;
use crate::domain::indicator::{
    clipped_window, mean, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};

const CCI_CONSTANT: f64 = 0.015;

pub fn calculate_cci(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::empty(IndicatorType::Cci(period));
    }

    let typical: Vec<f64> = bars.iter().map(PriceBar::typical_price).collect();

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let (start, full_window) = clipped_window(i, period);
            let window = &typical[start..=i];
            let sma = mean(window);
            let mean_dev =
                window.iter().map(|tp| (tp - sma).abs()).sum::<f64>() / window.len() as f64;
            let cci = if mean_dev == 0.0 {
                0.0
            } else {
                (typical[i] - sma) / (CCI_CONSTANT * mean_dev)
            };
            IndicatorPoint {
                date: bar.date,
                full_window,
                value: IndicatorValue::Simple(cci),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Cci(period),
        values,
    }
}
