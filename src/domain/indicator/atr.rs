//! Average True Range.
//!
//! TR[0] = high - low, TR[i] = max(H-L, |H-C[i-1]|, |L-C[i-1]|).
//! ATR(n)[i] is the rolling mean of the last n true ranges.

use crate::domain::bar::PriceBar;
use crate::domain::indicator::{
    clipped_window, mean, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};

pub fn true_ranges(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect()
}

pub fn calculate_atr(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::empty(IndicatorType::Atr(period));
    }

    let tr_values = true_ranges(bars);
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let (start, full_window) = clipped_window(i, period);
            IndicatorPoint {
                date: bar.date,
                full_window,
                value: IndicatorValue::Simple(mean(&tr_values[start..=i])),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}
