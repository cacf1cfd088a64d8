//! Price momentum and volume ratio.
//!
//! Momentum(n)[i] = (C[i] - C[i-k]) / C[i-k] with k = min(n, i), as a fraction.
//! Volume ratio = V[i] / mean(V) over the prior n bars that carry volume.

use crate::domain::bar::PriceBar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_momentum(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::empty(IndicatorType::Momentum(period));
    }

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let k = period.min(i);
            let momentum = if k == 0 {
                0.0
            } else {
                let base = bars[i - k].close;
                (bar.close - base) / base
            };
            IndicatorPoint {
                date: bar.date,
                full_window: i >= period,
                value: IndicatorValue::Simple(momentum),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Momentum(period),
        values,
    }
}

/// One entry per bar; `None` where the bar has no volume, no prior bar has
/// volume, or the prior average is zero.
pub fn calculate_volume_ratio(bars: &[PriceBar], period: usize) -> Vec<Option<f64>> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let current = bar.volume? as f64;
            let prior: Vec<f64> = bars[i.saturating_sub(period)..i]
                .iter()
                .filter_map(|b| b.volume)
                .map(|v| v as f64)
                .collect();
            if prior.is_empty() {
                return None;
            }
            let avg = prior.iter().sum::<f64>() / prior.len() as f64;
            (avg > 0.0).then(|| current / avg)
        })
        .collect()
}
