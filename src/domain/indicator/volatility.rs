//! Return volatility: population standard deviation of the last n
//! close-to-close simple returns. The first bar has no return and reports 0.

use crate::domain::bar::PriceBar;
use crate::domain::indicator::{
    population_stddev, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};

pub fn calculate_volatility(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::empty(IndicatorType::Volatility(period));
    }

    // returns[j] is the return from bar j to bar j+1
    let returns: Vec<f64> = bars
        .windows(2)
        .map(|w| (w[1].close - w[0].close) / w[0].close)
        .collect();

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let start = i.saturating_sub(period);
            let vol = if i == 0 {
                0.0
            } else {
                population_stddev(&returns[start..i])
            };
            IndicatorPoint {
                date: bar.date,
                full_window: i >= period,
                value: IndicatorValue::Simple(vol),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Volatility(period),
        values,
    }
}
