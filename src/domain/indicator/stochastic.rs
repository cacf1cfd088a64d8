//! Stochastic oscillator and Williams %R.
//!
//! %K = 100 × (C - LL) / (HH - LL) over the last k bars
//! %D = mean of the last d %K values
//! %R = -100 × (HH - C) / (HH - LL) over the last n bars
//!
//! A window with HH == LL has no range; %K falls back to 50 and %R to -50.

use crate::domain::bar::PriceBar;
use crate::domain::indicator::{
    clipped_window, mean, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};

fn high_low(window: &[PriceBar]) -> (f64, f64) {
    window.iter().fold((f64::MIN, f64::MAX), |(hh, ll), b| {
        (hh.max(b.high), ll.min(b.low))
    })
}

fn percent_k(bar: &PriceBar, hh: f64, ll: f64) -> f64 {
    let range = hh - ll;
    if range <= 0.0 {
        return 50.0;
    }
    (100.0 * (bar.close - ll) / range).clamp(0.0, 100.0)
}

pub fn calculate_stochastic(bars: &[PriceBar], k_period: usize, d_period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Stochastic { k_period, d_period };
    if k_period == 0 || d_period == 0 {
        return IndicatorSeries::empty(indicator_type);
    }

    let mut ks: Vec<f64> = Vec::with_capacity(bars.len());
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let (start, k_full) = clipped_window(i, k_period);
        let (hh, ll) = high_low(&bars[start..=i]);
        ks.push(percent_k(bar, hh, ll));

        let (d_start, d_full) = clipped_window(i, d_period);
        let d = mean(&ks[d_start..=i]).clamp(0.0, 100.0);

        values.push(IndicatorPoint {
            date: bar.date,
            full_window: k_full && i + 1 >= k_period + d_period - 1 && d_full,
            value: IndicatorValue::Stochastic { k: ks[i], d },
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}

pub fn calculate_williams_r(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::empty(IndicatorType::WilliamsR(period));
    }

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let (start, full_window) = clipped_window(i, period);
            let (hh, ll) = high_low(&bars[start..=i]);
            let range = hh - ll;
            let r = if range <= 0.0 {
                -50.0
            } else {
                (-100.0 * (hh - bar.close) / range).clamp(-100.0, 0.0)
            };
            IndicatorPoint {
                date: bar.date,
                full_window,
                value: IndicatorValue::Simple(r),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::WilliamsR(period),
        values,
    }
}
