//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]), clipped to the bars available.

use crate::domain::bar::PriceBar;
use crate::domain::indicator::{
    clipped_window, mean, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};

pub fn calculate_sma(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::empty(IndicatorType::Sma(period));
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let (start, full_window) = clipped_window(i, period);
            IndicatorPoint {
                date: bar.date,
                full_window,
                value: IndicatorValue::Simple(mean(&closes[start..=i])),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<PriceBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                instrument: "TEST".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: None,
            })
            .collect()
    }

    #[test]
    fn sma_full_window() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0]);
        let series = calculate_sma(&bars, 3);

        assert!(series.values[2].full_window);
        assert_eq!(series.simple_at(2), Some(20.0));
        assert_eq!(series.simple_at(3), Some(30.0));
    }

    #[test]
    fn sma_clips_short_history() {
        let bars = make_bars(&[10.0, 20.0]);
        let series = calculate_sma(&bars, 5);

        assert_eq!(series.values.len(), 2);
        assert!(!series.values[0].full_window);
        assert!(!series.values[1].full_window);
        assert_eq!(series.simple_at(0), Some(10.0));
        assert_eq!(series.simple_at(1), Some(15.0));
    }

    #[test]
    fn sma_zero_period() {
        let bars = make_bars(&[10.0, 20.0]);
        assert!(calculate_sma(&bars, 0).values.is_empty());
    }

    #[test]
    fn sma_empty_bars() {
        assert!(calculate_sma(&[], 3).values.is_empty());
    }
}
