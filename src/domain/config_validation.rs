//! Configuration validation.
//!
//! Runs once before a simulation starts; the first offending key is reported
//! as [`EquisimError::InvalidConfiguration`].

use crate::domain::config::{EngineConfig, RiskParams, SimulationParams};
use crate::domain::error::EquisimError;
use crate::domain::indicator::IndicatorParams;
use crate::domain::scoring::{
    FactorWeights, FundamentalBands, SentimentParams, TechnicalLevels, TechnicalPoints,
};
use crate::domain::strategy::StrategyMode;

/// Longest warm-up window accepted, in calendar days.
pub const MAX_HISTORY_LOOKBACK_DAYS: i64 = 36_500;

pub fn validate_engine_config(config: &EngineConfig) -> Result<(), EquisimError> {
    validate_simulation(&config.simulation)?;
    validate_risk(&config.risk)?;
    config.thresholds.validate()?;
    validate_weights(&config.weights)?;
    validate_indicators(&config.indicators)?;
    config.sizing.validate()?;
    validate_fundamental(&config.fundamental)?;
    validate_sentiment(&config.sentiment)?;
    validate_technical_points(&config.technical)?;
    validate_technical_levels(&config.technical_levels)?;
    Ok(())
}

fn finite(key: &str, value: f64) -> Result<f64, EquisimError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EquisimError::invalid_config(key, "must be finite"))
    }
}

fn fraction(key: &str, value: f64, allow_zero: bool) -> Result<(), EquisimError> {
    let value = finite(key, value)?;
    let lower_ok = if allow_zero { value >= 0.0 } else { value > 0.0 };
    if !lower_ok || value > 1.0 {
        let range = if allow_zero { "[0, 1]" } else { "(0, 1]" };
        return Err(EquisimError::invalid_config(
            key,
            format!("must be in {}, got {}", range, value),
        ));
    }
    Ok(())
}

fn validate_simulation(sim: &SimulationParams) -> Result<(), EquisimError> {
    if finite("simulation.initial_capital", sim.initial_capital)? <= 0.0 {
        return Err(EquisimError::invalid_config(
            "simulation.initial_capital",
            "must be positive",
        ));
    }
    if !(0..=MAX_HISTORY_LOOKBACK_DAYS).contains(&sim.history_lookback_days) {
        return Err(EquisimError::invalid_config(
            "simulation.history_lookback_days",
            format!("must be in [0, {}]", MAX_HISTORY_LOOKBACK_DAYS),
        ));
    }
    if let (Some(start), Some(end)) = (sim.start_date, sim.end_date) {
        if start > end {
            return Err(EquisimError::invalid_config(
                "simulation.start_date",
                format!("start date {} is after end date {}", start, end),
            ));
        }
    }
    if let StrategyMode::TargetWeightRebalance {
        interval,
        drift_tolerance,
    } = sim.strategy
    {
        if interval == 0 {
            return Err(EquisimError::invalid_config(
                "simulation.rebalance_interval",
                "must be at least 1",
            ));
        }
        let drift = finite("simulation.drift_tolerance", drift_tolerance)?;
        if !(0.0..1.0).contains(&drift) {
            return Err(EquisimError::invalid_config(
                "simulation.drift_tolerance",
                "must be in [0, 1)",
            ));
        }
    }
    Ok(())
}

fn validate_risk(risk: &RiskParams) -> Result<(), EquisimError> {
    fraction("risk.risk_per_trade", risk.risk_per_trade, false)?;
    fraction("risk.max_position_size", risk.max_position_size, false)?;
    fraction("risk.diversification", risk.diversification, false)?;
    fraction("risk.stop_loss_pct", risk.stop_loss_pct, true)?;
    fraction("risk.commission_rate", risk.commission_rate, true)?;
    fraction("risk.slippage_rate", risk.slippage_rate, true)?;
    if finite("risk.take_profit_pct", risk.take_profit_pct)? < 0.0 {
        return Err(EquisimError::invalid_config(
            "risk.take_profit_pct",
            "must be non-negative",
        ));
    }
    Ok(())
}

fn validate_weights(weights: &FactorWeights) -> Result<(), EquisimError> {
    let all = [
        ("weights.technical", weights.technical),
        ("weights.fundamental", weights.fundamental),
        ("weights.sentiment", weights.sentiment),
    ];
    for (key, value) in all {
        if finite(key, value)? < 0.0 {
            return Err(EquisimError::invalid_config(key, "must be non-negative"));
        }
    }
    if all.iter().map(|(_, w)| w).sum::<f64>() <= 0.0 {
        return Err(EquisimError::invalid_config(
            "weights",
            "at least one weight must be positive",
        ));
    }
    Ok(())
}

fn periods(key: &str, values: &[usize]) -> Result<(), EquisimError> {
    if values.is_empty() {
        return Err(EquisimError::invalid_config(key, "at least one period is required"));
    }
    if values.contains(&0) {
        return Err(EquisimError::invalid_config(key, "periods must be at least 1"));
    }
    Ok(())
}

fn period(key: &str, value: usize) -> Result<(), EquisimError> {
    periods(key, &[value])
}

fn validate_indicators(p: &IndicatorParams) -> Result<(), EquisimError> {
    periods("indicators.sma_periods", &p.sma_periods)?;
    periods("indicators.ema_periods", &p.ema_periods)?;
    periods("indicators.rsi_periods", &p.rsi_periods)?;
    periods("indicators.momentum_periods", &p.momentum_periods)?;

    if p.macd.is_empty() {
        return Err(EquisimError::invalid_config(
            "indicators.macd",
            "at least one fast/slow/signal triple is required",
        ));
    }
    for m in &p.macd {
        if m.fast == 0 || m.signal == 0 || m.fast >= m.slow {
            return Err(EquisimError::invalid_config(
                "indicators.macd",
                format!(
                    "{}/{}/{} must satisfy 1 <= fast < slow and signal >= 1",
                    m.fast, m.slow, m.signal
                ),
            ));
        }
    }

    period("indicators.bollinger_period", p.bollinger_period)?;
    if finite("indicators.bollinger_k", p.bollinger_k)? <= 0.0 {
        return Err(EquisimError::invalid_config(
            "indicators.bollinger_k",
            "must be positive",
        ));
    }
    period("indicators.stochastic_k", p.stochastic_k_period)?;
    period("indicators.stochastic_d", p.stochastic_d_period)?;
    period("indicators.williams_period", p.williams_period)?;
    period("indicators.cci_period", p.cci_period)?;
    period("indicators.atr_period", p.atr_period)?;
    period("indicators.volatility_period", p.volatility_period)?;
    period("indicators.trend_period", p.trend_period)?;
    period(
        "indicators.support_resistance_period",
        p.support_resistance_period,
    )?;
    period("indicators.volume_period", p.volume_period)
}

fn validate_fundamental(b: &FundamentalBands) -> Result<(), EquisimError> {
    let pe_fav = finite("fundamental.pe_favorable_max", b.pe_favorable_max)?;
    let pe_mod = finite("fundamental.pe_moderate_max", b.pe_moderate_max)?;
    if !(pe_fav > 0.0 && pe_fav < pe_mod) {
        return Err(EquisimError::invalid_config(
            "fundamental.pe_moderate_max",
            "P/E bands must satisfy 0 < favorable_max < moderate_max",
        ));
    }
    let pb_fav = finite("fundamental.pb_favorable_max", b.pb_favorable_max)?;
    let pb_mod = finite("fundamental.pb_moderate_max", b.pb_moderate_max)?;
    if !(pb_fav > 0.0 && pb_fav < pb_mod) {
        return Err(EquisimError::invalid_config(
            "fundamental.pb_moderate_max",
            "P/B bands must satisfy 0 < favorable_max < moderate_max",
        ));
    }
    for (key, value) in [
        ("fundamental.pe_favorable_points", b.pe_favorable_points),
        ("fundamental.pe_moderate_points", b.pe_moderate_points),
        ("fundamental.pe_unfavorable_points", b.pe_unfavorable_points),
        ("fundamental.pb_favorable_points", b.pb_favorable_points),
        ("fundamental.pb_moderate_points", b.pb_moderate_points),
        ("fundamental.pb_unfavorable_points", b.pb_unfavorable_points),
        ("fundamental.large_cap_points", b.large_cap_points),
        ("fundamental.mid_cap_points", b.mid_cap_points),
        ("fundamental.small_cap_points", b.small_cap_points),
        ("fundamental.micro_cap_points", b.micro_cap_points),
        ("fundamental.sector_points", b.sector_points),
    ] {
        finite(key, value)?;
    }
    Ok(())
}

fn validate_sentiment(s: &SentimentParams) -> Result<(), EquisimError> {
    if s.min_samples == 0 {
        return Err(EquisimError::invalid_config(
            "sentiment.min_samples",
            "must be at least 1",
        ));
    }
    if finite("sentiment.scale", s.scale)? <= 0.0 {
        return Err(EquisimError::invalid_config("sentiment.scale", "must be positive"));
    }
    if finite("sentiment.neutral_band", s.neutral_band)? < 0.0 {
        return Err(EquisimError::invalid_config(
            "sentiment.neutral_band",
            "must be non-negative",
        ));
    }
    Ok(())
}

fn validate_technical_points(p: &TechnicalPoints) -> Result<(), EquisimError> {
    for (key, value) in [
        ("technical.sustained_trend_points", p.sustained_trend),
        ("technical.long_ma_points", p.long_ma),
        ("technical.rsi_multi_points", p.rsi_multi),
        ("technical.rsi_single_points", p.rsi_single),
        ("technical.macd_multi_points", p.macd_multi),
        ("technical.macd_single_points", p.macd_single),
        ("technical.macd_cross_points", p.macd_cross),
        ("technical.bollinger_points", p.bollinger),
        ("technical.stochastic_points", p.stochastic),
        ("technical.williams_points", p.williams),
        ("technical.cci_points", p.cci),
        ("technical.momentum_multi_points", p.momentum_multi),
        ("technical.momentum_single_points", p.momentum_single),
        ("technical.breakout_points", p.breakout),
        ("technical.strong_trend_points", p.strong_trend),
        ("technical.volume_surge_points", p.volume_surge),
    ] {
        if finite(key, value)? < 0.0 {
            return Err(EquisimError::invalid_config(key, "must be non-negative"));
        }
    }
    // multi-timeframe agreement must outscore a single confirmation
    for (key, multi, single) in [
        ("technical.sustained_trend_points", p.sustained_trend, p.long_ma),
        ("technical.rsi_multi_points", p.rsi_multi, p.rsi_single),
        ("technical.macd_multi_points", p.macd_multi, p.macd_single),
        ("technical.momentum_multi_points", p.momentum_multi, p.momentum_single),
    ] {
        if multi <= single {
            return Err(EquisimError::invalid_config(
                key,
                format!("must exceed its single-timeframe counterpart ({})", single),
            ));
        }
    }
    Ok(())
}

fn validate_technical_levels(l: &TechnicalLevels) -> Result<(), EquisimError> {
    for (key, low, high, min, max) in [
        ("technical.rsi_overbought", l.rsi_oversold, l.rsi_overbought, 0.0, 100.0),
        (
            "technical.stochastic_overbought",
            l.stochastic_oversold,
            l.stochastic_overbought,
            0.0,
            100.0,
        ),
        (
            "technical.williams_overbought",
            l.williams_oversold,
            l.williams_overbought,
            -100.0,
            0.0,
        ),
        (
            "technical.cci_overbought",
            l.cci_oversold,
            l.cci_overbought,
            f64::MIN,
            f64::MAX,
        ),
    ] {
        let low = finite(key, low)?;
        let high = finite(key, high)?;
        if !(min <= low && low < high && high <= max) {
            return Err(EquisimError::invalid_config(
                key,
                format!("oversold {} must be below overbought {}", low, high),
            ));
        }
    }
    if finite("technical.strong_trend_threshold", l.strong_trend)? <= 0.0 {
        return Err(EquisimError::invalid_config(
            "technical.strong_trend_threshold",
            "must be positive",
        ));
    }
    if finite("technical.volume_surge_ratio", l.volume_surge_ratio)? <= 1.0 {
        return Err(EquisimError::invalid_config(
            "technical.volume_surge_ratio",
            "must be greater than 1",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::MacdParams;
    use chrono::NaiveDate;

    fn key_of(err: EquisimError) -> String {
        match err {
            EquisimError::InvalidConfiguration { key, .. } => key,
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_engine_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn rejects_non_positive_capital() {
        let mut config = EngineConfig::default();
        config.simulation.initial_capital = 0.0;
        let err = validate_engine_config(&config).unwrap_err();
        assert_eq!(key_of(err), "simulation.initial_capital");
    }

    #[test]
    fn rejects_reversed_dates() {
        let mut config = EngineConfig::default();
        config.simulation.start_date = NaiveDate::from_ymd_opt(2024, 6, 1);
        config.simulation.end_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        let err = validate_engine_config(&config).unwrap_err();
        assert_eq!(key_of(err), "simulation.start_date");
    }

    #[test]
    fn rejects_out_of_range_lookback() {
        for days in [-1, MAX_HISTORY_LOOKBACK_DAYS + 1, 10_000_000_000] {
            let mut config = EngineConfig::default();
            config.simulation.history_lookback_days = days;
            assert_eq!(
                key_of(validate_engine_config(&config).unwrap_err()),
                "simulation.history_lookback_days"
            );
        }

        let mut config = EngineConfig::default();
        config.simulation.history_lookback_days = MAX_HISTORY_LOOKBACK_DAYS;
        assert!(validate_engine_config(&config).is_ok());
    }

    #[test]
    fn rejects_out_of_range_risk() {
        let mut config = EngineConfig::default();
        config.risk.max_position_size = 1.5;
        assert_eq!(
            key_of(validate_engine_config(&config).unwrap_err()),
            "risk.max_position_size"
        );

        let mut config = EngineConfig::default();
        config.risk.commission_rate = -0.01;
        assert_eq!(
            key_of(validate_engine_config(&config).unwrap_err()),
            "risk.commission_rate"
        );
    }

    #[test]
    fn rejects_unordered_thresholds() {
        let mut config = EngineConfig::default();
        config.thresholds.strong_buy = 0.2;
        assert_eq!(
            key_of(validate_engine_config(&config).unwrap_err()),
            "thresholds.strong_buy"
        );
    }

    #[test]
    fn rejects_zero_weights() {
        let mut config = EngineConfig::default();
        config.weights = FactorWeights {
            technical: 0.0,
            fundamental: 0.0,
            sentiment: 0.0,
        };
        assert_eq!(key_of(validate_engine_config(&config).unwrap_err()), "weights");
    }

    #[test]
    fn rejects_bad_indicator_periods() {
        let mut config = EngineConfig::default();
        config.indicators.rsi_periods = vec![0, 14];
        assert_eq!(
            key_of(validate_engine_config(&config).unwrap_err()),
            "indicators.rsi_periods"
        );

        let mut config = EngineConfig::default();
        config.indicators.macd = vec![MacdParams {
            fast: 26,
            slow: 12,
            signal: 9,
        }];
        assert_eq!(
            key_of(validate_engine_config(&config).unwrap_err()),
            "indicators.macd"
        );
    }

    #[test]
    fn multi_timeframe_points_must_dominate() {
        let mut config = EngineConfig::default();
        config.technical.rsi_multi = 0.1;
        assert_eq!(
            key_of(validate_engine_config(&config).unwrap_err()),
            "technical.rsi_multi_points"
        );
    }

    #[test]
    fn rejects_zero_rebalance_interval() {
        let mut config = EngineConfig::default();
        config.simulation.strategy = StrategyMode::TargetWeightRebalance {
            interval: 0,
            drift_tolerance: 0.02,
        };
        assert_eq!(
            key_of(validate_engine_config(&config).unwrap_err()),
            "simulation.rebalance_interval"
        );
    }

    #[test]
    fn rejects_inverted_oscillator_levels() {
        let mut config = EngineConfig::default();
        config.technical_levels.williams_oversold = -10.0;
        assert_eq!(
            key_of(validate_engine_config(&config).unwrap_err()),
            "technical.williams_overbought"
        );
    }
}
