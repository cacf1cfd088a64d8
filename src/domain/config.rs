//! Engine configuration and its mapping from a [`ConfigPort`].
//!
//! INI layout. Every key is optional; the numbers shown are the defaults.
//!
//! ```ini
//! [simulation]
//! initial_capital = 100000
//! start_date = 2024-01-02
//! end_date = 2024-12-31
//! instruments = AAPL,MSFT
//! history_lookback_days = 400
//! strategy = signal
//! rebalance_interval = 20
//! drift_tolerance = 0.02
//!
//! [risk]
//! risk_per_trade = 0.02
//! max_position_size = 0.1
//! diversification = 1.0
//! stop_loss_pct = 0.05
//! take_profit_pct = 0.10
//! commission_rate = 0.001
//! slippage_rate = 0.0
//! allow_shorting = true
//!
//! [indicators]
//! sma_periods = 5,10,20,50,200
//! macd = 12/26/9,5/35/5
//!
//! [sizing]
//! ladder = 0.3:0.5,0.7:1.0,1.2:1.5
//! ```
//!
//! `strategy` is `signal` or `rebalance`; stop-loss and take-profit are
//! fractions and 0 disables them. Run arguments override the dates. There are
//! also `[thresholds]`, `[weights]`, `[fundamental]`, `[sentiment]` and
//! `[technical]` with one key per field of the matching struct (`_points`
//! suffix for technical point values).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::decision::DecisionThresholds;
use crate::domain::error::EquisimError;
use crate::domain::indicator::{IndicatorParams, MacdParams};
use crate::domain::scoring::{
    FactorWeights, FundamentalBands, SentimentParams, TechnicalLevels, TechnicalPoints,
};
use crate::domain::sizing::{SizingParams, StrengthStep};
use crate::domain::strategy::StrategyMode;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub initial_capital: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub instruments: Vec<String>,
    /// Calendar days of history loaded before the start date for warm-up.
    pub history_lookback_days: i64,
    pub strategy: StrategyMode,
}

impl Default for SimulationParams {
    fn default() -> Self {
        SimulationParams {
            initial_capital: 100_000.0,
            start_date: None,
            end_date: None,
            instruments: Vec::new(),
            history_lookback_days: 400,
            strategy: StrategyMode::default(),
        }
    }
}

/// Risk limits and trading costs. All rates are fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    pub risk_per_trade: f64,
    pub max_position_size: f64,
    pub diversification: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub commission_rate: f64,
    pub slippage_rate: f64,
    pub allow_shorting: bool,
}

impl Default for RiskParams {
    fn default() -> Self {
        RiskParams {
            risk_per_trade: 0.02,
            max_position_size: 0.1,
            diversification: 1.0,
            stop_loss_pct: 0.05,
            take_profit_pct: 0.10,
            commission_rate: 0.001,
            slippage_rate: 0.0,
            allow_shorting: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub simulation: SimulationParams,
    pub risk: RiskParams,
    pub thresholds: DecisionThresholds,
    pub weights: FactorWeights,
    pub indicators: IndicatorParams,
    pub sizing: SizingParams,
    pub fundamental: FundamentalBands,
    pub sentiment: SentimentParams,
    pub technical: TechnicalPoints,
    pub technical_levels: TechnicalLevels,
}

/// Reads an [`EngineConfig`] from `config`, falling back to the defaults for
/// absent keys. Malformed dates, counts, lists and the simulation, risk,
/// threshold and weight numbers are rejected; range checks are left to
/// [`validate_engine_config`](crate::domain::config_validation::validate_engine_config).
pub fn build_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig, EquisimError> {
    let d = EngineConfig::default();

    let simulation = build_simulation(config, &d.simulation)?;

    let risk = RiskParams {
        risk_per_trade: get_number(config, "risk", "risk_per_trade", d.risk.risk_per_trade)?,
        max_position_size: get_number(config, "risk", "max_position_size", d.risk.max_position_size)?,
        diversification: get_number(config, "risk", "diversification", d.risk.diversification)?,
        stop_loss_pct: get_number(config, "risk", "stop_loss_pct", d.risk.stop_loss_pct)?,
        take_profit_pct: get_number(config, "risk", "take_profit_pct", d.risk.take_profit_pct)?,
        commission_rate: get_number(config, "risk", "commission_rate", d.risk.commission_rate)?,
        slippage_rate: get_number(config, "risk", "slippage_rate", d.risk.slippage_rate)?,
        allow_shorting: config.get_bool("risk", "allow_shorting", d.risk.allow_shorting),
    };

    let t = &d.thresholds;
    let thresholds = DecisionThresholds {
        very_strong_sell: get_number(config, "thresholds", "very_strong_sell", t.very_strong_sell)?,
        strong_sell: get_number(config, "thresholds", "strong_sell", t.strong_sell)?,
        sell: get_number(config, "thresholds", "sell", t.sell)?,
        buy: get_number(config, "thresholds", "buy", t.buy)?,
        strong_buy: get_number(config, "thresholds", "strong_buy", t.strong_buy)?,
        very_strong_buy: get_number(config, "thresholds", "very_strong_buy", t.very_strong_buy)?,
    };

    let weights = FactorWeights {
        technical: get_number(config, "weights", "technical", d.weights.technical)?,
        fundamental: get_number(config, "weights", "fundamental", d.weights.fundamental)?,
        sentiment: get_number(config, "weights", "sentiment", d.weights.sentiment)?,
    };

    Ok(EngineConfig {
        simulation,
        risk,
        thresholds,
        weights,
        indicators: build_indicators(config, &d.indicators)?,
        sizing: build_sizing(config, &d.sizing)?,
        fundamental: build_fundamental(config, &d.fundamental),
        sentiment: SentimentParams {
            min_samples: get_count(config, "sentiment", "min_samples", d.sentiment.min_samples as usize)?
                as u32,
            scale: config.get_double("sentiment", "scale", d.sentiment.scale),
            neutral_band: config.get_double("sentiment", "neutral_band", d.sentiment.neutral_band),
        },
        technical: build_technical_points(config, &d.technical),
        technical_levels: build_technical_levels(config, &d.technical_levels),
    })
}

fn build_simulation(
    config: &dyn ConfigPort,
    d: &SimulationParams,
) -> Result<SimulationParams, EquisimError> {
    let strategy = match config.get_string("simulation", "strategy").as_deref().map(str::trim) {
        None | Some("") | Some("signal") => StrategyMode::SignalTriggered,
        Some("rebalance") => StrategyMode::TargetWeightRebalance {
            interval: get_count(config, "simulation", "rebalance_interval", 20)?,
            drift_tolerance: get_number(config, "simulation", "drift_tolerance", 0.02)?,
        },
        Some(other) => {
            return Err(EquisimError::invalid_config(
                "simulation.strategy",
                format!("unknown strategy '{}', expected signal or rebalance", other),
            ));
        }
    };

    let instruments = config
        .get_list("simulation", "instruments")
        .unwrap_or_else(|| d.instruments.clone());

    Ok(SimulationParams {
        initial_capital: get_number(config, "simulation", "initial_capital", d.initial_capital)?,
        start_date: get_date(config, "simulation", "start_date")?,
        end_date: get_date(config, "simulation", "end_date")?,
        instruments,
        history_lookback_days: config.get_int(
            "simulation",
            "history_lookback_days",
            d.history_lookback_days,
        ),
        strategy,
    })
}

fn build_indicators(
    config: &dyn ConfigPort,
    d: &IndicatorParams,
) -> Result<IndicatorParams, EquisimError> {
    let section = "indicators";
    let macd = match config.get_string(section, "macd") {
        Some(s) => parse_macd_list(&s)?,
        None => d.macd.clone(),
    };
    Ok(IndicatorParams {
        sma_periods: get_periods(config, section, "sma_periods", &d.sma_periods)?,
        ema_periods: get_periods(config, section, "ema_periods", &d.ema_periods)?,
        rsi_periods: get_periods(config, section, "rsi_periods", &d.rsi_periods)?,
        macd,
        bollinger_period: get_count(config, section, "bollinger_period", d.bollinger_period)?,
        bollinger_k: config.get_double(section, "bollinger_k", d.bollinger_k),
        stochastic_k_period: get_count(config, section, "stochastic_k", d.stochastic_k_period)?,
        stochastic_d_period: get_count(config, section, "stochastic_d", d.stochastic_d_period)?,
        williams_period: get_count(config, section, "williams_period", d.williams_period)?,
        cci_period: get_count(config, section, "cci_period", d.cci_period)?,
        atr_period: get_count(config, section, "atr_period", d.atr_period)?,
        volatility_period: get_count(config, section, "volatility_period", d.volatility_period)?,
        trend_period: get_count(config, section, "trend_period", d.trend_period)?,
        support_resistance_period: get_count(
            config,
            section,
            "support_resistance_period",
            d.support_resistance_period,
        )?,
        momentum_periods: get_periods(config, section, "momentum_periods", &d.momentum_periods)?,
        volume_period: get_count(config, section, "volume_period", d.volume_period)?,
    })
}

fn build_sizing(config: &dyn ConfigPort, d: &SizingParams) -> Result<SizingParams, EquisimError> {
    let ladder = match config.get_string("sizing", "ladder") {
        Some(s) => parse_ladder(&s)?,
        None => d.ladder.clone(),
    };
    Ok(SizingParams {
        ladder,
        fundamental_sensitivity: config.get_double(
            "sizing",
            "fundamental_sensitivity",
            d.fundamental_sensitivity,
        ),
        fundamental_min: config.get_double("sizing", "fundamental_min", d.fundamental_min),
        fundamental_max: config.get_double("sizing", "fundamental_max", d.fundamental_max),
        sentiment_sensitivity: config.get_double(
            "sizing",
            "sentiment_sensitivity",
            d.sentiment_sensitivity,
        ),
        sentiment_min: config.get_double("sizing", "sentiment_min", d.sentiment_min),
        sentiment_max: config.get_double("sizing", "sentiment_max", d.sentiment_max),
    })
}

fn build_fundamental(config: &dyn ConfigPort, d: &FundamentalBands) -> FundamentalBands {
    let s = "fundamental";
    let sectors = |key: &str, default: &[String]| -> Vec<String> {
        config
            .get_list(s, key)
            .unwrap_or_else(|| default.to_vec())
    };
    FundamentalBands {
        pe_favorable_max: config.get_double(s, "pe_favorable_max", d.pe_favorable_max),
        pe_moderate_max: config.get_double(s, "pe_moderate_max", d.pe_moderate_max),
        pe_favorable_points: config.get_double(s, "pe_favorable_points", d.pe_favorable_points),
        pe_moderate_points: config.get_double(s, "pe_moderate_points", d.pe_moderate_points),
        pe_unfavorable_points: config.get_double(
            s,
            "pe_unfavorable_points",
            d.pe_unfavorable_points,
        ),
        pb_favorable_max: config.get_double(s, "pb_favorable_max", d.pb_favorable_max),
        pb_moderate_max: config.get_double(s, "pb_moderate_max", d.pb_moderate_max),
        pb_favorable_points: config.get_double(s, "pb_favorable_points", d.pb_favorable_points),
        pb_moderate_points: config.get_double(s, "pb_moderate_points", d.pb_moderate_points),
        pb_unfavorable_points: config.get_double(
            s,
            "pb_unfavorable_points",
            d.pb_unfavorable_points,
        ),
        large_cap_points: config.get_double(s, "large_cap_points", d.large_cap_points),
        mid_cap_points: config.get_double(s, "mid_cap_points", d.mid_cap_points),
        small_cap_points: config.get_double(s, "small_cap_points", d.small_cap_points),
        micro_cap_points: config.get_double(s, "micro_cap_points", d.micro_cap_points),
        sector_points: config.get_double(s, "sector_points", d.sector_points),
        favored_sectors: sectors("favored_sectors", &d.favored_sectors),
        disfavored_sectors: sectors("disfavored_sectors", &d.disfavored_sectors),
    }
}

fn build_technical_points(config: &dyn ConfigPort, d: &TechnicalPoints) -> TechnicalPoints {
    let get = |name: &str, default: f64| {
        config.get_double("technical", &format!("{}_points", name), default)
    };
    TechnicalPoints {
        sustained_trend: get("sustained_trend", d.sustained_trend),
        long_ma: get("long_ma", d.long_ma),
        rsi_multi: get("rsi_multi", d.rsi_multi),
        rsi_single: get("rsi_single", d.rsi_single),
        macd_multi: get("macd_multi", d.macd_multi),
        macd_single: get("macd_single", d.macd_single),
        macd_cross: get("macd_cross", d.macd_cross),
        bollinger: get("bollinger", d.bollinger),
        stochastic: get("stochastic", d.stochastic),
        williams: get("williams", d.williams),
        cci: get("cci", d.cci),
        momentum_multi: get("momentum_multi", d.momentum_multi),
        momentum_single: get("momentum_single", d.momentum_single),
        breakout: get("breakout", d.breakout),
        strong_trend: get("strong_trend", d.strong_trend),
        volume_surge: get("volume_surge", d.volume_surge),
    }
}

fn build_technical_levels(config: &dyn ConfigPort, d: &TechnicalLevels) -> TechnicalLevels {
    let get = |key: &str, default: f64| config.get_double("technical", key, default);
    TechnicalLevels {
        rsi_oversold: get("rsi_oversold", d.rsi_oversold),
        rsi_overbought: get("rsi_overbought", d.rsi_overbought),
        stochastic_oversold: get("stochastic_oversold", d.stochastic_oversold),
        stochastic_overbought: get("stochastic_overbought", d.stochastic_overbought),
        williams_oversold: get("williams_oversold", d.williams_oversold),
        williams_overbought: get("williams_overbought", d.williams_overbought),
        cci_oversold: get("cci_oversold", d.cci_oversold),
        cci_overbought: get("cci_overbought", d.cci_overbought),
        strong_trend: get("strong_trend_threshold", d.strong_trend),
        volume_surge_ratio: get("volume_surge_ratio", d.volume_surge_ratio),
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn config_key(section: &str, key: &str) -> String {
    format!("{}.{}", section, key)
}

fn get_count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, EquisimError> {
    let value = config.get_int(section, key, default as i64);
    usize::try_from(value).map_err(|_| {
        EquisimError::invalid_config(&config_key(section, key), "must be non-negative")
    })
}

/// Like [`ConfigPort::get_double`], but a value that is present and does not
/// parse is an error instead of the default.
fn get_number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, EquisimError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) if s.trim().is_empty() => Ok(default),
        Some(s) => s.trim().parse::<f64>().map_err(|_| {
            EquisimError::invalid_config(
                &config_key(section, key),
                format!("invalid number '{}'", s.trim()),
            )
        }),
    }
}

fn get_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, EquisimError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                EquisimError::invalid_config(
                    &config_key(section, key),
                    format!("invalid date '{}', expected YYYY-MM-DD", s),
                )
            }),
    }
}

fn get_periods(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: &[usize],
) -> Result<Vec<usize>, EquisimError> {
    let Some(value) = config.get_string(section, key) else {
        return Ok(default.to_vec());
    };
    let mut periods = split_list(&value)
        .map(|p| {
            p.parse::<usize>().map_err(|_| {
                EquisimError::invalid_config(
                    &config_key(section, key),
                    format!("invalid period '{}'", p),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    periods.sort_unstable();
    periods.dedup();
    Ok(periods)
}

/// `fast/slow/signal` triples separated by commas, primary first.
pub fn parse_macd_list(value: &str) -> Result<Vec<MacdParams>, EquisimError> {
    split_list(value)
        .map(|triple| {
            let parts: Vec<&str> = triple.split('/').map(str::trim).collect();
            let parsed: Option<Vec<usize>> = parts.iter().map(|p| p.parse().ok()).collect();
            match parsed.as_deref() {
                Some(&[fast, slow, signal]) => Ok(MacdParams { fast, slow, signal }),
                _ => Err(EquisimError::invalid_config(
                    "indicators.macd",
                    format!("invalid entry '{}', expected fast/slow/signal", triple),
                )),
            }
        })
        .collect()
}

/// `min_strength:multiplier` pairs separated by commas.
pub fn parse_ladder(value: &str) -> Result<Vec<StrengthStep>, EquisimError> {
    split_list(value)
        .map(|pair| {
            let parsed = pair
                .split_once(':')
                .and_then(|(s, m)| Some((s.trim().parse().ok()?, m.trim().parse().ok()?)));
            match parsed {
                Some((min_strength, multiplier)) => Ok(StrengthStep {
                    min_strength,
                    multiplier,
                }),
                None => Err(EquisimError::invalid_config(
                    "sizing.ladder",
                    format!("invalid step '{}', expected strength:multiplier", pair),
                )),
            }
        })
        .collect()
}
