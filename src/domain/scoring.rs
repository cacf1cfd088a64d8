//! Factor scorer.
//!
//! Three bounded sub-scores (technical, fundamental, sentiment), each the sum
//! of the rules that fired, clamped to [-SCORE_BOUND, SCORE_BOUND]. Every
//! fired rule leaves an [`Evidence`] entry on the resulting [`Signal`].

use serde::{Deserialize, Serialize};

use crate::domain::config::EngineConfig;
use crate::domain::decision::decide;
use crate::domain::indicator::{IndicatorSnapshot, MacdReading};
use crate::domain::signal::{Evidence, Factor, Signal};
use crate::domain::snapshot::{FundamentalSnapshot, MarketCapTier, SentimentSnapshot};

pub const SCORE_BOUND: f64 = 2.0;

/// Relative size below which a MACD histogram counts as zero.
const MACD_TOLERANCE: f64 = 1e-9;

/// Point magnitudes per technical rule. Bullish rules add, bearish subtract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalPoints {
    pub sustained_trend: f64,
    pub long_ma: f64,
    pub rsi_multi: f64,
    pub rsi_single: f64,
    pub macd_multi: f64,
    pub macd_single: f64,
    pub macd_cross: f64,
    pub bollinger: f64,
    pub stochastic: f64,
    pub williams: f64,
    pub cci: f64,
    pub momentum_multi: f64,
    pub momentum_single: f64,
    pub breakout: f64,
    pub strong_trend: f64,
    pub volume_surge: f64,
}

impl Default for TechnicalPoints {
    fn default() -> Self {
        TechnicalPoints {
            sustained_trend: 0.8,
            long_ma: 0.3,
            rsi_multi: 0.4,
            rsi_single: 0.2,
            macd_multi: 0.5,
            macd_single: 0.2,
            macd_cross: 0.2,
            bollinger: 0.3,
            stochastic: 0.2,
            williams: 0.2,
            cci: 0.2,
            momentum_multi: 0.4,
            momentum_single: 0.15,
            breakout: 0.4,
            strong_trend: 0.3,
            volume_surge: 0.1,
        }
    }
}

/// Oscillator levels and thresholds for the technical rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalLevels {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub stochastic_oversold: f64,
    pub stochastic_overbought: f64,
    pub williams_oversold: f64,
    pub williams_overbought: f64,
    pub cci_oversold: f64,
    pub cci_overbought: f64,
    pub strong_trend: f64,
    pub volume_surge_ratio: f64,
}

impl Default for TechnicalLevels {
    fn default() -> Self {
        TechnicalLevels {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            stochastic_oversold: 20.0,
            stochastic_overbought: 80.0,
            williams_oversold: -80.0,
            williams_overbought: -20.0,
            cci_oversold: -100.0,
            cci_overbought: 100.0,
            strong_trend: 0.002,
            volume_surge_ratio: 1.5,
        }
    }
}

/// Valuation bands. Points are signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalBands {
    pub pe_favorable_max: f64,
    pub pe_moderate_max: f64,
    pub pe_favorable_points: f64,
    pub pe_moderate_points: f64,
    pub pe_unfavorable_points: f64,
    pub pb_favorable_max: f64,
    pub pb_moderate_max: f64,
    pub pb_favorable_points: f64,
    pub pb_moderate_points: f64,
    pub pb_unfavorable_points: f64,
    pub large_cap_points: f64,
    pub mid_cap_points: f64,
    pub small_cap_points: f64,
    pub micro_cap_points: f64,
    pub sector_points: f64,
    pub favored_sectors: Vec<String>,
    pub disfavored_sectors: Vec<String>,
}

impl Default for FundamentalBands {
    fn default() -> Self {
        FundamentalBands {
            pe_favorable_max: 15.0,
            pe_moderate_max: 25.0,
            pe_favorable_points: 0.8,
            pe_moderate_points: 0.2,
            pe_unfavorable_points: -0.6,
            pb_favorable_max: 1.5,
            pb_moderate_max: 3.0,
            pb_favorable_points: 0.4,
            pb_moderate_points: 0.0,
            pb_unfavorable_points: -0.3,
            large_cap_points: 0.3,
            mid_cap_points: 0.1,
            small_cap_points: -0.1,
            micro_cap_points: -0.3,
            sector_points: 0.3,
            favored_sectors: Vec::new(),
            disfavored_sectors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentParams {
    /// Sample count at which sentiment gets full weight.
    pub min_samples: u32,
    pub scale: f64,
    /// Scores with a smaller magnitude are tagged neutral.
    pub neutral_band: f64,
}

impl Default for SentimentParams {
    fn default() -> Self {
        SentimentParams {
            min_samples: 10,
            scale: 2.0,
            neutral_band: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    pub technical: f64,
    pub fundamental: f64,
    pub sentiment: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        FactorWeights {
            technical: 0.4,
            fundamental: 0.3,
            sentiment: 0.3,
        }
    }
}

/// Collects fired rules for one factor.
struct Tally {
    factor: Factor,
    total: f64,
    evidence: Vec<Evidence>,
}

impl Tally {
    fn new(factor: Factor) -> Self {
        Tally {
            factor,
            total: 0.0,
            evidence: Vec::new(),
        }
    }

    fn add(&mut self, tag: &str, contribution: f64) {
        self.total += contribution;
        self.evidence.push(Evidence::new(self.factor, tag, contribution));
    }

    fn finish(self) -> (f64, Vec<Evidence>) {
        (self.total.clamp(-SCORE_BOUND, SCORE_BOUND), self.evidence)
    }
}

/// Fuses one bar's indicators with the fundamental and sentiment snapshots.
/// Pure: identical inputs give an identical signal. A missing snapshot
/// contributes nothing to its factor.
pub fn score_signal(
    snapshot: &IndicatorSnapshot,
    fundamentals: Option<&FundamentalSnapshot>,
    sentiment: Option<&SentimentSnapshot>,
    config: &EngineConfig,
) -> Signal {
    let (technical, mut evidence) =
        technical_score(snapshot, &config.technical, &config.technical_levels);
    let (fundamental, fund_evidence) = match fundamentals {
        Some(f) => fundamental_score(f, &config.fundamental),
        None => (0.0, Vec::new()),
    };
    let (sentiment_value, sent_evidence) = match sentiment {
        Some(s) => sentiment_score(s, &config.sentiment),
        None => (0.0, Vec::new()),
    };
    evidence.extend(fund_evidence);
    evidence.extend(sent_evidence);

    let w = &config.weights;
    let score = w.technical * technical + w.fundamental * fundamental + w.sentiment * sentiment_value;

    Signal {
        instrument: snapshot.instrument.clone(),
        action: decide(score, &config.thresholds),
        score,
        technical,
        fundamental,
        sentiment: sentiment_value,
        evidence,
        reduced_confidence: snapshot.reduced_confidence,
    }
}

pub fn technical_score(
    snap: &IndicatorSnapshot,
    points: &TechnicalPoints,
    levels: &TechnicalLevels,
) -> (f64, Vec<Evidence>) {
    let mut tally = Tally::new(Factor::Technical);
    let close = snap.close;

    // Moving-average ordering across horizons
    let smas: Vec<f64> = snap.sma.values().copied().collect();
    if !smas.is_empty() {
        let chain: Vec<f64> = std::iter::once(close).chain(smas.iter().copied()).collect();
        let ascending = chain.windows(2).all(|w| w[0] > w[1]);
        let descending = chain.windows(2).all(|w| w[0] < w[1]);
        let longest = smas[smas.len() - 1];
        if snap.sma_full && smas.len() >= 2 && ascending {
            tally.add("SUSTAINED_UPTREND", points.sustained_trend);
        } else if snap.sma_full && smas.len() >= 2 && descending {
            tally.add("SUSTAINED_DOWNTREND", -points.sustained_trend);
        } else if close > longest {
            tally.add("ABOVE_LONG_MA", points.long_ma);
        } else if close < longest {
            tally.add("BELOW_LONG_MA", -points.long_ma);
        }
    }

    // RSI extremes across periods
    let rsis: Vec<f64> = snap.rsi.values().copied().collect();
    multi_rule(
        &mut tally,
        &rsis,
        |r| r < levels.rsi_oversold,
        ("RSI_OVERSOLD_MULTI", "RSI_OVERSOLD"),
        points.rsi_multi,
        points.rsi_single,
        false,
    );
    multi_rule(
        &mut tally,
        &rsis,
        |r| r > levels.rsi_overbought,
        ("RSI_OVERBOUGHT_MULTI", "RSI_OVERBOUGHT"),
        -points.rsi_multi,
        -points.rsi_single,
        false,
    );

    // MACD agreement across timeframes
    let biases: Vec<f64> = snap.macd.iter().map(|m| macd_bias(m, close)).collect();
    multi_rule(
        &mut tally,
        &biases,
        |b| b > 0.0,
        ("MACD_BULLISH_MULTI", "MACD_BULLISH"),
        points.macd_multi,
        points.macd_single,
        true,
    );
    multi_rule(
        &mut tally,
        &biases,
        |b| b < 0.0,
        ("MACD_BEARISH_MULTI", "MACD_BEARISH"),
        -points.macd_multi,
        -points.macd_single,
        true,
    );
    if let Some((prev, histogram)) = snap
        .macd
        .first()
        .and_then(|m| m.prev_histogram.map(|prev| (prev, m.histogram)))
    {
        let tol = MACD_TOLERANCE * close.abs();
        if prev <= 0.0 && histogram > tol {
            tally.add("MACD_GOLDEN_CROSS", points.macd_cross);
        } else if prev >= 0.0 && histogram < -tol {
            tally.add("MACD_DEATH_CROSS", -points.macd_cross);
        }
    }

    let bb = &snap.bollinger;
    if close < bb.lower {
        tally.add("BB_LOWER_PENETRATION", points.bollinger);
    } else if close > bb.upper {
        tally.add("BB_UPPER_PENETRATION", -points.bollinger);
    }

    if snap.stochastic_k < levels.stochastic_oversold && snap.stochastic_d < levels.stochastic_oversold {
        tally.add("STOCH_OVERSOLD", points.stochastic);
    } else if snap.stochastic_k > levels.stochastic_overbought
        && snap.stochastic_d > levels.stochastic_overbought
    {
        tally.add("STOCH_OVERBOUGHT", -points.stochastic);
    }

    if snap.williams_r < levels.williams_oversold {
        tally.add("WILLIAMS_OVERSOLD", points.williams);
    } else if snap.williams_r > levels.williams_overbought {
        tally.add("WILLIAMS_OVERBOUGHT", -points.williams);
    }

    if snap.cci < levels.cci_oversold {
        tally.add("CCI_OVERSOLD", points.cci);
    } else if snap.cci > levels.cci_overbought {
        tally.add("CCI_OVERBOUGHT", -points.cci);
    }

    // Momentum across horizons
    let momenta: Vec<f64> = snap.momentum.values().copied().collect();
    multi_rule(
        &mut tally,
        &momenta,
        |m| m > 0.0,
        ("MOMENTUM_POSITIVE_MULTI", "MOMENTUM_POSITIVE"),
        points.momentum_multi,
        points.momentum_single,
        true,
    );
    multi_rule(
        &mut tally,
        &momenta,
        |m| m < 0.0,
        ("MOMENTUM_NEGATIVE_MULTI", "MOMENTUM_NEGATIVE"),
        -points.momentum_multi,
        -points.momentum_single,
        true,
    );

    if snap.bars_available > 1 {
        if close > snap.resistance {
            tally.add("RESISTANCE_BREAK", points.breakout);
        } else if close < snap.support {
            tally.add("SUPPORT_BREAK", -points.breakout);
        }
    }

    if snap.trend_strength >= levels.strong_trend {
        tally.add("STRONG_TREND_UP", points.strong_trend);
    } else if snap.trend_strength <= -levels.strong_trend {
        tally.add("STRONG_TREND_DOWN", -points.strong_trend);
    }

    let surge = snap
        .volume_ratio
        .filter(|&ratio| ratio >= levels.volume_surge_ratio);
    if let (Some(_), Some(prev_close)) = (surge, snap.prev_close) {
        if close > prev_close {
            tally.add("VOLUME_SURGE_UP", points.volume_surge);
        } else if close < prev_close {
            tally.add("VOLUME_SURGE_DOWN", -points.volume_surge);
        }
    }

    tally.finish()
}

/// Multi-timeframe rule. With two or more readings that all satisfy `pred`
/// the multi tag fires; otherwise the single tag fires when the primary
/// reading (`primary_only`) or any reading satisfies `pred`.
fn multi_rule(
    tally: &mut Tally,
    readings: &[f64],
    pred: impl Fn(f64) -> bool,
    (multi_tag, single_tag): (&str, &str),
    multi_points: f64,
    single_points: f64,
    primary_only: bool,
) {
    if readings.len() >= 2 && readings.iter().all(|&r| pred(r)) {
        tally.add(multi_tag, multi_points);
        return;
    }
    let single = if primary_only {
        readings.first().is_some_and(|&r| pred(r))
    } else {
        readings.iter().any(|&r| pred(r))
    };
    if single {
        tally.add(single_tag, single_points);
    }
}

/// +1 bullish, -1 bearish, 0 neutral. A histogram within tolerance of zero
/// means the signal line has converged onto the MACD line; the side of the
/// zero line decides then.
fn macd_bias(m: &MacdReading, close: f64) -> f64 {
    let tol = MACD_TOLERANCE * close.abs();
    let reading = if m.histogram.abs() > tol { m.histogram } else { m.line };
    if reading > tol {
        1.0
    } else if reading < -tol {
        -1.0
    } else {
        0.0
    }
}

pub fn fundamental_score(f: &FundamentalSnapshot, bands: &FundamentalBands) -> (f64, Vec<Evidence>) {
    let mut tally = Tally::new(Factor::Fundamental);

    if let Some(pe) = f.pe_ratio {
        if pe > 0.0 && pe <= bands.pe_favorable_max {
            tally.add("PE_FAVORABLE", bands.pe_favorable_points);
        } else if pe > 0.0 && pe <= bands.pe_moderate_max {
            tally.add("PE_MODERATE", bands.pe_moderate_points);
        } else {
            tally.add("PE_UNFAVORABLE", bands.pe_unfavorable_points);
        }
    }

    if let Some(pb) = f.pb_ratio {
        if pb > 0.0 && pb <= bands.pb_favorable_max {
            tally.add("PB_FAVORABLE", bands.pb_favorable_points);
        } else if pb > 0.0 && pb <= bands.pb_moderate_max {
            tally.add("PB_MODERATE", bands.pb_moderate_points);
        } else {
            tally.add("PB_UNFAVORABLE", bands.pb_unfavorable_points);
        }
    }

    if let Some(cap) = f.market_cap {
        match MarketCapTier::from_market_cap(cap) {
            MarketCapTier::Large => tally.add("LARGE_CAP", bands.large_cap_points),
            MarketCapTier::Mid => tally.add("MID_CAP", bands.mid_cap_points),
            MarketCapTier::Small => tally.add("SMALL_CAP", bands.small_cap_points),
            MarketCapTier::Micro => tally.add("MICRO_CAP", bands.micro_cap_points),
        }
    }

    if let Some(sector) = f.sector.as_deref() {
        let matches = |list: &[String]| list.iter().any(|s| s.eq_ignore_ascii_case(sector));
        if matches(&bands.favored_sectors) {
            tally.add("SECTOR_FAVORED", bands.sector_points);
        } else if matches(&bands.disfavored_sectors) {
            tally.add("SECTOR_DISFAVORED", -bands.sector_points);
        }
    }

    tally.finish()
}

pub fn sentiment_score(s: &SentimentSnapshot, params: &SentimentParams) -> (f64, Vec<Evidence>) {
    let mut tally = Tally::new(Factor::Sentiment);

    let sample_weight = if params.min_samples == 0 {
        1.0
    } else {
        (s.sample_count as f64 / params.min_samples as f64).min(1.0)
    };
    let mean = if s.mean_score.is_finite() {
        s.mean_score.clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let confidence = if s.confidence.is_finite() {
        s.confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let raw = params.scale * mean * confidence * sample_weight;

    let tag = if raw.abs() < params.neutral_band {
        "SENTIMENT_NEUTRAL"
    } else if raw > 0.0 {
        "SENTIMENT_POSITIVE"
    } else {
        "SENTIMENT_NEGATIVE"
    };
    tally.add(tag, raw);

    tally.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::BollingerReading;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn neutral_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            instrument: "ACME".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            close: 100.0,
            prev_close: Some(100.0),
            bars_available: 300,
            reduced_confidence: false,
            sma: BTreeMap::from([(5, 100.0), (20, 100.0), (200, 100.0)]),
            sma_full: true,
            ema: BTreeMap::from([(12, 100.0)]),
            rsi: BTreeMap::from([(7, 50.0), (14, 50.0)]),
            macd: vec![],
            bollinger: BollingerReading {
                upper: 105.0,
                middle: 100.0,
                lower: 95.0,
            },
            stochastic_k: 50.0,
            stochastic_d: 50.0,
            williams_r: -50.0,
            cci: 0.0,
            atr: 1.0,
            volatility: 0.01,
            trend_strength: 0.0,
            support: 95.0,
            resistance: 105.0,
            momentum: BTreeMap::from([(5, 0.0), (20, 0.0)]),
            volume_ratio: None,
        }
    }

    fn macd(histogram: f64, prev: f64, line: f64) -> MacdReading {
        MacdReading {
            fast: 12,
            slow: 26,
            signal_period: 9,
            line,
            signal: line - histogram,
            histogram,
            prev_histogram: Some(prev),
        }
    }

    fn tags(evidence: &[Evidence]) -> Vec<&str> {
        evidence.iter().map(|e| e.tag.as_str()).collect()
    }

    #[test]
    fn neutral_snapshot_scores_zero() {
        let (score, evidence) = technical_score(
            &neutral_snapshot(),
            &TechnicalPoints::default(),
            &TechnicalLevels::default(),
        );
        assert_eq!(score, 0.0);
        assert!(evidence.is_empty());
    }

    #[test]
    fn sustained_uptrend_requires_full_windows() {
        let mut snap = neutral_snapshot();
        snap.close = 110.0;
        snap.sma = BTreeMap::from([(5, 108.0), (20, 105.0), (200, 100.0)]);
        let (_, evidence) =
            technical_score(&snap, &TechnicalPoints::default(), &TechnicalLevels::default());
        assert!(tags(&evidence).contains(&"SUSTAINED_UPTREND"));

        snap.sma_full = false;
        let (_, evidence) =
            technical_score(&snap, &TechnicalPoints::default(), &TechnicalLevels::default());
        let t = tags(&evidence);
        assert!(!t.contains(&"SUSTAINED_UPTREND"));
        assert!(t.contains(&"ABOVE_LONG_MA"));
    }

    #[test]
    fn rsi_multi_beats_single() {
        let points = TechnicalPoints::default();
        let levels = TechnicalLevels::default();

        let mut all = neutral_snapshot();
        all.rsi = BTreeMap::from([(7, 20.0), (14, 25.0)]);
        let (multi, evidence) = technical_score(&all, &points, &levels);
        assert_eq!(tags(&evidence), vec!["RSI_OVERSOLD_MULTI"]);

        let mut one = neutral_snapshot();
        one.rsi = BTreeMap::from([(7, 20.0), (14, 45.0)]);
        let (single, evidence) = technical_score(&one, &points, &levels);
        assert_eq!(tags(&evidence), vec!["RSI_OVERSOLD"]);
        assert!(multi > single);
    }

    #[test]
    fn macd_agreement_and_cross() {
        let mut snap = neutral_snapshot();
        snap.macd = vec![macd(0.5, -0.1, 1.0), macd(0.3, 0.2, 2.0)];
        let (_, evidence) =
            technical_score(&snap, &TechnicalPoints::default(), &TechnicalLevels::default());
        let t = tags(&evidence);
        assert!(t.contains(&"MACD_BULLISH_MULTI"));
        assert!(t.contains(&"MACD_GOLDEN_CROSS"));
        assert!(!t.contains(&"MACD_BULLISH"));
    }

    #[test]
    fn macd_converged_signal_uses_zero_line() {
        let mut snap = neutral_snapshot();
        snap.macd = vec![macd(1e-14, 1e-14, 7.0), macd(-1e-14, 0.0, 15.0)];
        let (_, evidence) =
            technical_score(&snap, &TechnicalPoints::default(), &TechnicalLevels::default());
        let t = tags(&evidence);
        assert!(t.contains(&"MACD_BULLISH_MULTI"));
        assert!(!t.contains(&"MACD_DEATH_CROSS"));
    }

    #[test]
    fn oscillator_extremes() {
        let mut snap = neutral_snapshot();
        snap.stochastic_k = 10.0;
        snap.stochastic_d = 15.0;
        snap.williams_r = -90.0;
        snap.cci = -150.0;
        snap.close = 94.0;
        let (score, evidence) =
            technical_score(&snap, &TechnicalPoints::default(), &TechnicalLevels::default());
        let t = tags(&evidence);
        assert!(t.contains(&"STOCH_OVERSOLD"));
        assert!(t.contains(&"WILLIAMS_OVERSOLD"));
        assert!(t.contains(&"CCI_OVERSOLD"));
        assert!(t.contains(&"BB_LOWER_PENETRATION"));
        assert!(t.contains(&"SUPPORT_BREAK"));
        assert!(t.contains(&"BELOW_LONG_MA"));
        assert!(score > 0.0);
    }

    #[test]
    fn technical_score_is_clamped() {
        let points = TechnicalPoints {
            strong_trend: 10.0,
            ..TechnicalPoints::default()
        };
        let mut snap = neutral_snapshot();
        snap.trend_strength = 0.01;
        let (score, _) = technical_score(&snap, &points, &TechnicalLevels::default());
        assert_eq!(score, SCORE_BOUND);
    }

    #[test]
    fn volume_surge_direction() {
        let mut snap = neutral_snapshot();
        snap.volume_ratio = Some(2.0);
        snap.prev_close = Some(99.0);
        let (_, evidence) =
            technical_score(&snap, &TechnicalPoints::default(), &TechnicalLevels::default());
        assert!(tags(&evidence).contains(&"VOLUME_SURGE_UP"));
    }

    fn fundamentals(pe: Option<f64>, pb: Option<f64>, cap: Option<f64>) -> FundamentalSnapshot {
        FundamentalSnapshot {
            instrument: "ACME".into(),
            as_of: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            pe_ratio: pe,
            pb_ratio: pb,
            market_cap: cap,
            sector: Some("Technology".into()),
        }
    }

    #[test]
    fn fundamental_bands() {
        let bands = FundamentalBands {
            favored_sectors: vec!["technology".into()],
            ..FundamentalBands::default()
        };
        let (score, evidence) =
            fundamental_score(&fundamentals(Some(12.0), Some(1.0), Some(20e9)), &bands);
        assert_eq!(
            tags(&evidence),
            vec!["PE_FAVORABLE", "PB_FAVORABLE", "LARGE_CAP", "SECTOR_FAVORED"]
        );
        assert!((score - 1.8).abs() < 1e-12);

        let (score, _) =
            fundamental_score(&fundamentals(Some(-5.0), Some(4.0), Some(1e6)), &bands);
        assert!((score - (-0.6 - 0.3 - 0.3 + 0.3)).abs() < 1e-12);
    }

    #[test]
    fn fundamental_missing_fields_contribute_nothing() {
        let mut f = fundamentals(None, None, None);
        f.sector = None;
        let (score, evidence) = fundamental_score(&f, &FundamentalBands::default());
        assert_eq!(score, 0.0);
        assert!(evidence.is_empty());
    }

    fn sentiment(mean: f64, confidence: f64, samples: u32) -> SentimentSnapshot {
        SentimentSnapshot {
            instrument: "ACME".into(),
            as_of: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            mean_score: mean,
            confidence,
            sample_count: samples,
        }
    }

    #[test]
    fn sentiment_scaling() {
        let params = SentimentParams::default();
        let (score, evidence) = sentiment_score(&sentiment(0.5, 0.8, 20), &params);
        assert!((score - 0.8).abs() < 1e-12);
        assert_eq!(evidence[0].tag, "SENTIMENT_POSITIVE");

        // half the minimum sample count halves the weight
        let (score, _) = sentiment_score(&sentiment(0.5, 0.8, 5), &params);
        assert!((score - 0.4).abs() < 1e-12);

        let (score, evidence) = sentiment_score(&sentiment(-0.02, 1.0, 50), &params);
        assert!(score.abs() < 0.1);
        assert_eq!(evidence[0].tag, "SENTIMENT_NEUTRAL");
    }

    #[test]
    fn sentiment_inputs_clamped() {
        let (score, evidence) =
            sentiment_score(&sentiment(-5.0, 3.0, 100), &SentimentParams::default());
        assert_eq!(score, -2.0);
        assert_eq!(evidence[0].tag, "SENTIMENT_NEGATIVE");
    }

    #[test]
    fn score_signal_weights_and_decides() {
        let config = EngineConfig::default();
        let mut snap = neutral_snapshot();
        snap.trend_strength = 0.01;
        let f = fundamentals(Some(12.0), None, None);
        let s = sentiment(0.5, 1.0, 10);

        let signal = score_signal(&snap, Some(&f), Some(&s), &config);
        let expected = 0.4 * 0.3 + 0.3 * 0.8 + 0.3 * 1.0;
        assert!((signal.score - expected).abs() < 1e-12);
        assert_eq!(signal.action, crate::domain::signal::Action::Buy);
        assert_eq!(signal.evidence[0].factor, Factor::Technical);
        assert_eq!(signal.evidence.last().unwrap().factor, Factor::Sentiment);
    }

    #[test]
    fn score_signal_is_pure() {
        let config = EngineConfig::default();
        let snap = neutral_snapshot();
        let f = fundamentals(Some(30.0), Some(2.0), Some(5e9));
        let s = sentiment(-0.4, 0.6, 3);
        let a = score_signal(&snap, Some(&f), Some(&s), &config);
        let b = score_signal(&snap, Some(&f), Some(&s), &config);
        assert_eq!(a, b);
    }
}
