//! Portfolio simulator: steps the period calendar and drives the signal,
//! sizing and execution stages for every instrument.
//!
//! One [`Simulator`] serves one run. Price history is fetched and validated
//! before the first period, indicator sets are computed once per instrument,
//! and the period loop itself only reads pre-computed data and the snapshot
//! caches behind the providers.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Duration, NaiveDate};
use tracing::{debug, info};

use super::bar::{PriceBar, first_invalid_close};
use super::config::{EngineConfig, RiskParams};
use super::config_validation::validate_engine_config;
use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::error::EquisimError;
use super::execution::{
    EntryResult, ExitResult, FillContext, check_exits, enter_position, entry_fill_price,
    exit_position, increase_position, reduce_position,
};
use super::indicator::{IndicatorSet, IndicatorSnapshot, compute_indicator_sets};
use super::metrics::PerformanceMetrics;
use super::portfolio::PortfolioState;
use super::position::{ExitReason, Side};
use super::result::{PeriodSummary, SimulationResult};
use super::scoring::score_signal;
use super::signal::Signal;
use super::sizing::{SizingRequest, size_position};
use super::strategy::{StrategyMode, target_weight};
use crate::ports::data_port::{FundamentalsProvider, PriceHistoryProvider, SentimentProvider};
use crate::ports::diagnostics_port::DiagnosticsSink;

/// Shared cancellation switch, checked once per period.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The three data providers a run reads from.
#[derive(Clone, Copy)]
pub struct MarketData<'a> {
    pub prices: &'a dyn PriceHistoryProvider,
    pub fundamentals: &'a dyn FundamentalsProvider,
    pub sentiment: &'a dyn SentimentProvider,
}

impl<'a> MarketData<'a> {
    /// All three ports served by one provider.
    pub fn from_provider<P>(provider: &'a P) -> Self
    where
        P: PriceHistoryProvider + FundamentalsProvider + SentimentProvider,
    {
        MarketData {
            prices: provider,
            fundamentals: provider,
            sentiment: provider,
        }
    }
}

/// What the strategy step sees of the current period.
struct PeriodView {
    date: NaiveDate,
    period: usize,
    /// Closes of instruments with a bar on the period date.
    today: BTreeMap<String, f64>,
    /// Latest known close of every instrument, used for marking.
    marks: BTreeMap<String, f64>,
    /// Instruments closed by stop-loss or take-profit this period.
    exited: HashSet<String>,
}

impl PeriodView {
    fn fill(&self, market_price: f64) -> FillContext {
        FillContext {
            market_price,
            date: self.date,
            period: self.period,
        }
    }
}

pub struct Simulator<'a> {
    data: MarketData<'a>,
    sink: &'a dyn DiagnosticsSink,
    cancel: CancelFlag,
    diagnostics: Vec<Diagnostic>,
    reduced_confidence_seen: HashSet<String>,
}

impl<'a> Simulator<'a> {
    pub fn new(
        prices: &'a dyn PriceHistoryProvider,
        fundamentals: &'a dyn FundamentalsProvider,
        sentiment: &'a dyn SentimentProvider,
        sink: &'a dyn DiagnosticsSink,
    ) -> Self {
        Self::with_market_data(
            MarketData {
                prices,
                fundamentals,
                sentiment,
            },
            sink,
        )
    }

    pub fn with_market_data(data: MarketData<'a>, sink: &'a dyn DiagnosticsSink) -> Self {
        Simulator {
            data,
            sink,
            cancel: CancelFlag::new(),
            diagnostics: Vec::new(),
            reduced_confidence_seen: HashSet::new(),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    fn diagnose(
        &mut self,
        date: NaiveDate,
        instrument: &str,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic::new(date, instrument, kind, message);
        self.sink.record(&diagnostic);
        self.diagnostics.push(diagnostic);
    }

    /// Runs the simulation over `[start, end]`.
    ///
    /// Fails before the first period on invalid configuration or a
    /// non-positive close in the fetched history, and mid-run only on
    /// cancellation. Everything else is recorded as a diagnostic.
    pub fn run(
        mut self,
        instruments: &[String],
        start: NaiveDate,
        end: NaiveDate,
        initial_capital: f64,
        config: &EngineConfig,
    ) -> Result<SimulationResult, EquisimError> {
        validate_engine_config(config)?;
        validate_run(instruments, start, end, initial_capital)?;

        let instruments: Vec<String> = instruments
            .iter()
            .map(|s| s.trim().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let history_start = lookback_start(start, config.simulation.history_lookback_days)?;
        let histories = self.fetch_histories(&instruments, history_start, start, end)?;
        let sets = compute_indicator_sets(histories, &config.indicators);

        let timeline: Vec<NaiveDate> = sets
            .values()
            .flat_map(|set| set.bars().iter().map(|b| b.date))
            .filter(|d| *d >= start && *d <= end)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        info!(
            instruments = instruments.len(),
            loaded = sets.len(),
            periods = timeline.len(),
            strategy = config.simulation.strategy.name(),
            %start,
            %end,
            "simulation started"
        );

        let mut portfolio = PortfolioState::new(initial_capital);
        let mut marks: BTreeMap<String, f64> = BTreeMap::new();
        let mut periods = Vec::with_capacity(timeline.len());
        let mut prev_equity = initial_capital;

        for (period, &date) in timeline.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(%date, period, "simulation cancelled");
                return Err(EquisimError::Cancelled { date });
            }

            let mut today = BTreeMap::new();
            for (instrument, set) in &sets {
                match set.index_of(date) {
                    Some(i) => {
                        let close = set.bars()[i].close;
                        today.insert(instrument.clone(), close);
                        marks.insert(instrument.clone(), close);
                    }
                    None => self.diagnose(
                        date,
                        instrument,
                        DiagnosticKind::PriceUnavailable,
                        "no bar on this date",
                    ),
                }
            }

            let trades_before = portfolio.closed_trades.len();
            let exits = check_exits(&mut portfolio, &today, date, period, &config.risk);
            log_exits(date, &exits);
            let view = PeriodView {
                date,
                period,
                today,
                marks,
                exited: exits.into_iter().map(|e| e.instrument).collect(),
            };

            let opened = match config.simulation.strategy {
                StrategyMode::SignalTriggered => {
                    self.signal_period(&mut portfolio, &sets, &view, config)
                }
                StrategyMode::TargetWeightRebalance {
                    drift_tolerance, ..
                } if config.simulation.strategy.rebalances_at(period) => {
                    self.rebalance_period(&mut portfolio, &sets, &view, drift_tolerance, config)
                }
                StrategyMode::TargetWeightRebalance { .. } => 0,
            };

            if period + 1 == timeline.len() {
                liquidate(&mut portfolio, &view, &config.risk);
            }

            let positions_value = portfolio.positions_value(&view.marks);
            let equity = portfolio.cash + positions_value;
            let period_return = if prev_equity > 0.0 {
                (equity - prev_equity) / prev_equity
            } else {
                0.0
            };
            prev_equity = equity;

            periods.push(PeriodSummary {
                period,
                date,
                equity,
                cash: portfolio.cash,
                positions_value,
                period_return,
                realized_pnl: portfolio.realized_pnl,
                open_positions: portfolio.position_count(),
                trades_opened: opened,
                trades_closed: portfolio.closed_trades.len() - trades_before,
            });
            marks = view.marks;
        }

        let metrics = PerformanceMetrics::compute(initial_capital, &periods, &portfolio.closed_trades);
        let final_equity = periods.last().map_or(initial_capital, |p| p.equity);

        info!(
            final_equity,
            total_return = metrics.total_return,
            trades = portfolio.closed_trades.len(),
            diagnostics = self.diagnostics.len(),
            "simulation finished"
        );

        Ok(SimulationResult {
            start,
            end,
            instruments,
            strategy: config.simulation.strategy,
            initial_capital,
            final_equity,
            periods,
            trades: portfolio.closed_trades,
            diagnostics: self.diagnostics,
            metrics,
        })
    }

    /// Fetches, orders and validates every instrument's history. Unavailable
    /// instruments are dropped with a diagnostic dated `start`.
    fn fetch_histories(
        &mut self,
        instruments: &[String],
        history_start: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<String, Vec<PriceBar>>, EquisimError> {
        let mut histories = BTreeMap::new();
        for instrument in instruments {
            let mut bars = match self.data.prices.price_history(instrument, history_start, end) {
                Ok(bars) => bars,
                Err(e) => {
                    self.diagnose(start, instrument, DiagnosticKind::DataUnavailable, e.to_string());
                    continue;
                }
            };
            bars.retain(|b| b.date >= history_start && b.date <= end);
            bars.sort_by_key(|b| b.date);
            bars.dedup_by_key(|b| b.date);

            if bars.is_empty() {
                self.diagnose(
                    start,
                    instrument,
                    DiagnosticKind::DataUnavailable,
                    format!("no price history between {} and {}", history_start, end),
                );
                continue;
            }
            if let Some(bad) = first_invalid_close(&bars) {
                return Err(EquisimError::InvalidPrice {
                    instrument: instrument.clone(),
                    date: bad.date,
                    price: bad.close,
                });
            }
            debug!(instrument = %instrument, bars = bars.len(), "history loaded");
            histories.insert(instrument.clone(), bars);
        }
        Ok(histories)
    }

    /// Snapshot plus fundamentals and sentiment as of `date`, or `None` with
    /// a diagnostic when any input is missing.
    fn evaluate(
        &mut self,
        set: &IndicatorSet,
        date: NaiveDate,
        config: &EngineConfig,
    ) -> Option<Signal> {
        let instrument = set.instrument().to_string();
        let snapshot: IndicatorSnapshot = set.snapshot_at(date)?;

        if snapshot.reduced_confidence && self.reduced_confidence_seen.insert(instrument.clone()) {
            self.diagnose(
                date,
                &instrument,
                DiagnosticKind::InsufficientHistory,
                format!(
                    "{} bars available, indicator windows clipped",
                    snapshot.bars_available
                ),
            );
        }

        let fundamentals = match self.data.fundamentals.fundamentals(&instrument, date) {
            Ok(Some(f)) => f,
            Ok(None) => {
                self.diagnose(
                    date,
                    &instrument,
                    DiagnosticKind::FundamentalsUnavailable,
                    format!("no fundamentals as of {}", date),
                );
                return None;
            }
            Err(e) => {
                self.diagnose(date, &instrument, DiagnosticKind::FundamentalsUnavailable, e.to_string());
                return None;
            }
        };
        let sentiment = match self.data.sentiment.sentiment(&instrument, date) {
            Ok(Some(s)) => s,
            Ok(None) => {
                self.diagnose(
                    date,
                    &instrument,
                    DiagnosticKind::SentimentUnavailable,
                    format!("no sentiment as of {}", date),
                );
                return None;
            }
            Err(e) => {
                self.diagnose(date, &instrument, DiagnosticKind::SentimentUnavailable, e.to_string());
                return None;
            }
        };

        Some(score_signal(&snapshot, Some(&fundamentals), Some(&sentiment), config))
    }

    /// FLAT -> LONG | SHORT on buy / sell family signals. Returns the number
    /// of positions opened.
    fn signal_period(
        &mut self,
        portfolio: &mut PortfolioState,
        sets: &BTreeMap<String, IndicatorSet>,
        view: &PeriodView,
        config: &EngineConfig,
    ) -> usize {
        let date = view.date;
        let mut opened = 0;
        for (instrument, &price) in &view.today {
            if view.exited.contains(instrument) || portfolio.has_position(instrument) {
                continue;
            }
            let Some(set) = sets.get(instrument) else {
                continue;
            };
            let Some(signal) = self.evaluate(set, date, config) else {
                continue;
            };

            let side = if signal.action.is_buy() {
                Side::Long
            } else if signal.action.is_sell() && config.risk.allow_shorting {
                Side::Short
            } else {
                continue;
            };

            let size = size_position(
                &SizingRequest {
                    equity: portfolio.total_equity(&view.marks),
                    cash: portfolio.cash,
                    price: entry_fill_price(side, price, config.risk.slippage_rate),
                    strength: signal.strength(),
                    side,
                    fundamental: signal.fundamental,
                    sentiment: signal.sentiment,
                },
                &config.risk,
                &config.sizing,
            );
            if size.quantity == 0 {
                debug!(%date, instrument = %instrument, action = %signal.action, "signal too weak to size");
                continue;
            }

            if self.record_entry(
                enter_position(
                    portfolio,
                    instrument,
                    side,
                    size.quantity,
                    view.fill(price),
                    &config.risk,
                ),
                instrument,
                side,
                date,
            ) {
                opened += 1;
            }
        }
        opened
    }

    /// Moves every evaluated instrument towards its target weight. Returns the
    /// number of entries (new positions and additions).
    fn rebalance_period(
        &mut self,
        portfolio: &mut PortfolioState,
        sets: &BTreeMap<String, IndicatorSet>,
        view: &PeriodView,
        drift_tolerance: f64,
        config: &EngineConfig,
    ) -> usize {
        let risk = &config.risk;
        let date = view.date;
        let mut opened = 0;
        for (instrument, &price) in &view.today {
            if view.exited.contains(instrument) {
                continue;
            }
            let Some(set) = sets.get(instrument) else {
                continue;
            };
            let Some(signal) = self.evaluate(set, date, config) else {
                continue;
            };
            let Some(target) = target_weight(&signal, &config.thresholds, risk) else {
                continue;
            };

            let equity = portfolio.total_equity(&view.marks);
            if equity <= 0.0 {
                continue;
            }
            let current = portfolio.get_position(instrument).map_or(0.0, |p| {
                p.side.direction() * p.quantity as f64 * price / equity
            });
            if (target - current).abs() <= drift_tolerance {
                continue;
            }

            let fill = view.fill(price);
            let target_side = if target > 0.0 {
                Some(Side::Long)
            } else if target < 0.0 {
                Some(Side::Short)
            } else {
                None
            };
            let target_qty = target_side.map_or(0, |side| {
                let fill_price = entry_fill_price(side, price, risk.slippage_rate);
                (target.abs() * equity / fill_price).floor() as u64
            });

            // close out when flattening or flipping sides
            let held_side = portfolio.get_position(instrument).map(|p| p.side);
            if held_side.is_some() && held_side != target_side {
                if let Some(exit) = exit_position(portfolio, instrument, fill, ExitReason::Rebalance, risk) {
                    log_exits(date, std::slice::from_ref(&exit));
                }
            }
            let Some(side) = target_side else {
                continue;
            };

            let held = portfolio.get_position(instrument).map_or(0, |p| p.quantity);
            if target_qty < held {
                if let Some(exit) = reduce_position(
                    portfolio,
                    instrument,
                    held - target_qty,
                    fill,
                    ExitReason::Rebalance,
                    risk,
                ) {
                    log_exits(date, std::slice::from_ref(&exit));
                }
                continue;
            }

            let affordable = affordable_quantity(portfolio.cash, price, risk);
            let quantity = (target_qty - held).min(affordable);
            if quantity == 0 {
                continue;
            }
            let result = if held == 0 {
                enter_position(portfolio, instrument, side, quantity, fill, risk)
            } else {
                increase_position(portfolio, instrument, quantity, fill, risk)
            };
            if self.record_entry(result, instrument, side, date) {
                opened += 1;
            }
        }
        opened
    }

    fn record_entry(
        &mut self,
        result: EntryResult,
        instrument: &str,
        side: Side,
        date: NaiveDate,
    ) -> bool {
        match result {
            EntryResult::Entered {
                quantity,
                execution_price,
                commission,
                ..
            } => {
                debug!(
                    %date,
                    instrument = %instrument,
                    %side,
                    quantity,
                    price = execution_price,
                    commission,
                    "entered"
                );
                true
            }
            EntryResult::ZeroQuantity => false,
            EntryResult::InsufficientCapital => {
                self.diagnose(
                    date,
                    instrument,
                    DiagnosticKind::EntryRejected,
                    format!("insufficient cash for {} entry", side),
                );
                false
            }
        }
    }
}

/// Units buyable with `cash` once slippage and commission are paid.
fn affordable_quantity(cash: f64, price: f64, risk: &RiskParams) -> u64 {
    let unit = price * (1.0 + risk.slippage_rate) * (1.0 + risk.commission_rate);
    if unit > 0.0 && cash > 0.0 {
        (cash / unit).floor() as u64
    } else {
        0
    }
}

/// First day of the warm-up history loaded before `from`.
fn lookback_start(from: NaiveDate, days: i64) -> Result<NaiveDate, EquisimError> {
    Duration::try_days(days)
        .and_then(|lookback| from.checked_sub_signed(lookback))
        .ok_or_else(|| {
            EquisimError::invalid_config(
                "simulation.history_lookback_days",
                format!("{} days before {} is out of range", days, from),
            )
        })
}

/// Closes everything at the last known close.
fn liquidate(portfolio: &mut PortfolioState, view: &PeriodView, risk: &RiskParams) {
    let open: Vec<String> = portfolio.positions.keys().cloned().collect();
    for instrument in open {
        let Some(&market_price) = view.marks.get(&instrument) else {
            continue;
        };
        let fill = view.fill(market_price);
        if let Some(exit) =
            exit_position(portfolio, &instrument, fill, ExitReason::EndOfSimulation, risk)
        {
            log_exits(view.date, std::slice::from_ref(&exit));
        }
    }
}

fn log_exits(date: NaiveDate, exits: &[ExitResult]) {
    for exit in exits {
        debug!(
            %date,
            instrument = %exit.instrument,
            side = %exit.side,
            quantity = exit.quantity,
            price = exit.exit_price,
            pnl = exit.pnl,
            reason = ?exit.reason,
            "exited"
        );
    }
}

fn validate_run(
    instruments: &[String],
    start: NaiveDate,
    end: NaiveDate,
    initial_capital: f64,
) -> Result<(), EquisimError> {
    if instruments.iter().all(|s| s.trim().is_empty()) {
        return Err(EquisimError::invalid_config(
            "simulation.instruments",
            "at least one instrument is required",
        ));
    }
    if start > end {
        return Err(EquisimError::invalid_config(
            "simulation.start_date",
            format!("start date {} is after end date {}", start, end),
        ));
    }
    if !(initial_capital.is_finite() && initial_capital > 0.0) {
        return Err(EquisimError::invalid_config(
            "simulation.initial_capital",
            "must be positive",
        ));
    }
    Ok(())
}

/// Builds a [`Simulator`] for one run and executes it.
pub fn run_simulation(
    instruments: &[String],
    start: NaiveDate,
    end: NaiveDate,
    initial_capital: f64,
    config: &EngineConfig,
    data: MarketData<'_>,
    sink: &dyn DiagnosticsSink,
) -> Result<SimulationResult, EquisimError> {
    Simulator::with_market_data(data, sink).run(instruments, start, end, initial_capital, config)
}

/// Scores one instrument as of `as_of` outside a simulation. History is
/// loaded from `as_of - history_lookback_days`; `None` when there is no bar
/// on or before `as_of`. Missing snapshots contribute nothing.
pub fn score_instrument(
    data: MarketData<'_>,
    instrument: &str,
    as_of: NaiveDate,
    config: &EngineConfig,
) -> Result<Option<Signal>, EquisimError> {
    let history_start = lookback_start(as_of, config.simulation.history_lookback_days)?;
    let mut bars = data.prices.price_history(instrument, history_start, as_of)?;
    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    if let Some(bad) = first_invalid_close(&bars) {
        return Err(EquisimError::InvalidPrice {
            instrument: instrument.to_string(),
            date: bad.date,
            price: bad.close,
        });
    }

    let set = IndicatorSet::compute(instrument, bars, &config.indicators);
    let Some(snapshot) = set
        .last_index_on_or_before(as_of)
        .and_then(|i| set.snapshot(i))
    else {
        return Ok(None);
    };
    let fundamentals = data.fundamentals.fundamentals(instrument, as_of)?;
    let sentiment = data.sentiment.sentiment(instrument, as_of)?;
    Ok(Some(score_signal(
        &snapshot,
        fundamentals.as_ref(),
        sentiment.as_ref(),
        config,
    )))
}
