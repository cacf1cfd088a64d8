//! The serialisable output of a simulation run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::diagnostics::Diagnostic;
use super::metrics::PerformanceMetrics;
use super::position::ClosedTrade;
use super::strategy::StrategyMode;

/// End-of-period snapshot of the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub period: usize,
    pub date: NaiveDate,
    /// `cash + positions_value`.
    pub equity: f64,
    pub cash: f64,
    pub positions_value: f64,
    /// Fractional change from the previous period's equity (from the initial
    /// capital for the first period).
    pub period_return: f64,
    /// Cumulative realized P&L at the end of the period.
    pub realized_pnl: f64,
    pub open_positions: usize,
    pub trades_opened: usize,
    pub trades_closed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub instruments: Vec<String>,
    pub strategy: StrategyMode,
    pub initial_capital: f64,
    pub final_equity: f64,
    pub periods: Vec<PeriodSummary>,
    pub trades: Vec<ClosedTrade>,
    pub diagnostics: Vec<Diagnostic>,
    pub metrics: PerformanceMetrics,
}

impl SimulationResult {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn equity_curve(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.periods.iter().map(|p| (p.date, p.equity))
    }
}
