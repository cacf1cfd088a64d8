//! Portfolio state: cash, open positions and the realized P&L log.

use std::collections::BTreeMap;

use super::position::{ClosedTrade, Position};

/// Owned by a single simulation run; only entry and exit transitions mutate
/// it. Positions are keyed by instrument, so there is at most one each.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: BTreeMap<String, Position>,
    pub closed_trades: Vec<ClosedTrade>,
    pub realized_pnl: f64,
}

impl PortfolioState {
    pub fn new(initial_capital: f64) -> Self {
        PortfolioState {
            cash: initial_capital,
            initial_capital,
            positions: BTreeMap::new(),
            closed_trades: Vec::new(),
            realized_pnl: 0.0,
        }
    }

    pub fn add_position(&mut self, position: Position) {
        self.positions.insert(position.instrument.clone(), position);
    }

    pub fn get_position(&self, instrument: &str) -> Option<&Position> {
        self.positions.get(instrument)
    }

    pub fn get_position_mut(&mut self, instrument: &str) -> Option<&mut Position> {
        self.positions.get_mut(instrument)
    }

    pub fn has_position(&self, instrument: &str) -> bool {
        self.positions.contains_key(instrument)
    }

    pub fn remove_position(&mut self, instrument: &str) -> Option<Position> {
        self.positions.remove(instrument)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn record_trade(&mut self, trade: ClosedTrade) {
        self.realized_pnl += trade.pnl;
        self.closed_trades.push(trade);
    }

    /// Mark-to-market value of the open positions. A position without a
    /// price in `marks` is carried at its entry price.
    pub fn positions_value(&self, marks: &BTreeMap<String, f64>) -> f64 {
        self.positions
            .values()
            .map(|pos| {
                let price = marks
                    .get(&pos.instrument)
                    .copied()
                    .unwrap_or(pos.entry_price);
                pos.market_value(price)
            })
            .sum()
    }

    pub fn total_equity(&self, marks: &BTreeMap<String, f64>) -> f64 {
        self.cash + self.positions_value(marks)
    }
}
