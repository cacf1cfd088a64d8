//! Open positions and closed trades.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn direction(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("LONG"),
            Side::Short => f.write_str("SHORT"),
        }
    }
}

/// An open holding. Shorts are held in escrow: the entry notional was taken
/// out of cash and comes back, adjusted by the P&L, on exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub instrument: String,
    pub side: Side,
    pub quantity: u64,
    /// Average fill price of the open quantity.
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub entry_period: usize,
    /// Entry commission not yet attributed to a closed trade.
    pub entry_commission: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.side == Side::Long
    }

    pub fn is_short(&self) -> bool {
        self.side == Side::Short
    }

    pub fn cost_basis(&self) -> f64 {
        self.quantity as f64 * self.entry_price
    }

    /// Value the position contributes to equity at `price`.
    pub fn market_value(&self, price: f64) -> f64 {
        let qty = self.quantity as f64;
        match self.side {
            Side::Long => qty * price,
            Side::Short => qty * (2.0 * self.entry_price - price),
        }
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.side.direction() * self.quantity as f64 * (price - self.entry_price)
    }

    /// Unrealized P&L as a fraction of the entry price.
    pub fn pnl_fraction(&self, price: f64) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        self.side.direction() * (price - self.entry_price) / self.entry_price
    }

    pub fn should_stop_loss(&self, price: f64, stop_loss_pct: f64) -> bool {
        stop_loss_pct > 0.0 && self.pnl_fraction(price) <= -stop_loss_pct
    }

    pub fn should_take_profit(&self, price: f64, take_profit_pct: f64) -> bool {
        take_profit_pct > 0.0 && self.pnl_fraction(price) >= take_profit_pct
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Rebalance,
    EndOfSimulation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub instrument: String,
    pub side: Side,
    pub quantity: u64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub holding_periods: usize,
    /// Entry and exit commission attributed to this trade.
    pub commission: f64,
    /// Net of commission.
    pub pnl: f64,
    pub reason: ExitReason,
}

impl ClosedTrade {
    /// Net P&L as a fraction of the entry notional.
    pub fn return_fraction(&self) -> f64 {
        let notional = self.quantity as f64 * self.entry_price;
        if notional > 0.0 { self.pnl / notional } else { 0.0 }
    }
}
