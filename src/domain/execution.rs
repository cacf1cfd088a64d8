//! Trade execution and fill simulation.
//!
//! Fills happen at the period close moved against the trader by the slippage
//! rate. Commission is proportional to notional on every fill. Longs pay the
//! notional out of cash; shorts escrow it, so both sides debit cash on entry
//! and credit it back on exit.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::config::RiskParams;
use super::portfolio::PortfolioState;
use super::position::{ClosedTrade, ExitReason, Position, Side};

pub fn calculate_commission(notional: f64, commission_rate: f64) -> f64 {
    notional.abs() * commission_rate
}

/// Buying (long entry, short cover) pays up; selling receives less.
pub fn entry_fill_price(side: Side, market_price: f64, slippage_rate: f64) -> f64 {
    market_price * (1.0 + side.direction() * slippage_rate)
}

pub fn exit_fill_price(side: Side, market_price: f64, slippage_rate: f64) -> f64 {
    market_price * (1.0 - side.direction() * slippage_rate)
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered {
        quantity: u64,
        execution_price: f64,
        cost: f64,
        commission: f64,
    },
    ZeroQuantity,
    InsufficientCapital,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitResult {
    pub instrument: String,
    pub side: Side,
    pub quantity: u64,
    pub exit_price: f64,
    pub exit_value: f64,
    pub exit_commission: f64,
    pub pnl: f64,
    pub reason: ExitReason,
}

/// Where and when a fill happens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillContext {
    pub market_price: f64,
    pub date: NaiveDate,
    pub period: usize,
}

/// Opens a new position. The instrument must be flat.
pub fn enter_position(
    portfolio: &mut PortfolioState,
    instrument: &str,
    side: Side,
    quantity: u64,
    fill: FillContext,
    risk: &RiskParams,
) -> EntryResult {
    if quantity == 0 {
        return EntryResult::ZeroQuantity;
    }
    let execution_price = entry_fill_price(side, fill.market_price, risk.slippage_rate);
    let cost = quantity as f64 * execution_price;
    let commission = calculate_commission(cost, risk.commission_rate);

    if cost + commission > portfolio.cash {
        return EntryResult::InsufficientCapital;
    }
    portfolio.cash -= cost + commission;

    portfolio.add_position(Position {
        instrument: instrument.to_string(),
        side,
        quantity,
        entry_price: execution_price,
        entry_date: fill.date,
        entry_period: fill.period,
        entry_commission: commission,
    });

    EntryResult::Entered {
        quantity,
        execution_price,
        cost,
        commission,
    }
}

/// Adds to an open position on the same side. The entry price becomes the
/// quantity-weighted average of the old and new fills.
pub fn increase_position(
    portfolio: &mut PortfolioState,
    instrument: &str,
    quantity: u64,
    fill: FillContext,
    risk: &RiskParams,
) -> EntryResult {
    if quantity == 0 {
        return EntryResult::ZeroQuantity;
    }
    let Some(side) = portfolio.get_position(instrument).map(|p| p.side) else {
        return EntryResult::ZeroQuantity;
    };
    let execution_price = entry_fill_price(side, fill.market_price, risk.slippage_rate);
    let cost = quantity as f64 * execution_price;
    let commission = calculate_commission(cost, risk.commission_rate);

    if cost + commission > portfolio.cash {
        return EntryResult::InsufficientCapital;
    }
    portfolio.cash -= cost + commission;

    if let Some(pos) = portfolio.get_position_mut(instrument) {
        let total = pos.quantity + quantity;
        pos.entry_price = (pos.cost_basis() + cost) / total as f64;
        pos.quantity = total;
        pos.entry_commission += commission;
    }

    EntryResult::Entered {
        quantity,
        execution_price,
        cost,
        commission,
    }
}

/// Closes the whole position.
pub fn exit_position(
    portfolio: &mut PortfolioState,
    instrument: &str,
    fill: FillContext,
    reason: ExitReason,
    risk: &RiskParams,
) -> Option<ExitResult> {
    let quantity = portfolio.get_position(instrument)?.quantity;
    reduce_position(portfolio, instrument, quantity, fill, reason, risk)
}

/// Closes `quantity` units (all of them if more are asked for). The closed
/// part carries its pro-rata share of the entry commission.
pub fn reduce_position(
    portfolio: &mut PortfolioState,
    instrument: &str,
    quantity: u64,
    fill: FillContext,
    reason: ExitReason,
    risk: &RiskParams,
) -> Option<ExitResult> {
    let pos = portfolio.get_position(instrument)?.clone();
    let closing = quantity.min(pos.quantity);
    if closing == 0 {
        return None;
    }

    let exit_price = exit_fill_price(pos.side, fill.market_price, risk.slippage_rate);
    let qty = closing as f64;
    let exit_value = qty * exit_price;
    let exit_commission = calculate_commission(exit_value, risk.commission_rate);
    let entry_commission = pos.entry_commission * qty / pos.quantity as f64;

    let price_pnl = pos.side.direction() * qty * (exit_price - pos.entry_price);
    let pnl = price_pnl - entry_commission - exit_commission;

    match pos.side {
        Side::Long => portfolio.cash += exit_value - exit_commission,
        // escrowed notional comes back adjusted by the price move
        Side::Short => portfolio.cash += qty * pos.entry_price + price_pnl - exit_commission,
    }

    if closing == pos.quantity {
        portfolio.remove_position(instrument);
    } else if let Some(open) = portfolio.get_position_mut(instrument) {
        open.quantity -= closing;
        open.entry_commission -= entry_commission;
    }

    portfolio.record_trade(ClosedTrade {
        instrument: instrument.to_string(),
        side: pos.side,
        quantity: closing,
        entry_price: pos.entry_price,
        exit_price,
        entry_date: pos.entry_date,
        exit_date: fill.date,
        holding_periods: fill.period.saturating_sub(pos.entry_period),
        commission: entry_commission + exit_commission,
        pnl,
        reason,
    });

    Some(ExitResult {
        instrument: instrument.to_string(),
        side: pos.side,
        quantity: closing,
        exit_price,
        exit_value,
        exit_commission,
        pnl,
        reason,
    })
}

/// Stop-loss / take-profit sweep over the positions priced this period.
///
/// Triggered instruments are collected first, then exited in instrument
/// order. Stop-loss wins when both thresholds are crossed.
pub fn check_exits(
    portfolio: &mut PortfolioState,
    prices: &BTreeMap<String, f64>,
    date: NaiveDate,
    period: usize,
    risk: &RiskParams,
) -> Vec<ExitResult> {
    let triggered: Vec<(String, f64, ExitReason)> = portfolio
        .positions
        .values()
        .filter_map(|pos| {
            let price = *prices.get(&pos.instrument)?;
            if pos.should_stop_loss(price, risk.stop_loss_pct) {
                Some((pos.instrument.clone(), price, ExitReason::StopLoss))
            } else if pos.should_take_profit(price, risk.take_profit_pct) {
                Some((pos.instrument.clone(), price, ExitReason::TakeProfit))
            } else {
                None
            }
        })
        .collect();

    triggered
        .into_iter()
        .filter_map(|(instrument, market_price, reason)| {
            let fill = FillContext {
                market_price,
                date,
                period,
            };
            exit_position(portfolio, &instrument, fill, reason, risk)
        })
        .collect()
}
