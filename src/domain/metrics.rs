//! Performance aggregation over the per-period trace.

use serde::{Deserialize, Serialize};

use super::position::ClosedTrade;
use super::result::PeriodSummary;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_pnl: f64,
    /// Total P&L as a fraction of the initial capital.
    pub total_return: f64,
    /// Fraction of periods with a positive return.
    pub period_win_rate: f64,
    pub best_period_return: f64,
    pub worst_period_return: f64,
    /// Mean over population stdev of period returns, not annualised.
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub trade_win_rate: f64,
    /// Gross wins over gross losses; `None` when nothing was lost.
    pub profit_factor: Option<f64>,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_holding_periods: f64,
}

impl PerformanceMetrics {
    pub fn compute(
        initial_capital: f64,
        periods: &[PeriodSummary],
        trades: &[ClosedTrade],
    ) -> Self {
        let final_equity = periods.last().map_or(initial_capital, |p| p.equity);
        let total_pnl = final_equity - initial_capital;
        let total_return = if initial_capital > 0.0 {
            total_pnl / initial_capital
        } else {
            0.0
        };

        let returns: Vec<f64> = periods.iter().map(|p| p.period_return).collect();
        let period_win_rate = if returns.is_empty() {
            0.0
        } else {
            returns.iter().filter(|&&r| r > 0.0).count() as f64 / returns.len() as f64
        };
        let best_period_return = returns.iter().copied().reduce(f64::max).unwrap_or(0.0);
        let worst_period_return = returns.iter().copied().reduce(f64::min).unwrap_or(0.0);

        let equity: Vec<f64> = periods.iter().map(|p| p.equity).collect();
        let (max_drawdown, max_drawdown_duration) = compute_drawdown(initial_capital, &equity);

        let mut metrics = PerformanceMetrics {
            total_pnl,
            total_return,
            period_win_rate,
            best_period_return,
            worst_period_return,
            sharpe_ratio: compute_sharpe(&returns),
            max_drawdown,
            max_drawdown_duration,
            ..PerformanceMetrics::default()
        };
        metrics.add_trade_stats(trades);
        metrics
    }

    fn add_trade_stats(&mut self, trades: &[ClosedTrade]) {
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut total_holding = 0usize;

        for trade in trades {
            let pnl = trade.pnl;
            if pnl > 0.0 {
                self.trades_won += 1;
                total_wins += pnl;
                self.largest_win = self.largest_win.max(pnl);
            } else if pnl < 0.0 {
                self.trades_lost += 1;
                total_losses += pnl.abs();
                self.largest_loss = self.largest_loss.max(pnl.abs());
            } else {
                self.trades_breakeven += 1;
            }
            total_holding += trade.holding_periods;
        }

        let total_trades = trades.len();
        if total_trades > 0 {
            self.trade_win_rate = self.trades_won as f64 / total_trades as f64;
            self.avg_holding_periods = total_holding as f64 / total_trades as f64;
        }
        self.profit_factor = if total_losses > 0.0 {
            Some(total_wins / total_losses)
        } else if total_wins > 0.0 {
            None
        } else {
            Some(0.0)
        };
        if self.trades_won > 0 {
            self.avg_win = total_wins / self.trades_won as f64;
        }
        if self.trades_lost > 0 {
            self.avg_loss = total_losses / self.trades_lost as f64;
        }
    }
}

/// Largest peak-to-trough decline as a fraction of the peak, and the longest
/// run of periods spent below a peak. The initial capital is the first peak.
pub fn compute_drawdown(initial_capital: f64, equity: &[f64]) -> (f64, usize) {
    let mut peak = initial_capital;
    let mut max_dd = 0.0_f64;
    let mut max_duration = 0usize;
    let mut current_duration = 0usize;

    for &value in equity {
        if value >= peak {
            peak = value;
            current_duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - value) / peak);
            current_duration += 1;
            max_duration = max_duration.max(current_duration);
        }
    }

    (max_dd, max_duration)
}

pub fn compute_sharpe(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    if stddev > 0.0 { mean / stddev } else { 0.0 }
}
