//! Portfolio strategy variants driven by the same simulator.

use serde::{Deserialize, Serialize};

use crate::domain::config::RiskParams;
use crate::domain::decision::DecisionThresholds;
use crate::domain::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyMode {
    /// Flat -> long | short -> flat. Positions are opened on buy or sell
    /// family signals and closed by stop-loss, take-profit or the end of the
    /// run.
    #[default]
    SignalTriggered,
    /// Every `interval` periods the signal is turned into a target weight and
    /// positions are resized when they drift further than `drift_tolerance`
    /// (absolute weight) from it.
    TargetWeightRebalance { interval: usize, drift_tolerance: f64 },
}

impl StrategyMode {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyMode::SignalTriggered => "signal",
            StrategyMode::TargetWeightRebalance { .. } => "rebalance",
        }
    }

    /// Whether period `period` (0-based) is a rebalance period.
    pub fn rebalances_at(&self, period: usize) -> bool {
        match self {
            StrategyMode::SignalTriggered => false,
            StrategyMode::TargetWeightRebalance { interval, .. } => {
                *interval > 0 && period % interval == 0
            }
        }
    }
}

/// Signed portfolio weight a signal asks for. `None` means keep the current
/// weight.
///
/// Buy-family signals scale `max_position_size` by how far the score is
/// towards the very-strong-buy threshold; sell-family signals mirror that on
/// the short side, or go flat when shorting is disabled.
pub fn target_weight(
    signal: &Signal,
    thresholds: &DecisionThresholds,
    risk: &RiskParams,
) -> Option<f64> {
    if signal.action.is_buy() {
        let scale = (signal.score / thresholds.very_strong_buy).clamp(0.0, 1.0);
        Some(risk.max_position_size * scale)
    } else if signal.action.is_sell() {
        if !risk.allow_shorting {
            return Some(0.0);
        }
        let scale = (signal.score / thresholds.very_strong_sell).clamp(0.0, 1.0);
        Some(-risk.max_position_size * scale)
    } else {
        None
    }
}
