//! Decision engine: a stateless threshold ladder from aggregate score to
//! [`Action`].

use serde::{Deserialize, Serialize};

use crate::domain::error::EquisimError;
use crate::domain::signal::Action;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionThresholds {
    pub very_strong_sell: f64,
    pub strong_sell: f64,
    pub sell: f64,
    pub buy: f64,
    pub strong_buy: f64,
    pub very_strong_buy: f64,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        DecisionThresholds {
            very_strong_sell: -1.2,
            strong_sell: -0.7,
            sell: -0.3,
            buy: 0.3,
            strong_buy: 0.7,
            very_strong_buy: 1.2,
        }
    }
}

impl DecisionThresholds {
    /// The ladder must be finite and strictly increasing from very strong
    /// sell to very strong buy.
    pub fn validate(&self) -> Result<(), EquisimError> {
        let ladder = [
            ("thresholds.very_strong_sell", self.very_strong_sell),
            ("thresholds.strong_sell", self.strong_sell),
            ("thresholds.sell", self.sell),
            ("thresholds.buy", self.buy),
            ("thresholds.strong_buy", self.strong_buy),
            ("thresholds.very_strong_buy", self.very_strong_buy),
        ];
        for (key, value) in ladder {
            if !value.is_finite() {
                return Err(EquisimError::invalid_config(key, "must be finite"));
            }
        }
        for pair in ladder.windows(2) {
            let (lower_key, lower) = pair[0];
            let (key, value) = pair[1];
            if value <= lower {
                return Err(EquisimError::invalid_config(
                    key,
                    format!("must be greater than {} ({})", lower_key, lower),
                ));
            }
        }
        Ok(())
    }
}

/// Maps a score onto the ladder. A boundary value belongs to the tier it
/// reaches; NaN maps to Hold.
pub fn decide(score: f64, thresholds: &DecisionThresholds) -> Action {
    if score.is_nan() {
        return Action::Hold;
    }
    if score >= thresholds.very_strong_buy {
        Action::VeryStrongBuy
    } else if score >= thresholds.strong_buy {
        Action::StrongBuy
    } else if score >= thresholds.buy {
        Action::Buy
    } else if score <= thresholds.very_strong_sell {
        Action::VeryStrongSell
    } else if score <= thresholds.strong_sell {
        Action::StrongSell
    } else if score <= thresholds.sell {
        Action::Sell
    } else {
        Action::Hold
    }
}
