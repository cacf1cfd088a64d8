//! Position sizer.
//!
//! budget   = equity × risk_per_trade × ladder multiplier × diversification
//! quantity = floor(budget × fundamental adj × sentiment adj / price)
//!
//! then capped by the max-position fraction of equity and by the cash that is
//! left after commission. Zero is a valid answer.

use serde::{Deserialize, Serialize};

use crate::domain::config::RiskParams;
use crate::domain::error::EquisimError;
use crate::domain::position::Side;

/// Signals at least `min_strength` strong scale the budget by `multiplier`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrengthStep {
    pub min_strength: f64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingParams {
    /// Strictly increasing breakpoints, non-decreasing multipliers.
    pub ladder: Vec<StrengthStep>,
    pub fundamental_sensitivity: f64,
    pub fundamental_min: f64,
    pub fundamental_max: f64,
    pub sentiment_sensitivity: f64,
    pub sentiment_min: f64,
    pub sentiment_max: f64,
}

impl Default for SizingParams {
    fn default() -> Self {
        SizingParams {
            ladder: vec![
                StrengthStep {
                    min_strength: 0.3,
                    multiplier: 0.5,
                },
                StrengthStep {
                    min_strength: 0.7,
                    multiplier: 1.0,
                },
                StrengthStep {
                    min_strength: 1.2,
                    multiplier: 1.5,
                },
            ],
            fundamental_sensitivity: 0.25,
            fundamental_min: 0.5,
            fundamental_max: 2.0,
            sentiment_sensitivity: 0.125,
            sentiment_min: 0.8,
            sentiment_max: 1.5,
        }
    }
}

impl SizingParams {
    /// Multiplier of the highest step reached; 0 below the first step.
    pub fn multiplier(&self, strength: f64) -> f64 {
        self.ladder
            .iter()
            .take_while(|step| strength >= step.min_strength)
            .last()
            .map_or(0.0, |step| step.multiplier)
    }

    pub fn validate(&self) -> Result<(), EquisimError> {
        if self.ladder.is_empty() {
            return Err(EquisimError::invalid_config(
                "sizing.ladder",
                "at least one step is required",
            ));
        }
        for step in &self.ladder {
            if !(step.min_strength.is_finite() && step.min_strength >= 0.0) {
                return Err(EquisimError::invalid_config(
                    "sizing.ladder",
                    "breakpoints must be non-negative",
                ));
            }
            if !(step.multiplier.is_finite() && step.multiplier >= 0.0) {
                return Err(EquisimError::invalid_config(
                    "sizing.ladder",
                    "multipliers must be non-negative",
                ));
            }
        }
        for pair in self.ladder.windows(2) {
            if pair[1].min_strength <= pair[0].min_strength {
                return Err(EquisimError::invalid_config(
                    "sizing.ladder",
                    "breakpoints must be strictly increasing",
                ));
            }
            if pair[1].multiplier < pair[0].multiplier {
                return Err(EquisimError::invalid_config(
                    "sizing.ladder",
                    "multipliers must be non-decreasing",
                ));
            }
        }
        validate_bounds(
            "sizing.fundamental",
            self.fundamental_sensitivity,
            self.fundamental_min,
            self.fundamental_max,
        )?;
        validate_bounds(
            "sizing.sentiment",
            self.sentiment_sensitivity,
            self.sentiment_min,
            self.sentiment_max,
        )
    }
}

fn validate_bounds(key: &str, sensitivity: f64, min: f64, max: f64) -> Result<(), EquisimError> {
    if !(sensitivity.is_finite() && sensitivity >= 0.0) {
        return Err(EquisimError::invalid_config(
            key,
            "sensitivity must be non-negative",
        ));
    }
    if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max) {
        return Err(EquisimError::invalid_config(
            key,
            "bounds must satisfy 0 < min <= max",
        ));
    }
    Ok(())
}

/// Inputs of one sizing decision.
#[derive(Debug, Clone, PartialEq)]
pub struct SizingRequest {
    pub equity: f64,
    pub cash: f64,
    /// Expected fill price per unit.
    pub price: f64,
    /// |aggregate score|
    pub strength: f64,
    pub side: Side,
    pub fundamental: f64,
    pub sentiment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSize {
    pub quantity: u64,
    pub multiplier: f64,
    pub budget: f64,
    pub fundamental_adjustment: f64,
    pub sentiment_adjustment: f64,
}

impl PositionSize {
    fn zero() -> Self {
        PositionSize {
            quantity: 0,
            multiplier: 0.0,
            budget: 0.0,
            fundamental_adjustment: 1.0,
            sentiment_adjustment: 1.0,
        }
    }
}

pub fn size_position(req: &SizingRequest, risk: &RiskParams, params: &SizingParams) -> PositionSize {
    if !(req.price.is_finite() && req.price > 0.0 && req.equity > 0.0 && req.cash > 0.0) {
        return PositionSize::zero();
    }

    let direction = req.side.direction();
    let multiplier = params.multiplier(req.strength);
    let budget = req.equity * risk.risk_per_trade * multiplier * risk.diversification;

    let fundamental_adjustment = (1.0 + direction * req.fundamental * params.fundamental_sensitivity)
        .clamp(params.fundamental_min, params.fundamental_max);
    let sentiment_adjustment = (1.0 + direction * req.sentiment * params.sentiment_sensitivity)
        .clamp(params.sentiment_min, params.sentiment_max);

    let raw = (budget * fundamental_adjustment * sentiment_adjustment / req.price).floor();
    let position_cap = (risk.max_position_size * req.equity / req.price).floor();
    let cash_cap = (req.cash / (req.price * (1.0 + risk.commission_rate))).floor();

    let quantity = raw.min(position_cap).min(cash_cap).max(0.0) as u64;

    PositionSize {
        quantity,
        multiplier,
        budget,
        fundamental_adjustment,
        sentiment_adjustment,
    }
}
