//! Trading signal: a discrete action, the aggregate score behind it and the
//! evidence trail that produced the score.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Decision ladder, declared in rank order so `Ord` follows sell -> buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Action {
    VeryStrongSell,
    StrongSell,
    Sell,
    Hold,
    Buy,
    StrongBuy,
    VeryStrongBuy,
}

impl Action {
    pub fn rank(self) -> i8 {
        self as i8 - 3
    }

    pub fn is_buy(self) -> bool {
        self > Action::Hold
    }

    pub fn is_sell(self) -> bool {
        self < Action::Hold
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::VeryStrongSell => "VERY_STRONG_SELL",
            Action::StrongSell => "STRONG_SELL",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
            Action::Buy => "BUY",
            Action::StrongBuy => "STRONG_BUY",
            Action::VeryStrongBuy => "VERY_STRONG_BUY",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Factor {
    Technical,
    Fundamental,
    Sentiment,
}

/// One fired scoring rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub factor: Factor,
    pub tag: String,
    pub contribution: f64,
}

impl Evidence {
    pub fn new(factor: Factor, tag: &str, contribution: f64) -> Self {
        Evidence {
            factor,
            tag: tag.to_string(),
            contribution,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub instrument: String,
    pub action: Action,
    /// Weighted aggregate of the three sub-scores.
    pub score: f64,
    pub technical: f64,
    pub fundamental: f64,
    pub sentiment: f64,
    /// In firing order: technical, then fundamental, then sentiment.
    pub evidence: Vec<Evidence>,
    /// Some indicator was computed on a clipped window.
    pub reduced_confidence: bool,
}

impl Signal {
    pub fn strength(&self) -> f64 {
        self.score.abs()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.evidence.iter().any(|e| e.tag == tag)
    }
}
