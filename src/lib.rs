//! equisim: trading-signal generation and portfolio simulation engine.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].
//!
//! The pipeline runs indicators -> factor scoring -> decision ladder ->
//! position sizing -> portfolio simulation -> performance metrics.
//! [`run_simulation`] drives all of it; [`score_signal`] is the standalone
//! scoring entry point.

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;

pub use domain::scoring::score_signal;
pub use domain::simulator::{CancelFlag, MarketData, Simulator, run_simulation, score_instrument};
