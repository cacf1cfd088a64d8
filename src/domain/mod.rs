//! Core domain types and logic.

pub mod bar;
pub mod indicator;
pub mod snapshot;
pub mod signal;
pub mod scoring;
pub mod decision;
pub mod sizing;
pub mod position;
pub mod portfolio;
pub mod execution;
pub mod strategy;
pub mod diagnostics;
pub mod metrics;
pub mod result;
pub mod simulator;
pub mod config;
pub mod config_validation;
pub mod error;
