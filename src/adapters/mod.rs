//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod diagnostics_adapter;
pub mod file_config_adapter;
pub mod memory_adapter;
