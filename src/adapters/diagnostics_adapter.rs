//! Diagnostics sinks.

use std::sync::Mutex;

use tracing::warn;

use crate::domain::diagnostics::Diagnostic;
use crate::ports::diagnostics_port::DiagnosticsSink;

/// Logs every diagnostic at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, diagnostic: &Diagnostic) {
        warn!(
            date = %diagnostic.date,
            instrument = %diagnostic.instrument,
            kind = %diagnostic.kind,
            "{}",
            diagnostic.message
        );
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    seen: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self.seen.lock() {
            Ok(seen) => seen.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DiagnosticsSink for CollectingSink {
    fn record(&self, diagnostic: &Diagnostic) {
        match self.seen.lock() {
            Ok(mut seen) => seen.push(diagnostic.clone()),
            Err(poisoned) => poisoned.into_inner().push(diagnostic.clone()),
        }
    }
}
