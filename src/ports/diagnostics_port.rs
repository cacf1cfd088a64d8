//! Diagnostics sink port.

use crate::domain::diagnostics::Diagnostic;

/// Receives every non-fatal condition as the simulator records it.
pub trait DiagnosticsSink {
    fn record(&self, diagnostic: &Diagnostic);
}
