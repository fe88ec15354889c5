//! Stock `DiagnosticSink` implementations.

use tracing::{debug, warn};

use podgen_contracts::diagnostic::Diagnostic;

use crate::traits::DiagnosticSink;

/// Forwards diagnostics to `tracing`.
///
/// Expected outcomes (an ineligible policy, a rule without an action body) are
/// logged at `debug`; lost output (a conversion failure, an unshifted
/// reference, a malformed anyPattern) at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::Ineligible { policy, reason } => {
                debug!(policy = %policy, reason = %reason, "policy not eligible for autogen");
            }
            Diagnostic::RuleSkipped {
                rule,
                target,
                reason,
            } => {
                debug!(rule = %rule, target = %target, reason = %reason, "no rule generated");
            }
            Diagnostic::ConversionFailed {
                rule,
                target,
                reason,
            } => {
                warn!(rule = %rule, target = %target, reason = %reason, "failed to convert generated rule");
            }
            Diagnostic::ReferenceNotShifted { reference, pivot } => {
                warn!(reference = %reference, pivot = %pivot, "message reference not shifted");
            }
            Diagnostic::AnyPatternNotArray { rule } => {
                warn!(rule = %rule, "anyPattern is not an array");
            }
        }
    }
}

/// Collects diagnostics in order.
impl DiagnosticSink for Vec<Diagnostic> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Discards every diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&mut self, _diagnostic: Diagnostic) {}
}
