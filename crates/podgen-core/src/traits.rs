//! Collaborator traits for the autogeneration pipeline.
//!
//! - `PolicyObject`: read access to a policy's spec and annotations
//! - `ReferenceShifter`: rewrites `$(...)` references in validation messages
//! - `DiagnosticSink`: receives diagnostics from every stage
//!
//! The engine never reaches for global state: every stage that can report
//! something takes a `&mut dyn DiagnosticSink`.

use std::collections::BTreeMap;
use std::fmt;

use podgen_contracts::{
    diagnostic::Diagnostic,
    policy::{Policy, PolicySpec, ANNOTATION_AUTOGEN_CONTROLLERS},
};

/// Anything autogeneration can read rules and annotations from.
pub trait PolicyObject: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// The policy spec holding the rule list.
    fn spec(&self) -> &PolicySpec;

    /// Metadata annotations.
    fn annotations(&self) -> &BTreeMap<String, String>;

    /// The autogen controllers annotation, trimmed. Absent and blank values
    /// both read as `None`.
    fn autogen_annotation(&self) -> Option<&str> {
        self.annotations()
            .get(ANNOTATION_AUTOGEN_CONTROLLERS)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

impl PolicyObject for Policy {
    fn name(&self) -> &str {
        &self.metadata.name
    }

    fn spec(&self) -> &PolicySpec {
        &self.spec
    }

    fn annotations(&self) -> &BTreeMap<String, String> {
        &self.metadata.annotations
    }
}

/// The validation sub-tree a message's references point into.
///
/// The pivot is the path segment after which the controller path shift is
/// inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftMode {
    Pattern,
    Deny,
    PodSecurity,
    AnyPattern,
}

impl ShiftMode {
    /// The path segment references are anchored on.
    pub fn pivot(&self) -> &'static str {
        match self {
            ShiftMode::Pattern => "pattern",
            ShiftMode::Deny => "deny",
            ShiftMode::PodSecurity => "podSecurity",
            ShiftMode::AnyPattern => "anyPattern",
        }
    }
}

impl fmt::Display for ShiftMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pivot())
    }
}

/// Rewrites the `$(...)` references of a validation message so they keep
/// pointing at the same node once the rule body is nested under a controller
/// path.
///
/// Implementations must be pure: the same inputs always give the same message.
pub trait ReferenceShifter: Send + Sync {
    /// Return `message` with every reference under `mode`'s pivot moved below
    /// `shift`. References that cannot be shifted are left as they are and
    /// reported to `sink`.
    fn shift(
        &self,
        message: &str,
        shift: &str,
        mode: ShiftMode,
        sink: &mut dyn DiagnosticSink,
    ) -> String;
}

/// Receives diagnostics. Never fails; a sink that cannot record an event
/// drops it.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}
