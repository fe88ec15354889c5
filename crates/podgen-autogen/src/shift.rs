//! `$(...)` reference shifting for validation messages.
//!
//! A message such as `"image tag required at $(pattern/spec/containers/0)"`
//! points into the rule's pattern tree. Nesting the pattern under a controller
//! path moves that node, so the reference has to follow it:
//! `$(pattern/spec/template/spec/containers/0)`.

use std::sync::LazyLock;

use regex::Regex;

use podgen_contracts::diagnostic::Diagnostic;
use podgen_core::traits::{DiagnosticSink, ReferenceShifter, ShiftMode};

/// `$(...)` at the start of the message, or after any character but `\`.
/// The reference runs to the last `)` before the next space.
const REFERENCE_PATTERN: &str = r"^\$\(.[^ ]*\)|[^\\]\$\(.[^ ]*\)";

static REFERENCES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(REFERENCE_PATTERN).expect("reference pattern is valid"));

/// The default `ReferenceShifter`.
#[derive(Debug, Default, Clone, Copy)]
pub struct VariableReferenceShifter;

impl ReferenceShifter for VariableReferenceShifter {
    fn shift(
        &self,
        message: &str,
        shift: &str,
        mode: ShiftMode,
        sink: &mut dyn DiagnosticSink,
    ) -> String {
        let mut out = String::with_capacity(message.len());
        let mut last = 0;
        for found in REFERENCES.find_iter(message) {
            let matched = found.as_str();
            // A non-initial match carries the character before `$(`.
            let (lead, reference) = match matched.strip_prefix("$(") {
                Some(_) if found.start() == 0 => ("", matched),
                _ => {
                    let split = matched.find("$(").unwrap_or(0);
                    matched.split_at(split)
                }
            };
            out.push_str(&message[last..found.start()]);
            out.push_str(lead);
            out.push_str(&shift_reference(reference, shift, mode, sink));
            last = found.end();
        }
        out.push_str(&message[last..]);
        out
    }
}

/// Insert `shift` after the pivot segment of a single reference.
fn shift_reference(
    reference: &str,
    shift: &str,
    mode: ShiftMode,
    sink: &mut dyn DiagnosticSink,
) -> String {
    let base = mode.pivot();
    let Some(index) = reference.find(base) else {
        sink.emit(Diagnostic::ReferenceNotShifted {
            reference: reference.to_string(),
            pivot: base.to_string(),
        });
        return reference.to_string();
    };

    // anyPattern references name the alternative they point into.
    let pivot = match mode {
        ShiftMode::AnyPattern => {
            let after = &reference[index + base.len()..];
            match after
                .strip_prefix('/')
                .and_then(|tail| tail.split('/').next())
                .map(|segment| segment.trim_end_matches(')'))
                .filter(|segment| !segment.is_empty())
            {
                Some(alternative) => format!("{base}/{alternative}"),
                None => base.to_string(),
            }
        }
        _ => base.to_string(),
    };

    reference.replace(&pivot, &format!("{pivot}/{shift}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(message: &str, shift_path: &str, mode: ShiftMode) -> (String, Vec<Diagnostic>) {
        let mut sink: Vec<Diagnostic> = Vec::new();
        let out = VariableReferenceShifter.shift(message, shift_path, mode, &mut sink);
        (out, sink)
    }

    #[test]
    fn reference_pattern_compiles() {
        assert!(Regex::new(REFERENCE_PATTERN).is_ok());
        assert!(REFERENCES.is_match("$(pattern/spec)"));
        assert!(!REFERENCES.is_match(r"\$(pattern/spec)"));
    }

    #[test]
    fn initial_reference_is_shifted() {
        let (out, diags) = shift(
            "$(pattern/spec/containers/0/image) must be tagged",
            "spec/template",
            ShiftMode::Pattern,
        );
        assert_eq!(
            out,
            "$(pattern/spec/template/spec/containers/0/image) must be tagged"
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn inner_reference_keeps_leading_character() {
        let (out, _) = shift(
            "value at $(deny/conditions/0) is wrong",
            "spec/jobTemplate/spec/template",
            ShiftMode::Deny,
        );
        assert_eq!(
            out,
            "value at $(deny/spec/jobTemplate/spec/template/conditions/0) is wrong"
        );
    }

    #[test]
    fn escaped_reference_is_left_alone() {
        let message = r"literal \$(pattern/spec) here";
        let (out, diags) = shift(message, "spec/template", ShiftMode::Pattern);
        assert_eq!(out, message);
        assert!(diags.is_empty());
    }

    #[test]
    fn any_pattern_reference_keeps_alternative_index() {
        let (out, _) = shift(
            "see $(anyPattern/1/spec/containers)",
            "spec/template",
            ShiftMode::AnyPattern,
        );
        assert_eq!(out, "see $(anyPattern/1/spec/template/spec/containers)");
    }

    #[test]
    fn each_reference_uses_its_own_alternative() {
        let (out, _) = shift(
            "$(anyPattern/0/a) or $(anyPattern/1/b)",
            "spec/template",
            ShiftMode::AnyPattern,
        );
        assert_eq!(
            out,
            "$(anyPattern/0/spec/template/a) or $(anyPattern/1/spec/template/b)"
        );
    }

    #[test]
    fn reference_without_pivot_is_reported() {
        let (out, diags) = shift(
            "name $(metadata/name) is invalid",
            "spec/template",
            ShiftMode::Pattern,
        );
        assert_eq!(out, "name $(metadata/name) is invalid");
        assert_eq!(
            diags,
            vec![Diagnostic::ReferenceNotShifted {
                reference: "$(metadata/name)".to_string(),
                pivot: "pattern".to_string(),
            }]
        );
    }

    #[test]
    fn message_without_references_is_unchanged() {
        let (out, diags) = shift("plain message", "spec/template", ShiftMode::Pattern);
        assert_eq!(out, "plain message");
        assert!(diags.is_empty());
    }
}
