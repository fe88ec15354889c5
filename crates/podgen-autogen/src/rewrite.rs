//! Expression path rewriting for derived rules.
//!
//! A Pod rule refers to the admitted object as `request.object.spec` (or
//! `object.spec` in CEL). Once the rule targets a controller, the same data
//! lives under the pod template, so every such literal in the serialized rule
//! is moved below `spec.template` (or `spec.jobTemplate.spec.template`).
//!
//! The scan is a single left-to-right pass. At each position a literal that is
//! already in target form is copied as is, otherwise a source literal is
//! replaced by its target. Rewriting a rewritten document is therefore a no-op.

use podgen_contracts::controller::TargetGroup;

type PathTable = [(&'static str, &'static str); 4];

const POD_PATHS: PathTable = [
    ("request.object.spec", "request.object.spec.template.spec"),
    ("request.oldObject.spec", "request.oldObject.spec.template.spec"),
    ("request.object.metadata", "request.object.spec.template.metadata"),
    ("request.oldObject.metadata", "request.oldObject.spec.template.metadata"),
];

const POD_CEL_PATHS: PathTable = [
    ("object.spec", "object.spec.template.spec"),
    ("oldObject.spec", "oldObject.spec.template.spec"),
    ("object.metadata", "object.spec.template.metadata"),
    ("oldObject.metadata", "oldObject.spec.template.metadata"),
];

const CRONJOB_PATHS: PathTable = [
    (
        "request.object.spec",
        "request.object.spec.jobTemplate.spec.template.spec",
    ),
    (
        "request.oldObject.spec",
        "request.oldObject.spec.jobTemplate.spec.template.spec",
    ),
    (
        "request.object.metadata",
        "request.object.spec.jobTemplate.spec.template.metadata",
    ),
    (
        "request.oldObject.metadata",
        "request.oldObject.spec.jobTemplate.spec.template.metadata",
    ),
];

const CRONJOB_CEL_PATHS: PathTable = [
    ("object.spec", "object.spec.jobTemplate.spec.template.spec"),
    ("oldObject.spec", "oldObject.spec.jobTemplate.spec.template.spec"),
    ("object.metadata", "object.spec.jobTemplate.spec.template.metadata"),
    (
        "oldObject.metadata",
        "oldObject.spec.jobTemplate.spec.template.metadata",
    ),
];

fn table(group: TargetGroup, cel: bool) -> &'static PathTable {
    match (group, cel) {
        (TargetGroup::PodControllers, false) => &POD_PATHS,
        (TargetGroup::PodControllers, true) => &POD_CEL_PATHS,
        (TargetGroup::CronJob, false) => &CRONJOB_PATHS,
        (TargetGroup::CronJob, true) => &CRONJOB_CEL_PATHS,
    }
}

/// Rewrite every object path literal in `document` for `group`.
///
/// `cel` selects the CEL dialect (no `request.` prefix). It should be set when
/// the rule carries a CEL validation.
pub fn rewrite_paths(document: &str, group: TargetGroup, cel: bool) -> String {
    let table = table(group, cel);
    let mut out = String::with_capacity(document.len());
    let mut rest = document;

    'scan: while !rest.is_empty() {
        for (_, target) in table {
            if let Some(tail) = rest.strip_prefix(target) {
                out.push_str(target);
                rest = tail;
                continue 'scan;
            }
        }
        for (source, target) in table {
            if let Some(tail) = rest.strip_prefix(source) {
                out.push_str(target);
                rest = tail;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}
