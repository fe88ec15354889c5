//! Controller resolution: which controllers rules are generated for.
//!
//! Two views of the same inputs. `resolve` is what rule generation uses: a
//! single `ControllerSelection`. `controller_triple` reports the requested,
//! supported and effective sets separately.

use std::collections::BTreeSet;

use serde::Serialize;

use podgen_contracts::controller::{ControllerKind, ControllerSelection};

use crate::analyze::Eligibility;

/// Merge the analyzer's verdict with the autogen annotation.
///
/// `annotation` is the trimmed annotation value, `None` when the annotation is
/// absent or blank. Without an annotation the supported set is used as is.
pub fn resolve(eligibility: &Eligibility, annotation: Option<&str>) -> ControllerSelection {
    if !eligibility.applicable {
        return ControllerSelection::None;
    }
    match annotation {
        None => eligibility.controllers.clone(),
        Some(value) => ControllerSelection::parse(value),
    }
}

/// Requested, supported and effective controllers of a policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControllerTriple {
    /// What the annotation asks for. `None` without an annotation; empty
    /// for `none`.
    pub requested: Option<BTreeSet<ControllerKind>>,
    /// What the policy allows. `None` when it is not eligible.
    pub supported: Option<BTreeSet<ControllerKind>>,
    /// The controllers rules are generated for.
    pub effective: BTreeSet<ControllerKind>,
}

/// Kinds named by an annotation value.
///
/// A `none` token yields the empty set. `all` and unknown tokens name
/// nothing.
pub fn requested_controllers(annotation: Option<&str>) -> Option<BTreeSet<ControllerKind>> {
    let value = annotation?;
    let tokens: Vec<&str> = value.split(',').map(str::trim).collect();
    if tokens.contains(&"none") {
        return Some(BTreeSet::new());
    }
    Some(tokens.iter().filter_map(|token| token.parse().ok()).collect())
}

/// Build the requested / supported / effective view.
pub fn controller_triple(eligibility: &Eligibility, annotation: Option<&str>) -> ControllerTriple {
    let supported = eligibility
        .applicable
        .then(|| eligibility.controllers.kinds());
    let requested = requested_controllers(annotation);
    let effective = match (&requested, &supported) {
        (None, Some(supported)) => supported.clone(),
        (Some(requested), Some(supported)) => {
            requested.intersection(supported).copied().collect()
        }
        (_, None) => BTreeSet::new(),
    };
    ControllerTriple {
        requested,
        supported,
        effective,
    }
}

#[cfg(test)]
mod tests {
    use podgen_contracts::diagnostic::Ineligibility;

    use super::*;

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn eligible() -> Eligibility {
        Eligibility {
            applicable: true,
            controllers: ControllerSelection::Kinds(ControllerKind::all()),
            reason: None,
        }
    }

    fn ineligible() -> Eligibility {
        Eligibility {
            applicable: false,
            controllers: ControllerSelection::Kinds(BTreeSet::new()),
            reason: Some(Ineligibility::NoPodKinds),
        }
    }

    fn kinds(list: &[ControllerKind]) -> BTreeSet<ControllerKind> {
        list.iter().copied().collect()
    }

    // ── resolve ──────────────────────────────────────────────────────────────

    #[test]
    fn ineligible_policy_resolves_to_none() {
        assert!(resolve(&ineligible(), Some("Deployment")).is_none());
        assert!(resolve(&ineligible(), None).is_none());
    }

    #[test]
    fn no_annotation_uses_supported_set() {
        let selection = resolve(&eligible(), None);
        assert_eq!(selection.pod_template_kinds().len(), 6);
        assert!(selection.includes_cronjob());
    }

    #[test]
    fn annotation_restricts_selection() {
        let selection = resolve(&eligible(), Some("Deployment,Job,StatefulSet"));
        assert_eq!(
            selection.pod_template_kinds(),
            vec![
                ControllerKind::Deployment,
                ControllerKind::Job,
                ControllerKind::StatefulSet
            ]
        );
        assert!(!selection.includes_cronjob());
    }

    #[test]
    fn none_annotation_disables_generation() {
        assert!(resolve(&eligible(), Some("none")).is_none());
    }

    // ── controller_triple ────────────────────────────────────────────────────

    #[test]
    fn triple_without_annotation() {
        let triple = controller_triple(&eligible(), None);
        assert_eq!(triple.requested, None);
        assert_eq!(triple.supported, Some(ControllerKind::all()));
        assert_eq!(triple.effective, ControllerKind::all());
    }

    #[test]
    fn triple_intersects_requested_with_supported() {
        let triple = controller_triple(&eligible(), Some("Deployment,all,Foo,CronJob"));
        assert_eq!(
            triple.requested,
            Some(kinds(&[ControllerKind::Deployment, ControllerKind::CronJob]))
        );
        assert_eq!(
            triple.effective,
            kinds(&[ControllerKind::Deployment, ControllerKind::CronJob])
        );
    }

    #[test]
    fn triple_none_request_is_empty_not_absent() {
        let triple = controller_triple(&eligible(), Some("none"));
        assert_eq!(triple.requested, Some(BTreeSet::new()));
        assert!(triple.effective.is_empty());
    }

    #[test]
    fn triple_for_ineligible_policy() {
        let triple = controller_triple(&ineligible(), Some("Deployment"));
        assert_eq!(triple.supported, None);
        assert!(triple.effective.is_empty());
    }
}
