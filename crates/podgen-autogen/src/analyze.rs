//! Policy eligibility analysis.
//!
//! A policy is eligible for autogeneration when every rule can be expressed
//! against a pod template and at least one rule selects Pod or a pod
//! controller.
//!
//! Per rule, in declaration order:
//!
//! 1. A generate action or a JSON patch mutation → not eligible, selection
//!    `None`.
//! 2. Every resource description of the match block, then of the exclude
//!    block, is checked. A description that selects by name, names, label
//!    selector or annotations, or mixes Pod with other kinds → not eligible,
//!    empty selection.
//! 3. Descriptions that name Pod or a controller kind mark the policy as
//!    needing autogeneration.
//!
//! If nothing was marked → not eligible, empty selection. Otherwise eligible
//! for every controller kind.

use tracing::debug;

use podgen_contracts::{
    controller::{ControllerKind, ControllerSelection},
    diagnostic::{FilterBlock, Ineligibility},
    kind::contains_kind,
    rule::{MatchResources, ResourceDescription, Rule},
};

/// Outcome of `analyze`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    pub applicable: bool,
    /// The supported controllers: every kind when applicable, otherwise the
    /// `None` sentinel or an empty set depending on what disqualified the
    /// policy.
    pub controllers: ControllerSelection,
    /// Why the policy is not applicable. `None` when it is.
    pub reason: Option<Ineligibility>,
}

impl Eligibility {
    fn eligible() -> Self {
        Self {
            applicable: true,
            controllers: ControllerSelection::Kinds(ControllerKind::all()),
            reason: None,
        }
    }

    fn disabled(reason: Ineligibility) -> Self {
        Self {
            applicable: false,
            controllers: ControllerSelection::None,
            reason: Some(reason),
        }
    }

    fn unsupported(reason: Ineligibility) -> Self {
        Self {
            applicable: false,
            controllers: ControllerSelection::Kinds(Default::default()),
            reason: Some(reason),
        }
    }
}

/// Decide whether autogeneration applies to `rules`.
pub fn analyze(rules: &[Rule]) -> Eligibility {
    let mut needed = false;
    for rule in rules {
        if rule.has_generate() {
            debug!(rule = %rule.name, "generate rule disables autogen");
            return Eligibility::disabled(Ineligibility::GenerateRule {
                rule: rule.name.clone(),
            });
        }
        if rule.has_json_patch() {
            debug!(rule = %rule.name, "json patch mutation disables autogen");
            return Eligibility::disabled(Ineligibility::JsonPatch {
                rule: rule.name.clone(),
            });
        }

        let mut blocks = filter_blocks(&rule.match_resources, false);
        if let Some(exclude) = &rule.exclude_resources {
            blocks.extend(filter_blocks(exclude, true));
        }
        for (block, description) in blocks {
            if !is_supported(description) {
                debug!(rule = %rule.name, block = %block, "resource filter not applicable to pod controllers");
                return Eligibility::unsupported(Ineligibility::UnsupportedFilter {
                    rule: rule.name.clone(),
                    block,
                });
            }
            needed = needed || selects_pod_or_controller(description);
        }
    }

    if !needed {
        return Eligibility::unsupported(Ineligibility::NoPodKinds);
    }
    Eligibility::eligible()
}

/// The resource descriptions of a match or exclude block, in scan order.
fn filter_blocks(
    resources: &MatchResources,
    exclude: bool,
) -> Vec<(FilterBlock, &ResourceDescription)> {
    let (flat, any, all) = if exclude {
        (
            FilterBlock::ExcludeResources,
            FilterBlock::ExcludeAny,
            FilterBlock::ExcludeAll,
        )
    } else {
        (
            FilterBlock::MatchResources,
            FilterBlock::MatchAny,
            FilterBlock::MatchAll,
        )
    };

    let mut blocks = vec![(flat, &resources.resources)];
    blocks.extend(resources.any.iter().map(|filter| (any, &filter.resources)));
    blocks.extend(resources.all.iter().map(|filter| (all, &filter.resources)));
    blocks
}

fn is_supported(description: &ResourceDescription) -> bool {
    description.name.is_empty()
        && description.names.is_empty()
        && description.selector.is_none()
        && description.annotations.is_none()
        && !mixes_pod_with_other_kinds(&description.kinds)
}

fn mixes_pod_with_other_kinds(kinds: &[String]) -> bool {
    kinds.len() > 1 && contains_kind(kinds, "Pod")
}

/// Exact match only: `v1/Pod` or `apps/v1/Deployment` do not count.
fn selects_pod_or_controller(description: &ResourceDescription) -> bool {
    description
        .kinds
        .iter()
        .any(|kind| kind == "Pod" || kind.parse::<ControllerKind>().is_ok())
}
