//! Diagnostics emitted while generating controller rules.
//!
//! None of these stop a computation. They describe why a policy or rule was
//! left alone, or which part of a derived rule could not be produced.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::controller::TargetGroup;

/// Which resource filter block disqualified a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterBlock {
    MatchResources,
    MatchAny,
    MatchAll,
    ExcludeResources,
    ExcludeAny,
    ExcludeAll,
}

impl fmt::Display for FilterBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FilterBlock::MatchResources => "match.resources",
            FilterBlock::MatchAny => "match.any",
            FilterBlock::MatchAll => "match.all",
            FilterBlock::ExcludeResources => "exclude.resources",
            FilterBlock::ExcludeAny => "exclude.any",
            FilterBlock::ExcludeAll => "exclude.all",
        };
        f.write_str(s)
    }
}

/// Why a policy is not eligible for autogeneration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ineligibility {
    /// A rule generates resources.
    GenerateRule { rule: String },
    /// A rule mutates with JSON patch syntax.
    JsonPatch { rule: String },
    /// A filter selects by name, selector or annotations, or mixes Pod with
    /// other kinds.
    UnsupportedFilter { rule: String, block: FilterBlock },
    /// No rule selects Pod or a pod controller.
    NoPodKinds,
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ineligibility::GenerateRule { rule } => {
                write!(f, "rule '{rule}' has a generate action")
            }
            Ineligibility::JsonPatch { rule } => {
                write!(f, "rule '{rule}' mutates with patchesJson6902")
            }
            Ineligibility::UnsupportedFilter { rule, block } => {
                write!(f, "rule '{rule}' has an unsupported filter in {block}")
            }
            Ineligibility::NoPodKinds => f.write_str("no rule selects Pod or a pod controller"),
        }
    }
}

/// One diagnostic event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The policy is not eligible; its rules are returned unchanged.
    Ineligible { policy: String, reason: Ineligibility },

    /// A rule produced no derived rule for a target group.
    RuleSkipped {
        rule: String,
        target: TargetGroup,
        reason: String,
    },

    /// A derived rule could not be re-marshalled and was dropped.
    ConversionFailed {
        rule: String,
        target: TargetGroup,
        reason: String,
    },

    /// A `$(...)` message reference does not contain the expected pivot.
    ReferenceNotShifted { reference: String, pivot: String },

    /// `validate.anyPattern` is not an array.
    AnyPatternNotArray { rule: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Ineligible { policy, reason } => {
                write!(f, "policy '{policy}' is not eligible for autogen: {reason}")
            }
            Diagnostic::RuleSkipped {
                rule,
                target,
                reason,
            } => write!(f, "no {target} rule generated from '{rule}': {reason}"),
            Diagnostic::ConversionFailed {
                rule,
                target,
                reason,
            } => write!(f, "failed to convert {target} rule from '{rule}': {reason}"),
            Diagnostic::ReferenceNotShifted { reference, pivot } => {
                write!(f, "reference '{reference}' does not contain '{pivot}'")
            }
            Diagnostic::AnyPatternNotArray { rule } => {
                write!(f, "anyPattern of rule '{rule}' is not an array")
            }
        }
    }
}
