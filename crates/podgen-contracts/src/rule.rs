//! Policy rule types.
//!
//! These mirror the wire (JSON/YAML) shape of admission policy rules. Parts the
//! engine never inspects (context entries, preconditions, patterns, image
//! verification entries) stay as `serde_json::Value`; fields the engine does not
//! model at all are kept in `extra` so a rule survives a round trip unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kind::contains_kind;

/// Name prefix that marks a rule as machine-generated.
pub const AUTOGEN_PREFIX: &str = "autogen-";

/// Name prefix of rules generated for CronJob.
pub const AUTOGEN_CRONJOB_PREFIX: &str = "autogen-cronjob-";

/// Maximum length of a generated rule name.
pub const MAX_RULE_NAME_LEN: usize = 63;

/// A single policy rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<Value>,

    #[serde(rename = "match", default, skip_serializing_if = "MatchResources::is_empty")]
    pub match_resources: MatchResources,

    #[serde(rename = "exclude", default, skip_serializing_if = "Option::is_none")]
    pub exclude_resources: Option<MatchResources>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cel_preconditions: Vec<CelPrecondition>,

    /// Legacy any/all preconditions, kept opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<Value>,

    #[serde(rename = "mutate", default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<Mutation>,

    #[serde(rename = "validate", default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,

    /// Only inspected to veto autogeneration.
    #[serde(rename = "generate", default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verify_images: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_background_requests: Option<bool>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Rule {
    /// True if the rule name carries the `autogen-` prefix.
    pub fn is_autogen(&self) -> bool {
        is_autogen_rule_name(&self.name)
    }

    /// True if the rule generates resources.
    pub fn has_generate(&self) -> bool {
        self.generation.is_some()
    }

    /// True if the rule mutates with JSON patch syntax, at the top level or in
    /// any foreach entry.
    pub fn has_json_patch(&self) -> bool {
        self.mutation.as_ref().is_some_and(|mutation| {
            !mutation.patches_json6902.is_empty()
                || mutation
                    .for_each
                    .iter()
                    .any(|foreach| !foreach.patches_json6902.is_empty())
        })
    }

    /// True if the rule validates with CEL expressions.
    pub fn has_validate_cel(&self) -> bool {
        self.validation.as_ref().is_some_and(|v| v.cel.is_some())
    }

    /// Classify the rule's action body.
    ///
    /// Action bodies are mutually exclusive by convention. When a rule carries
    /// more than one, the first in this order wins: strategic merge patch,
    /// foreach mutation, pattern, deny, pod security, any pattern, foreach
    /// validation, CEL, assertion tree, image verification.
    pub fn action(&self) -> Option<RuleAction<'_>> {
        if let Some(mutation) = &self.mutation {
            if let Some(patch) = &mutation.patch_strategic_merge {
                return Some(RuleAction::Mutate(MutateAction::PatchStrategicMerge(patch)));
            }
            if !mutation.for_each.is_empty() {
                return Some(RuleAction::Mutate(MutateAction::ForEach(&mutation.for_each)));
            }
        }
        if let Some(validation) = &self.validation {
            let action = if let Some(pattern) = &validation.pattern {
                Some(ValidateAction::Pattern(pattern))
            } else if let Some(deny) = &validation.deny {
                Some(ValidateAction::Deny(deny))
            } else if let Some(pod_security) = &validation.pod_security {
                Some(ValidateAction::PodSecurity(pod_security))
            } else if let Some(any_pattern) = &validation.any_pattern {
                Some(ValidateAction::AnyPattern(any_pattern))
            } else if !validation.for_each.is_empty() {
                Some(ValidateAction::ForEach(&validation.for_each))
            } else if let Some(cel) = &validation.cel {
                Some(ValidateAction::Cel(cel))
            } else {
                validation.assert.as_ref().map(ValidateAction::Assert)
            };
            if let Some(action) = action {
                return Some(RuleAction::Validate(validation, action));
            }
        }
        if !self.verify_images.is_empty() {
            return Some(RuleAction::VerifyImages(&self.verify_images));
        }
        None
    }
}

/// True if `name` marks a machine-generated rule.
pub fn is_autogen_rule_name(name: &str) -> bool {
    name.starts_with(AUTOGEN_PREFIX)
}

/// Build a generated rule name: `<prefix><name>`, cut to 63 bytes.
///
/// The cut never splits a UTF-8 character, so a name containing multi-byte
/// characters may end up a few bytes shorter.
pub fn autogen_rule_name(prefix: &str, name: &str) -> String {
    let mut generated = format!("{prefix}{name}");
    if generated.len() > MAX_RULE_NAME_LEN {
        let mut end = MAX_RULE_NAME_LEN;
        while !generated.is_char_boundary(end) {
            end -= 1;
        }
        generated.truncate(end);
    }
    generated
}

/// The action body of a rule, borrowed from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleAction<'a> {
    Mutate(MutateAction<'a>),
    /// The enclosing validation travels along for its message and failure
    /// settings.
    Validate(&'a Validation, ValidateAction<'a>),
    VerifyImages(&'a [Value]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MutateAction<'a> {
    PatchStrategicMerge(&'a Value),
    ForEach(&'a [ForEachMutation]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidateAction<'a> {
    Pattern(&'a Value),
    Deny(&'a Value),
    PodSecurity(&'a PodSecurity),
    AnyPattern(&'a Value),
    ForEach(&'a [Value]),
    Cel(&'a Value),
    Assert(&'a Value),
}

/// A named CEL match condition evaluated before the rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CelPrecondition {
    pub name: String,
    pub expression: String,
}

/// Resource selection for a match or exclude block.
///
/// Either the flat `resources` description or the `any` (OR) / `all` (AND)
/// filter lists are used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResources {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any: Vec<ResourceFilter>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all: Vec<ResourceFilter>,

    #[serde(flatten)]
    pub user_info: UserInfo,

    #[serde(default, skip_serializing_if = "ResourceDescription::is_empty")]
    pub resources: ResourceDescription,
}

impl MatchResources {
    /// All kinds referenced by the flat description and the filter lists.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds = self.resources.kinds.clone();
        for filter in self.all.iter().chain(self.any.iter()) {
            kinds.extend(filter.resources.kinds.iter().cloned());
        }
        kinds
    }

    /// True if any description of the block names `kind`.
    pub fn has_kind(&self, kind: &str) -> bool {
        contains_kind(&self.kinds(), kind)
    }

    pub fn is_empty(&self) -> bool {
        self.any.is_empty()
            && self.all.is_empty()
            && self.user_info.is_empty()
            && self.resources.is_empty()
    }
}

/// One entry of an `any` / `all` filter list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceFilter {
    #[serde(flatten)]
    pub user_info: UserInfo,

    #[serde(default, skip_serializing_if = "ResourceDescription::is_empty")]
    pub resources: ResourceDescription,
}

/// Subject-based selection, inlined into match blocks and filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_roles: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<Value>,
}

impl UserInfo {
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.cluster_roles.is_empty() && self.subjects.is_empty()
    }
}

/// Describes the resources a filter selects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescription {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<String>,
}

impl ResourceDescription {
    pub fn is_empty(&self) -> bool {
        *self == ResourceDescription::default()
    }

    /// True if the kinds list names `kind`, ignoring group, version and
    /// subresource qualifiers.
    pub fn has_kind(&self, kind: &str) -> bool {
        contains_kind(&self.kinds, kind)
    }
}

/// The mutate action of a rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mutation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_strategic_merge: Option<Value>,

    #[serde(rename = "patchesJson6902", default, skip_serializing_if = "String::is_empty")]
    pub patches_json6902: String,

    #[serde(rename = "foreach", default, skip_serializing_if = "Vec::is_empty")]
    pub for_each: Vec<ForEachMutation>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A per-element mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForEachMutation {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub list: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_strategic_merge: Option<Value>,

    #[serde(rename = "patchesJson6902", default, skip_serializing_if = "String::is_empty")]
    pub patches_json6902: String,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// The validate action of a rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_action: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failure_action_overrides: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_existing_violations: Option<bool>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_pattern: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_security: Option<PodSecurity>,

    #[serde(rename = "foreach", default, skip_serializing_if = "Vec::is_empty")]
    pub for_each: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cel: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assert: Option<Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Validation {
    /// A validation carrying only the failure settings of `self` and `message`.
    pub fn with_failure_settings(&self, message: String) -> Validation {
        Validation {
            failure_action: self.failure_action.clone(),
            failure_action_overrides: self.failure_action_overrides.clone(),
            allow_existing_violations: self.allow_existing_violations,
            message,
            ..Validation::default()
        }
    }
}

/// Pod Security Standards check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodSecurity {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub level: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<Value>,
}
