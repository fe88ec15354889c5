//! Policy object types.
//!
//! Only the parts autogeneration reads are modelled: metadata annotations and
//! the rule list. Everything else (status, policy-level flags) is carried in
//! `extra` maps untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rule::Rule;

/// Annotation that requests which controllers autogeneration targets.
///
/// Value grammar: comma-separated controller kind names, or `none` / `all`.
pub const ANNOTATION_AUTOGEN_CONTROLLERS: &str = "pod-policies.kyverno.io/autogen-controllers";

/// A cluster- or namespace-scoped admission policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: PolicySpec,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Policy {
    /// Set (or replace) the autogen controllers annotation.
    pub fn set_autogen_annotation(&mut self, value: impl Into<String>) {
        self.metadata
            .annotations
            .insert(ANNOTATION_AUTOGEN_CONTROLLERS.to_string(), value.into());
    }
}

/// The subset of Kubernetes object metadata podgen reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Policy spec: the ordered rule list plus policy-level settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySpec {
    #[serde(default)]
    pub rules: Vec<Rule>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}
