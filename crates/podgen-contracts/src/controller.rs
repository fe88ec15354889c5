//! Pod controller kinds and controller selections.
//!
//! A `ControllerSelection` is what the autogen annotation (or the eligibility
//! analyzer) asks for: nothing (`None`), the legacy shorthand (`All`), or an
//! explicit set of kinds. The two sentinels are separate variants so they can
//! never end up in the same set as real kind names.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::rule::{AUTOGEN_CRONJOB_PREFIX, AUTOGEN_PREFIX};

/// A workload kind whose spec embeds a pod template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ControllerKind {
    DaemonSet,
    Deployment,
    Job,
    StatefulSet,
    ReplicaSet,
    ReplicationController,
    CronJob,
}

impl ControllerKind {
    /// Every controller kind, CronJob included.
    pub const ALL: [ControllerKind; 7] = [
        ControllerKind::DaemonSet,
        ControllerKind::Deployment,
        ControllerKind::Job,
        ControllerKind::StatefulSet,
        ControllerKind::ReplicaSet,
        ControllerKind::ReplicationController,
        ControllerKind::CronJob,
    ];

    /// The six kinds that embed a pod template directly under `spec.template`.
    pub const POD_TEMPLATE: [ControllerKind; 6] = [
        ControllerKind::DaemonSet,
        ControllerKind::Deployment,
        ControllerKind::Job,
        ControllerKind::StatefulSet,
        ControllerKind::ReplicaSet,
        ControllerKind::ReplicationController,
    ];

    /// The Kubernetes kind name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerKind::DaemonSet => "DaemonSet",
            ControllerKind::Deployment => "Deployment",
            ControllerKind::Job => "Job",
            ControllerKind::StatefulSet => "StatefulSet",
            ControllerKind::ReplicaSet => "ReplicaSet",
            ControllerKind::ReplicationController => "ReplicationController",
            ControllerKind::CronJob => "CronJob",
        }
    }

    /// True for the kinds that nest the pod template at `spec.template`.
    pub fn has_pod_template(&self) -> bool {
        !matches!(self, ControllerKind::CronJob)
    }

    /// Every controller kind as a set.
    pub fn all() -> BTreeSet<ControllerKind> {
        Self::ALL.into_iter().collect()
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControllerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown controller kind '{s}'"))
    }
}

/// The set of controllers autogeneration should target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerSelection {
    /// Autogeneration disabled.
    None,
    /// Legacy shorthand: the six pod-template controllers plus CronJob.
    All,
    /// An explicit set of kinds. May be empty.
    Kinds(BTreeSet<ControllerKind>),
}

impl ControllerSelection {
    /// Parse an annotation value.
    ///
    /// Tokens are comma separated and trimmed. A `none` token disables
    /// generation and wins over everything else; otherwise an `all` token
    /// selects `All`. Unrecognized tokens are dropped without complaint.
    pub fn parse(value: &str) -> Self {
        let tokens: Vec<&str> = value.split(',').map(str::trim).collect();
        if tokens.contains(&"none") {
            return ControllerSelection::None;
        }
        if tokens.contains(&"all") {
            return ControllerSelection::All;
        }
        ControllerSelection::Kinds(tokens.iter().filter_map(|t| t.parse().ok()).collect())
    }

    /// True when generation is disabled.
    pub fn is_none(&self) -> bool {
        matches!(self, ControllerSelection::None)
    }

    /// True if `kind` is part of this selection.
    pub fn contains(&self, kind: ControllerKind) -> bool {
        match self {
            ControllerSelection::None => false,
            ControllerSelection::All => true,
            ControllerSelection::Kinds(kinds) => kinds.contains(&kind),
        }
    }

    /// The selected kinds that use `spec.template`, sorted by kind name.
    ///
    /// This is the kind list written into the pod-group generated rule.
    pub fn pod_template_kinds(&self) -> Vec<ControllerKind> {
        let mut kinds: Vec<ControllerKind> = ControllerKind::POD_TEMPLATE
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .collect();
        kinds.sort_by_key(|kind| kind.as_str());
        kinds
    }

    /// True when a CronJob rule should be generated.
    pub fn includes_cronjob(&self) -> bool {
        self.contains(ControllerKind::CronJob)
    }

    /// The selected kinds, sentinels expanded (`All` → all seven, `None` → empty).
    pub fn kinds(&self) -> BTreeSet<ControllerKind> {
        match self {
            ControllerSelection::None => BTreeSet::new(),
            ControllerSelection::All => ControllerKind::all(),
            ControllerSelection::Kinds(kinds) => kinds.clone(),
        }
    }
}

impl fmt::Display for ControllerSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerSelection::None => f.write_str("none"),
            ControllerSelection::All => f.write_str("all"),
            ControllerSelection::Kinds(kinds) => {
                let names: Vec<&str> = kinds.iter().map(ControllerKind::as_str).collect();
                f.write_str(&names.join(","))
            }
        }
    }
}

/// The embedding a derived rule targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetGroup {
    /// Controllers with the pod template at `spec.template`.
    PodControllers,
    /// CronJob, with the pod template at `spec.jobTemplate.spec.template`.
    CronJob,
}

impl TargetGroup {
    /// Key the rule body is nested under, inside `spec`.
    pub fn template_key(&self) -> &'static str {
        match self {
            TargetGroup::PodControllers => "template",
            TargetGroup::CronJob => "jobTemplate",
        }
    }

    /// Path shift applied to variable references in messages.
    pub fn path_shift(&self) -> &'static str {
        match self {
            TargetGroup::PodControllers => "spec/template",
            TargetGroup::CronJob => "spec/jobTemplate/spec/template",
        }
    }

    /// Prefix of generated rule names.
    pub fn name_prefix(&self) -> &'static str {
        match self {
            TargetGroup::PodControllers => AUTOGEN_PREFIX,
            TargetGroup::CronJob => AUTOGEN_CRONJOB_PREFIX,
        }
    }
}

impl fmt::Display for TargetGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetGroup::PodControllers => f.write_str("pod controllers"),
            TargetGroup::CronJob => f.write_str("CronJob"),
        }
    }
}
