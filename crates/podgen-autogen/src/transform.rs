//! Rule transformation: one Pod rule → one controller rule.
//!
//! `RuleTransformer::generate_rule` is the shared step. It retargets the kind
//! lists, then rebuilds the action body so it addresses the pod template:
//!
//! | action                    | derived body                                   |
//! |---------------------------|------------------------------------------------|
//! | patchStrategicMerge       | `{"spec": {<key>: patch}}`                     |
//! | mutate foreach            | each entry's patch wrapped the same way        |
//! | pattern                   | wrapped, message shifted                       |
//! | deny / podSecurity        | copied, message shifted                        |
//! | anyPattern                | each alternative wrapped, message shifted      |
//! | validate foreach          | copied, message shifted                        |
//! | cel                       | copied                                         |
//! | assert                    | `object` / `oldObject` nodes wrapped           |
//! | verifyImages              | copied                                         |
//!
//! Expression paths inside the body are not touched here; see `rewrite`.

use serde_json::{Map, Value};
use tracing::debug;

use podgen_contracts::{
    controller::{ControllerKind, TargetGroup},
    diagnostic::Diagnostic,
    rule::{
        autogen_rule_name, ForEachMutation, MatchResources, MutateAction, Mutation, ResourceFilter,
        Rule, RuleAction, ValidateAction, Validation,
    },
};
use podgen_core::traits::{DiagnosticSink, ReferenceShifter, ShiftMode};

/// Assertion tree nodes that address the admitted object.
const ASSERT_OBJECT_NODES: [&str; 2] = ["object", "oldObject"];

/// Builds derived rules. Borrows the message shifter it hands every
/// validation message to.
#[derive(Clone, Copy)]
pub struct RuleTransformer<'a> {
    shifter: &'a dyn ReferenceShifter,
}

impl<'a> RuleTransformer<'a> {
    pub fn new(shifter: &'a dyn ReferenceShifter) -> Self {
        Self { shifter }
    }

    /// Derive the rule for the controllers that use `spec.template`.
    ///
    /// Returns `None` for rules that are already generated, for an empty
    /// kind list, and for rules whose match (or non-empty exclude) block does
    /// not select Pod.
    pub fn generate_rule_for_controllers(
        &self,
        rule: &Rule,
        kinds: &[ControllerKind],
        sink: &mut dyn DiagnosticSink,
    ) -> Option<Rule> {
        self.pod_template_rule(rule, kinds, TargetGroup::PodControllers, sink)
    }

    /// Derive the CronJob rule.
    ///
    /// The pod-controller rule is derived first and then nested once more
    /// under `spec.jobTemplate`, so both share their preconditions and
    /// context.
    pub fn generate_cronjob_rule(
        &self,
        rule: &Rule,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<Rule> {
        let base =
            self.pod_template_rule(rule, &[ControllerKind::CronJob], TargetGroup::CronJob, sink)?;
        self.generate_rule(
            autogen_rule_name(TargetGroup::CronJob.name_prefix(), &rule.name),
            &base,
            TargetGroup::CronJob,
            &[ControllerKind::CronJob.as_str().to_string()],
            sink,
        )
    }

    fn pod_template_rule(
        &self,
        rule: &Rule,
        kinds: &[ControllerKind],
        target: TargetGroup,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<Rule> {
        if rule.is_autogen() || kinds.is_empty() {
            debug!(rule = %rule.name, target = %target, "skipping rule generation");
            return None;
        }
        let skip_reason = if !rule.match_resources.has_kind("Pod") {
            Some("match block does not select Pod")
        } else if rule.exclude_resources.as_ref().is_some_and(|exclude| {
            !exclude.kinds().is_empty() && !exclude.has_kind("Pod")
        }) {
            Some("exclude block does not select Pod")
        } else {
            None
        };
        if let Some(reason) = skip_reason {
            sink.emit(Diagnostic::RuleSkipped {
                rule: rule.name.clone(),
                target,
                reason: reason.to_string(),
            });
            return None;
        }

        let mut names: Vec<String> = kinds.iter().map(|kind| kind.as_str().to_string()).collect();
        names.sort();
        self.generate_rule(
            autogen_rule_name(TargetGroup::PodControllers.name_prefix(), &rule.name),
            rule,
            TargetGroup::PodControllers,
            &names,
            sink,
        )
    }

    /// Derive a rule named `name` from `rule` for `group`, matching `kinds`.
    ///
    /// Never modifies `rule`. Returns `None` when the rule has no action body.
    pub fn generate_rule(
        &self,
        name: String,
        rule: &Rule,
        group: TargetGroup,
        kinds: &[String],
        sink: &mut dyn DiagnosticSink,
    ) -> Option<Rule> {
        let Some(action) = rule.action() else {
            sink.emit(Diagnostic::RuleSkipped {
                rule: rule.name.clone(),
                target: group,
                reason: "no supported action body".to_string(),
            });
            return None;
        };

        // Derived rules carry only the fields autogeneration understands.
        let mut derived = Rule {
            name,
            generation: None,
            extra: Default::default(),
            ..rule.clone()
        };
        retarget(&mut derived.match_resources, group, kinds, true);
        if let Some(exclude) = derived.exclude_resources.as_mut() {
            retarget(exclude, group, kinds, false);
        }

        let key = group.template_key();
        let shift = group.path_shift();
        match action {
            RuleAction::Mutate(MutateAction::PatchStrategicMerge(patch)) => {
                derived.mutation = Some(Mutation {
                    patch_strategic_merge: Some(nest(key, patch.clone())),
                    ..Mutation::default()
                });
            }
            RuleAction::Mutate(MutateAction::ForEach(entries)) => {
                let for_each = entries
                    .iter()
                    .map(|entry| ForEachMutation {
                        list: entry.list.clone(),
                        context: entry.context.clone(),
                        preconditions: entry.preconditions.clone(),
                        patch_strategic_merge: Some(nest(
                            key,
                            entry.patch_strategic_merge.clone().unwrap_or(Value::Null),
                        )),
                        ..ForEachMutation::default()
                    })
                    .collect();
                derived.mutation = Some(Mutation {
                    for_each,
                    ..Mutation::default()
                });
            }
            RuleAction::Validate(validation, action) => {
                derived.validation = Some(self.derive_validation(
                    &rule.name, validation, action, key, shift, sink,
                ));
            }
            RuleAction::VerifyImages(_) => {}
        }
        Some(derived)
    }

    /// A validation with the failure settings of `validation` and its message
    /// shifted by `shift`.
    fn shifted(
        &self,
        validation: &Validation,
        shift: &str,
        mode: ShiftMode,
        sink: &mut dyn DiagnosticSink,
    ) -> Validation {
        let message = self.shifter.shift(&validation.message, shift, mode, sink);
        validation.with_failure_settings(message)
    }

    fn derive_validation(
        &self,
        rule: &str,
        validation: &Validation,
        action: ValidateAction<'_>,
        key: &str,
        shift: &str,
        sink: &mut dyn DiagnosticSink,
    ) -> Validation {
        match action {
            ValidateAction::Pattern(pattern) => Validation {
                pattern: Some(nest(key, pattern.clone())),
                ..self.shifted(validation, shift, ShiftMode::Pattern, sink)
            },
            ValidateAction::Deny(deny) => Validation {
                deny: Some(deny.clone()),
                ..self.shifted(validation, shift, ShiftMode::Deny, sink)
            },
            ValidateAction::PodSecurity(pod_security) => Validation {
                pod_security: Some(pod_security.clone()),
                ..self.shifted(validation, shift, ShiftMode::PodSecurity, sink)
            },
            ValidateAction::AnyPattern(any_pattern) => {
                let alternatives = match any_pattern {
                    Value::Array(items) => items.iter().map(|item| nest(key, item.clone())).collect(),
                    _ => {
                        sink.emit(Diagnostic::AnyPatternNotArray {
                            rule: rule.to_string(),
                        });
                        Vec::new()
                    }
                };
                Validation {
                    any_pattern: Some(Value::Array(alternatives)),
                    ..self.shifted(validation, shift, ShiftMode::AnyPattern, sink)
                }
            }
            ValidateAction::ForEach(entries) => Validation {
                for_each: entries.to_vec(),
                ..self.shifted(validation, shift, ShiftMode::Pattern, sink)
            },
            ValidateAction::Cel(_) => validation.clone(),
            ValidateAction::Assert(tree) => Validation {
                assert: Some(nest_assertion(key, tree)),
                ..validation.clone()
            },
        }
    }
}

/// `{"spec": {<key>: value}}`
fn nest(key: &str, value: Value) -> Value {
    let mut template = Map::new();
    template.insert(key.to_string(), value);
    let mut spec = Map::new();
    spec.insert("spec".to_string(), Value::Object(template));
    Value::Object(spec)
}

/// Wrap the `object` / `oldObject` nodes of an assertion tree. Trees that are
/// not objects, and other nodes, are left as they are.
fn nest_assertion(key: &str, tree: &Value) -> Value {
    let Value::Object(nodes) = tree else {
        return tree.clone();
    };
    let mut out: Map<String, Value> = nodes.clone();
    for node in ASSERT_OBJECT_NODES {
        if let Some(object @ Value::Object(_)) = nodes.get(node) {
            out.insert(node.to_string(), nest(key, object.clone()));
        }
    }
    Value::Object(out)
}

/// Point a match or exclude block at `kinds`.
///
/// The `any` list wins over `all`, which wins over the flat description. The
/// flat kinds of an exclude block are only replaced when already set.
fn retarget(resources: &mut MatchResources, group: TargetGroup, kinds: &[String], is_match: bool) {
    if !resources.any.is_empty() {
        retarget_filters(&mut resources.any, group, kinds);
    } else if !resources.all.is_empty() {
        retarget_filters(&mut resources.all, group, kinds);
    } else if is_match || !resources.resources.kinds.is_empty() {
        resources.resources.kinds = kinds.to_vec();
    }
}

fn retarget_filters(filters: &mut [ResourceFilter], group: TargetGroup, kinds: &[String]) {
    for filter in filters {
        let replace = match group {
            TargetGroup::PodControllers => filter.resources.has_kind("Pod"),
            TargetGroup::CronJob => true,
        };
        if replace {
            filter.resources.kinds = kinds.to_vec();
        }
    }
}
