//! # podgen-autogen
//!
//! Derives pod-controller rules from admission policy rules written against
//! `Pod`.
//!
//! ## Overview
//!
//! This crate provides [`Autogen`], the policy-level entry point, and the
//! stages it is built from:
//!
//! - [`analyze`](analyze::analyze) decides whether a policy is eligible
//! - [`resolve`](resolve::resolve) merges that with the autogen annotation
//! - [`RuleTransformer`] derives one controller rule from one rule
//! - [`rewrite_paths`](rewrite::rewrite_paths) moves expression paths below
//!   the pod template
//! - [`VariableReferenceShifter`] follows `$(...)` message references
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use podgen_autogen::Autogen;
//! use podgen_core::TracingSink;
//!
//! let rules = Autogen::new().compute_rules(&policy, &mut TracingSink);
//! ```

pub mod analyze;
pub mod assemble;
pub mod extract;
pub mod resolve;
pub mod rewrite;
pub mod shift;
pub mod transform;

pub use assemble::{Autogen, PatchOp, RulePatch};
pub use extract::extract_pod_spec;
pub use resolve::ControllerTriple;
pub use shift::VariableReferenceShifter;
pub use transform::RuleTransformer;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use podgen_contracts::{
        controller::{ControllerKind, TargetGroup},
        diagnostic::{Diagnostic, Ineligibility},
        policy::Policy,
    };
    use podgen_core::{
        traits::{DiagnosticSink, ReferenceShifter, ShiftMode},
        NullSink,
    };

    use crate::{Autogen, PatchOp};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn policy(rules: Value, annotation: Option<&str>) -> Policy {
        let mut policy: Policy = serde_json::from_value(json!({
            "apiVersion": "kyverno.io/v1",
            "kind": "ClusterPolicy",
            "metadata": {"name": "test-policy"},
            "spec": {"validationFailureAction": "Enforce", "rules": rules}
        }))
        .unwrap();
        if let Some(value) = annotation {
            policy.set_autogen_annotation(value);
        }
        policy
    }

    fn require_image_tag() -> Value {
        json!({
            "name": "require-image-tag",
            "match": {"any": [{"resources": {"kinds": ["Pod"]}}]},
            "validate": {
                "message": "An image tag is required.",
                "pattern": {"spec": {"containers": [{"image": "*:*"}]}}
            }
        })
    }

    fn names(rules: &[podgen_contracts::rule::Rule]) -> Vec<&str> {
        rules.iter().map(|rule| rule.name.as_str()).collect()
    }

    // ── 1. no annotation → pod + CronJob rules ────────────────────────────────

    #[test]
    fn pattern_rule_without_annotation_gets_both_groups() {
        let policy = policy(json!([require_image_tag()]), None);
        let rules = Autogen::new().compute_rules(&policy, &mut NullSink);

        assert_eq!(
            names(&rules),
            vec![
                "require-image-tag",
                "autogen-require-image-tag",
                "autogen-cronjob-require-image-tag"
            ]
        );
        assert_eq!(
            serde_json::to_value(&rules[1]).unwrap(),
            json!({
                "name": "autogen-require-image-tag",
                "match": {"any": [{"resources": {"kinds": [
                    "DaemonSet", "Deployment", "Job", "ReplicaSet", "ReplicationController", "StatefulSet"
                ]}}]},
                "validate": {
                    "message": "An image tag is required.",
                    "pattern": {"spec": {"template": {"spec": {"containers": [{"image": "*:*"}]}}}}
                }
            })
        );
        assert_eq!(
            serde_json::to_value(&rules[2]).unwrap(),
            json!({
                "name": "autogen-cronjob-require-image-tag",
                "match": {"any": [{"resources": {"kinds": ["CronJob"]}}]},
                "validate": {
                    "message": "An image tag is required.",
                    "pattern": {"spec": {"jobTemplate": {"spec": {"template": {"spec": {
                        "containers": [{"image": "*:*"}]
                    }}}}}}
                }
            })
        );
    }

    // ── 2. annotation restricts controllers ───────────────────────────────────

    #[test]
    fn annotation_limits_generated_kinds() {
        let policy = policy(json!([require_image_tag()]), Some("Deployment,Job,StatefulSet"));
        let rules = Autogen::new().compute_rules(&policy, &mut NullSink);

        assert_eq!(
            names(&rules),
            vec!["require-image-tag", "autogen-require-image-tag"]
        );
        assert_eq!(
            rules[1].match_resources.any[0].resources.kinds,
            vec!["Deployment", "Job", "StatefulSet"]
        );
    }

    #[test]
    fn cronjob_only_annotation_skips_pod_group() {
        let policy = policy(json!([require_image_tag()]), Some("CronJob"));
        let rules = Autogen::new().compute_rules(&policy, &mut NullSink);
        assert_eq!(
            names(&rules),
            vec!["require-image-tag", "autogen-cronjob-require-image-tag"]
        );
    }

    #[test]
    fn none_annotation_leaves_rules_alone() {
        let policy = policy(json!([require_image_tag()]), Some("none"));
        let rules = Autogen::new().compute_rules(&policy, &mut NullSink);
        assert_eq!(rules, policy.spec.rules);
    }

    // ── 3. JSON patch mutation → unchanged ────────────────────────────────────

    #[test]
    fn json_patch_policy_is_unchanged() {
        let policy = policy(
            json!([{
                "name": "add-label",
                "match": {"any": [{"resources": {"kinds": ["Pod"]}}]},
                "mutate": {"patchesJson6902": "- op: add\n  path: /metadata/labels/team\n  value: core"}
            }]),
            None,
        );
        let mut sink: Vec<Diagnostic> = Vec::new();
        let rules = Autogen::new().compute_rules(&policy, &mut sink);
        assert_eq!(rules, policy.spec.rules);
        assert_eq!(
            sink,
            vec![Diagnostic::Ineligible {
                policy: "test-policy".to_string(),
                reason: Ineligibility::JsonPatch {
                    rule: "add-label".to_string()
                },
            }]
        );
    }

    // ── 4. mixed kinds → unchanged ────────────────────────────────────────────

    #[test]
    fn mixed_kind_policy_is_unchanged() {
        let policy = policy(
            json!([{
                "name": "mixed",
                "match": {"resources": {"kinds": ["Pod", "Deployment"]}},
                "validate": {"pattern": {"metadata": {"labels": {"app": "?*"}}}}
            }]),
            None,
        );
        let rules = Autogen::new().compute_rules(&policy, &mut NullSink);
        assert_eq!(rules, policy.spec.rules);
        assert!(Autogen::new().autogen_kinds(&policy).is_empty());
    }

    #[test]
    fn versioned_pod_selector_is_unchanged() {
        let policy = policy(
            json!([{
                "name": "r",
                "match": {"resources": {"kinds": ["v1/Pod"]}},
                "validate": {"pattern": {"spec": {"containers": [{"image": "*:*"}]}}}
            }]),
            None,
        );
        let mut sink: Vec<Diagnostic> = Vec::new();
        let rules = Autogen::new().compute_rules(&policy, &mut sink);
        assert_eq!(rules, policy.spec.rules);
        assert!(matches!(
            sink.as_slice(),
            [Diagnostic::Ineligible { reason: Ineligibility::NoPodKinds, .. }]
        ));
    }

    // ── 5. idempotence ────────────────────────────────────────────────────────

    #[test]
    fn computing_twice_changes_nothing() {
        let original = policy(
            json!([
                require_image_tag(),
                {
                    "name": "deny-host-path",
                    "match": {"all": [{"resources": {"kinds": ["Pod"], "operations": ["CREATE"]}}]},
                    "validate": {
                        "message": "{{ request.object.metadata.name }} uses hostPath",
                        "deny": {"conditions": {"any": [{
                            "key": "{{ request.object.spec.volumes[].hostPath || `[]` | length(@) }}",
                            "operator": "GreaterThan",
                            "value": 0
                        }]}}
                    }
                }
            ]),
            None,
        );
        let autogen = Autogen::new();
        let once = autogen.compute_rules(&original, &mut NullSink);

        let mut again = original.clone();
        again.spec.rules = once.clone();
        let twice = autogen.compute_rules(&again, &mut NullSink);
        assert_eq!(once, twice);
    }

    // ── 6. expression paths ───────────────────────────────────────────────────

    #[test]
    fn deny_expressions_follow_the_pod_template() {
        let policy = policy(
            json!([{
                "name": "check-name",
                "match": {"resources": {"kinds": ["Pod"]}},
                "validate": {
                    "message": "bad name {{ request.object.metadata.name }}",
                    "deny": {"conditions": {"any": [{
                        "key": "{{ request.object.spec.hostNetwork }}",
                        "operator": "Equals",
                        "value": true
                    }]}}
                }
            }]),
            None,
        );
        let rules = Autogen::new().compute_rules(&policy, &mut NullSink);

        let pod = serde_json::to_value(&rules[1]).unwrap();
        assert_eq!(
            pod["validate"]["message"],
            "bad name {{ request.object.spec.template.metadata.name }}"
        );
        assert_eq!(
            pod["validate"]["deny"]["conditions"]["any"][0]["key"],
            "{{ request.object.spec.template.spec.hostNetwork }}"
        );

        let cronjob = serde_json::to_value(&rules[2]).unwrap();
        assert_eq!(
            cronjob["validate"]["deny"]["conditions"]["any"][0]["key"],
            "{{ request.object.spec.jobTemplate.spec.template.spec.hostNetwork }}"
        );
    }

    #[test]
    fn cel_expressions_use_the_cel_table() {
        let policy = policy(
            json!([{
                "name": "no-host-pid",
                "match": {"any": [{"resources": {"kinds": ["Pod"]}}]},
                "validate": {"cel": {"expressions": [{"expression": "object.spec.hostPID != true"}]}}
            }]),
            Some("Deployment"),
        );
        let rules = Autogen::new().compute_rules(&policy, &mut NullSink);
        let derived = serde_json::to_value(&rules[1]).unwrap();
        assert_eq!(
            derived["validate"]["cel"]["expressions"][0]["expression"],
            "object.spec.template.spec.hostPID != true"
        );
    }

    // ── 7. per-kind computation ───────────────────────────────────────────────

    #[test]
    fn compute_for_single_kind() {
        let policy = policy(json!([require_image_tag()]), None);
        let autogen = Autogen::new();

        let rules = autogen.compute_rules_for_kind(&policy, ControllerKind::Deployment, &mut NullSink);
        assert_eq!(names(&rules), vec!["require-image-tag", "autogen-require-image-tag"]);
        assert_eq!(rules[1].match_resources.any[0].resources.kinds, vec!["Deployment"]);

        let rules = autogen.compute_rules_for_kind(&policy, ControllerKind::CronJob, &mut NullSink);
        assert_eq!(
            names(&rules),
            vec!["require-image-tag", "autogen-cronjob-require-image-tag"]
        );

        let restricted = self::policy(json!([require_image_tag()]), Some("Job"));
        let rules = autogen.compute_rules_for_kind(&restricted, ControllerKind::DaemonSet, &mut NullSink);
        assert_eq!(rules, restricted.spec.rules);
    }

    // ── 8. helpers ────────────────────────────────────────────────────────────

    #[test]
    fn rule_names_follow_the_selection() {
        let autogen = Autogen::new();
        let all = policy(json!([require_image_tag()]), None);
        assert_eq!(
            autogen.autogen_rule_names(&all),
            vec![
                "require-image-tag",
                "autogen-require-image-tag",
                "autogen-cronjob-require-image-tag"
            ]
        );

        let cronjob = policy(json!([require_image_tag()]), Some("CronJob"));
        assert_eq!(
            autogen.autogen_rule_names(&cronjob),
            vec!["require-image-tag", "autogen-cronjob-require-image-tag"]
        );

        let none = policy(json!([require_image_tag()]), Some("none"));
        assert_eq!(autogen.autogen_rule_names(&none), vec!["require-image-tag"]);
    }

    #[test]
    fn controllers_triple_for_annotated_policy() {
        let policy = policy(json!([require_image_tag()]), Some("Deployment,Foo"));
        let triple = Autogen::new().controllers(&policy);
        assert_eq!(
            triple.effective,
            [ControllerKind::Deployment].into_iter().collect()
        );
        assert_eq!(triple.supported, Some(ControllerKind::all()));
    }

    #[test]
    fn patches_add_then_replace() {
        let autogen = Autogen::new();
        let fresh = policy(json!([require_image_tag()]), None);

        let patches = autogen.rule_patches(&fresh, &mut NullSink);
        assert_eq!(patches.len(), 2);
        assert_eq!(patches[0].path, "/spec/rules/1");
        assert_eq!(patches[0].op, PatchOp::Add);
        assert_eq!(patches[1].path, "/spec/rules/2");
        assert_eq!(
            serde_json::to_value(&patches[0]).unwrap()["op"],
            json!("add")
        );

        // Already up to date: nothing to do.
        let mut current = fresh.clone();
        current.spec.rules = autogen.compute_rules(&fresh, &mut NullSink);
        assert!(autogen.rule_patches(&current, &mut NullSink).is_empty());

        // A stale generated rule is replaced where it sits.
        let mut stale = current.clone();
        stale.spec.rules[1].match_resources.any[0].resources.kinds = vec!["Deployment".to_string()];
        let patches = autogen.rule_patches(&stale, &mut NullSink);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].path, "/spec/rules/1");
        assert_eq!(patches[0].op, PatchOp::Replace);
    }

    // ── 9. pluggable shifter ──────────────────────────────────────────────────

    struct TaggingShifter;

    impl ReferenceShifter for TaggingShifter {
        fn shift(
            &self,
            message: &str,
            shift: &str,
            _mode: ShiftMode,
            _sink: &mut dyn DiagnosticSink,
        ) -> String {
            format!("[{shift}] {message}")
        }
    }

    #[test]
    fn custom_shifter_is_used_for_messages() {
        let policy = policy(json!([require_image_tag()]), Some("Deployment,CronJob"));
        let rules = Autogen::with_shifter(Box::new(TaggingShifter)).compute_rules(&policy, &mut NullSink);
        let pod_message = &rules[1].validation.as_ref().unwrap().message;
        assert_eq!(pod_message, "[spec/template] An image tag is required.");
        let cron_message = &rules[2].validation.as_ref().unwrap().message;
        assert_eq!(
            cron_message,
            "[spec/jobTemplate/spec/template] [spec/template] An image tag is required."
        );
    }

    #[test]
    fn skipped_rules_are_reported() {
        let policy = policy(
            json!([
                require_image_tag(),
                {
                    "name": "services",
                    "match": {"any": [{"resources": {"kinds": ["Service"]}}]},
                    "validate": {"pattern": {"spec": {"type": "ClusterIP"}}}
                }
            ]),
            Some("Deployment"),
        );
        let mut sink: Vec<Diagnostic> = Vec::new();
        let rules = Autogen::new().compute_rules(&policy, &mut sink);
        assert_eq!(rules.len(), 3);
        assert!(sink.iter().any(|diagnostic| matches!(
            diagnostic,
            Diagnostic::RuleSkipped { rule, target: TargetGroup::PodControllers, .. } if rule == "services"
        )));
    }
}
