//! Rule assembly: the policy-level entry points.
//!
//! `Autogen` runs the whole pipeline over one policy:
//!
//! 1. `analyze` the rules; an ineligible policy keeps its rules.
//! 2. `resolve` the annotation into a `ControllerSelection`; `None` keeps the
//!    rules.
//! 3. For every rule, derive the pod-controller rule and then the CronJob rule,
//!    round-trip each through JSON with its expression paths rewritten.
//! 4. Return the original (non-generated) rules followed by the generated
//!    ones, or the original list if nothing was generated.
//!
//! Running `compute_rules` on its own output gives the same output.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::{debug, info};

use podgen_contracts::{
    controller::{ControllerKind, ControllerSelection, TargetGroup},
    diagnostic::Diagnostic,
    error::{PodgenError, PodgenResult},
    rule::{autogen_rule_name, Rule, AUTOGEN_CRONJOB_PREFIX, AUTOGEN_PREFIX},
};
use podgen_core::traits::{DiagnosticSink, PolicyObject, ReferenceShifter};

use crate::analyze::{analyze, Eligibility};
use crate::resolve::{controller_triple, resolve, ControllerTriple};
use crate::rewrite::rewrite_paths;
use crate::shift::VariableReferenceShifter;
use crate::transform::RuleTransformer;

/// One RFC 6902 operation on a policy's rule list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RulePatch {
    pub path: String,
    pub op: PatchOp,
    pub value: Rule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Replace,
}

/// The autogeneration engine.
///
/// Holds no state besides its message shifter; every method is a pure
/// function of the policy it is given.
pub struct Autogen {
    shifter: Box<dyn ReferenceShifter>,
}

impl Default for Autogen {
    fn default() -> Self {
        Self::new()
    }
}

impl Autogen {
    /// An engine using `VariableReferenceShifter` for validation messages.
    pub fn new() -> Self {
        Self::with_shifter(Box::new(VariableReferenceShifter))
    }

    pub fn with_shifter(shifter: Box<dyn ReferenceShifter>) -> Self {
        Self { shifter }
    }

    fn transformer(&self) -> RuleTransformer<'_> {
        RuleTransformer::new(self.shifter.as_ref())
    }

    /// The controllers rules are generated for.
    ///
    /// Reports ineligibility to `sink`.
    pub fn selection(
        &self,
        policy: &dyn PolicyObject,
        sink: &mut dyn DiagnosticSink,
    ) -> ControllerSelection {
        let eligibility = analyze(&policy.spec().rules);
        report_ineligible(policy, &eligibility, sink);
        resolve(&eligibility, policy.autogen_annotation())
    }

    /// Requested, supported and effective controllers.
    pub fn controllers(&self, policy: &dyn PolicyObject) -> ControllerTriple {
        let eligibility = analyze(&policy.spec().rules);
        controller_triple(&eligibility, policy.autogen_annotation())
    }

    /// The controller kinds rules are generated for, sentinels expanded.
    pub fn autogen_kinds(&self, policy: &dyn PolicyObject) -> BTreeSet<ControllerKind> {
        let eligibility = analyze(&policy.spec().rules);
        resolve(&eligibility, policy.autogen_annotation()).kinds()
    }

    /// The rule names the policy exposes once autogeneration has run.
    ///
    /// Names are predicted from the selection alone; a rule that ends up not
    /// producing a derived rule still contributes its generated names.
    pub fn autogen_rule_names(&self, policy: &dyn PolicyObject) -> Vec<String> {
        let eligibility = analyze(&policy.spec().rules);
        let selection = resolve(&eligibility, policy.autogen_annotation());
        let pod_group = !selection.pod_template_kinds().is_empty();
        let cronjob = selection.includes_cronjob();

        let mut names = Vec::new();
        for rule in policy.spec().rules.iter().filter(|rule| !rule.is_autogen()) {
            names.push(rule.name.clone());
            if pod_group {
                names.push(autogen_rule_name(AUTOGEN_PREFIX, &rule.name));
            }
            if cronjob {
                names.push(autogen_rule_name(AUTOGEN_CRONJOB_PREFIX, &rule.name));
            }
        }
        names
    }

    /// The policy's rules with the derived controller rules appended.
    pub fn compute_rules(
        &self,
        policy: &dyn PolicyObject,
        sink: &mut dyn DiagnosticSink,
    ) -> Vec<Rule> {
        let selection = self.selection(policy, sink);
        self.assemble(&policy.spec().rules, &selection, sink)
    }

    /// Like `compute_rules`, restricted to a single controller kind.
    ///
    /// The rules are returned unchanged if `kind` is not selected.
    pub fn compute_rules_for_kind(
        &self,
        policy: &dyn PolicyObject,
        kind: ControllerKind,
        sink: &mut dyn DiagnosticSink,
    ) -> Vec<Rule> {
        let selection = self.selection(policy, sink);
        if !selection.contains(kind) {
            debug!(kind = %kind, "controller kind not selected");
            return policy.spec().rules.clone();
        }
        let only = ControllerSelection::Kinds(BTreeSet::from([kind]));
        self.assemble(&policy.spec().rules, &only, sink)
    }

    /// JSON patch operations that bring the stored rule list up to date.
    ///
    /// A generated rule with a new name is added after the last rule; one
    /// whose name exists but whose body differs replaces it in place; an
    /// identical one produces nothing.
    pub fn rule_patches(
        &self,
        policy: &dyn PolicyObject,
        sink: &mut dyn DiagnosticSink,
    ) -> Vec<RulePatch> {
        let rules = &policy.spec().rules;
        let selection = self.selection(policy, sink);
        if selection.is_none() {
            return Vec::new();
        }

        let existing: HashMap<&str, (usize, &Rule)> = rules
            .iter()
            .enumerate()
            .map(|(index, rule)| (rule.name.as_str(), (index, rule)))
            .collect();
        let mut insert_at = rules.len();
        let mut patches = Vec::new();
        for generated in self.generate_rules(rules, &selection, sink) {
            match existing.get(generated.name.as_str()) {
                Some((_, current)) if **current == generated => {}
                Some((index, _)) => patches.push(RulePatch {
                    path: format!("/spec/rules/{index}"),
                    op: PatchOp::Replace,
                    value: generated,
                }),
                None => {
                    patches.push(RulePatch {
                        path: format!("/spec/rules/{insert_at}"),
                        op: PatchOp::Add,
                        value: generated,
                    });
                    insert_at += 1;
                }
            }
        }
        patches
    }

    fn assemble(
        &self,
        rules: &[Rule],
        selection: &ControllerSelection,
        sink: &mut dyn DiagnosticSink,
    ) -> Vec<Rule> {
        if selection.is_none() {
            return rules.to_vec();
        }
        let generated = self.generate_rules(rules, selection, sink);
        if generated.is_empty() {
            return rules.to_vec();
        }
        info!(
            generated = generated.len(),
            selection = %selection,
            "generated controller rules"
        );
        rules
            .iter()
            .filter(|rule| !rule.is_autogen())
            .cloned()
            .chain(generated)
            .collect()
    }

    /// Derived rules for `selection`, pod-controller rule before its CronJob
    /// sibling, in rule order.
    pub fn generate_rules(
        &self,
        rules: &[Rule],
        selection: &ControllerSelection,
        sink: &mut dyn DiagnosticSink,
    ) -> Vec<Rule> {
        let transformer = self.transformer();
        let pod_kinds = selection.pod_template_kinds();
        let mut generated = Vec::new();
        for rule in rules {
            if !pod_kinds.is_empty() {
                if let Some(derived) = transformer.generate_rule_for_controllers(rule, &pod_kinds, sink) {
                    push_converted(&mut generated, derived, TargetGroup::PodControllers, sink);
                }
            }
            if selection.includes_cronjob() {
                if let Some(derived) = transformer.generate_cronjob_rule(rule, sink) {
                    push_converted(&mut generated, derived, TargetGroup::CronJob, sink);
                }
            }
        }
        generated
    }
}

fn push_converted(
    generated: &mut Vec<Rule>,
    derived: Rule,
    group: TargetGroup,
    sink: &mut dyn DiagnosticSink,
) {
    let name = derived.name.clone();
    match convert_rule(derived, group) {
        Ok(rule) => generated.push(rule),
        Err(err) => sink.emit(Diagnostic::ConversionFailed {
            rule: name,
            target: group,
            reason: err.to_string(),
        }),
    }
}

/// Round-trip a derived rule through JSON with its expression paths moved
/// below the pod template.
pub fn convert_rule(rule: Rule, group: TargetGroup) -> PodgenResult<Rule> {
    let cel = rule.has_validate_cel();
    let failed = |reason: String| PodgenError::Serialization {
        rule: rule.name.clone(),
        target: group.to_string(),
        reason,
    };
    let raw = serde_json::to_string(&rule).map_err(|e| failed(e.to_string()))?;
    let rewritten = rewrite_paths(&raw, group, cel);
    serde_json::from_str(&rewritten).map_err(|e| failed(e.to_string()))
}

fn report_ineligible(
    policy: &dyn PolicyObject,
    eligibility: &Eligibility,
    sink: &mut dyn DiagnosticSink,
) {
    if let Some(reason) = &eligibility.reason {
        sink.emit(Diagnostic::Ineligible {
            policy: policy.name().to_string(),
            reason: reason.clone(),
        });
    }
}
