// evaluator.rs — Decides whether a policy holds against an assertion state map.
//
// The walk is recursive and read-only. Leaves are looked up in the state map;
// nested assertions additionally evaluate their sub-policy, normalized on the
// spot, as a unit.
//
// Operator nodes use a structural tie-break: the first child decides how the
// whole children list is read, whatever the node's own tag.
//
// 1. First child is a leaf → every child must hold (AND)
// 2. First child is an operator or policy → at least one child must hold (OR)
// 3. No children → the tag decides: `All()` holds, `ExactlyOne()` does not
//
// This matches the normalized shape `ExactlyOne(All(leaf, ..), ..)` and
// tolerates un-normalized trees. Evaluation never fails: an empty state map
// simply leaves every leaf requirement unsatisfied.

use serde::{Deserialize, Serialize};

use crate::component::{NestedAssertion, Policy, PolicyComponent};
use crate::state::AssertionStateMap;

/// A node visited during evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluationStep {
    /// Distance from the evaluated root (root is 0).
    pub depth: usize,
    /// Which rule was applied (e.g., "assertion", "all_of", "any_of").
    pub check: String,
    /// The node the rule was applied to, rendered for humans.
    pub subject: String,
    /// "satisfied" or "unsatisfied".
    pub outcome: String,
}

/// Verdict plus the ordered (pre-order) list of nodes checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationTrace {
    pub satisfied: bool,
    pub steps: Vec<EvaluationStep>,
}

/// Whether `component` is satisfied by `state`.
pub fn is_satisfied(component: &PolicyComponent, state: &AssertionStateMap) -> bool {
    Evaluator::new(state, false).component(component)
}

/// Whether `policy` is satisfied by `state`. Applies the operator rule to the
/// policy body (or the leaf rule, when the body is a single leaf).
pub fn is_satisfied_policy(policy: &Policy, state: &AssertionStateMap) -> bool {
    Evaluator::new(state, false).policy(policy)
}

/// Evaluate and record every node checked.
pub fn evaluate_with_trace(component: &PolicyComponent, state: &AssertionStateMap) -> EvaluationTrace {
    let mut evaluator = Evaluator::new(state, true);
    let satisfied = evaluator.component(component);
    EvaluationTrace {
        satisfied,
        steps: evaluator.steps.unwrap_or_default(),
    }
}

struct Evaluator<'s> {
    state: &'s AssertionStateMap,
    steps: Option<Vec<EvaluationStep>>,
    depth: usize,
}

impl<'s> Evaluator<'s> {
    fn new(state: &'s AssertionStateMap, trace: bool) -> Self {
        Self {
            state,
            steps: trace.then(Vec::new),
            depth: 0,
        }
    }

    fn component(&mut self, component: &PolicyComponent) -> bool {
        match component {
            PolicyComponent::Assertion(_) => {
                let step = self.begin("assertion", || component.to_string());
                let satisfied = self.asserted(component);
                self.finish(step, satisfied)
            }
            PolicyComponent::NestedAssertion(nested) => self.nested(component, nested),
            PolicyComponent::Conjunction(children) => self.group(component, children, true),
            PolicyComponent::Disjunction(children) => self.group(component, children, false),
            PolicyComponent::Policy(policy) => self.policy(policy),
        }
    }

    fn policy(&mut self, policy: &Policy) -> bool {
        let step = self.begin("policy", || match &policy.name {
            Some(name) => format!("Policy<{}>", name),
            None => "Policy".to_string(),
        });
        self.depth += 1;
        let satisfied = self.component(&policy.body);
        self.depth -= 1;
        self.finish(step, satisfied)
    }

    /// Base leaf rule: some occurrence under the same name is asserted and
    /// structurally equal to `leaf`.
    fn asserted(&self, leaf: &PolicyComponent) -> bool {
        let Some(name) = leaf.name() else {
            return false;
        };
        let satisfied = self
            .state
            .lookup(name)
            .iter()
            .any(|info| info.is_asserted() && info.assertion().equivalent(leaf));
        tracing::trace!(assertion = %name, satisfied, "leaf decision");
        satisfied
    }

    fn nested(&mut self, component: &PolicyComponent, nested: &NestedAssertion) -> bool {
        let step = self.begin("nested_assertion", || component.to_string());

        // The sub-policy is kept as built and normalized here, so optional
        // leaves inside it get their empty alternative.
        let base_ok = !nested.required_mode || self.asserted(component);
        let satisfied = base_ok
            && match &nested.nested {
                Some(policy) => {
                    self.depth += 1;
                    let ok = self.policy(&policy.normalize());
                    self.depth -= 1;
                    ok
                }
                None => true,
            };

        self.finish(step, satisfied)
    }

    fn group(&mut self, component: &PolicyComponent, children: &[PolicyComponent], empty: bool) -> bool {
        let Some(first) = children.first() else {
            let check = if empty { "empty_all" } else { "empty_exactly_one" };
            let step = self.begin(check, || component.to_string());
            return self.finish(step, empty);
        };

        let every = first.is_leaf();
        let check = if every { "all_of" } else { "any_of" };
        let step = self.begin(check, || group_subject(component, children.len()));

        self.depth += 1;
        let satisfied = if every {
            children.iter().all(|child| self.component(child))
        } else {
            children.iter().any(|child| self.component(child))
        };
        self.depth -= 1;

        self.finish(step, satisfied)
    }

    fn begin(&mut self, check: &str, subject: impl FnOnce() -> String) -> Option<usize> {
        let depth = self.depth;
        self.steps.as_mut().map(|steps| {
            steps.push(EvaluationStep {
                depth,
                check: check.to_string(),
                subject: subject(),
                outcome: String::new(),
            });
            steps.len() - 1
        })
    }

    fn finish(&mut self, step: Option<usize>, satisfied: bool) -> bool {
        if let (Some(steps), Some(index)) = (self.steps.as_mut(), step) {
            steps[index].outcome = if satisfied { "satisfied" } else { "unsatisfied" }.to_string();
        }
        satisfied
    }
}

fn group_subject(component: &PolicyComponent, len: usize) -> String {
    let tag = match component {
        PolicyComponent::Disjunction(_) => "ExactlyOne",
        _ => "All",
    };
    format!("{}({} children)", tag, len)
}
