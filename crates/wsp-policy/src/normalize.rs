// normalize.rs — Rewrites a policy into disjunctive normal form.
//
// Every policy becomes ExactlyOne(All(leaf, ...), All(...), ...): one level of
// alternatives, each a list of mandatory leaves. Optional leaves turn into a
// choice between "require it" and the empty alternative. Nested assertions
// are leaves here; their sub-policies are left as they are and evaluated as
// a unit.
//
// Normalization is pure: the input tree is never modified.

use crate::component::{Policy, PolicyComponent};

/// Normalize a component.
///
/// - mandatory leaf → `All(leaf)`
/// - optional leaf → `ExactlyOne(All(mandatory leaf), All())`
/// - `All` → cross product of its children's alternatives; stays an `All`
///   when exactly one alternative results, otherwise `ExactlyOne(All, ...)`
/// - `ExactlyOne` → `ExactlyOne(All, ...)` with the children's alternatives
///   concatenated
/// - `Policy` → same name, body always `ExactlyOne(All, ...)`
pub fn normalize(component: &PolicyComponent) -> PolicyComponent {
    match component {
        PolicyComponent::Disjunction(_) => disjunction_of(alternatives(component)),
        PolicyComponent::Policy(policy) => PolicyComponent::Policy(policy.normalize()),
        _ => {
            let mut alts = alternatives(component);
            if alts.len() == 1 {
                PolicyComponent::Conjunction(alts.remove(0))
            } else {
                disjunction_of(alts)
            }
        }
    }
}

/// The alternatives of a component: each inner `Vec` holds the mandatory
/// leaves that must all hold for that alternative.
pub fn alternatives(component: &PolicyComponent) -> Vec<Vec<PolicyComponent>> {
    match component {
        PolicyComponent::Assertion(a) => leaf_alternatives(a.clone_mandatory().into(), a.optional),
        PolicyComponent::NestedAssertion(n) => {
            leaf_alternatives(n.clone_mandatory().into(), n.base.optional)
        }
        PolicyComponent::Conjunction(children) => {
            let mut product: Vec<Vec<PolicyComponent>> = vec![Vec::new()];
            for child in children {
                let child_alts = alternatives(child);
                product = product
                    .iter()
                    .flat_map(|prefix| {
                        child_alts.iter().map(move |alt| {
                            let mut combined = prefix.clone();
                            combined.extend(alt.iter().cloned());
                            combined
                        })
                    })
                    .collect();
            }
            product
        }
        PolicyComponent::Disjunction(children) => children.iter().flat_map(alternatives).collect(),
        PolicyComponent::Policy(policy) => alternatives(&policy.body),
    }
}

fn leaf_alternatives(mandatory: PolicyComponent, optional: bool) -> Vec<Vec<PolicyComponent>> {
    if optional {
        vec![vec![mandatory], Vec::new()]
    } else {
        vec![vec![mandatory]]
    }
}

fn disjunction_of(alts: Vec<Vec<PolicyComponent>>) -> PolicyComponent {
    PolicyComponent::Disjunction(alts.into_iter().map(PolicyComponent::Conjunction).collect())
}

impl Policy {
    /// Normalized copy of this policy. The body is always an `ExactlyOne`
    /// whose children are `All`s of leaves.
    pub fn normalize(&self) -> Policy {
        Policy {
            name: self.name.clone(),
            body: Box::new(disjunction_of(alternatives(&self.body))),
        }
    }

    /// The normalized alternatives of this policy.
    pub fn alternatives(&self) -> Vec<Vec<PolicyComponent>> {
        alternatives(&self.body)
    }

    /// Whether this policy is already in normal form.
    pub fn is_normalized(&self) -> bool {
        match self.body.as_ref() {
            PolicyComponent::Disjunction(alts) => alts.iter().all(|alt| match alt {
                PolicyComponent::Conjunction(leaves) => leaves.iter().all(PolicyComponent::is_leaf),
                _ => false,
            }),
            _ => false,
        }
    }
}
