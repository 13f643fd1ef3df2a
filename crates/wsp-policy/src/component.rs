// component.rs — The compiled policy tree.
//
// A policy is a closed tree of five node kinds: two leaves (`Assertion`,
// `NestedAssertion`) and three containers (`Conjunction`, `Disjunction`,
// `Policy`). Each node owns its children; trees are built once and then
// only read, so they can be shared across threads without locking.

use std::collections::HashSet;
use std::fmt;

use crate::qname::QualifiedName;

/// A leaf requirement identified by its qualified name.
///
/// `optional` only matters to the normalizer (it becomes an explicit
/// "or nothing" alternative). `ignorable` is carried for consumers and never
/// changes an evaluation outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    pub name: QualifiedName,
    pub optional: bool,
    pub ignorable: bool,
}

impl Assertion {
    /// A mandatory, non-ignorable assertion.
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            optional: false,
            ignorable: false,
        }
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn ignorable(mut self, ignorable: bool) -> Self {
        self.ignorable = ignorable;
        self
    }

    /// Copy of this assertion with `optional` forced off.
    pub fn clone_mandatory(&self) -> Self {
        Self {
            optional: false,
            ..self.clone()
        }
    }
}

/// A leaf requirement that also embeds a sub-policy which must hold.
///
/// With `required_mode` the outer name must itself be asserted *and* the
/// nested policy must hold; without it only the nested policy is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedAssertion {
    pub base: Assertion,
    pub required_mode: bool,
    pub nested: Option<Policy>,
}

impl NestedAssertion {
    pub fn new(base: Assertion, required_mode: bool, nested: Option<Policy>) -> Self {
        Self {
            base,
            required_mode,
            nested,
        }
    }

    pub fn name(&self) -> &QualifiedName {
        &self.base.name
    }

    /// Copy with `optional` forced off; the nested policy is kept as is.
    pub fn clone_mandatory(&self) -> Self {
        Self {
            base: self.base.clone_mandatory(),
            required_mode: self.required_mode,
            nested: self.nested.clone(),
        }
    }
}

/// A named container at the top of a compiled policy.
///
/// Once normalized, `body` is always a `Disjunction` of `Conjunction`s of
/// leaves. Before that it may be any component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub name: Option<String>,
    pub body: Box<PolicyComponent>,
}

impl Policy {
    pub fn new(body: PolicyComponent) -> Self {
        Self {
            name: None,
            body: Box::new(body),
        }
    }

    pub fn named(name: impl Into<String>, body: PolicyComponent) -> Self {
        Self {
            name: Some(name.into()),
            body: Box::new(body),
        }
    }

    /// A policy with no requirements (an empty conjunction); always satisfied.
    pub fn empty() -> Self {
        Self::new(PolicyComponent::Conjunction(Vec::new()))
    }

    /// Combine two policies so that both must hold.
    ///
    /// The result keeps this policy's name and is returned normalized: its
    /// alternatives are the cross product of both policies' alternatives.
    pub fn merge(&self, other: &Policy) -> Policy {
        Policy {
            name: self.name.clone(),
            body: Box::new(PolicyComponent::Conjunction(vec![
                (*self.body).clone(),
                (*other.body).clone(),
            ])),
        }
        .normalize()
    }

    /// Fold `merge` over several policies. The result is normalized, even
    /// for a single policy. No policies yields `Policy::empty()`.
    pub fn aggregate<'a>(policies: impl IntoIterator<Item = &'a Policy>) -> Policy {
        let mut aggregated: Option<Policy> = None;
        for policy in policies {
            aggregated = Some(match aggregated {
                None => policy.normalize(),
                Some(acc) => acc.merge(policy),
            });
        }
        aggregated.unwrap_or_else(Policy::empty)
    }

    /// Structural equality that ignores policy names and leaf flags.
    pub fn equivalent(&self, other: &Policy) -> bool {
        self.body.equivalent(&other.body)
    }
}

/// A node of a compiled policy tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyComponent {
    Assertion(Assertion),
    NestedAssertion(NestedAssertion),
    /// AND. Empty is vacuously satisfied.
    Conjunction(Vec<PolicyComponent>),
    /// OR. Empty is unsatisfiable.
    Disjunction(Vec<PolicyComponent>),
    Policy(Policy),
}

impl PolicyComponent {
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            PolicyComponent::Assertion(_) | PolicyComponent::NestedAssertion(_)
        )
    }

    /// The leaf's qualified name; `None` for containers.
    pub fn name(&self) -> Option<&QualifiedName> {
        match self {
            PolicyComponent::Assertion(a) => Some(&a.name),
            PolicyComponent::NestedAssertion(n) => Some(n.name()),
            _ => None,
        }
    }

    /// Whether this is an optional leaf. Containers are never optional.
    pub fn is_optional(&self) -> bool {
        match self {
            PolicyComponent::Assertion(a) => a.optional,
            PolicyComponent::NestedAssertion(n) => n.base.optional,
            _ => false,
        }
    }

    /// Whether this is an ignorable leaf.
    pub fn is_ignorable(&self) -> bool {
        match self {
            PolicyComponent::Assertion(a) => a.ignorable,
            PolicyComponent::NestedAssertion(n) => n.base.ignorable,
            _ => false,
        }
    }

    /// Mandatory copy of a leaf; `None` for containers.
    pub fn clone_mandatory(&self) -> Option<PolicyComponent> {
        match self {
            PolicyComponent::Assertion(a) => Some(PolicyComponent::Assertion(a.clone_mandatory())),
            PolicyComponent::NestedAssertion(n) => {
                Some(PolicyComponent::NestedAssertion(n.clone_mandatory()))
            }
            _ => None,
        }
    }

    /// Structural equality used to match declared assertions at evaluation time.
    ///
    /// Leaves match on name (and, for nested assertions, on equivalent nested
    /// policies). `optional`, `ignorable`, `required_mode` and policy names are
    /// never compared. Containers match when their kinds agree and their
    /// children are pairwise equivalent in order.
    pub fn equivalent(&self, other: &PolicyComponent) -> bool {
        match (self, other) {
            (PolicyComponent::Assertion(a), PolicyComponent::Assertion(b)) => a.name == b.name,
            (PolicyComponent::NestedAssertion(a), PolicyComponent::NestedAssertion(b)) => {
                a.name() == b.name()
                    && match (&a.nested, &b.nested) {
                        (None, None) => true,
                        (Some(x), Some(y)) => x.equivalent(y),
                        _ => false,
                    }
            }
            (PolicyComponent::Conjunction(a), PolicyComponent::Conjunction(b))
            | (PolicyComponent::Disjunction(a), PolicyComponent::Disjunction(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equivalent(y))
            }
            (PolicyComponent::Policy(a), PolicyComponent::Policy(b)) => a.equivalent(b),
            _ => false,
        }
    }

    /// Every leaf reachable through operators and policies, in document order.
    ///
    /// Nested sub-policies are not descended into: a nested assertion counts
    /// as one leaf of its parent.
    pub fn assertions(&self, include_optional: bool) -> Vec<&PolicyComponent> {
        let mut out = Vec::new();
        self.collect_assertions(include_optional, &mut out);
        out
    }

    fn collect_assertions<'a>(&'a self, include_optional: bool, out: &mut Vec<&'a PolicyComponent>) {
        match self {
            PolicyComponent::Assertion(_) | PolicyComponent::NestedAssertion(_) => {
                if include_optional || !self.is_optional() {
                    out.push(self);
                }
            }
            PolicyComponent::Conjunction(children) | PolicyComponent::Disjunction(children) => {
                for child in children {
                    child.collect_assertions(include_optional, out);
                }
            }
            PolicyComponent::Policy(policy) => {
                policy.body.collect_assertions(include_optional, out)
            }
        }
    }

    /// The distinct names of `assertions(include_optional)`.
    pub fn vocabulary(&self, include_optional: bool) -> HashSet<QualifiedName> {
        self.assertions(include_optional)
            .into_iter()
            .filter_map(|a| a.name().cloned())
            .collect()
    }
}

impl From<Assertion> for PolicyComponent {
    fn from(assertion: Assertion) -> Self {
        PolicyComponent::Assertion(assertion)
    }
}

impl From<NestedAssertion> for PolicyComponent {
    fn from(nested: NestedAssertion) -> Self {
        PolicyComponent::NestedAssertion(nested)
    }
}

impl From<Policy> for PolicyComponent {
    fn from(policy: Policy) -> Self {
        PolicyComponent::Policy(policy)
    }
}

fn write_children(f: &mut fmt::Formatter<'_>, children: &[PolicyComponent]) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", child)?;
    }
    Ok(())
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.optional {
            write!(f, "?")?;
        }
        Ok(())
    }
}

impl fmt::Display for NestedAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        match &self.nested {
            Some(policy) => write!(f, "[{}]", policy),
            None => write!(f, "[]"),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "Policy<{}>({})", name, self.body),
            None => write!(f, "Policy({})", self.body),
        }
    }
}

impl fmt::Display for PolicyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyComponent::Assertion(a) => write!(f, "{}", a),
            PolicyComponent::NestedAssertion(n) => write!(f, "{}", n),
            PolicyComponent::Conjunction(children) => {
                write!(f, "All(")?;
                write_children(f, children)?;
                write!(f, ")")
            }
            PolicyComponent::Disjunction(children) => {
                write!(f, "ExactlyOne(")?;
                write_children(f, children)?;
                write!(f, ")")
            }
            PolicyComponent::Policy(p) => write!(f, "{}", p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::is_satisfied_policy;
    use crate::state::AssertionStateMap;

    fn qn(local: &str) -> QualifiedName {
        QualifiedName::new("urn:test", local)
    }

    fn leaf(local: &str) -> PolicyComponent {
        Assertion::new(qn(local)).into()
    }

    #[test]
    fn clone_mandatory_clears_optional_only() {
        let a = Assertion::new(qn("A")).optional(true).ignorable(true);
        let m = a.clone_mandatory();
        assert!(!m.optional);
        assert!(m.ignorable);
        assert_eq!(m.name, a.name);
    }

    #[test]
    fn nested_clone_mandatory_keeps_sub_policy() {
        let sub = Policy::new(PolicyComponent::Conjunction(vec![leaf("Y")]));
        let nested = NestedAssertion::new(
            Assertion::new(qn("X")).optional(true),
            true,
            Some(sub.clone()),
        );
        let m = nested.clone_mandatory();
        assert!(!m.base.optional);
        assert!(m.required_mode);
        assert_eq!(m.nested, Some(sub));
    }

    #[test]
    fn equivalence_ignores_flags() {
        let a: PolicyComponent = Assertion::new(qn("A")).optional(true).into();
        let b: PolicyComponent = Assertion::new(qn("A")).ignorable(true).into();
        assert!(a.equivalent(&b));
        assert_ne!(a, b);
        assert!(!a.equivalent(&leaf("B")));
    }

    #[test]
    fn nested_equivalence_compares_sub_policies() {
        let with_y = |required| {
            PolicyComponent::from(NestedAssertion::new(
                Assertion::new(qn("X")),
                required,
                Some(Policy::new(PolicyComponent::Conjunction(vec![leaf("Y")]))),
            ))
        };
        let with_z = PolicyComponent::from(NestedAssertion::new(
            Assertion::new(qn("X")),
            true,
            Some(Policy::new(PolicyComponent::Conjunction(vec![leaf("Z")]))),
        ));
        let without = PolicyComponent::from(NestedAssertion::new(Assertion::new(qn("X")), true, None));

        assert!(with_y(true).equivalent(&with_y(false)));
        assert!(!with_y(true).equivalent(&with_z));
        assert!(!with_y(true).equivalent(&without));
        // A plain assertion never matches a nested one, even with the same name.
        assert!(!leaf("X").equivalent(&with_y(true)));
    }

    #[test]
    fn assertions_skip_optional_when_asked() {
        let tree = PolicyComponent::Conjunction(vec![
            leaf("A"),
            Assertion::new(qn("B")).optional(true).into(),
            PolicyComponent::Disjunction(vec![leaf("C")]),
        ]);
        let all: Vec<_> = tree.assertions(true).iter().filter_map(|a| a.name()).cloned().collect();
        assert_eq!(all, vec![qn("A"), qn("B"), qn("C")]);

        let mandatory = tree.vocabulary(false);
        assert!(mandatory.contains(&qn("A")));
        assert!(!mandatory.contains(&qn("B")));
        assert!(mandatory.contains(&qn("C")));
    }

    #[test]
    fn assertions_do_not_descend_into_nested_policies() {
        let tree = PolicyComponent::from(Policy::new(PolicyComponent::Conjunction(vec![
            NestedAssertion::new(
                Assertion::new(qn("X")),
                true,
                Some(Policy::new(PolicyComponent::Conjunction(vec![leaf("Y")]))),
            )
            .into(),
        ])));
        let vocabulary = tree.vocabulary(true);
        assert_eq!(vocabulary.len(), 1);
        assert!(vocabulary.contains(&qn("X")));
    }

    #[test]
    fn merge_requires_both_bodies() {
        let p1 = Policy::named("p1", leaf("A"));
        let p2 = Policy::named("p2", leaf("B"));
        let merged = p1.merge(&p2);
        assert_eq!(merged.name.as_deref(), Some("p1"));
        assert_eq!(
            *merged.body,
            PolicyComponent::Disjunction(vec![PolicyComponent::Conjunction(vec![leaf("A"), leaf("B")])])
        );
    }

    #[test]
    fn merged_operator_bodies_both_hold_without_renormalizing() {
        let p1 = Policy::new(PolicyComponent::Disjunction(vec![PolicyComponent::Conjunction(vec![leaf("A")])]));
        let p2 = Policy::new(PolicyComponent::Disjunction(vec![PolicyComponent::Conjunction(vec![leaf("B")])]));
        let merged = p1.merge(&p2);

        let mut state = AssertionStateMap::from_policy(&merged);
        state.assert_name(&qn("A"));
        assert!(!is_satisfied_policy(&merged, &state));

        state.assert_name(&qn("B"));
        assert!(is_satisfied_policy(&merged, &state));
    }

    #[test]
    fn aggregate_of_nothing_is_empty_policy() {
        assert_eq!(Policy::aggregate(std::iter::empty()), Policy::empty());
    }

    #[test]
    fn aggregate_single_policy_is_normalized() {
        let p = Policy::named("only", leaf("A"));
        let aggregated = Policy::aggregate([&p]);
        assert_eq!(aggregated, p.normalize());
        assert!(aggregated.is_normalized());
    }

    #[test]
    fn display_renders_operators_and_optional_marker() {
        let tree = PolicyComponent::Disjunction(vec![
            PolicyComponent::Conjunction(vec![leaf("A")]),
            PolicyComponent::Conjunction(vec![Assertion::new(qn("B")).optional(true).into()]),
        ]);
        assert_eq!(
            tree.to_string(),
            "ExactlyOne(All({urn:test}A), All({urn:test}B?))"
        );
    }
}
