// state.rs — Runtime record of which assertions were honored.
//
// The negotiation layer fills an `AssertionStateMap` while a message exchange
// runs: each declared assertion gets an `AssertionInfo`, later flagged as
// asserted (or not, with a reason). Several occurrences may share a name.
// The evaluator only reads the map; callers must not mutate a map while an
// evaluation over it is in flight.

use std::collections::HashMap;

use crate::component::{Assertion, NestedAssertion, Policy, PolicyComponent};
use crate::error::PolicyError;
use crate::evaluator;
use crate::qname::QualifiedName;

/// One declared occurrence of an assertion and whether it was honored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionInfo {
    name: QualifiedName,
    assertion: PolicyComponent,
    asserted: bool,
    not_asserted_reason: Option<String>,
}

impl AssertionInfo {
    fn from_leaf(name: QualifiedName, assertion: PolicyComponent) -> Self {
        Self {
            name,
            assertion,
            asserted: false,
            not_asserted_reason: None,
        }
    }

    /// Info for a leaf component; `None` for containers.
    pub fn for_component(component: &PolicyComponent) -> Option<Self> {
        if !component.is_leaf() {
            return None;
        }
        let name = component.name()?.clone();
        Some(Self::from_leaf(name, component.clone()))
    }

    /// The declared assertion (always a leaf).
    pub fn assertion(&self) -> &PolicyComponent {
        &self.assertion
    }

    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    pub fn is_asserted(&self) -> bool {
        self.asserted
    }

    pub fn set_asserted(&mut self, asserted: bool) {
        self.asserted = asserted;
        if asserted {
            self.not_asserted_reason = None;
        }
    }

    pub fn set_not_asserted(&mut self, reason: impl Into<String>) {
        self.asserted = false;
        self.not_asserted_reason = Some(reason.into());
    }

    pub fn not_asserted_reason(&self) -> Option<&str> {
        self.not_asserted_reason.as_deref()
    }
}

impl From<Assertion> for AssertionInfo {
    fn from(assertion: Assertion) -> Self {
        Self::from_leaf(assertion.name.clone(), assertion.into())
    }
}

impl From<NestedAssertion> for AssertionInfo {
    fn from(nested: NestedAssertion) -> Self {
        Self::from_leaf(nested.name().clone(), nested.into())
    }
}

/// Multi-map from assertion name to its declared occurrences.
#[derive(Debug, Clone, Default)]
pub struct AssertionStateMap {
    entries: HashMap<QualifiedName, Vec<AssertionInfo>>,
}

impl AssertionStateMap {
    /// An empty map. Every leaf requirement evaluates to unsatisfied against it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare every leaf of a component, including optional leaves and the
    /// leaves of nested sub-policies. Nothing is asserted yet.
    pub fn from_component(component: &PolicyComponent) -> Self {
        let mut map = Self::new();
        map.declare_all(component);
        map
    }

    pub fn from_policy(policy: &Policy) -> Self {
        Self::from_component(&policy.body)
    }

    fn declare_all(&mut self, component: &PolicyComponent) {
        for leaf in component.assertions(true) {
            if let PolicyComponent::NestedAssertion(n) = leaf {
                if let Some(nested) = &n.nested {
                    self.declare_all(&nested.body);
                }
            }
            if let Some(info) = AssertionInfo::for_component(leaf) {
                self.insert(info);
            }
        }
    }

    pub fn insert(&mut self, info: AssertionInfo) {
        self.entries.entry(info.name().clone()).or_default().push(info);
    }

    /// All occurrences declared under `name`, in insertion order.
    pub fn lookup(&self, name: &QualifiedName) -> &[AssertionInfo] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mark every occurrence of `name` as asserted. Returns how many were marked.
    pub fn assert_name(&mut self, name: &QualifiedName) -> usize {
        self.update(name, |info| info.set_asserted(true))
    }

    /// Mark every occurrence of `name` as not asserted with a reason.
    pub fn not_assert(&mut self, name: &QualifiedName, reason: &str) -> usize {
        self.update(name, |info| info.set_not_asserted(reason))
    }

    fn update(&mut self, name: &QualifiedName, mut f: impl FnMut(&mut AssertionInfo)) -> usize {
        match self.entries.get_mut(name) {
            Some(infos) => {
                infos.iter_mut().for_each(&mut f);
                infos.len()
            }
            None => 0,
        }
    }

    /// Whether any occurrence of `name` is asserted.
    pub fn is_asserted(&self, name: &QualifiedName) -> bool {
        self.lookup(name).iter().any(AssertionInfo::is_asserted)
    }

    pub fn names(&self) -> impl Iterator<Item = &QualifiedName> {
        self.entries.keys()
    }

    /// Total number of occurrences.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the first alternative of `policy` whose every leaf is satisfied.
    ///
    /// When none is, the error lists (once each, in order of first
    /// appearance) the names of the leaves that were not satisfied.
    pub fn check_effective_policy(&self, policy: &Policy) -> Result<Vec<PolicyComponent>, PolicyError> {
        let mut unasserted: Vec<QualifiedName> = Vec::new();

        for alternative in policy.alternatives() {
            let mut supported = true;
            for leaf in &alternative {
                if !evaluator::is_satisfied(leaf, self) {
                    supported = false;
                    if let Some(name) = leaf.name() {
                        if !unasserted.contains(name) {
                            unasserted.push(name.clone());
                        }
                    }
                }
            }
            if supported {
                return Ok(alternative);
            }
        }

        Err(PolicyError::NoAlternativeSupported { unasserted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qn(local: &str) -> QualifiedName {
        QualifiedName::new("urn:test", local)
    }

    fn leaf(local: &str) -> PolicyComponent {
        Assertion::new(qn(local)).into()
    }

    #[test]
    fn empty_map_has_no_occurrences() {
        let map = AssertionStateMap::new();
        assert!(map.is_empty());
        assert!(map.lookup(&qn("A")).is_empty());
        assert!(!map.is_asserted(&qn("A")));
    }

    #[test]
    fn containers_are_not_recorded() {
        assert!(AssertionInfo::for_component(&PolicyComponent::Conjunction(vec![])).is_none());
        assert!(AssertionInfo::for_component(&leaf("A")).is_some());
    }

    #[test]
    fn occurrences_share_a_name() {
        let mut map = AssertionStateMap::new();
        map.insert(Assertion::new(qn("A")).into());
        map.insert(Assertion::new(qn("A")).optional(true).into());
        assert_eq!(map.lookup(&qn("A")).len(), 2);
        assert_eq!(map.len(), 2);
        assert_eq!(map.names().count(), 1);
    }

    #[test]
    fn assert_name_marks_every_occurrence() {
        let mut map = AssertionStateMap::new();
        map.insert(Assertion::new(qn("A")).into());
        map.insert(Assertion::new(qn("A")).into());
        assert_eq!(map.assert_name(&qn("A")), 2);
        assert!(map.lookup(&qn("A")).iter().all(AssertionInfo::is_asserted));
        assert_eq!(map.assert_name(&qn("Missing")), 0);
    }

    #[test]
    fn not_assert_records_reason() {
        let mut map = AssertionStateMap::new();
        map.insert(Assertion::new(qn("A")).into());
        map.assert_name(&qn("A"));
        map.not_assert(&qn("A"), "no signature");

        let info = &map.lookup(&qn("A"))[0];
        assert!(!info.is_asserted());
        assert_eq!(info.not_asserted_reason(), Some("no signature"));
    }

    #[test]
    fn asserting_clears_reason() {
        let mut info = AssertionInfo::from(Assertion::new(qn("A")));
        info.set_not_asserted("later");
        info.set_asserted(true);
        assert!(info.not_asserted_reason().is_none());
    }

    #[test]
    fn from_component_declares_nested_leaves() {
        let policy = Policy::new(PolicyComponent::Conjunction(vec![
            leaf("A"),
            Assertion::new(qn("B")).optional(true).into(),
            NestedAssertion::new(
                Assertion::new(qn("X")),
                true,
                Some(Policy::new(PolicyComponent::Conjunction(vec![leaf("Y")]))),
            )
            .into(),
        ]));
        let map = AssertionStateMap::from_policy(&policy);
        for name in ["A", "B", "X", "Y"] {
            assert_eq!(map.lookup(&qn(name)).len(), 1, "missing {}", name);
        }
        assert!(map.names().all(|n| !map.is_asserted(n)));
    }

    #[test]
    fn check_effective_policy_returns_first_supported_alternative() {
        let policy = Policy::new(PolicyComponent::Disjunction(vec![
            PolicyComponent::Conjunction(vec![leaf("A"), leaf("B")]),
            PolicyComponent::Conjunction(vec![leaf("C")]),
        ]));
        let mut map = AssertionStateMap::from_policy(&policy);
        map.assert_name(&qn("C"));

        assert_eq!(map.check_effective_policy(&policy).unwrap(), vec![leaf("C")]);
    }

    #[test]
    fn check_effective_policy_lists_unasserted_names() {
        let policy = Policy::new(PolicyComponent::Disjunction(vec![
            PolicyComponent::Conjunction(vec![leaf("A"), leaf("B")]),
            PolicyComponent::Conjunction(vec![leaf("A"), leaf("C")]),
        ]));
        let mut map = AssertionStateMap::from_policy(&policy);
        map.assert_name(&qn("B"));

        match map.check_effective_policy(&policy) {
            Err(PolicyError::NoAlternativeSupported { unasserted }) => {
                assert_eq!(unasserted, vec![qn("A"), qn("C")]);
            }
            other => panic!("expected NoAlternativeSupported, got {:?}", other),
        }
    }

    #[test]
    fn optional_leaf_never_blocks_effective_policy() {
        let policy = Policy::new(Assertion::new(qn("A")).optional(true).into());
        let map = AssertionStateMap::from_policy(&policy);
        assert_eq!(map.check_effective_policy(&policy).unwrap(), vec![]);
    }
}
