// builder.rs — Compiles external element trees into policy components.
//
// Structural elements become containers:
//
//   Policy          → Policy { body }   (children are implicitly ANDed)
//   All             → Conjunction
//   ExactlyOne      → Disjunction
//   PolicyReference → the referenced Policy, inlined
//
// A container with a PolicyReference among its direct children is built
// normalized, so the referenced alternatives are crossed with its siblings
// instead of sitting beside them as an operator.
//
// Everything else is a leaf. A leaf whose only child is a Policy element is
// a nested assertion; any other shape of policy children degrades to a
// generic leaf. Building never fails: malformed input produces opaque
// leaves or empty operators that evaluate under the vacuous rules.

use crate::component::{NestedAssertion, Policy, PolicyComponent};
use crate::element::PolicyElement;
use crate::normalize::normalize;
use crate::reference::PolicyRegistry;
use crate::registry::AssertionBuilderRegistry;

/// Walks an element tree, delegating leaves to an assertion registry.
///
/// The builder borrows its registries; it holds no state of its own, so one
/// builder can be shared by concurrent builds and handed to registered
/// constructors for recursive sub-policy compilation.
#[derive(Clone, Copy)]
pub struct PolicyBuilder<'r> {
    registry: &'r AssertionBuilderRegistry,
    references: Option<&'r PolicyRegistry>,
}

impl<'r> PolicyBuilder<'r> {
    pub fn new(registry: &'r AssertionBuilderRegistry) -> Self {
        Self {
            registry,
            references: None,
        }
    }

    /// Resolve `PolicyReference` elements against `references`.
    pub fn with_references(mut self, references: &'r PolicyRegistry) -> Self {
        self.references = Some(references);
        self
    }

    pub fn registry(&self) -> &'r AssertionBuilderRegistry {
        self.registry
    }

    /// Compile an element into a `Policy`, wrapping non-policy results in an
    /// unnamed policy.
    pub fn build_policy(&self, element: &dyn PolicyElement) -> Policy {
        match self.build_component(element) {
            PolicyComponent::Policy(policy) => policy,
            other => Policy::new(other),
        }
    }

    /// Compile one element (and its subtree).
    pub fn build_component(&self, element: &dyn PolicyElement) -> PolicyComponent {
        let vocabulary = self.registry.vocabulary();
        let name = element.name();

        if name == &vocabulary.policy {
            let children = self.build_children(element);
            let body = if self.has_reference_child(element) {
                normalize(&PolicyComponent::Conjunction(children))
            } else {
                policy_body(children)
            };
            let policy = Policy {
                name: element
                    .attribute(&vocabulary.name_attribute)
                    .map(str::to_string),
                body: Box::new(body),
            };
            PolicyComponent::Policy(policy)
        } else if name == &vocabulary.all {
            self.build_operator(element, PolicyComponent::Conjunction)
        } else if name == &vocabulary.exactly_one {
            self.build_operator(element, PolicyComponent::Disjunction)
        } else if name == &vocabulary.policy_reference {
            self.resolve_reference(element)
        } else {
            self.build_leaf(element)
        }
    }

    fn build_operator(
        &self,
        element: &dyn PolicyElement,
        operator: fn(Vec<PolicyComponent>) -> PolicyComponent,
    ) -> PolicyComponent {
        let built = operator(self.build_children(element));
        if self.has_reference_child(element) {
            normalize(&built)
        } else {
            built
        }
    }

    fn has_reference_child(&self, element: &dyn PolicyElement) -> bool {
        let marker = &self.registry.vocabulary().policy_reference;
        element.children().iter().any(|child| child.name() == marker)
    }

    fn build_children(&self, element: &dyn PolicyElement) -> Vec<PolicyComponent> {
        element
            .children()
            .into_iter()
            .map(|child| self.build_component(child))
            .collect()
    }

    fn build_leaf(&self, element: &dyn PolicyElement) -> PolicyComponent {
        // Registered constructors decide the shape of their own kinds.
        if self.registry.is_registered(element.name()) {
            return self.registry.build_with(element, self);
        }

        let policy_marker = &self.registry.vocabulary().policy;
        let children = element.children();
        let policy_children = children
            .iter()
            .filter(|c| c.name() == policy_marker)
            .count();

        match (policy_children, children.as_slice()) {
            (0, _) => self.registry.build_with(element, self),
            (1, [only]) => {
                let base = self.registry.generic_leaf(element);
                let nested = self.build_policy(*only);
                NestedAssertion::new(base, true, Some(nested)).into()
            }
            _ => {
                tracing::debug!(
                    "{} has {} policy children among {} children; using generic leaf",
                    element.name(),
                    policy_children,
                    children.len()
                );
                self.registry.generic_leaf(element).into()
            }
        }
    }

    fn resolve_reference(&self, element: &dyn PolicyElement) -> PolicyComponent {
        let uri_attribute = &self.registry.vocabulary().uri_attribute;
        let resolved = element.attribute(uri_attribute).and_then(|uri| {
            self.references
                .and_then(|references| references.lookup(uri))
        });

        match resolved {
            Some(policy) => PolicyComponent::Policy(policy),
            None => {
                // Unresolvable: an empty ExactlyOne, which nothing satisfies.
                tracing::warn!(
                    "unresolved policy reference '{}'",
                    element.attribute(uri_attribute).unwrap_or("")
                );
                PolicyComponent::Disjunction(Vec::new())
            }
        }
    }
}

/// A policy's children are implicitly ANDed. A lone operator child is used
/// directly as the body.
fn policy_body(mut children: Vec<PolicyComponent>) -> PolicyComponent {
    if children.len() == 1 && !children[0].is_leaf() {
        return children.remove(0);
    }
    PolicyComponent::Conjunction(children)
}
