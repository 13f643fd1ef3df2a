// registry.rs — Assertion builder registry.
//
// Maps assertion qualified names to constructors. Unknown names are never an
// error: they become generic leaves that carry only the `Optional` and
// `Ignorable` attributes. Registrations usually happen once at startup;
// lookups are concurrent reads.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::builder::PolicyBuilder;
use crate::component::{Assertion, NestedAssertion, PolicyComponent};
use crate::config::{PolicyConfig, PolicyVocabulary};
use crate::element::{parse_bool_attribute, PolicyElement};
use crate::qname::QualifiedName;

/// Constructs a component from an element.
///
/// The builder is passed in so that constructors for nested kinds can
/// compile their sub-policies with the same registry.
pub trait AssertionBuilder: Send + Sync {
    fn build(&self, element: &dyn PolicyElement, builder: &PolicyBuilder<'_>) -> PolicyComponent;
}

impl<F> AssertionBuilder for F
where
    F: Fn(&dyn PolicyElement, &PolicyBuilder<'_>) -> PolicyComponent + Send + Sync,
{
    fn build(&self, element: &dyn PolicyElement, builder: &PolicyBuilder<'_>) -> PolicyComponent {
        self(element, builder)
    }
}

/// Builds nested assertions with a fixed `required_mode`.
struct NestedAssertionBuilder {
    required_mode: bool,
}

impl AssertionBuilder for NestedAssertionBuilder {
    fn build(&self, element: &dyn PolicyElement, builder: &PolicyBuilder<'_>) -> PolicyComponent {
        let registry = builder.registry();
        let policy_marker = &registry.vocabulary().policy;
        let base = registry.generic_leaf(element);

        let policies: Vec<&dyn PolicyElement> = element
            .children()
            .into_iter()
            .filter(|c| c.name() == policy_marker)
            .collect();

        match policies.as_slice() {
            [] => NestedAssertion::new(base, self.required_mode, None).into(),
            [only] => {
                let nested = builder.build_policy(*only);
                NestedAssertion::new(base, self.required_mode, Some(nested)).into()
            }
            _ => {
                tracing::debug!(
                    "nested assertion {} has {} policy children; using generic leaf",
                    base.name,
                    policies.len()
                );
                base.into()
            }
        }
    }
}

/// Name → constructor table plus the vocabulary used to read leaf attributes.
pub struct AssertionBuilderRegistry {
    vocabulary: PolicyVocabulary,
    ignore_unknown_assertions: bool,
    builders: RwLock<HashMap<QualifiedName, Arc<dyn AssertionBuilder>>>,
}

impl AssertionBuilderRegistry {
    /// Empty registry using the WS-Policy 1.5 vocabulary.
    pub fn new() -> Self {
        Self::with_vocabulary(PolicyVocabulary::default())
    }

    pub fn with_vocabulary(vocabulary: PolicyVocabulary) -> Self {
        Self {
            vocabulary,
            ignore_unknown_assertions: true,
            builders: RwLock::new(HashMap::new()),
        }
    }

    /// Registry configured from `wsp.toml`, with its nested kinds registered.
    pub fn from_config(config: &PolicyConfig) -> Self {
        let mut registry = Self::with_vocabulary(config.vocabulary());
        registry.ignore_unknown_assertions = config.registry.ignore_unknown_assertions;
        for kind in &config.registry.nested {
            registry.register_nested(kind.name.clone(), kind.required);
        }
        registry
    }

    pub fn vocabulary(&self) -> &PolicyVocabulary {
        &self.vocabulary
    }

    /// Register (or replace) the constructor for an assertion name.
    pub fn register(&self, name: QualifiedName, builder: impl AssertionBuilder + 'static) {
        tracing::debug!("registering assertion builder for {}", name);
        self.builders.write().insert(name, Arc::new(builder));
    }

    /// Register a closure as the constructor for an assertion name.
    pub fn register_fn<F>(&self, name: QualifiedName, f: F)
    where
        F: Fn(&dyn PolicyElement, &PolicyBuilder<'_>) -> PolicyComponent + Send + Sync + 'static,
    {
        self.register(name, f);
    }

    /// Register `name` as a nested-assertion kind.
    pub fn register_nested(&self, name: QualifiedName, required_mode: bool) {
        self.register(name, NestedAssertionBuilder { required_mode });
    }

    pub fn is_registered(&self, name: &QualifiedName) -> bool {
        self.builders.read().contains_key(name)
    }

    pub fn lookup(&self, name: &QualifiedName) -> Option<Arc<dyn AssertionBuilder>> {
        self.builders.read().get(name).cloned()
    }

    /// Build a leaf from an element using a fresh builder over this registry.
    pub fn build(&self, element: &dyn PolicyElement) -> PolicyComponent {
        self.build_with(element, &PolicyBuilder::new(self))
    }

    /// Build a leaf, handing registered constructors the given builder.
    pub fn build_with(&self, element: &dyn PolicyElement, builder: &PolicyBuilder<'_>) -> PolicyComponent {
        // The lock is released before the constructor runs: constructors may
        // recurse into this registry.
        match self.lookup(element.name()) {
            Some(ctor) => ctor.build(element, builder),
            None => {
                if self.ignore_unknown_assertions {
                    tracing::debug!("no builder for {}; using generic leaf", element.name());
                } else {
                    tracing::warn!("unknown assertion {}; using generic leaf", element.name());
                }
                self.generic_leaf(element).into()
            }
        }
    }

    /// The generic leaf for an element: its name plus the two recognized flags.
    /// Every other attribute and all children are ignored.
    pub fn generic_leaf(&self, element: &dyn PolicyElement) -> Assertion {
        Assertion::new(element.name().clone())
            .optional(parse_bool_attribute(
                element.attribute(&self.vocabulary.optional_attribute),
            ))
            .ignorable(parse_bool_attribute(
                element.attribute(&self.vocabulary.ignorable_attribute),
            ))
    }
}

impl Default for AssertionBuilderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
