//! # wsp-policy
//!
//! WS-Policy style policy algebra: compile, normalize and evaluate.
//!
//! A policy is a boolean expression over named assertions. It is authored as
//! an element tree (see [`PolicyElement`]), compiled by a [`PolicyBuilder`]
//! into a [`PolicyComponent`] tree, optionally rewritten into disjunctive
//! normal form by [`normalize`], and finally checked against an
//! [`AssertionStateMap`] recording what a live exchange actually honored.
//!
//! ## Key invariants
//!
//! - **Pure compilation**: building and normalizing never fail and never
//!   mutate their input. Malformed input degrades to a generic leaf or an
//!   empty operator, and is reported through `tracing`.
//! - **Normal form**: a normalized policy body is always
//!   `ExactlyOne(All(leaf, ..), ..)`.
//! - **Structural tie-break**: the evaluator reads an operator's children as
//!   AND when the first child is a leaf and as OR otherwise.
//! - **Flags**: `ignorable` never changes an evaluation outcome.
//!
//! ## Example
//!
//! ```
//! use wsp_policy::{
//!     is_satisfied_policy, AssertionBuilderRegistry, AssertionStateMap, Element, PolicyBuilder,
//!     PolicyVocabulary, QualifiedName,
//! };
//!
//! let vocabulary = PolicyVocabulary::default();
//! let a = QualifiedName::new("urn:example", "A");
//! let document = Element::new(vocabulary.policy.clone()).with_child(Element::new(a.clone()));
//!
//! let registry = AssertionBuilderRegistry::new();
//! let policy = PolicyBuilder::new(&registry).build_policy(&document).normalize();
//!
//! let mut state = AssertionStateMap::from_policy(&policy);
//! assert!(!is_satisfied_policy(&policy, &state));
//! state.assert_name(&a);
//! assert!(is_satisfied_policy(&policy, &state));
//! ```

pub mod alternative;
pub mod builder;
pub mod component;
pub mod config;
pub mod element;
pub mod error;
pub mod evaluator;
pub mod normalize;
pub mod qname;
pub mod reference;
pub mod registry;
pub mod state;

pub use alternative::Assertor;
pub use builder::PolicyBuilder;
pub use component::{Assertion, NestedAssertion, Policy, PolicyComponent};
pub use config::{
    NestedKindConfig, PolicyConfig, PolicyVocabulary, RegistryConfig, VocabularyConfig,
    WS_POLICY_NAMESPACE, WS_POLICY_SUBMISSION_NAMESPACE,
};
pub use element::{parse_bool_attribute, Element, PolicyElement};
pub use error::PolicyError;
pub use evaluator::{
    evaluate_with_trace, is_satisfied, is_satisfied_policy, EvaluationStep, EvaluationTrace,
};
pub use normalize::{alternatives, normalize};
pub use qname::QualifiedName;
pub use reference::PolicyRegistry;
pub use registry::{AssertionBuilder, AssertionBuilderRegistry};
pub use state::{AssertionInfo, AssertionStateMap};
