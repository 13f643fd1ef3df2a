// reference.rs — Registry of compiled policies addressable by URI.
//
// `PolicyReference` elements are resolved against this registry at build
// time by inlining a copy of the referenced policy. Registered policies are
// already compiled, so inlining cannot create cycles.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::component::Policy;

/// URI → compiled policy table.
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    policies: RwLock<HashMap<String, Policy>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the policy for a URI.
    pub fn register(&self, uri: impl Into<String>, policy: Policy) {
        self.policies.write().insert(uri.into(), policy);
    }

    pub fn remove(&self, uri: &str) -> Option<Policy> {
        self.policies.write().remove(uri)
    }

    /// Look up a policy by URI. A same-document reference (`#id`) also
    /// matches a policy registered under the bare `id`.
    pub fn lookup(&self, uri: &str) -> Option<Policy> {
        let policies = self.policies.read();
        policies
            .get(uri)
            .or_else(|| uri.strip_prefix('#').and_then(|id| policies.get(id)))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.policies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.read().is_empty()
    }
}
