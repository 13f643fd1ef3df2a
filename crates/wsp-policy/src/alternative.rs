// alternative.rs — Picking an alternative a runtime can actually honor.
//
// An `Assertor` reports which assertion names it knows how to enforce. Before
// any message is exchanged, the first normalized alternative it fully
// supports is the one the endpoint commits to.

use std::collections::HashSet;

use crate::component::{Policy, PolicyComponent};
use crate::qname::QualifiedName;

/// Something able to enforce assertions by name.
pub trait Assertor {
    fn can_assert(&self, name: &QualifiedName) -> bool;
}

impl Assertor for HashSet<QualifiedName> {
    fn can_assert(&self, name: &QualifiedName) -> bool {
        self.contains(name)
    }
}

impl Assertor for Vec<QualifiedName> {
    fn can_assert(&self, name: &QualifiedName) -> bool {
        self.contains(name)
    }
}

impl<F> Assertor for F
where
    F: Fn(&QualifiedName) -> bool,
{
    fn can_assert(&self, name: &QualifiedName) -> bool {
        self(name)
    }
}

impl Policy {
    /// First normalized alternative whose every leaf is optional or can be
    /// asserted by `assertor`. Leaves in an alternative are already mandatory
    /// copies, so optionality is read from the original declarations: a name
    /// counts as optional only when every declaration of it is optional.
    pub fn supported_alternative(&self, assertor: &dyn Assertor) -> Option<Vec<PolicyComponent>> {
        let declared = self.body.assertions(true);
        let mandatory: HashSet<&QualifiedName> = declared
            .iter()
            .filter(|leaf| !leaf.is_optional())
            .filter_map(|leaf| leaf.name())
            .collect();
        let optional: HashSet<&QualifiedName> = declared
            .iter()
            .filter_map(|leaf| leaf.name())
            .filter(|name| !mandatory.contains(name))
            .collect();

        self.alternatives().into_iter().find(|alternative| {
            alternative.iter().all(|leaf| match leaf.name() {
                Some(name) => optional.contains(name) || assertor.can_assert(name),
                None => false,
            })
        })
    }

    /// Whether any alternative is supported by `assertor`.
    pub fn supports(&self, assertor: &dyn Assertor) -> bool {
        self.supported_alternative(assertor).is_some()
    }
}
