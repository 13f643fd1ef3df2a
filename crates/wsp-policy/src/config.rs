// config.rs — Policy vocabulary and registry configuration.
//
// The structural markers (`Policy`, `All`, `ExactlyOne`, `PolicyReference`)
// and the recognized attributes (`Optional`, `Ignorable`, `URI`, `Name`) are not
// hardcoded in the builder; they come from a `PolicyVocabulary`. The default
// is WS-Policy 1.5. Configuration is read from a TOML file:
//
// ```toml
// [vocabulary]
// namespace = "http://schemas.xmlsoap.org/ws/2004/09/policy"
//
// [registry]
// ignore_unknown_assertions = false
// nested = [{ name = "{urn:example}Binding", required = false }]
// ```

use std::path::Path;

use serde::Deserialize;

use crate::error::PolicyError;
use crate::qname::QualifiedName;

/// WS-Policy 1.5 namespace.
pub const WS_POLICY_NAMESPACE: &str = "http://www.w3.org/ns/ws-policy";

/// WS-Policy 2004/09 submission namespace.
pub const WS_POLICY_SUBMISSION_NAMESPACE: &str = "http://schemas.xmlsoap.org/ws/2004/09/policy";

/// Qualified names the builder recognizes as structure rather than assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyVocabulary {
    pub policy: QualifiedName,
    pub all: QualifiedName,
    pub exactly_one: QualifiedName,
    pub policy_reference: QualifiedName,
    pub optional_attribute: QualifiedName,
    pub ignorable_attribute: QualifiedName,
    /// Attribute holding a policy reference's target (unqualified).
    pub uri_attribute: QualifiedName,
    /// Attribute naming a policy (unqualified).
    pub name_attribute: QualifiedName,
}

impl PolicyVocabulary {
    /// Derive the full vocabulary from a policy namespace.
    pub fn for_namespace(namespace: &str) -> Self {
        Self {
            policy: QualifiedName::new(namespace, "Policy"),
            all: QualifiedName::new(namespace, "All"),
            exactly_one: QualifiedName::new(namespace, "ExactlyOne"),
            policy_reference: QualifiedName::new(namespace, "PolicyReference"),
            optional_attribute: QualifiedName::new(namespace, "Optional"),
            ignorable_attribute: QualifiedName::new(namespace, "Ignorable"),
            uri_attribute: QualifiedName::local("URI"),
            name_attribute: QualifiedName::local("Name"),
        }
    }

    pub fn ws_policy_15() -> Self {
        Self::for_namespace(WS_POLICY_NAMESPACE)
    }

    pub fn ws_policy_submission() -> Self {
        Self::for_namespace(WS_POLICY_SUBMISSION_NAMESPACE)
    }
}

impl Default for PolicyVocabulary {
    fn default() -> Self {
        Self::ws_policy_15()
    }
}

/// Top-level configuration from `wsp.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub vocabulary: VocabularyConfig,

    #[serde(default)]
    pub registry: RegistryConfig,
}

/// The `[vocabulary]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct VocabularyConfig {
    /// Policy language namespace the structural markers live in.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

/// The `[registry]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// When false, fallbacks to the generic leaf are logged as warnings.
    #[serde(default = "default_ignore_unknown")]
    pub ignore_unknown_assertions: bool,

    /// Assertion names compiled as nested assertions.
    #[serde(default)]
    pub nested: Vec<NestedKindConfig>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            ignore_unknown_assertions: default_ignore_unknown(),
            nested: Vec::new(),
        }
    }
}

/// One `[[registry.nested]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NestedKindConfig {
    pub name: QualifiedName,
    /// Whether the outer name must itself be asserted.
    #[serde(default = "default_required")]
    pub required: bool,
}

// Serde default functions
fn default_namespace() -> String {
    WS_POLICY_NAMESPACE.to_string()
}

fn default_ignore_unknown() -> bool {
    true
}

fn default_required() -> bool {
    true
}

impl PolicyConfig {
    pub fn parse_content(content: &str) -> Result<Self, PolicyError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_content(&content)
    }

    /// Load from file if it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, PolicyError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn vocabulary(&self) -> PolicyVocabulary {
        PolicyVocabulary::for_namespace(&self.vocabulary.namespace)
    }
}
