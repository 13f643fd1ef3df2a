// qname.rs — Qualified names.
//
// A qualified name is the identity key for assertion kinds and for the
// structural markers of the policy language. The text form is Clark
// notation: `{namespace}local`, or a bare `local` when the namespace is empty.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// An immutable `(namespace, local)` pair. Equality and hashing are structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedName {
    namespace: String,
    local: String,
}

impl QualifiedName {
    /// The local part must be non-empty and free of braces and whitespace
    /// for the name to survive a trip through its text form. The namespace
    /// may contain anything.
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }

    /// A name with no namespace (e.g., the unqualified `URI` attribute).
    pub fn local(local: impl Into<String>) -> Self {
        Self::new("", local)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn local_part(&self) -> &str {
        &self.local
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

impl FromStr for QualifiedName {
    type Err = PolicyError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| PolicyError::InvalidQualifiedName {
            text: text.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = text.trim();
        let (namespace, local) = match trimmed.strip_prefix('{') {
            Some(rest) => {
                // The local part cannot hold '}', so the last one closes.
                let close = rest.rfind('}').ok_or_else(|| invalid("missing '}'"))?;
                (&rest[..close], &rest[close + 1..])
            }
            None => ("", trimmed),
        };

        if local.is_empty() {
            return Err(invalid("local part is empty"));
        }
        if local.contains(['{', '}']) || local.chars().any(char::is_whitespace) {
            return Err(invalid("local part contains braces or whitespace"));
        }
        Ok(Self::new(namespace, local))
    }
}

impl TryFrom<String> for QualifiedName {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QualifiedName> for String {
    fn from(name: QualifiedName) -> Self {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_clark_notation() {
        let name: QualifiedName = "{http://www.w3.org/ns/ws-policy}All".parse().unwrap();
        assert_eq!(name.namespace(), "http://www.w3.org/ns/ws-policy");
        assert_eq!(name.local_part(), "All");
    }

    #[test]
    fn parse_bare_local_name() {
        let name: QualifiedName = "URI".parse().unwrap();
        assert_eq!(name, QualifiedName::local("URI"));
        assert_eq!(name.to_string(), "URI");
    }

    #[test]
    fn display_matches_parse() {
        let name = QualifiedName::new("urn:example", "Timestamp");
        let text = name.to_string();
        assert_eq!(text, "{urn:example}Timestamp");
        assert_eq!(text.parse::<QualifiedName>().unwrap(), name);
    }

    #[test]
    fn namespace_with_closing_brace_round_trips() {
        let name = QualifiedName::new("urn:{odd}", "A");
        let text = name.to_string();
        assert_eq!(text, "{urn:{odd}}A");
        assert_eq!(text.parse::<QualifiedName>().unwrap(), name);

        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(serde_json::from_str::<QualifiedName>(&json).unwrap(), name);
    }

    #[test]
    fn reject_unclosed_namespace() {
        let result = "{urn:example".parse::<QualifiedName>();
        match result {
            Err(PolicyError::InvalidQualifiedName { reason, .. }) => {
                assert!(reason.contains("missing"));
            }
            other => panic!("expected InvalidQualifiedName, got {:?}", other),
        }
    }

    #[test]
    fn reject_empty_local_part() {
        assert!("{urn:example}".parse::<QualifiedName>().is_err());
        assert!("".parse::<QualifiedName>().is_err());
    }

    #[test]
    fn equality_is_structural() {
        let a = QualifiedName::new("urn:x", "A");
        assert_eq!(a, QualifiedName::new("urn:x", "A"));
        assert_ne!(a, QualifiedName::new("urn:y", "A"));
        assert_ne!(a, QualifiedName::new("urn:x", "B"));
    }

    #[test]
    fn deserializes_from_string() {
        let name: QualifiedName = serde_json::from_str("\"{urn:x}A\"").unwrap();
        assert_eq!(name, QualifiedName::new("urn:x", "A"));
        assert!(serde_json::from_str::<QualifiedName>("\"{urn:x\"").is_err());
    }
}
