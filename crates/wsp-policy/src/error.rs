// error.rs — Error types for the policy subsystem.
//
// Building, normalizing, and evaluating a policy never fail: malformed input
// degrades to opaque leaves or empty operators. Only the loading surfaces
// (documents, configuration, qualified-name text) and the effective-policy
// check return these errors.

use thiserror::Error;

use crate::qname::QualifiedName;

/// Errors that can occur during policy operations.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A qualified name in `{namespace}local` form could not be parsed.
    #[error("invalid qualified name '{text}': {reason}")]
    InvalidQualifiedName { text: String, reason: String },

    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A YAML policy or state document could not be parsed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON policy document could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A TOML configuration file could not be parsed.
    #[error("config error: {0}")]
    Toml(#[from] toml::de::Error),

    /// No alternative of the effective policy had all of its assertions asserted.
    #[error("no policy alternative is supported; unasserted: {}", format_names(unasserted))]
    NoAlternativeSupported { unasserted: Vec<QualifiedName> },
}

impl PolicyError {
    /// The names reported by `NoAlternativeSupported`; empty for every
    /// other variant.
    pub fn unasserted(&self) -> &[QualifiedName] {
        match self {
            PolicyError::NoAlternativeSupported { unasserted } => unasserted,
            _ => &[],
        }
    }
}

fn format_names(names: &[QualifiedName]) -> String {
    if names.is_empty() {
        return "(none)".to_string();
    }
    names
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
