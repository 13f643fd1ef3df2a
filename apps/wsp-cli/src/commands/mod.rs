// mod.rs — Shared setup for the wsp subcommands.
//
// Every subcommand needs the same three things: the configuration, an
// assertion registry built from it, and the referenced policies compiled
// into a `PolicyRegistry`. `Context` owns them; subcommands borrow.

pub mod check;
pub mod normalize;
pub mod vocabulary;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use wsp_policy::{AssertionBuilderRegistry, Element, Policy, PolicyBuilder, PolicyConfig, PolicyRegistry};

pub struct Context {
    pub registry: AssertionBuilderRegistry,
    pub references: PolicyRegistry,
}

impl Context {
    /// Load configuration and compile every `URI=PATH` reference, in order.
    /// A reference may point at policies registered before it.
    pub fn load(config_path: &Path, references: &[String]) -> anyhow::Result<Self> {
        let config = PolicyConfig::load_or_default(config_path)
            .with_context(|| format!("failed to load config {}", config_path.display()))?;
        let context = Self {
            registry: AssertionBuilderRegistry::from_config(&config),
            references: PolicyRegistry::new(),
        };

        for arg in references {
            let (uri, path) = parse_reference(arg)?;
            let policy = context.load_policy(&path)?;
            tracing::info!("registered policy reference {} from {}", uri, path.display());
            context.references.register(uri, policy);
        }

        Ok(context)
    }

    /// Read and compile a policy document.
    pub fn load_policy(&self, path: &Path) -> anyhow::Result<Policy> {
        let document = Element::from_file(path)
            .with_context(|| format!("failed to read policy {}", path.display()))?;
        Ok(PolicyBuilder::new(&self.registry)
            .with_references(&self.references)
            .build_policy(&document))
    }
}

/// Split a `URI=PATH` argument.
fn parse_reference(arg: &str) -> anyhow::Result<(String, PathBuf)> {
    match arg.split_once('=') {
        Some((uri, path)) if !uri.is_empty() && !path.is_empty() => {
            Ok((uri.to_string(), PathBuf::from(path)))
        }
        _ => anyhow::bail!("invalid reference '{}': expected URI=PATH", arg),
    }
}
