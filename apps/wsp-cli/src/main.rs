//! # wsp-cli
//!
//! Command-line front end for the `wsp-policy` library.
//!
//! - `wsp normalize <policy>`: print the policy in disjunctive normal form
//! - `wsp alternatives <policy>`: list each normalized alternative
//! - `wsp check <policy> --state <file>`: evaluate against asserted names
//! - `wsp vocabulary <policy>`: list the assertion names a policy uses

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::Context;

/// Compile, normalize and evaluate WS-Policy documents.
#[derive(Parser)]
#[command(name = "wsp", version, about)]
struct Cli {
    /// Vocabulary and registry configuration (defaults apply when missing).
    #[arg(long, global = true, default_value = "wsp.toml")]
    config: PathBuf,

    /// Register a policy document for reference resolution, as URI=PATH.
    #[arg(long = "reference", global = true, value_name = "URI=PATH")]
    references: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the normalized policy.
    Normalize {
        /// Policy document (.yaml, .yml or .json).
        policy: PathBuf,
    },
    /// Print each normalized alternative on its own line.
    Alternatives {
        /// Policy document (.yaml, .yml or .json).
        policy: PathBuf,
    },
    /// Evaluate a policy against an assertion state document.
    Check {
        /// Policy document (.yaml, .yml or .json).
        policy: PathBuf,
        /// State document listing asserted assertion names.
        #[arg(long)]
        state: PathBuf,
        /// Print the verdict and evaluation trace as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List the assertion names used by a policy.
    Vocabulary {
        /// Policy document (.yaml, .yml or .json).
        policy: PathBuf,
        /// Include assertions marked optional.
        #[arg(long)]
        include_optional: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wsp_policy=info".parse()?)
                .add_directive("wsp=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let context = Context::load(&cli.config, &cli.references)?;

    match &cli.command {
        Commands::Normalize { policy } => commands::normalize::execute(&context, policy),
        Commands::Alternatives { policy } => commands::normalize::alternatives(&context, policy),
        Commands::Check {
            policy,
            state,
            json,
        } => commands::check::execute(&context, policy, state, *json),
        Commands::Vocabulary {
            policy,
            include_optional,
        } => commands::vocabulary::execute(&context, policy, *include_optional),
    }
}
