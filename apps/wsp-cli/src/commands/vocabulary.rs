// vocabulary.rs — vocabulary subcommand: assertion names used by a policy.

use std::path::Path;

use super::Context;

pub fn execute(context: &Context, policy: &Path, include_optional: bool) -> anyhow::Result<()> {
    let policy = context.load_policy(policy)?;
    let mut names: Vec<String> = policy
        .body
        .vocabulary(include_optional)
        .iter()
        .map(|name| name.to_string())
        .collect();
    names.sort();

    if names.is_empty() {
        println!("No assertions.");
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}
