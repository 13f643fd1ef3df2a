// normalize.rs — normalize and alternatives subcommands.

use std::path::Path;

use super::Context;

pub fn execute(context: &Context, policy: &Path) -> anyhow::Result<()> {
    let policy = context.load_policy(policy)?;
    println!("{}", policy.normalize());
    Ok(())
}

pub fn alternatives(context: &Context, policy: &Path) -> anyhow::Result<()> {
    let policy = context.load_policy(policy)?;
    let alternatives = policy.alternatives();

    if alternatives.is_empty() {
        println!("No alternatives: the policy cannot be satisfied.");
        return Ok(());
    }

    for (index, alternative) in alternatives.iter().enumerate() {
        let leaves: Vec<String> = alternative.iter().map(|leaf| leaf.to_string()).collect();
        if leaves.is_empty() {
            println!("{:>3}: (empty)", index + 1);
        } else {
            println!("{:>3}: {}", index + 1, leaves.join(", "));
        }
    }
    Ok(())
}
