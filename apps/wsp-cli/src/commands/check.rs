// check.rs — check subcommand: evaluate a policy against asserted names.
//
// The state document stands in for a negotiation layer. Its format:
//
// ```yaml
// asserted:
//   - "{urn:example}Timestamp"
// not_asserted:
//   - name: "{urn:example}Signature"
//     reason: "no signing key"
// ```
//
// Exits with an error when the policy is not satisfied.

use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use wsp_policy::{evaluate_with_trace, AssertionStateMap, EvaluationTrace, PolicyComponent, QualifiedName};

use super::Context;

#[derive(Debug, Deserialize)]
pub struct StateFile {
    #[serde(default)]
    pub asserted: Vec<QualifiedName>,
    #[serde(default)]
    pub not_asserted: Vec<NotAsserted>,
}

#[derive(Debug, Deserialize)]
pub struct NotAsserted {
    pub name: QualifiedName,
    #[serde(default)]
    pub reason: String,
}

impl StateFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read state {}", path.display()))?;
        let state = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };
        Ok(state)
    }

    /// Apply the recorded outcomes to a map populated from the policy.
    pub fn apply(&self, state: &mut AssertionStateMap) {
        for name in &self.asserted {
            if state.assert_name(name) == 0 {
                tracing::warn!("{} is asserted but not declared by the policy", name);
            }
        }
        for entry in &self.not_asserted {
            state.not_assert(&entry.name, &entry.reason);
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckReport {
    satisfied: bool,
    /// Leaves of the first satisfied alternative.
    effective_alternative: Option<Vec<String>>,
    /// Names that kept every alternative from being satisfied.
    unasserted: Vec<String>,
    trace: EvaluationTrace,
}

pub fn execute(context: &Context, policy: &Path, state: &Path, json: bool) -> anyhow::Result<()> {
    let policy = context.load_policy(policy)?.normalize();
    let state_file = StateFile::load(state)?;

    let mut state = AssertionStateMap::from_policy(&policy);
    state_file.apply(&mut state);

    let report = check(&policy, &state);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.satisfied {
        anyhow::bail!("policy is not satisfied");
    }
    Ok(())
}

fn check(policy: &wsp_policy::Policy, state: &AssertionStateMap) -> CheckReport {
    let trace = evaluate_with_trace(&PolicyComponent::Policy(policy.clone()), state);
    let (effective_alternative, unasserted) = match state.check_effective_policy(policy) {
        Ok(alternative) => (
            Some(alternative.iter().map(|leaf| leaf.to_string()).collect()),
            Vec::new(),
        ),
        Err(e) => (None, e.unasserted().iter().map(|n| n.to_string()).collect()),
    };

    CheckReport {
        satisfied: trace.satisfied,
        effective_alternative,
        unasserted,
        trace,
    }
}

fn print_report(report: &CheckReport) {
    if report.satisfied {
        println!("Policy satisfied.");
    } else {
        println!("Policy NOT satisfied.");
    }

    if let Some(alternative) = &report.effective_alternative {
        if alternative.is_empty() {
            println!("  Effective alternative: (empty)");
        } else {
            println!("  Effective alternative: {}", alternative.join(", "));
        }
    }
    if !report.unasserted.is_empty() {
        println!("  Unasserted: {}", report.unasserted.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const POLICY: &str = r#"
name: "{http://www.w3.org/ns/ws-policy}Policy"
children:
  - name: "{http://www.w3.org/ns/ws-policy}ExactlyOne"
    children:
      - name: "{http://www.w3.org/ns/ws-policy}All"
        children:
          - name: "{urn:example}A"
      - name: "{http://www.w3.org/ns/ws-policy}All"
        children:
          - name: "{urn:example}B"
"#;

    fn context(dir: &Path) -> Context {
        Context::load(&dir.join("wsp.toml"), &[]).unwrap()
    }

    #[test]
    fn state_file_parses_yaml_and_json() {
        let dir = tempdir().unwrap();
        let yaml = dir.path().join("state.yaml");
        fs::write(
            &yaml,
            "asserted:\n  - \"{urn:example}A\"\nnot_asserted:\n  - name: \"{urn:example}B\"\n    reason: no key\n",
        )
        .unwrap();
        let json = dir.path().join("state.json");
        fs::write(&json, r#"{"asserted": ["{urn:example}A"]}"#).unwrap();

        let from_yaml = StateFile::load(&yaml).unwrap();
        assert_eq!(from_yaml.asserted, vec![QualifiedName::new("urn:example", "A")]);
        assert_eq!(from_yaml.not_asserted[0].reason, "no key");

        let from_json = StateFile::load(&json).unwrap();
        assert_eq!(from_json.asserted, from_yaml.asserted);
        assert!(from_json.not_asserted.is_empty());
    }

    #[test]
    fn state_file_rejects_bad_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.yaml");
        fs::write(&path, "asserted:\n  - \"{urn:example\"\n").unwrap();
        assert!(StateFile::load(&path).is_err());
    }

    #[test]
    fn satisfied_policy_succeeds() {
        let dir = tempdir().unwrap();
        let policy = dir.path().join("policy.yaml");
        let state = dir.path().join("state.yaml");
        fs::write(&policy, POLICY).unwrap();
        fs::write(&state, "asserted:\n  - \"{urn:example}B\"\n").unwrap();

        execute(&context(dir.path()), &policy, &state, false).unwrap();
    }

    #[test]
    fn unsatisfied_policy_is_an_error() {
        let dir = tempdir().unwrap();
        let policy = dir.path().join("policy.yaml");
        let state = dir.path().join("state.yaml");
        fs::write(&policy, POLICY).unwrap();
        fs::write(&state, "asserted: []\n").unwrap();

        let err = execute(&context(dir.path()), &policy, &state, true).unwrap_err();
        assert!(err.to_string().contains("not satisfied"));
    }

    #[test]
    fn report_lists_effective_alternative_and_unasserted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("policy.yaml");
        fs::write(&path, POLICY).unwrap();
        let policy = context(dir.path()).load_policy(&path).unwrap().normalize();

        let mut state = AssertionStateMap::from_policy(&policy);
        let report = check(&policy, &state);
        assert!(!report.satisfied);
        assert_eq!(report.unasserted, vec!["{urn:example}A", "{urn:example}B"]);

        state.assert_name(&QualifiedName::new("urn:example", "B"));
        let report = check(&policy, &state);
        assert!(report.satisfied);
        assert_eq!(report.effective_alternative, Some(vec!["{urn:example}B".to_string()]));
    }
}
