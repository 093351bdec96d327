use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::builders::rules::{RuleStore, Target};
use crate::builders::trigger;

/// Whether the external runner should go ahead with the suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Build,
    Skip,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Build => write!(f, "BUILD"),
            Outcome::Skip => write!(f, "SKIP"),
        }
    }
}

/// The verdict handed back to the runner, with a human readable justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub outcome: Outcome,
    pub reason: String,
}

impl Decision {
    fn build(reason: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Build,
            reason: reason.into(),
        }
    }

    fn skip(reason: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Skip,
            reason: reason.into(),
        }
    }

    pub fn should_build(&self) -> bool {
        self.outcome == Outcome::Build
    }
}

/// The scalar inputs of a decision, already parsed from flags or environment.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    pub pull_request: bool,
    pub branch: String,
    /// The component (suite) this job runs. `None` or empty means "unspecified".
    pub component: Option<String>,
    /// Branches that are built outside of pull requests. Empty allows all.
    pub allowed_branches: BTreeSet<String>,
}

/// CI providers report either the pull-request number or the literal `false`.
pub fn parse_pull_request(raw: &str) -> bool {
    let raw = raw.trim();
    !raw.is_empty() && !raw.eq_ignore_ascii_case("false")
}

/// Applies the build policy.
///
/// Pull requests build when the component is unspecified or when one of the
/// changed files triggers it. Branch builds only consult the allow-list.
///
/// # Arguments
/// * `store`: The rules and dependency edges to evaluate the component against.
/// * `context`: The pull-request flag, branch, component and allowed branches.
/// * `changed_files`: The paths changed in the build's commit range.
///
/// # Returns
/// A `Decision` carrying the outcome and a human-readable reason. The function
/// is total and has no side effects.
pub fn decide<S: AsRef<str>>(
    store: &RuleStore,
    context: &BuildContext,
    changed_files: &[S],
) -> Decision {
    if context.pull_request {
        let component = match context.component.as_deref() {
            Some(component) if !component.is_empty() => component,
            _ => return Decision::build("building PR, no component specified"),
        };

        match trigger::matches(store, &Target::from(component), changed_files) {
            Some(hit) => Decision::build(format!(
                "building PR, component {component} triggered by {} (rule {} of {})",
                hit.file, hit.pattern, hit.owner
            )),
            None => Decision::skip(format!(
                "skipping PR, no changed file triggers component {component}"
            )),
        }
    } else {
        let branch = context.branch.as_str();
        if branch.is_empty() {
            Decision::build("building non-PR, no branch specified")
        } else if context.allowed_branches.is_empty() {
            Decision::build(format!("building non-PR, branch: {branch} (all branches allowed)"))
        } else if context.allowed_branches.contains(branch) {
            Decision::build(format!("building non-PR, branch: {branch}"))
        } else {
            let allowed: Vec<&str> = context.allowed_branches.iter().map(String::as_str).collect();
            Decision::skip(format!(
                "skipping non-PR, branch: {branch} (not {})",
                allowed.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr(component: &str) -> BuildContext {
        BuildContext {
            pull_request: true,
            branch: "master".to_string(),
            component: Some(component.to_string()),
            allowed_branches: BTreeSet::from(["master".to_string()]),
        }
    }

    fn branch(name: &str, allowed: &[&str]) -> BuildContext {
        BuildContext {
            pull_request: false,
            branch: name.to_string(),
            component: Some("models".to_string()),
            allowed_branches: allowed.iter().map(|b| b.to_string()).collect(),
        }
    }

    #[test]
    fn test_pr_builds_triggered_component() {
        let mut store = RuleStore::new();
        store.add_rule("models", "app/models/**/*.rb").unwrap();

        let decision = decide(&store, &pr("models"), &["app/models/user.rb"]);
        assert_eq!(decision.outcome, Outcome::Build);
        assert!(decision.reason.contains("app/models/user.rb"));
    }

    #[test]
    fn test_pr_builds_through_dependency_edge() {
        let mut store = RuleStore::new();
        store.add_rule("controllers", "app/controllers/**/*.rb").unwrap();
        store.add_dependency("ui", "controllers");

        let decision = decide(&store, &pr("ui"), &["app/controllers/x.rb"]);
        assert!(decision.should_build());
    }

    #[test]
    fn test_pr_skips_untriggered_component() {
        let mut store = RuleStore::new();
        store.add_rule("models", "app/models/**/*.rb").unwrap();

        let decision = decide(&store, &pr("models"), &["README.md"]);
        assert_eq!(decision.outcome, Outcome::Skip);
        assert!(decision.reason.contains("models"));
    }

    #[test]
    fn test_pr_for_none_component_skips() {
        let mut store = RuleStore::new();
        store.add_rule(Target::NONE, "README.md").unwrap();

        let decision = decide(&store, &pr(":none"), &["README.md"]);
        assert_eq!(decision.outcome, Outcome::Skip);
    }

    #[test]
    fn test_pr_without_component_builds() {
        let store = RuleStore::new();
        let empty: [&str; 0] = [];
        assert!(decide(&store, &pr(""), &empty).should_build());

        let mut context = pr("models");
        context.component = None;
        assert!(decide(&store, &context, &empty).should_build());
    }

    #[test]
    fn test_duplicate_rule_does_not_change_outcome() {
        let mut store = RuleStore::new();
        store.add_rule("models", "app/models/**/*.rb").unwrap();
        let first = decide(&store, &pr("models"), &["app/models/user.rb"]);
        store.add_rule("models", "app/models/**/*.rb").unwrap();
        let second = decide(&store, &pr("models"), &["app/models/user.rb"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_branch_builds() {
        let store = RuleStore::new();
        let empty: [&str; 0] = [];

        let skipped = decide(&store, &branch("feature-x", &["master"]), &empty);
        assert_eq!(skipped.outcome, Outcome::Skip);
        assert!(skipped.reason.contains("feature-x"));
        assert!(skipped.reason.contains("master"));

        assert!(decide(&store, &branch("master", &["master"]), &empty).should_build());
        assert!(decide(&store, &branch("feature-x", &[]), &empty).should_build());
        assert!(decide(&store, &branch("", &["master"]), &empty).should_build());
    }

    #[test]
    fn test_parse_pull_request() {
        assert!(parse_pull_request("42"));
        assert!(!parse_pull_request("false"));
        assert!(!parse_pull_request(" FALSE "));
        assert!(!parse_pull_request(""));
    }
}
