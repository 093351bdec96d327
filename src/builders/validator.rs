use anyhow::Result;
use std::collections::HashSet;

use crate::builders::patterns::{self, Pattern};
use crate::builders::rules::{RuleStore, Target};
use crate::core::config::{self, SuiteConfig, TriggerConfig};

/// The `ConfigValidator` trait defines the public interface for validating the
/// trigger configuration.
///
/// This trait allows for the implementation of different validation strategies,
/// such as a strict validator or a more permissive one, by adhering to a common
/// set of methods.
pub trait ConfigValidator {
    /// Performs a full validation of the `TriggerConfig` and returns
    /// a list of issues found.
    fn validate_config(&self, config: &TriggerConfig) -> Result<Vec<String>>;

    /// Validates a single suite and returns a list of issues.
    fn validate_suite(&self, suite: &SuiteConfig) -> Vec<String>;
}

/// The `StandardValidator` is a concrete implementation of `ConfigValidator`.
///
/// Besides syntax, it looks for configurations that load fine but are almost
/// certainly mistakes: suites that declare nothing, repeated globs, and
/// triggers naming a target that nothing defines.
pub struct StandardValidator;

impl StandardValidator {
    /// Creates a new instance of `StandardValidator`.
    pub fn new() -> Self {
        Self
    }

    /// Reports trigger targets that own neither rules nor triggers. Such an
    /// edge can never fire, which usually means a misspelled target name.
    fn check_dangling_triggers(&self, config: &TriggerConfig, store: &RuleStore) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut reported = HashSet::new();

        for suite in &config.suites {
            for target in &suite.triggers {
                if *target == Target::NONE {
                    warnings.push(format!(
                        "Suite {} triggers ':none', whose rules never trigger anything",
                        suite.targets
                    ));
                    continue;
                }
                if target.is_reserved() || store.is_defined(target) {
                    continue;
                }
                if reported.insert(target.clone()) {
                    warnings.push(format!(
                        "Trigger target '{target}' (in suite {}) has no rules or triggers \
                         of its own",
                        suite.targets
                    ));
                }
            }
        }
        warnings
    }
}

impl Default for StandardValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator for StandardValidator {
    fn validate_config(&self, config: &TriggerConfig) -> Result<Vec<String>> {
        let mut issues = Vec::new();

        // Check for an unsupported configuration version.
        if config.version != config::CONFIG_VERSION {
            issues.push(format!("Unsupported config version: {}", config.version));
        }

        for suite in &config.suites {
            issues.extend(self.validate_suite(suite));
        }

        // Only a configuration whose rules all compile can be turned into a
        // store for the cross-suite checks.
        if let Ok(store) = config.build_store() {
            issues.extend(self.check_dangling_triggers(config, &store));
        }

        Ok(issues)
    }

    fn validate_suite(&self, suite: &SuiteConfig) -> Vec<String> {
        let mut issues = Vec::new();

        if suite.targets.iter().next().is_none() {
            issues.push("Suite without targets will register nothing".to_string());
        }

        if suite.files.is_empty()
            && suite.tests.is_empty()
            && suite.patterns.is_empty()
            && suite.triggers.is_empty()
        {
            issues.push(format!("Suite {} declares no files or triggers", suite.targets));
        }

        let mut seen = HashSet::new();
        for glob in suite.globs() {
            if !seen.insert(glob) {
                issues.push(format!("Duplicate glob '{glob}' in suite {}", suite.targets));
            }
            if let Err(e) = patterns::translate(glob) {
                issues.push(format!("Invalid glob in suite {}: {e}", suite.targets));
            }
        }

        for expression in &suite.patterns {
            if let Err(e) = Pattern::from_regex(expression) {
                issues.push(format!("Invalid pattern in suite {}: {e}", suite.targets));
            }
        }

        issues
    }
}

/// Changed files that no rule of any target matches.
///
/// Every file of a repository is expected to be covered by some suite (files
/// that should never trigger anything belong to `:none`), so anything returned
/// here points at a gap in the configuration.
pub fn uncovered_files<'a, S: AsRef<str>>(
    store: &RuleStore,
    changed_files: &'a [S],
) -> Vec<&'a str> {
    let all = store.all_patterns();
    changed_files
        .iter()
        .map(<S as AsRef<str>>::as_ref)
        .filter(|file| !all.iter().any(|pattern| pattern.is_match(file)))
        .collect()
}
