use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::builders::reporter::{ConsoleReporter, Explanation, RunReport, StatusReporter};
use crate::builders::resolver;
use crate::builders::rules::{RuleStore, Target};
use crate::builders::trigger::{self, Trigger};
use crate::builders::validator;
use crate::core::config::{ConfigManager, ConfigProvider, TriggerConfig};
use crate::core::decision::{self, BuildContext};
use crate::core::git::{self, Git2Client, GitClient};

/// Name of the marker file left behind for a skipped build.
pub const SKIP_FILE: &str = ".skip-ci";

/// Inputs of a decision run, as gathered from flags and the CI environment.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub pull_request: bool,
    pub branch: String,
    pub component: Option<String>,
    /// Raw range as reported by CI; normalized before use.
    pub commit_range: Option<String>,
    /// Where the skip marker is written. Defaults to the repository root.
    pub build_dir: Option<PathBuf>,
    /// Write the skip marker when the decision is SKIP.
    pub touch: bool,
}

pub struct TriggerEngine {
    config: TriggerConfig,
    store: RuleStore,
    repo_root: PathBuf,
    git: Option<Box<dyn GitClient>>,
    reporter: Box<dyn StatusReporter>,
}

impl TriggerEngine {
    pub fn new(config_manager: &ConfigManager, verbose: bool) -> Result<Self> {
        let config = config_manager.load_config()?;
        let repo_root = config_manager.get_repo_root().to_path_buf();

        // Without repository data every range is treated as empty.
        let git: Option<Box<dyn GitClient>> = match Git2Client::new(&repo_root) {
            Ok(client) => Some(Box::new(client)),
            Err(e) => {
                warn!(error = %e, root = %repo_root.display(), "cannot open repository");
                None
            }
        };

        Self::with_parts(
            repo_root,
            config,
            git,
            Box::new(ConsoleReporter::new(verbose)),
        )
    }

    /// Assembles an engine from explicit collaborators. The rule store is
    /// built here, so a malformed rule fails construction.
    pub fn with_parts(
        repo_root: PathBuf,
        config: TriggerConfig,
        git: Option<Box<dyn GitClient>>,
        reporter: Box<dyn StatusReporter>,
    ) -> Result<Self> {
        let store = config.build_store()?;
        debug!(
            suites = config.suites.len(),
            targets = store.targets().len(),
            patterns = store.all_patterns().len(),
            "rule store ready"
        );

        Ok(Self {
            config,
            store,
            repo_root,
            git,
            reporter,
        })
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    /// Runs the build policy for one job and reports it.
    pub fn run(&self, options: &RunOptions) -> Result<RunReport> {
        let range = git::normalize_range(options.commit_range.as_deref());
        let changed_files = self.changed_files(&range);
        let commits = self.commits(&range);

        let suffix = self.config.component_suffix.as_deref().unwrap_or_default();
        let component = options
            .component
            .as_deref()
            .map(str::trim)
            .filter(|component| !component.is_empty())
            .map(|component| format!("{component}{suffix}"));

        let context = BuildContext {
            pull_request: options.pull_request,
            branch: options.branch.clone(),
            component,
            allowed_branches: self.config.allowed_branches(),
        };

        let decision = decision::decide(&self.store, &context, &changed_files);
        info!(outcome = %decision.outcome, reason = %decision.reason, "decision");

        let uncovered = validator::uncovered_files(&self.store, &changed_files)
            .into_iter()
            .map(str::to_string)
            .collect();

        let report = RunReport {
            context,
            range,
            commits,
            changed_files,
            uncovered,
            decision,
        };
        self.reporter.generate_run_report(&report)?;

        if options.touch && !report.decision.should_build() {
            let dir = options.build_dir.as_deref().unwrap_or(&self.repo_root);
            write_skip_marker(dir, &report.decision.reason)?;
        }

        Ok(report)
    }

    /// Expansion of `target` and every rule it pools.
    pub fn explain(&self, target: &Target) -> Result<Explanation> {
        let expansion: Vec<Target> = resolver::expand(&self.store, target).into_iter().collect();
        let rules = expansion
            .iter()
            .flat_map(|member| {
                self.store
                    .patterns_for(member)
                    .map(move |pattern| (member.clone(), pattern.glob().to_string()))
            })
            .collect();

        let explanation = Explanation {
            target: target.clone(),
            expansion,
            rules,
        };
        self.reporter.generate_explain_report(&explanation)?;
        Ok(explanation)
    }

    /// Every target triggered by the changes of `commit_range`.
    pub fn affected(&self, commit_range: Option<&str>) -> Result<Vec<(Target, Trigger)>> {
        let range = git::normalize_range(commit_range);
        let changed_files = self.changed_files(&range);
        let hits = trigger::triggered_targets(&self.store, &changed_files);
        self.reporter.generate_affected_report(&range, &hits)?;
        Ok(hits)
    }

    fn changed_files(&self, range: &str) -> Vec<String> {
        let Some(git) = &self.git else {
            return Vec::new();
        };
        match git.changed_files(range) {
            Ok(files) => files,
            Err(e) => {
                warn!(%range, error = %format!("{e:#}"), "no change data; assuming no files changed");
                Vec::new()
            }
        }
    }

    fn commits(&self, range: &str) -> Vec<String> {
        let Some(git) = &self.git else {
            return Vec::new();
        };
        git.commits(range).unwrap_or_else(|e| {
            debug!(%range, error = %e, "cannot list commits");
            Vec::new()
        })
    }
}

/// Leaves `SKIPPING: <reason>` in `dir`, for runners that look for a marker
/// file rather than an exit code.
pub fn write_skip_marker(dir: &Path, reason: &str) -> Result<PathBuf> {
    let path = dir.join(SKIP_FILE);
    fs::write(&path, format!("SKIPPING: {reason}\n"))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote skip marker");
    Ok(path)
}
