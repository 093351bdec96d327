use anyhow::Result;

use crate::builders::rules::Target;
use crate::builders::trigger::Trigger;
use crate::core::decision::{BuildContext, Decision, Outcome};

/// Everything a decision run looked at, and what it decided.
///
/// This provides a clean way to pass run data from the `TriggerEngine`
/// to the `StatusReporter`, and is what the engine hands back to the caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub context: BuildContext,
    /// The normalized commit range the files were taken from.
    pub range: String,
    pub commits: Vec<String>,
    pub changed_files: Vec<String>,
    /// Changed files that no rule of any target covers.
    pub uncovered: Vec<String>,
    pub decision: Decision,
}

/// How a single target expands, and the rules that come with the expansion.
#[derive(Debug, Clone)]
pub struct Explanation {
    pub target: Target,
    pub expansion: Vec<Target>,
    /// `(owner, glob)` for every pooled rule, in evaluation order.
    pub rules: Vec<(Target, String)>,
}

pub trait StatusReporter {
    fn generate_run_report(&self, report: &RunReport) -> Result<()>;

    fn generate_explain_report(&self, explanation: &Explanation) -> Result<()>;

    fn generate_affected_report(&self, range: &str, hits: &[(Target, Trigger)]) -> Result<()>;
}

/// A concrete implementation of `StatusReporter` that prints the report to the console.
pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    /// Constructs a new `ConsoleReporter`. Commit and file listings are only
    /// printed when `verbose` is set.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn format_context(&self, context: &BuildContext, range: &str) -> Vec<String> {
        let kind = if context.pull_request { "PR" } else { "BRANCH" };
        vec![
            format!("{kind:<13}: {}", context.branch),
            format!("{:<13}: {range}", "COMMIT_RANGE"),
            format!(
                "{:<13}: {}",
                "component",
                context.component.as_deref().unwrap_or("(none)")
            ),
        ]
    }

    /// A private helper that renders the final verdict line.
    fn format_decision(&self, decision: &Decision) -> String {
        // 🟢: the suite runs.
        // 🔴: the suite is skipped.
        let icon = match decision.outcome {
            Outcome::Build => "🟢",
            Outcome::Skip => "🔴",
        };
        format!("{icon} {}: {}", decision.outcome, decision.reason)
    }
}

impl StatusReporter for ConsoleReporter {
    fn generate_run_report(&self, report: &RunReport) -> Result<()> {
        println!("🔍 Git Build Trigger");
        println!("===================");
        for line in self.format_context(&report.context, &report.range) {
            println!("{line}");
        }

        if self.verbose {
            println!("\n📜 Commits ({}):", report.commits.len());
            for commit in &report.commits {
                println!("  - {commit}");
            }
            println!("\n📁 Changed files ({}):", report.changed_files.len());
            for file in &report.changed_files {
                println!("  - {file}");
            }
        } else {
            println!(
                "{:<13}: {} commits, {} files",
                "changes",
                report.commits.len(),
                report.changed_files.len()
            );
        }

        if !report.uncovered.is_empty() {
            println!("\n⚠️  Files not covered by any rule:");
            for file in &report.uncovered {
                println!("  - {file}");
            }
        }

        println!("\n{}", self.format_decision(&report.decision));
        Ok(())
    }

    fn generate_explain_report(&self, explanation: &Explanation) -> Result<()> {
        let expansion: Vec<&str> = explanation.expansion.iter().map(Target::as_str).collect();
        println!("🎯 Target: {}", explanation.target);
        println!("  Expansion: {}", expansion.join(", "));

        if explanation.rules.is_empty() {
            println!("  No rules apply; this target is never triggered.");
            return Ok(());
        }
        println!("  Rules:");
        for (owner, glob) in &explanation.rules {
            println!("  └─ {glob} ({owner})");
        }
        Ok(())
    }

    fn generate_affected_report(&self, range: &str, hits: &[(Target, Trigger)]) -> Result<()> {
        println!("📈 Targets triggered by {range}:");
        if hits.is_empty() {
            println!("  (none)");
            return Ok(());
        }
        for (target, trigger) in hits {
            if self.verbose {
                println!(
                    "  {target} ← {} via {} ({})",
                    trigger.file, trigger.pattern, trigger.owner
                );
            } else {
                println!("  {target} ← {}", trigger.file);
            }
        }
        Ok(())
    }
}
