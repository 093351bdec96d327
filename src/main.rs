//! Decides, for one CI job, whether a component's build/test suite needs to
//! run. The job passes its component name and the commit range being built;
//! the tool looks up which files changed, runs them through the rules in
//! `.build-trigger.toml`, and exits 0 (build) or non-zero (skip).
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use git_build_trigger::builders::rules::Target;
use git_build_trigger::core::decision::parse_pull_request;
use git_build_trigger::core::engine::{RunOptions, TriggerEngine};
use git_build_trigger::utils;

#[derive(Parser)]
#[command(name = "git-build-trigger")]
#[command(about = "Decide whether a component's CI suite needs to run for a commit range")]
struct Cli {
    /// Configuration file (defaults to .build-trigger.toml at the repository root)
    #[arg(long, global = true, env = "BUILD_TRIGGER_CONFIG")]
    config: Option<PathBuf>,

    /// Show commits, changed files and rule details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration for this repository
    Init,
    /// Decide whether the suite of a component should run
    Check(CheckArgs),
    /// Check the configuration for errors and likely mistakes
    Validate,
    /// Show how a target expands and which rules apply to it
    Explain {
        /// Target (component) name
        target: String,
    },
    /// List every target triggered by a commit range
    Affected {
        #[arg(long, env = "TRAVIS_COMMIT_RANGE")]
        commit_range: Option<String>,
    },
    /// Export the configuration in another format
    Export {
        /// Destination file
        output: PathBuf,
        /// json, yaml or toml (defaults to the output file extension)
        #[arg(long)]
        format: Option<String>,
    },
}

#[derive(Args)]
struct CheckArgs {
    /// Pull request number, or "false" for a branch build
    #[arg(long, env = "TRAVIS_PULL_REQUEST", default_value = "false")]
    pull_request: String,

    /// Branch being built (for a pull request, its target branch)
    #[arg(long, env = "TRAVIS_BRANCH", default_value = "")]
    branch: String,

    /// Commit range of the build; a single commit or nothing is widened to a range
    #[arg(long, env = "TRAVIS_COMMIT_RANGE")]
    commit_range: Option<String>,

    /// Component whose suite this job runs (falls back to TEST_SUITE, then GEM)
    #[arg(long, env = "COMPONENT")]
    component: Option<String>,

    /// Directory receiving the skip marker file
    #[arg(long, env = "TRAVIS_BUILD_DIR")]
    build_dir: Option<PathBuf>,

    /// Write a .skip-ci marker file when the suite is skipped
    #[arg(short, long)]
    touch: bool,

    /// Exit code reported when the suite is skipped
    #[arg(long, default_value_t = 1)]
    skip_exit_code: u8,
}

impl CheckArgs {
    fn component(&self) -> Option<String> {
        self.component
            .clone()
            .or_else(|| std::env::var("TEST_SUITE").ok())
            .or_else(|| std::env::var("GEM").ok())
    }

    fn run_options(&self) -> RunOptions {
        RunOptions {
            pull_request: parse_pull_request(&self.pull_request),
            branch: self.branch.clone(),
            component: self.component(),
            commit_range: self.commit_range.clone(),
            build_dir: self.build_dir.clone(),
            touch: self.touch,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => utils::initialize_repository(cli.config)?,
        Commands::Validate => utils::validate_configuration(cli.config)?,
        Commands::Export { output, format } => {
            utils::export_configuration(cli.config, &output, format.as_deref())?
        }
        Commands::Explain { target } => {
            engine(cli.config, cli.verbose)?.explain(&Target::from(target))?;
        }
        Commands::Affected { commit_range } => {
            engine(cli.config, cli.verbose)?.affected(commit_range.as_deref())?;
        }
        Commands::Check(args) => {
            let report = engine(cli.config, cli.verbose)?.run(&args.run_options())?;
            if !report.decision.should_build() {
                return Ok(ExitCode::from(args.skip_exit_code));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn engine(config: Option<PathBuf>, verbose: bool) -> Result<TriggerEngine> {
    let config_manager = utils::get_config_manager(config)?;
    TriggerEngine::new(&config_manager, verbose)
}
