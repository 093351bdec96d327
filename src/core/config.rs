use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::builders::rules::{RuleStore, Target, TargetSet};
use crate::builders::validator::{ConfigValidator, StandardValidator};

pub const CONFIG_FILE_NAME: &str = ".build-trigger.toml";
pub const CONFIG_VERSION: &str = "1.0";

const CONFIG_HEADER: &str = "\
# git-build-trigger configuration
#
# Each [[suite]] registers rules for one or more targets (components):
#   files / tests : globs (`*` one segment, `**/` any directories, `{a,b}` alternatives)
#   patterns      : raw regular expressions
#   triggers      : targets whose changes also trigger this suite
# The reserved target \":all\" applies to every component, \":none\" to nothing.

";

/// Rules declared for a group of targets.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SuiteConfig {
    pub targets: TargetSet,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<Target>,
}

impl SuiteConfig {
    pub fn new(targets: impl Into<TargetSet>) -> Self {
        Self {
            targets: targets.into(),
            files: Vec::new(),
            tests: Vec::new(),
            patterns: Vec::new(),
            triggers: Vec::new(),
        }
    }

    /// Globs of the suite, files first.
    pub fn globs(&self) -> impl Iterator<Item = &str> {
        self.files.iter().chain(&self.tests).map(String::as_str)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TriggerConfig {
    pub version: String,
    /// Branches built outside of pull requests. Empty builds every branch.
    #[serde(default)]
    pub branches: Vec<String>,
    /// Appended to the component before it is evaluated (e.g. `-spec`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_suffix: Option<String>,
    #[serde(default, rename = "suite")]
    pub suites: Vec<SuiteConfig>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        let mut docs = SuiteConfig::new(Target::NONE);
        docs.files = vec!["README.md".to_string(), "LICENSE".to_string()];
        let mut config = SuiteConfig::new(Target::ALL);
        config.files = vec![CONFIG_FILE_NAME.to_string()];

        Self {
            version: CONFIG_VERSION.to_string(),
            branches: vec!["master".to_string()],
            component_suffix: None,
            suites: vec![config, docs],
        }
    }
}

impl TriggerConfig {
    /// Registers every suite into a fresh [`RuleStore`]. The first glob that
    /// fails to translate aborts loading.
    pub fn build_store(&self) -> Result<RuleStore> {
        let mut store = RuleStore::new();

        for (index, suite) in self.suites.iter().enumerate() {
            store
                .suite(suite.targets.clone(), |cfg| {
                    for glob in &suite.files {
                        cfg.file(glob.as_str())?;
                    }
                    for glob in &suite.tests {
                        cfg.test(glob.as_str())?;
                    }
                    for expression in &suite.patterns {
                        cfg.pattern(expression)?;
                    }
                    if !suite.triggers.is_empty() {
                        cfg.trigger(suite.triggers.clone());
                    }
                    Ok(())
                })
                .with_context(|| {
                    format!("Invalid rule in suite #{} ({})", index + 1, suite.targets)
                })?;
        }

        Ok(store)
    }

    pub fn allowed_branches(&self) -> BTreeSet<String> {
        self.branches.iter().cloned().collect()
    }
}

/// Serialization formats understood for reading and exporting configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Picks the format from a file extension, TOML when unknown.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => ConfigFormat::Json,
            Some("yaml" | "yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Toml,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "json" => ConfigFormat::Json,
            "yaml" | "yml" => ConfigFormat::Yaml,
            _ => ConfigFormat::Toml,
        }
    }

    pub fn parse(self, content: &str) -> Result<TriggerConfig> {
        match self {
            ConfigFormat::Toml => toml::from_str(content).context("Failed to parse TOML config"),
            ConfigFormat::Json => {
                serde_json::from_str(content).context("Failed to parse JSON config")
            }
            ConfigFormat::Yaml => {
                serde_yaml::from_str(content).context("Failed to parse YAML config")
            }
        }
    }

    pub fn render(self, config: &TriggerConfig) -> Result<String> {
        match self {
            ConfigFormat::Toml => {
                toml::to_string_pretty(config).context("Failed to serialize to TOML")
            }
            ConfigFormat::Json => {
                serde_json::to_string_pretty(config).context("Failed to serialize to JSON")
            }
            ConfigFormat::Yaml => serde_yaml::to_string(config).context("Failed to serialize to YAML"),
        }
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
    repo_root: PathBuf,
}

impl ConfigManager {
    /// Locates the repository containing the current directory.
    pub fn new() -> Result<Self> {
        let repo_root = find_git_root(&std::env::current_dir()?)?;
        Self::new_at(repo_root)
    }

    pub fn new_at(repo_root: PathBuf) -> Result<Self> {
        let config_path = repo_root.join(CONFIG_FILE_NAME);
        Ok(Self {
            config_path,
            repo_root,
        })
    }

    /// Reads the configuration from `path` instead of the repository default.
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = path;
        self
    }

    /// Writes the starter configuration. Returns `false` when a configuration
    /// already exists and was left untouched.
    pub fn initialize(&self) -> Result<bool> {
        if self.config_path.exists() {
            return Ok(false);
        }

        self.save_config(&TriggerConfig::default())?;
        Ok(true)
    }

    pub fn validate_config(&self) -> Result<()> {
        let config = self.load_config()?;
        let validator = StandardValidator::new();
        let issues = validator.validate_config(&config)?;

        if issues.is_empty() {
            println!("✓ Configuration is valid.");
            Ok(())
        } else {
            println!("⚠️  Found issues in configuration:");
            for issue in issues {
                println!("  - {issue}");
            }
            anyhow::bail!("Configuration validation failed.");
        }
    }

    pub fn export_config(&self, file_path: &Path, format: ConfigFormat) -> Result<()> {
        let config = self.load_config()?;
        let content = format.render(&config)?;
        fs::write(file_path, content).context("Failed to write export file")?;
        Ok(())
    }

    pub fn get_repo_root(&self) -> &Path {
        &self.repo_root
    }
}

pub trait ConfigProvider {
    fn load_config(&self) -> Result<TriggerConfig>;
    fn save_config(&self, config: &TriggerConfig) -> Result<()>;
    fn get_config_path(&self) -> Result<PathBuf>;
}

impl ConfigProvider for ConfigManager {
    fn load_config(&self) -> Result<TriggerConfig> {
        if !self.config_path.exists() {
            anyhow::bail!(
                "No configuration found at {} (run `git-build-trigger init`)",
                self.config_path.display()
            );
        }

        let content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read {}", self.config_path.display()))?;

        ConfigFormat::from_path(&self.config_path).parse(&content)
    }

    fn save_config(&self, config: &TriggerConfig) -> Result<()> {
        let format = ConfigFormat::from_path(&self.config_path);
        let mut content = format.render(config)?;
        if format == ConfigFormat::Toml {
            content.insert_str(0, CONFIG_HEADER);
        }

        fs::write(&self.config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn get_config_path(&self) -> Result<PathBuf> {
        Ok(self.config_path.clone())
    }
}

fn find_git_root(start: &Path) -> Result<PathBuf> {
    let mut dir = start;

    loop {
        if dir.join(".git").exists() {
            return Ok(dir.to_path_buf());
        }

        match dir.parent() {
            Some(parent) => dir = parent,
            None => anyhow::bail!("Not in a Git repository"),
        }
    }
}
