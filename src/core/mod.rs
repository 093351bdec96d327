// This file is the module declaration file for the `core` module.
// In Rust, a `mod.rs` file within a directory (e.g., `src/core/`)
// serves two main purposes:
//
// 1. It declares the submodules contained within that directory.
// 2. It exposes these submodules to the parent module (`src/` in this case),
//    making them accessible to the entire crate.

// `config` module:
// This module is responsible for the declarative configuration file
// (`.build-trigger.toml`). It defines the data structures for the file
// (`TriggerConfig`, `SuiteConfig`), turns them into a `RuleStore`, and
// includes a `ConfigManager` to handle loading, saving, validating and
// exporting the configuration.
pub mod config;

// `decision` module:
// The build policy itself. Given the scalar inputs of a CI job and the
// changed files, it decides BUILD or SKIP and explains why.
pub mod decision;

// `engine` module:
// Wires configuration, rule store, Git and reporting together for the
// commands exposed by the binary.
pub mod engine;

// `git` module:
// Commit range normalization and the `GitClient` abstraction that lists the
// files changed in a range.
pub mod git;
