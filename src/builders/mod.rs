// This file is the module declaration file for the `builders` module.
// It declares and makes public all the sub-modules within the `src/builders`
// directory. Together they form the rule engine: from globs to a yes/no
// answer for a target.

// `patterns` module:
// This is a fundamental module that translates glob-style rules into
// compiled `Pattern`s (segment wildcards, recursive directory wildcards,
// brace alternation and literal dots).
pub mod patterns;

// `reporter` module:
// This module is responsible for generating human-readable reports. It
// defines a `StatusReporter` trait and its `ConsoleReporter` implementation.
pub mod reporter;

// `resolver` module:
// Transitive expansion of a target over the dependency edges, always
// including the universal target.
pub mod resolver;

// `rules` module:
// Targets, the `RuleStore` holding direct rules and dependency edges, and the
// suite context used to register them in groups.
pub mod rules;

// `trigger` module:
// Tests a changed-file list against the pooled rules of a target's expansion.
pub mod trigger;

// `validator` module:
// This module is dedicated to ensuring the integrity and correctness of
// the configuration, and to spotting changed files no rule covers.
pub mod validator;
