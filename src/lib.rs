//! Decides whether a CI job for a component needs to run, based on the files
//! changed in the commit range being built.
//!
//! Rules map globs to targets, dependency edges pull the rules of other
//! targets into a target's impact set, and the decision engine turns that
//! into BUILD or SKIP with a reason.

pub mod builders;
pub mod core;
pub mod utils;

#[cfg(test)]
mod tests;
