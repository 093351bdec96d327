use tracing::debug;

use crate::builders::patterns::Pattern;
use crate::builders::resolver;
use crate::builders::rules::{RuleStore, Target};

/// The first changed file that hit a target, and the rule it hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// The changed path, exactly as it appeared in the file list.
    pub file: String,
    /// The glob (or raw expression) of the rule that matched.
    pub pattern: String,
    /// The member of the expansion that owns the rule.
    pub owner: Target,
}

/// Decides whether any changed file impacts `target`.
///
/// The target is expanded, the direct rules of every member are pooled, and
/// the files are tested in the order given. Rules of [`Target::NONE`] are never
/// pooled: they only mark files as known, so they cannot trigger anything even
/// when `:none` is asked for directly or reached through a dependency edge.
///
/// # Arguments
/// * `store`: The rule store holding direct rules and dependency edges.
/// * `target`: The component being evaluated.
/// * `changed_files`: The changed paths, in the order the collaborator gave them.
///
/// # Returns
/// The first file matching any pooled rule together with that rule and its
/// owner, or `None` when nothing matches. Neither input is modified.
pub fn matches<S: AsRef<str>>(
    store: &RuleStore,
    target: &Target,
    changed_files: &[S],
) -> Option<Trigger> {
    let closure = resolver::expand(store, target);
    let pooled: Vec<(&Target, &Pattern)> = closure
        .iter()
        .filter(|member| **member != Target::NONE)
        .flat_map(|member| store.patterns_for(member).map(move |pattern| (member, pattern)))
        .collect();

    debug!(
        %target,
        expansion = closure.len(),
        patterns = pooled.len(),
        files = changed_files.len(),
        "evaluating trigger"
    );

    changed_files.iter().find_map(|file| {
        let file: &str = file.as_ref();
        pooled
            .iter()
            .find(|(_, pattern)| pattern.is_match(file))
            .map(|(owner, pattern)| Trigger {
                file: file.to_string(),
                pattern: pattern.glob().to_string(),
                owner: (*owner).clone(),
            })
    })
}

/// Every known target (reserved ones excluded) that the changed files trigger,
/// paired with the trigger that fired.
pub fn triggered_targets<S: AsRef<str>>(
    store: &RuleStore,
    changed_files: &[S],
) -> Vec<(Target, Trigger)> {
    store
        .targets()
        .into_iter()
        .filter(|target| !target.is_reserved())
        .filter_map(|target| {
            matches(store, target, changed_files).map(|trigger| (target.clone(), trigger))
        })
        .collect()
}
