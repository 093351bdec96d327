use std::collections::BTreeSet;
use tracing::trace;

use crate::builders::rules::{RuleStore, Target};

/// Computes the closure of `target` under the dependency edges of `store`.
///
/// The result always holds `target` itself and [`Target::ALL`]. Expansion is a
/// fixed-point loop over a set: each pass unions in every edge leaving a
/// current member and the loop stops once a pass adds nothing, so cyclic
/// graphs terminate. A target the store has never seen simply expands to
/// `{target, ALL}` (plus whatever `ALL` itself depends on).
///
/// # Arguments
/// * `store`: The rule store whose dependency edges are followed.
/// * `target`: The target to expand.
///
/// # Returns
/// The closure as an ordered set of targets.
pub fn expand(store: &RuleStore, target: &Target) -> BTreeSet<Target> {
    let mut closure: BTreeSet<Target> = [target.clone(), Target::ALL].into_iter().collect();
    let mut passes = 0usize;

    loop {
        passes += 1;
        let reached: BTreeSet<Target> = closure
            .iter()
            .flat_map(|member| store.dependencies_of(member))
            .cloned()
            .collect();

        let before = closure.len();
        closure.extend(reached);
        if closure.len() == before {
            break;
        }
    }

    trace!(%target, passes, size = closure.len(), "expanded target");
    closure
}
