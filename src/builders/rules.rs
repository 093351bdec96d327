use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::builders::patterns::{self, Pattern, PatternError, PatternSource};

/// A named build/test component that can be triggered.
///
/// Two identifiers are reserved and live in the same namespace as user targets:
/// [`Target::ALL`] is part of every expansion, so its rules apply to every
/// component, and [`Target::NONE`] collects files that are known to the
/// configuration but impact nothing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(Cow<'static, str>);

impl Target {
    /// The universal target.
    pub const ALL: Target = Target(Cow::Borrowed(":all"));
    /// Matches nothing; a home for files that should never trigger a build.
    pub const NONE: Target = Target(Cow::Borrowed(":none"));

    pub fn new(name: impl Into<String>) -> Self {
        Target(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_reserved(&self) -> bool {
        *self == Target::ALL || *self == Target::NONE
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Target::new(name)
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Target::new(name)
    }
}

/// One target or several: rules and triggers fan out to every member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetSet {
    One(Target),
    Many(Vec<Target>),
}

impl TargetSet {
    pub fn iter(&self) -> std::slice::Iter<'_, Target> {
        match self {
            TargetSet::One(target) => std::slice::from_ref(target).iter(),
            TargetSet::Many(targets) => targets.iter(),
        }
    }
}

impl fmt::Display for TargetSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Target::as_str).collect();
        write!(f, "{}", names.join(", "))
    }
}

impl From<Target> for TargetSet {
    fn from(target: Target) -> Self {
        TargetSet::One(target)
    }
}

impl From<&str> for TargetSet {
    fn from(name: &str) -> Self {
        TargetSet::One(Target::new(name))
    }
}

impl From<String> for TargetSet {
    fn from(name: String) -> Self {
        TargetSet::One(Target::new(name))
    }
}

impl<T: Into<Target>> From<Vec<T>> for TargetSet {
    fn from(targets: Vec<T>) -> Self {
        TargetSet::Many(targets.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Target>, const N: usize> From<[T; N]> for TargetSet {
    fn from(targets: [T; N]) -> Self {
        TargetSet::Many(targets.into_iter().map(Into::into).collect())
    }
}

/// The registry of direct rules and dependency edges.
///
/// The store is populated once while the configuration is loaded and is only
/// read afterwards, so it can be shared by reference between evaluations.
#[derive(Debug, Default, Clone)]
pub struct RuleStore {
    rules: BTreeMap<Target, IndexSet<Pattern>>,
    dependencies: BTreeMap<Target, BTreeSet<Target>>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `source` as a direct rule of every target in `targets`.
    ///
    /// The glob is translated once; a malformed glob is reported here and
    /// nothing is registered.
    ///
    /// # Arguments
    /// * `targets`: One target or a list of targets receiving the rule.
    /// * `source`: A glob string or an already compiled `Pattern`.
    ///
    /// # Returns
    /// `Ok(())` once the rule is registered. Registering the same pattern for
    /// a target twice leaves the store unchanged.
    pub fn add_rule(
        &mut self,
        targets: impl Into<TargetSet>,
        source: impl Into<PatternSource>,
    ) -> Result<(), PatternError> {
        let pattern = patterns::translate(source)?;
        for target in targets.into().iter() {
            self.rules
                .entry(target.clone())
                .or_default()
                .insert(pattern.clone());
        }
        Ok(())
    }

    /// Declares that the impact set of `from` includes every target in `to`:
    /// a change matching the rules of one of them also triggers `from`.
    pub fn add_dependency(&mut self, from: impl Into<Target>, to: impl Into<TargetSet>) {
        let edges = self.dependencies.entry(from.into()).or_default();
        edges.extend(to.into().iter().cloned());
    }

    /// Direct rules of exactly `target`, in registration order.
    pub fn patterns_for<'a>(
        &'a self,
        target: &Target,
    ) -> impl Iterator<Item = &'a Pattern> + use<'a> {
        self.rules.get(target).into_iter().flatten()
    }

    /// Every direct rule ever registered, each pattern listed once.
    pub fn all_patterns(&self) -> IndexSet<&Pattern> {
        self.rules.values().flatten().collect()
    }

    /// Outgoing dependency edges of `target`.
    pub fn dependencies_of<'a>(
        &'a self,
        target: &Target,
    ) -> impl Iterator<Item = &'a Target> + use<'a> {
        self.dependencies.get(target).into_iter().flatten()
    }

    /// Every target referenced by a rule or as either end of an edge.
    pub fn targets(&self) -> BTreeSet<&Target> {
        self.rules
            .keys()
            .chain(self.dependencies.keys())
            .chain(self.dependencies.values().flatten())
            .collect()
    }

    /// Whether `target` owns rules or outgoing edges of its own.
    pub fn is_defined(&self, target: &Target) -> bool {
        self.rules.contains_key(target) || self.dependencies.contains_key(target)
    }

    /// Opens a suite: every rule and trigger declared inside `declare` is
    /// registered for all of `targets`.
    pub fn suite<F>(
        &mut self,
        targets: impl Into<TargetSet>,
        declare: F,
    ) -> Result<(), PatternError>
    where
        F: FnOnce(&mut Suite<'_>) -> Result<(), PatternError>,
    {
        let mut suite = Suite {
            store: self,
            targets: targets.into(),
        };
        declare(&mut suite)
    }
}

/// The "current suite" context handed to [`RuleStore::suite`].
pub struct Suite<'a> {
    store: &'a mut RuleStore,
    targets: TargetSet,
}

impl Suite<'_> {
    /// A source file whose change impacts the suite.
    pub fn file(&mut self, source: impl Into<PatternSource>) -> Result<&mut Self, PatternError> {
        self.store.add_rule(self.targets.clone(), source)?;
        Ok(self)
    }

    /// A test file of the suite. Registered exactly like [`Suite::file`].
    pub fn test(&mut self, source: impl Into<PatternSource>) -> Result<&mut Self, PatternError> {
        self.file(source)
    }

    /// A raw regular expression, used as is.
    pub fn pattern(&mut self, expression: &str) -> Result<&mut Self, PatternError> {
        let pattern = Pattern::from_regex(expression)?;
        self.file(pattern)
    }

    /// Changes to `dependencies` also trigger the suite.
    pub fn trigger(&mut self, dependencies: impl Into<TargetSet>) -> &mut Self {
        let dependencies = dependencies.into();
        for target in self.targets.iter() {
            self.store.add_dependency(target.clone(), dependencies.clone());
        }
        self
    }
}
