use anyhow::{Context, Result, anyhow};
use git2::{Oid, Repository, RevparseMode, Sort};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Range used when the CI provider did not report one: the commit that was
/// fetched for the build, compared with its first parent.
pub const DEFAULT_RANGE: &str = "FETCH_HEAD^...FETCH_HEAD";

/// Trait defining the Git operations required by the engine.
/// This abstraction allows for easier testing and decoupling from specific git implementations.
pub trait GitClient {
    /// Paths touched by the commits of `range`, de-duplicated and sorted.
    fn changed_files(&self, range: &str) -> Result<Vec<String>>;

    /// One `<short id> <summary>` line per commit of `range`, newest first.
    fn commits(&self, range: &str) -> Result<Vec<String>>;

    /// Returns the root path of the repository.
    fn get_repo_root(&self) -> PathBuf;
}

/// Turns whatever the CI provider reported into a two-endpoint range.
///
/// * nothing → [`DEFAULT_RANGE`]
/// * a single commit `abc` → `abc^...abc`
/// * anything containing `..` is already a range and is kept as is
pub fn normalize_range(raw: Option<&str>) -> String {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        DEFAULT_RANGE.to_string()
    } else if raw.contains("..") {
        raw.to_string()
    } else {
        format!("{raw}^...{raw}")
    }
}

/// Concrete implementation of GitClient using the git2 crate.
pub struct Git2Client {
    repo: Repository,
}

impl Git2Client {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path)?;
        Ok(Self { repo })
    }

    fn peel(&self, object: Option<&git2::Object<'_>>, range: &str) -> Result<Oid> {
        let object = object.ok_or_else(|| anyhow!("Incomplete commit range '{range}'"))?;
        Ok(object.peel_to_commit()?.id())
    }

    /// Commits selected by `range`, following `git log` semantics:
    /// `A...B` is the symmetric difference, `A..B` the commits of `B` not in
    /// `A`, and a single revision is that commit with all of its ancestors.
    fn walk(&self, range: &str) -> Result<Vec<Oid>> {
        let spec = self
            .repo
            .revparse(range)
            .with_context(|| format!("Failed to resolve commit range '{range}'"))?;

        let mut walk = self.repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

        let mode = spec.mode();
        if mode.contains(RevparseMode::MERGE_BASE) {
            let from = self.peel(spec.from(), range)?;
            let to = self.peel(spec.to(), range)?;
            walk.push(from)?;
            walk.push(to)?;
            if let Ok(base) = self.repo.merge_base(from, to) {
                walk.hide(base)?;
            }
        } else if mode.contains(RevparseMode::RANGE) {
            walk.hide(self.peel(spec.from(), range)?)?;
            walk.push(self.peel(spec.to(), range)?)?;
        } else {
            walk.push(self.peel(spec.from(), range)?)?;
        }

        walk.collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to walk commit range '{range}'"))
    }
}

impl GitClient for Git2Client {
    fn changed_files(&self, range: &str) -> Result<Vec<String>> {
        let mut files = BTreeSet::new();

        for oid in self.walk(range)? {
            let commit = self.repo.find_commit(oid)?;
            let tree = commit.tree()?;
            // Root commits are compared against the empty tree.
            let parent_tree = match commit.parent(0) {
                Ok(parent) => Some(parent.tree()?),
                Err(_) => None,
            };

            let diff = self
                .repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
            for delta in diff.deltas() {
                for path in [delta.old_file().path(), delta.new_file().path()]
                    .into_iter()
                    .flatten()
                {
                    files.insert(path.to_string_lossy().into_owned());
                }
            }
        }

        Ok(files.into_iter().collect())
    }

    fn commits(&self, range: &str) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        for oid in self.walk(range)? {
            let commit = self.repo.find_commit(oid)?;
            let id = oid.to_string();
            lines.push(format!(
                "{} {}",
                &id[..10],
                commit.summary().unwrap_or_default()
            ));
        }
        Ok(lines)
    }

    fn get_repo_root(&self) -> PathBuf {
        self.repo
            .workdir()
            .unwrap_or(self.repo.path())
            .to_path_buf()
    }
}
