#[cfg(test)]
mod tests {
    use crate::builders::reporter::ConsoleReporter;
    use crate::builders::rules::Target;
    use crate::core::config::{SuiteConfig, TriggerConfig};
    use crate::core::decision::Outcome;
    use crate::core::engine::{RunOptions, SKIP_FILE, TriggerEngine};
    use crate::core::git::{self, Git2Client, GitClient};
    use anyhow::{Result, anyhow};
    use git2::{Commit, Oid, Repository, Signature};
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    fn setup_test_repo() -> (tempfile::TempDir, Repository, PathBuf) {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let repo_path = dir.path().to_path_buf();
        (dir, repo, repo_path)
    }

    /// Writes `files`, removes `removed`, and commits the result on HEAD.
    fn commit(repo: &Repository, files: &[(&str, &str)], removed: &[&str], message: &str) -> Oid {
        let root = repo.workdir().unwrap().to_path_buf();
        let mut index = repo.index().unwrap();

        for (path, content) in files {
            let full = root.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(&full, content).unwrap();
            index.add_path(Path::new(path)).unwrap();
        }
        for path in removed {
            fs::remove_file(root.join(path)).unwrap();
            index.remove_path(Path::new(path)).unwrap();
        }
        index.write().unwrap();

        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let signature = Signature::now("Test", "test@example.com").unwrap();
        let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .unwrap()
    }

    /// Three commits: docs, a model, then a controller plus a docs edit.
    fn history(repo: &Repository) -> [Oid; 3] {
        let first = commit(repo, &[("README.md", "# app\n")], &[], "Initial commit");
        let second = commit(
            repo,
            &[("app/models/user.rb", "class User; end\n")],
            &[],
            "Add user model",
        );
        let third = commit(
            repo,
            &[
                ("app/controllers/x.rb", "class X; end\n"),
                ("README.md", "# app\n\nnow with controllers\n"),
            ],
            &[],
            "Add controller",
        );
        [first, second, third]
    }

    struct FakeGit {
        files: Vec<String>,
    }

    impl GitClient for FakeGit {
        fn changed_files(&self, _range: &str) -> Result<Vec<String>> {
            Ok(self.files.clone())
        }

        fn commits(&self, _range: &str) -> Result<Vec<String>> {
            Ok(vec!["0123456789 fake commit".to_string()])
        }

        fn get_repo_root(&self) -> PathBuf {
            PathBuf::from(".")
        }
    }

    struct BrokenGit;

    impl GitClient for BrokenGit {
        fn changed_files(&self, range: &str) -> Result<Vec<String>> {
            Err(anyhow!("unknown revision {range}"))
        }

        fn commits(&self, range: &str) -> Result<Vec<String>> {
            Err(anyhow!("unknown revision {range}"))
        }

        fn get_repo_root(&self) -> PathBuf {
            PathBuf::from(".")
        }
    }

    fn sample_config() -> TriggerConfig {
        let mut models = SuiteConfig::new("models");
        models.files = vec!["app/models/**/*.rb".to_string()];
        let mut controllers = SuiteConfig::new("controllers");
        controllers.files = vec!["app/controllers/**/*.rb".to_string()];
        controllers.triggers = vec![Target::from("models")];
        let mut docs = SuiteConfig::new(Target::NONE);
        docs.files = vec!["README.md".to_string()];

        TriggerConfig {
            suites: vec![models, controllers, docs],
            ..TriggerConfig::default()
        }
    }

    fn engine_with(root: &Path, git: Option<Box<dyn GitClient>>) -> TriggerEngine {
        TriggerEngine::with_parts(
            root.to_path_buf(),
            sample_config(),
            git,
            Box::new(ConsoleReporter::new(true)),
        )
        .unwrap()
    }

    fn pr(component: &str) -> RunOptions {
        RunOptions {
            pull_request: true,
            branch: "master".to_string(),
            component: Some(component.to_string()),
            commit_range: Some("a...b".to_string()),
            ..RunOptions::default()
        }
    }

    #[test]
    fn test_changed_files_for_symmetric_range() {
        let (_dir, repo, repo_path) = setup_test_repo();
        let [first, _, third] = history(&repo);
        let client = Git2Client::new(&repo_path).unwrap();

        let files = client.changed_files(&format!("{first}...{third}")).unwrap();
        assert_eq!(
            files,
            vec!["README.md", "app/controllers/x.rb", "app/models/user.rb"]
        );
    }

    #[test]
    fn test_changed_files_for_two_dot_range() {
        let (_dir, repo, repo_path) = setup_test_repo();
        let [first, second, _] = history(&repo);
        let client = Git2Client::new(&repo_path).unwrap();

        let files = client.changed_files(&format!("{first}..{second}")).unwrap();
        assert_eq!(files, vec!["app/models/user.rb"]);
    }

    #[test]
    fn test_single_commit_is_widened_to_its_own_changes() {
        let (_dir, repo, repo_path) = setup_test_repo();
        let [_, _, third] = history(&repo);
        let client = Git2Client::new(&repo_path).unwrap();

        let range = git::normalize_range(Some(&third.to_string()));
        let files = client.changed_files(&range).unwrap();
        assert_eq!(files, vec!["README.md", "app/controllers/x.rb"]);

        let commits = client.commits(&range).unwrap();
        assert_eq!(commits.len(), 1);
        assert!(commits[0].ends_with(" Add controller"));
    }

    #[test]
    fn test_root_commit_and_deletions() {
        let (_dir, repo, repo_path) = setup_test_repo();
        let [first, ..] = history(&repo);
        let fourth = commit(&repo, &[], &["app/models/user.rb"], "Drop user model");
        let client = Git2Client::new(&repo_path).unwrap();

        assert_eq!(
            client.changed_files(&first.to_string()).unwrap(),
            vec!["README.md"]
        );
        assert_eq!(
            client.changed_files(&format!("{fourth}^...{fourth}")).unwrap(),
            vec!["app/models/user.rb"]
        );
    }

    #[test]
    fn test_unknown_range_is_an_error() {
        let (_dir, repo, repo_path) = setup_test_repo();
        history(&repo);
        let client = Git2Client::new(&repo_path).unwrap();
        assert!(client.changed_files(git::DEFAULT_RANGE).is_err());
    }

    #[test]
    fn test_engine_builds_through_dependency() {
        let dir = tempdir().unwrap();
        let git = FakeGit {
            files: vec!["README.md".to_string(), "app/models/user.rb".to_string()],
        };
        let engine = engine_with(dir.path(), Some(Box::new(git)));

        let report = engine.run(&pr("controllers")).unwrap();
        assert_eq!(report.decision.outcome, Outcome::Build);
        assert!(report.decision.reason.contains("app/models/user.rb"));
        assert!(report.uncovered.is_empty());
        assert_eq!(report.commits.len(), 1);
    }

    #[test]
    fn test_engine_reports_uncovered_files() {
        let dir = tempdir().unwrap();
        let git = FakeGit {
            files: vec!["Rakefile".to_string()],
        };
        let engine = engine_with(dir.path(), Some(Box::new(git)));

        let report = engine.run(&pr("models")).unwrap();
        assert_eq!(report.decision.outcome, Outcome::Skip);
        assert_eq!(report.uncovered, vec!["Rakefile"]);
    }

    #[test]
    fn test_skip_writes_marker_when_touching() {
        let dir = tempdir().unwrap();
        let build_dir = tempdir().unwrap();
        let git = FakeGit {
            files: vec!["README.md".to_string()],
        };
        let engine = engine_with(dir.path(), Some(Box::new(git)));

        let mut options = pr("models");
        engine.run(&options).unwrap();
        assert!(!build_dir.path().join(SKIP_FILE).exists());

        options.touch = true;
        options.build_dir = Some(build_dir.path().to_path_buf());
        let report = engine.run(&options).unwrap();

        let marker = fs::read_to_string(build_dir.path().join(SKIP_FILE)).unwrap();
        assert_eq!(marker, format!("SKIPPING: {}\n", report.decision.reason));
    }

    #[test]
    fn test_git_failure_means_no_changes() {
        let dir = tempdir().unwrap();
        let engine = engine_with(dir.path(), Some(Box::new(BrokenGit)));

        let report = engine.run(&pr("models")).unwrap();
        assert!(report.changed_files.is_empty());
        assert_eq!(report.decision.outcome, Outcome::Skip);

        let mut options = pr("models");
        options.pull_request = false;
        let report = engine.run(&options).unwrap();
        assert_eq!(report.decision.outcome, Outcome::Build);
    }

    #[test]
    fn test_component_suffix_is_applied() {
        let dir = tempdir().unwrap();
        let mut config = sample_config();
        config.component_suffix = Some("-spec".to_string());
        let mut spec = SuiteConfig::new("models-spec");
        spec.tests = vec!["test/models/**/*_test.rb".to_string()];
        spec.triggers = vec![Target::from("models")];
        config.suites.push(spec);

        let git = FakeGit {
            files: vec!["app/models/user.rb".to_string()],
        };
        let engine = TriggerEngine::with_parts(
            dir.path().to_path_buf(),
            config,
            Some(Box::new(git)),
            Box::new(ConsoleReporter::new(false)),
        )
        .unwrap();

        let report = engine.run(&pr("models")).unwrap();
        assert_eq!(report.context.component.as_deref(), Some("models-spec"));
        assert!(report.decision.should_build());
    }

    #[test]
    fn test_explain_and_affected() {
        let dir = tempdir().unwrap();
        let git = FakeGit {
            files: vec!["app/models/user.rb".to_string()],
        };
        let engine = engine_with(dir.path(), Some(Box::new(git)));

        let explanation = engine.explain(&Target::from("controllers")).unwrap();
        let expansion: Vec<&str> = explanation.expansion.iter().map(Target::as_str).collect();
        assert_eq!(expansion, vec![":all", "controllers", "models"]);
        assert!(
            explanation
                .rules
                .contains(&(Target::from("models"), "app/models/**/*.rb".to_string()))
        );

        let hits = engine.affected(None).unwrap();
        let names: Vec<&str> = hits.iter().map(|(target, _)| target.as_str()).collect();
        assert_eq!(names, vec!["controllers", "models"]);
    }
}
