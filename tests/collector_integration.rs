//! Integration tests for the collection coordinator over fixture
//! workspaces built with git2.

use std::fs;
use std::path::{Path, PathBuf};
use git2::{Repository, RepositoryInitOptions, Signature, Time};
use tempfile::TempDir;

use garchive::scanner::{CollectError, Collector, ScanConfig};

const BOT: &str = "bitbucket-pipelines";

/// Create a repository under the workspace with `main` as initial head.
fn init_repo(workspace: &Path, name: &str) -> Repository {
    let path = workspace.join(name);
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    Repository::init_opts(&path, &opts).expect("Failed to init repository")
}

/// Commit a file on the current branch with a fixed author and time.
fn commit_file(
    repo: &Repository,
    file: &str,
    content: &str,
    author: &str,
    secs: i64,
) -> git2::Oid {
    let workdir = repo.workdir().expect("Repository has a workdir");
    let path = workdir.join(file);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(file)).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let email = format!("{}@example.com", author.to_lowercase().replace(' ', "."));
    let sig = Signature::new(author, &email, &Time::new(secs, 0)).unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, &format!("update {file}"), &tree, &parents)
        .unwrap()
}

/// Drop every loose object so any object lookup (and therefore any
/// checkout) fails while refs stay readable.
fn corrupt_objects(repo_path: &Path) {
    let objects = repo_path.join(".git/objects");
    for entry in walkdir(&objects) {
        if entry.is_file() {
            fs::remove_file(entry).unwrap();
        }
    }
}

fn walkdir(root: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        if let Ok(entries) = fs::read_dir(&dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path.clone());
                }
                paths.push(path);
            }
        }
    }
    paths
}

fn config_with_workers(workers: usize) -> ScanConfig {
    ScanConfig {
        workers,
        ..ScanConfig::default()
    }
}

fn base_secs() -> i64 {
    // A stable reference point well in the past keeps fixtures
    // deterministic.
    1_700_000_000
}

#[test]
fn determinism_across_worker_counts() {
    let workspace = TempDir::new().unwrap();
    let t = base_secs();

    for (name, authors) in [
        ("payments", vec!["Alice", "Bob", "Alice"]),
        ("billing", vec!["Carol", "Carol"]),
        ("gateway", vec!["Dave"]),
    ] {
        let repo = init_repo(workspace.path(), name);
        for (i, author) in authors.iter().enumerate() {
            commit_file(&repo, &format!("f{i}.txt"), author, author, t + i as i64 * 60);
        }
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        repo.branch("develop", &head, false).unwrap();
    }

    let serial = Collector::new(config_with_workers(1))
        .collect_branch_info(workspace.path(), 0)
        .unwrap();
    let parallel = Collector::new(config_with_workers(8))
        .collect_branch_info(workspace.path(), 0)
        .unwrap();

    let key = |result: &garchive::scanner::AggregateResult| {
        result
            .records
            .iter()
            .map(|r| {
                (
                    r.repo_name.clone(),
                    r.branch_name.clone(),
                    r.last_commit_date,
                    r.commit_count,
                    r.last_developer.clone(),
                    r.top_developer.clone(),
                )
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(key(&serial), key(&parallel));
    assert_eq!(serial.processed_repos, 3);
    assert_eq!(serial.records.len(), 6); // main + develop per repository
    assert!(serial.errors.is_empty());
}

#[test]
fn records_are_sorted_by_repo_then_most_recent_commit() {
    let workspace = TempDir::new().unwrap();
    let t = base_secs();

    let repo = init_repo(workspace.path(), "beta");
    commit_file(&repo, "a.txt", "x", "Alice", t);

    let repo = init_repo(workspace.path(), "Alpha");
    commit_file(&repo, "a.txt", "x", "Alice", t + 100);
    // develop gets a younger commit than main so it sorts first.
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch("develop", &head, false).unwrap();
    let handle = garchive::git::RepositoryHandle::open(workspace.path().join("Alpha")).unwrap();
    handle.checkout("develop").unwrap();
    commit_file(&repo, "b.txt", "y", "Alice", t + 200);

    let result = Collector::new(config_with_workers(2))
        .collect_branch_info(workspace.path(), 0)
        .unwrap();

    let order: Vec<(&str, &str)> = result
        .records
        .iter()
        .map(|r| (r.repo_name.as_str(), r.branch_name.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![("Alpha", "develop"), ("Alpha", "main"), ("beta", "main")]
    );
}

#[test]
fn local_branch_wins_over_remote_tracking() {
    let workspace = TempDir::new().unwrap();
    let repo = init_repo(workspace.path(), "svc");
    let oid = commit_file(&repo, "a.txt", "x", "Alice", base_secs());
    let head = repo.find_commit(oid).unwrap();
    repo.branch("develop", &head, false).unwrap();
    repo.reference("refs/remotes/origin/develop", oid, false, "").unwrap();
    repo.reference("refs/remotes/origin/feature-x", oid, false, "").unwrap();

    let result = Collector::new(config_with_workers(1))
        .collect_branch_info(workspace.path(), 0)
        .unwrap();

    let branches: Vec<&str> = result
        .records
        .iter()
        .map(|r| r.branch_name.as_str())
        .collect();
    assert!(branches.contains(&"develop"));
    assert!(!branches.contains(&"origin/develop"));
    // A remote-only branch survives under its remote-tracking name.
    assert!(branches.contains(&"origin/feature-x"));
    assert_eq!(
        branches.iter().filter(|b| b.ends_with("develop")).count(),
        1
    );
}

#[test]
fn shallow_clone_uses_head_author_only() {
    let workspace = TempDir::new().unwrap();
    let repo = init_repo(workspace.path(), "svc");
    let oid = commit_file(&repo, "a.txt", "x", "Alice", base_secs());
    fs::write(
        workspace.path().join("svc/.git/shallow"),
        format!("{oid}\n"),
    )
    .unwrap();

    let result = Collector::new(config_with_workers(1))
        .collect_branch_info(workspace.path(), 0)
        .unwrap();

    assert_eq!(result.records.len(), 1);
    let record = &result.records[0];
    assert!(record.is_shallow);
    assert_eq!(record.clone_depth, 1);
    assert_eq!(record.commit_count, 1);
    assert_eq!(record.last_developer, "Alice");
    assert_eq!(record.top_developer, "Alice");
    assert_eq!(record.last_developer_percentage, 100.0);
    assert_eq!(record.top_developer_percentage, 100.0);
}

#[test]
fn empty_repository_is_recorded_and_skipped() {
    let workspace = TempDir::new().unwrap();
    init_repo(workspace.path(), "unborn");
    let repo = init_repo(workspace.path(), "active");
    commit_file(&repo, "a.txt", "x", "Alice", base_secs());

    let result = Collector::new(config_with_workers(2))
        .collect_branch_info(workspace.path(), 0)
        .unwrap();

    assert_eq!(result.empty_repos, vec!["unborn".to_string()]);
    assert_eq!(result.processed_repos, 2);
    assert!(result.errors.is_empty());
    assert!(result.records.iter().all(|r| r.repo_name == "active"));
}

#[test]
fn failed_repository_does_not_abort_siblings() {
    let workspace = TempDir::new().unwrap();
    let t = base_secs();
    for name in ["alpha", "broken", "gamma"] {
        let repo = init_repo(workspace.path(), name);
        commit_file(&repo, "a.txt", "x", "Alice", t);
    }
    corrupt_objects(&workspace.path().join("broken"));

    let result = Collector::new(config_with_workers(3))
        .collect_branch_info(workspace.path(), 0)
        .unwrap();

    assert_eq!(result.processed_repos, 2);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].repo(), Some("broken"));
    let repos: Vec<&str> = result
        .records
        .iter()
        .map(|r| r.repo_name.as_str())
        .collect();
    assert_eq!(repos, vec!["alpha", "gamma"]);
}

#[test]
fn total_failure_returns_aggregate_error() {
    let workspace = TempDir::new().unwrap();
    let repo = init_repo(workspace.path(), "broken");
    commit_file(&repo, "a.txt", "x", "Alice", base_secs());
    corrupt_objects(&workspace.path().join("broken"));

    let result = Collector::new(config_with_workers(1)).collect_branch_info(workspace.path(), 0);
    match result {
        Err(CollectError::AggregateFailure { failures }) => assert_eq!(failures, 1),
        other => panic!("Expected AggregateFailure, got {:?}", other.map(|r| r.records.len())),
    }
}

#[test]
fn empty_workspace_yields_empty_result() {
    let workspace = TempDir::new().unwrap();
    fs::create_dir(workspace.path().join("not-a-repo")).unwrap();
    let result = Collector::new(config_with_workers(1))
        .collect_branch_info(workspace.path(), 0)
        .unwrap();
    assert!(result.records.is_empty());
    assert_eq!(result.processed_repos, 0);
}

#[test]
fn predicate_counts_and_maps() {
    let workspace = TempDir::new().unwrap();
    let repo = init_repo(workspace.path(), "svc");
    let t = base_secs();
    commit_file(&repo, "Dockerfile", "FROM alpine:3.18", "Alice", t);
    commit_file(&repo, "docs/api.md", "swagger: enabled", "Alice", t + 60);

    let config = ScanConfig {
        workers: 1,
        required_files: vec![
            "(?i)dockerfile$".to_string(),
            "(?i)sonar-project\\.properties$".to_string(),
        ],
        required_terms: vec!["(?i)swagger".to_string()],
        forbidden_files: vec!["(?i)\\.env$".to_string()],
        selective_columns: vec!["(?i)dockerfile$".to_string()],
        ..ScanConfig::default()
    };
    let result = Collector::new(config)
        .collect_branch_info(workspace.path(), 0)
        .unwrap();

    let record = &result.records[0];
    assert_eq!(record.required_files["(?i)dockerfile$"], true);
    assert_eq!(record.required_files["(?i)sonar-project\\.properties$"], false);
    assert_eq!(record.required_terms["(?i)swagger"], true);
    assert_eq!(record.forbidden_files["(?i)\\.env$"], false);
    assert_eq!(record.count, "2/3");
    assert_eq!(record.forbidden_count, "0/1");
    assert_eq!(record.selective_count, "1/1");
}

#[test]
fn bot_only_branch_gets_zero_value_developer() {
    let workspace = TempDir::new().unwrap();
    let repo = init_repo(workspace.path(), "pipeline-only");
    commit_file(&repo, "a.txt", "x", BOT, base_secs());

    let result = Collector::new(config_with_workers(1))
        .collect_branch_info(workspace.path(), 0)
        .unwrap();

    assert_eq!(result.records.len(), 1);
    let record = &result.records[0];
    assert_eq!(record.commit_count, 0);
    assert_eq!(record.last_developer, "");
    assert_eq!(record.top_developer, "");
    assert_eq!(record.top_developer_percentage, 0.0);
}

#[test]
fn developer_stats_and_aliases_flow_through() {
    let workspace = TempDir::new().unwrap();
    let repo = init_repo(workspace.path(), "svc");
    let t = base_secs();
    commit_file(&repo, "a.txt", "1", "ajones", t);
    commit_file(&repo, "b.txt", "2", "ajones", t + 60);
    commit_file(&repo, "c.txt", "3", "ajones", t + 120);
    commit_file(&repo, "d.txt", "4", "Bob", t + 180);

    let config = ScanConfig {
        workers: 1,
        aliases: [("ajones".to_string(), "Alice Jones".to_string())]
            .into_iter()
            .collect(),
        ..ScanConfig::default()
    };
    let result = Collector::new(config)
        .collect_branch_info(workspace.path(), 0)
        .unwrap();

    let record = &result.records[0];
    assert_eq!(record.commit_count, 4);
    // Bob made the most recent commit.
    assert_eq!(record.last_developer, "Bob");
    assert_eq!(record.last_developer_percentage, 25.0);
    // ajones owns 3 of 4 commits and is reported under the alias.
    assert_eq!(record.top_developer, "Alice Jones");
}
