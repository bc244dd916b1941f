//! Collection coordinator: fans repository scans out across a bounded
//! worker pool and funnels results into a single aggregation loop.
//!
//! Branches inside one repository are walked sequentially by the worker
//! that owns its working tree (checkout mutates shared state); only
//! cross-repository work runs in parallel. Worker scheduling never leaks
//! into the result: the final sort makes the output identical for any
//! worker count.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use crossbeam_channel::RecvTimeoutError;
use log::{debug, info, trace, warn};

use super::analyzer::BranchAnalyzer;
use super::config::ScanConfig;
use super::error::CollectError;
use super::records::{sort_records, AggregateResult, BranchRecord};
use crate::git::{is_git_repository, RepositoryHandle, REMOTE_PREFIX};

/// How often the aggregation loop reports liveness while workers run.
const HEARTBEAT: Duration = Duration::from_secs(3);

/// Outcome of one repository unit of work.
enum RepoOutcome {
    Analyzed {
        records: Vec<BranchRecord>,
    },
    Empty {
        name: String,
    },
    Failed {
        error: CollectError,
    },
}

/// Coordinates a collection run over a directory of cloned repositories.
pub struct Collector {
    config: ScanConfig,
}

impl Collector {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Walk every branch of every repository under `base_path` and return
    /// the sorted aggregate. `total_repo_hint` only feeds progress
    /// reporting; pass 0 when unknown.
    ///
    /// Per-repository failures are captured, reported and returned in the
    /// aggregate; the call itself fails only when repositories were found
    /// and none could be processed.
    pub fn collect_branch_info(
        &self,
        base_path: &Path,
        total_repo_hint: usize,
    ) -> Result<AggregateResult, CollectError> {
        let repo_dirs = discover_repositories(base_path)?;
        if repo_dirs.is_empty() {
            info!("No git repositories found under {}", base_path.display());
            return Ok(AggregateResult::default());
        }

        let workers = self.config.workers.max(1);
        let total = total_repo_hint.max(repo_dirs.len());
        info!(
            "Collecting branch info for {} repositories with {} workers",
            repo_dirs.len(),
            workers
        );

        let (task_tx, task_rx) = crossbeam_channel::unbounded::<PathBuf>();
        let (outcome_tx, outcome_rx) = crossbeam_channel::bounded::<RepoOutcome>(repo_dirs.len());
        for dir in &repo_dirs {
            // Unbounded queue, every send succeeds before workers start.
            let _ = task_tx.send(dir.clone());
        }
        drop(task_tx);

        let mut result = AggregateResult::default();
        let mut failures = 0usize;

        thread::scope(|scope| {
            let config = &self.config;
            for _ in 0..workers {
                let task_rx = task_rx.clone();
                let outcome_tx = outcome_tx.clone();
                scope.spawn(move || {
                    while let Ok(path) = task_rx.recv() {
                        let _ = outcome_tx.send(scan_repository(&path, config));
                    }
                });
            }
            drop(task_rx);
            drop(outcome_tx);

            // Single writer: only this loop touches the aggregate.
            let mut last_report = Instant::now();
            loop {
                match outcome_rx.recv_timeout(HEARTBEAT) {
                    Ok(RepoOutcome::Analyzed { records }) => {
                        result.records.extend(records);
                        result.processed_repos += 1;
                    }
                    Ok(RepoOutcome::Empty { name }) => {
                        debug!("Repository {} has no commits", name);
                        result.empty_repos.push(name);
                        result.processed_repos += 1;
                    }
                    Ok(RepoOutcome::Failed { error }) => {
                        warn!("{}", error);
                        result.errors.push(error);
                        failures += 1;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
                if last_report.elapsed() >= HEARTBEAT {
                    info!(
                        "Collection progress: {}/{} repositories",
                        result.processed_repos + failures,
                        total
                    );
                    last_report = Instant::now();
                }
            }
        });

        if result.processed_repos == 0 {
            return Err(CollectError::AggregateFailure { failures });
        }

        sort_records(&mut result.records);
        result.empty_repos.sort();

        if !result.errors.is_empty() {
            warn!(
                "{} of {} repositories failed and are missing from the report",
                result.errors.len(),
                repo_dirs.len()
            );
        }
        info!(
            "Collected {} branch records from {} repositories ({} empty)",
            result.records.len(),
            result.processed_repos,
            result.empty_repos.len()
        );
        Ok(result)
    }
}

/// One unit of work: classify or analyze a single repository. Failures
/// stay inside the returned outcome so sibling repositories are never
/// affected.
fn scan_repository(path: &Path, config: &ScanConfig) -> RepoOutcome {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let repo = match RepositoryHandle::open(path) {
        Ok(repo) => repo,
        Err(source) => {
            return RepoOutcome::Failed {
                error: CollectError::Open { repo: name, source },
            }
        }
    };

    match repo.is_empty() {
        Ok(true) => return RepoOutcome::Empty { name },
        Ok(false) => {}
        Err(source) => {
            return RepoOutcome::Failed {
                error: CollectError::Open { repo: name, source },
            }
        }
    }

    let branches = match repo.branches() {
        Ok(branches) => branches,
        Err(source) => {
            return RepoOutcome::Failed {
                error: CollectError::Open { repo: name, source },
            }
        }
    };

    // The listing is local-first, so the local set is complete before any
    // remote-tracking name is tested against it.
    let local_branches: HashSet<&str> = branches
        .iter()
        .map(String::as_str)
        .filter(|branch| !branch.starts_with(REMOTE_PREFIX))
        .collect();

    let is_shallow = repo.is_shallow();
    let analyzer = BranchAnalyzer::new(&repo, config);
    let mut records = Vec::new();

    for branch in &branches {
        if let Some(short) = branch.strip_prefix(REMOTE_PREFIX) {
            if local_branches.contains(short) {
                trace!("Skipping {} in {}: local branch wins", branch, name);
                continue;
            }
        }
        match analyzer.analyze(branch, is_shallow) {
            Ok(record) => records.push(record),
            // A checkout or history failure invalidates the whole
            // repository; its earlier records are dropped with it.
            Err(error) => return RepoOutcome::Failed { error },
        }
    }

    RepoOutcome::Analyzed { records }
}

fn discover_repositories(base: &Path) -> Result<Vec<PathBuf>, CollectError> {
    let discover_err = |source| CollectError::Discover {
        path: base.display().to_string(),
        source,
    };
    let mut dirs = Vec::new();
    for entry in fs::read_dir(base).map_err(discover_err)? {
        let entry = entry.map_err(discover_err)?;
        let path = entry.path();
        if path.is_dir() && is_git_repository(&path) {
            dirs.push(path);
        } else {
            trace!("Not a git repository: {}", path.display());
        }
    }
    dirs.sort();
    Ok(dirs)
}
