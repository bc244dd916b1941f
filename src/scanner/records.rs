//! Branch metadata records and the aggregate result of a collection run.

use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::CollectError;
use crate::git::REMOTE_PREFIX;

/// One row of report output, one per (repository, branch) pair.
#[derive(Debug, Clone, Serialize)]
pub struct BranchRecord {
    pub repo_name: String,
    /// Branch short name; remote-tracking branches keep the `origin/`
    /// prefix.
    pub branch_name: String,
    pub last_commit_date: DateTime<Utc>,
    pub time_since_last_commit: String,
    /// Commits excluding the configured bot identity. Fixed at 1 for
    /// shallow clones.
    pub commit_count: usize,
    /// Free-text host extracted from a compose-style file, empty if
    /// absent.
    pub host_line: String,
    pub last_developer: String,
    pub last_developer_percentage: f64,
    pub top_developer: String,
    pub top_developer_percentage: f64,
    /// File-name pattern to found/not-found.
    pub required_files: BTreeMap<String, bool>,
    pub required_terms: BTreeMap<String, bool>,
    pub forbidden_files: BTreeMap<String, bool>,
    /// "x/y" over required files and terms.
    pub count: String,
    pub forbidden_count: String,
    pub selective_count: String,
    pub is_shallow: bool,
    /// 1 for shallow clones, -1 for full clones.
    pub clone_depth: i32,
}

impl BranchRecord {
    /// Branch name without the remote-tracking prefix.
    pub fn short_branch_name(&self) -> &str {
        self.branch_name
            .strip_prefix(REMOTE_PREFIX)
            .unwrap_or(&self.branch_name)
    }
}

/// Format a found/total pair the way report cells expect it.
pub fn ratio(found: usize, total: usize) -> String {
    format!("{found}/{total}")
}

/// Everything one collection run produced. Built by the coordinator,
/// immutable once returned.
#[derive(Debug, Default)]
pub struct AggregateResult {
    /// Sorted branch records.
    pub records: Vec<BranchRecord>,
    /// Repositories successfully processed, empty ones included.
    pub processed_repos: usize,
    /// Names of repositories with no commits, sorted.
    pub empty_repos: Vec<String>,
    /// Per-repository failures captured during the run.
    pub errors: Vec<CollectError>,
}

impl AggregateResult {
    /// Number of distinct repositories present in the records.
    pub fn unique_repos(&self) -> usize {
        let mut names: Vec<&str> = self.records.iter().map(|r| r.repo_name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }
}

/// Sort records by repository name (case-insensitive), most recent commit
/// first within a repository. The sort is stable, so branches of one
/// repository sharing a commit date keep their listing order.
pub fn sort_records(records: &mut [BranchRecord]) {
    records.sort_by(|a, b| {
        a.repo_name
            .to_lowercase()
            .cmp(&b.repo_name.to_lowercase())
            .then_with(|| b.last_commit_date.cmp(&a.last_commit_date))
    });
}
