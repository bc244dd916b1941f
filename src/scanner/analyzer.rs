//! Per-branch analysis: checkout, ownership statistics, predicate
//! evaluation and record assembly.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use log::{debug, trace};
use walkdir::WalkDir;

use super::config::ScanConfig;
use super::error::CollectError;
use super::predicates;
use super::records::{ratio, BranchRecord};
use crate::git::RepositoryHandle;
use crate::stats;

/// Analyzes the branches of a single repository. The repository's working
/// tree is exclusively owned by the caller for the lifetime of the
/// analyzer; checkout mutates it, so branches must be analyzed one at a
/// time.
pub struct BranchAnalyzer<'a> {
    repo: &'a RepositoryHandle,
    config: &'a ScanConfig,
}

impl<'a> BranchAnalyzer<'a> {
    pub fn new(repo: &'a RepositoryHandle, config: &'a ScanConfig) -> Self {
        Self { repo, config }
    }

    /// Check out `branch_name` and assemble its record. A checkout or
    /// history-read failure is fatal for the rest of this repository and
    /// is reported with the repository and branch attached.
    pub fn analyze(&self, branch_name: &str, is_shallow: bool) -> Result<BranchRecord, CollectError> {
        let repo_name = self.repo.name();
        debug!("Processing branch {} in repository {}", branch_name, repo_name);

        self.repo
            .checkout(branch_name)
            .map_err(|source| CollectError::Checkout {
                repo: repo_name.clone(),
                branch: branch_name.to_string(),
                source,
            })?;

        let history = self.read_history(branch_name, is_shallow)?;

        let workdir = self.repo.path();
        let compose_name = compose_file_name(workdir);
        let host_line = host_line(workdir, &compose_name);

        let required_files = evaluate(&self.config.required_files, |pattern| {
            predicates::file_name_matches(workdir, pattern)
        });
        let required_terms = evaluate(&self.config.required_terms, |pattern| {
            predicates::content_matches(workdir, pattern)
        });
        let forbidden_files = evaluate(&self.config.forbidden_files, |pattern| {
            predicates::file_name_matches(workdir, pattern)
        });

        let found = count_true(&required_files) + count_true(&required_terms);
        let total = required_files.len() + required_terms.len();
        let count = ratio(found, total);
        let forbidden_count = ratio(count_true(&forbidden_files), forbidden_files.len());
        let selective_count = selective_count(
            &self.config.selective_columns,
            [&required_files, &required_terms, &forbidden_files],
        );

        trace!(
            "Branch {} in {}: {} commits, last by {}",
            branch_name,
            repo_name,
            history.commit_count,
            history.last_developer
        );

        Ok(BranchRecord {
            repo_name,
            branch_name: branch_name.to_string(),
            time_since_last_commit: format_time_since(history.last_commit_date, Utc::now()),
            last_commit_date: history.last_commit_date,
            commit_count: history.commit_count,
            host_line,
            last_developer: history.last_developer,
            last_developer_percentage: history.last_developer_percentage,
            top_developer: history.top_developer,
            top_developer_percentage: history.top_developer_percentage,
            required_files,
            required_terms,
            forbidden_files,
            count,
            forbidden_count,
            selective_count,
            is_shallow,
            clone_depth: self.repo.clone_depth(),
        })
    }

    fn read_history(&self, branch_name: &str, is_shallow: bool) -> Result<HistoryStats, CollectError> {
        let history_err = |source| CollectError::HistoryRead {
            repo: self.repo.name(),
            branch: branch_name.to_string(),
            source,
        };

        if is_shallow {
            // A shallow clone only carries HEAD, so the single author owns
            // the branch outright.
            let head = self.repo.head_commit().map_err(history_err)?;
            let name = stats::apply_alias(&self.config.aliases, &head.author_name).to_string();
            return Ok(HistoryStats {
                last_commit_date: head.author_date,
                commit_count: 1,
                last_developer: name.clone(),
                last_developer_percentage: 100.0,
                top_developer: name,
                top_developer_percentage: 100.0,
            });
        }

        let log = self.repo.log().map_err(history_err)?;
        let excluded = self.config.excluded_author.as_str();
        let aliases = &self.config.aliases;

        // Branches where the bot is the only author still get a record,
        // with a zero-value developer.
        let (last_developer, last_commit_date) =
            stats::last_developer_excluding(&log, excluded, aliases)
                .unwrap_or_else(|| (String::new(), DateTime::UNIX_EPOCH));
        let (top_developer, top_developer_percentage) =
            stats::top_developer(&log, excluded, aliases).unwrap_or_default();

        Ok(HistoryStats {
            last_commit_date,
            commit_count: stats::commit_count(&log, excluded),
            last_developer_percentage: stats::developer_percentage(&log, &last_developer),
            last_developer,
            top_developer,
            top_developer_percentage,
        })
    }
}

struct HistoryStats {
    last_commit_date: DateTime<Utc>,
    commit_count: usize,
    last_developer: String,
    last_developer_percentage: f64,
    top_developer: String,
    top_developer_percentage: f64,
}

fn evaluate<F: Fn(&str) -> bool>(patterns: &[String], test: F) -> BTreeMap<String, bool> {
    patterns
        .iter()
        .map(|pattern| (pattern.clone(), test(pattern)))
        .collect()
}

fn count_true(results: &BTreeMap<String, bool>) -> usize {
    results.values().filter(|found| **found).count()
}

/// "x/y" over the configured selective subset. Names that do not match any
/// configured pattern are skipped.
fn selective_count(names: &[String], sources: [&BTreeMap<String, bool>; 3]) -> String {
    let mut found = 0;
    let mut total = 0;
    for name in names {
        if let Some(hit) = sources.iter().find_map(|map| map.get(name)) {
            total += 1;
            if *hit {
                found += 1;
            }
        }
    }
    ratio(found, total)
}

/// Bucket the time since the last commit into days, weeks or months.
pub fn format_time_since(last: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now - last).num_days().max(0);
    if days < 7 {
        format!("{days} days")
    } else if days < 30 {
        format!("{} weeks", days / 7)
    } else {
        format!("{} months", days / 30)
    }
}

/// Name of the first `docker-compose*` file in the repository root,
/// `docker-compose.yaml` when none matches.
fn compose_file_name(dir: &Path) -> String {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("docker-compose"))
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
        .into_iter()
        .next()
        .unwrap_or_else(|| "docker-compose.yaml".to_string())
}

/// Best-effort extraction of the value following a "host" token: the text
/// between the first `(` and the last `)` on the first matching line, with
/// `") Host ("` separators collapsed. Not a structured parser.
fn host_line(dir: &Path, file_name: &str) -> String {
    let path = match find_file_ignore_case(dir, file_name) {
        Some(path) => path,
        None => return String::new(),
    };
    let content = match fs::read(&path) {
        Ok(content) => content,
        Err(_) => return String::new(),
    };
    for line in String::from_utf8_lossy(&content).lines() {
        if !line.to_lowercase().contains("host") {
            continue;
        }
        if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
            if start < end {
                return line[start + 1..end].replace(") Host (", " ");
            }
        }
    }
    String::new()
}

fn find_file_ignore_case(dir: &Path, file_name: &str) -> Option<PathBuf> {
    for entry in WalkDir::new(dir).into_iter().flatten() {
        if entry.file_type().is_file()
            && entry
                .file_name()
                .to_string_lossy()
                .eq_ignore_ascii_case(file_name)
        {
            return Some(entry.into_path());
        }
    }
    None
}
