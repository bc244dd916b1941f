//! Developer ownership statistics over a branch commit log.
//!
//! All functions are pure over the log slice delivered by the git layer
//! (most-recent-first). Commits by the excluded bot identity are left out
//! of ownership tallies; the percentage denominator deliberately keeps
//! them in, matching the behaviour reports have always shown.

use std::collections::{BTreeMap, HashMap};
use chrono::{DateTime, Utc};

use crate::git::CommitInfo;

/// Raw author display name mapped to a canonical developer name.
pub type AliasMap = HashMap<String, String>;

/// Resolve a raw author name through the alias table.
pub fn apply_alias<'a>(aliases: &'a AliasMap, name: &'a str) -> &'a str {
    aliases.get(name).map(String::as_str).unwrap_or(name)
}

/// The most recent commit not authored by `excluded`, as the aliased
/// author name and the committer date. `None` when the log is empty or
/// every commit is by the excluded identity.
pub fn last_developer_excluding(
    log: &[CommitInfo],
    excluded: &str,
    aliases: &AliasMap,
) -> Option<(String, DateTime<Utc>)> {
    log.iter()
        .find(|commit| commit.author_name != excluded)
        .map(|commit| {
            (
                apply_alias(aliases, &commit.author_name).to_string(),
                commit.committer_date,
            )
        })
}

/// Number of commits not authored by `excluded`.
pub fn commit_count(log: &[CommitInfo], excluded: &str) -> usize {
    log.iter()
        .filter(|commit| commit.author_name != excluded)
        .count()
}

/// The author with the highest bot-excluded commit count, aliased, with
/// their share of all commits. Ties break to the alphabetically first
/// author name.
pub fn top_developer(
    log: &[CommitInfo],
    excluded: &str,
    aliases: &AliasMap,
) -> Option<(String, f64)> {
    let mut tally: BTreeMap<&str, usize> = BTreeMap::new();
    for commit in log {
        if commit.author_name == excluded {
            continue;
        }
        *tally.entry(commit.author_name.as_str()).or_default() += 1;
    }

    let mut top: Option<(&str, usize)> = None;
    for (author, count) in &tally {
        if top.map_or(true, |(_, best)| *count > best) {
            top = Some((author, *count));
        }
    }

    top.map(|(author, _)| {
        let name = apply_alias(aliases, author).to_string();
        let percentage = developer_percentage(log, &name);
        (name, percentage)
    })
}

/// Share of all commits (bot included) authored by `developer`, as a
/// percentage rounded to the nearest 0.5. Zero when the log is empty.
pub fn developer_percentage(log: &[CommitInfo], developer: &str) -> f64 {
    if log.is_empty() {
        return 0.0;
    }
    let by_developer = log
        .iter()
        .filter(|commit| commit.author_name == developer)
        .count();
    let percentage = (by_developer as f64 / log.len() as f64) * 100.0;
    (percentage * 2.0).round() / 2.0
}
