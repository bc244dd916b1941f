//! Report rendering: CSV sheets over the collected branch records.
//!
//! One sheet for all branches, one for main branches, one for develop
//! branches, and optionally one per developer. Every sheet carries the
//! configured columns followed by the predicate columns, and closes with
//! a totals row giving per-pattern hit rates across repositories.

pub mod columns;

pub use columns::Column;

use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use log::{debug, info};

use crate::scanner::{AggregateResult, BranchRecord};

/// Rendering settings derived from the application configuration.
#[derive(Debug, Clone, Default)]
pub struct ReportSettings {
    /// Configured column names, resolved through [`Column::parse`].
    pub columns: Vec<String>,
    pub required_files: Vec<String>,
    pub required_terms: Vec<String>,
    pub forbidden_files: Vec<String>,
    pub selective_columns: Vec<String>,
    /// Also write one sheet per developer.
    pub dev_sheets: bool,
}

/// Write all report sheets into `output_dir` and return the written
/// paths.
pub fn write_report(
    result: &AggregateResult,
    output_dir: &Path,
    settings: &ReportSettings,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create report directory: {}", output_dir.display()))?;

    let columns = build_columns(settings);
    let all: Vec<&BranchRecord> = result.records.iter().collect();
    let main: Vec<&BranchRecord> = result
        .records
        .iter()
        .filter(|r| matches!(r.short_branch_name(), "main" | "master"))
        .collect();
    let develop: Vec<&BranchRecord> = result
        .records
        .iter()
        .filter(|r| r.short_branch_name() == "develop")
        .collect();

    let mut written = Vec::new();
    for (name, records) in [
        ("branches.csv", &all),
        ("main-branches.csv", &main),
        ("develop-branches.csv", &develop),
    ] {
        let path = output_dir.join(name);
        write_sheet(&path, &columns, records)?;
        written.push(path);
    }

    if settings.dev_sheets {
        written.extend(write_developer_sheets(output_dir, &columns, &all)?);
    }

    info!(
        "Report written to {} ({} sheets, {} records)",
        output_dir.display(),
        written.len(),
        result.records.len()
    );
    Ok(written)
}

/// Configured columns followed by the predicate columns. Count columns
/// for forbidden/selective patterns are appended when the matching
/// pattern lists are configured but the column is not.
fn build_columns(settings: &ReportSettings) -> Vec<Column> {
    let mut columns: Vec<Column> = settings.columns.iter().map(|c| Column::parse(c)).collect();
    if !settings.forbidden_files.is_empty() && !columns.contains(&Column::ForbiddenCount) {
        columns.push(Column::ForbiddenCount);
    }
    if !settings.selective_columns.is_empty() && !columns.contains(&Column::SelectiveCount) {
        columns.push(Column::SelectiveCount);
    }
    for pattern in settings
        .required_files
        .iter()
        .chain(&settings.required_terms)
        .chain(&settings.forbidden_files)
    {
        columns.push(Column::Predicate(pattern.clone()));
    }
    columns
}

fn write_sheet(path: &Path, columns: &[Column], records: &[&BranchRecord]) -> Result<()> {
    let mut out = String::new();

    let header: Vec<String> = columns.iter().map(Column::header).collect();
    out.push_str(&header.join(","));
    out.push('\n');

    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|column| csv_escape(&columns::cell(record, column).unwrap_or_default()))
            .collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out.push_str(&totals_row(columns, records).join(","));
    out.push('\n');

    fs::write(path, out).with_context(|| format!("Failed to write sheet: {}", path.display()))?;
    debug!("Wrote sheet {} ({} rows)", path.display(), records.len());
    Ok(())
}

/// Per-pattern totals: how many of the sheet's repositories hit the
/// pattern, as "x/y (p%)" under the pattern's column.
fn totals_row(columns: &[Column], records: &[&BranchRecord]) -> Vec<String> {
    let repo_count = {
        let mut names: Vec<&str> = records.iter().map(|r| r.repo_name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    };

    columns
        .iter()
        .enumerate()
        .map(|(i, column)| match column.pattern() {
            Some(_) if repo_count > 0 => {
                let hits = records
                    .iter()
                    .filter(|record| columns::cell(record, column).as_deref() == Some("TRUE"))
                    .count();
                if hits > 0 {
                    let percentage = hits as f64 / repo_count as f64 * 100.0;
                    csv_escape(&format!("{hits}/{repo_count} ({percentage:.1}%)"))
                } else {
                    String::new()
                }
            }
            _ if i == 0 => "TOTAL".to_string(),
            _ => String::new(),
        })
        .collect()
}

/// One sheet per developer, keyed by normalized developer name, holding
/// the branches they last touched or own.
fn write_developer_sheets(
    output_dir: &Path,
    columns: &[Column],
    records: &[&BranchRecord],
) -> Result<Vec<PathBuf>> {
    let mut slugs: Vec<String> = records
        .iter()
        .flat_map(|r| [r.last_developer.as_str(), r.top_developer.as_str()])
        .map(normalize_developer)
        .filter(|slug| !slug.is_empty())
        .collect();
    slugs.sort();
    slugs.dedup();

    let mut written = Vec::new();
    for slug in slugs {
        let rows: Vec<&BranchRecord> = records
            .iter()
            .filter(|r| {
                normalize_developer(&r.last_developer) == slug
                    || normalize_developer(&r.top_developer) == slug
            })
            .copied()
            .collect();
        let path = output_dir.join(format!("developer-{slug}.csv"));
        write_sheet(&path, columns, &rows)?;
        written.push(path);
    }
    Ok(written)
}

/// Lowercased, ASCII-alphanumeric-only form of a developer name, used for
/// sheet file names and matching.
pub fn normalize_developer(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
