//! Report column model.
//!
//! Every column a sheet can carry is either a known record field or a
//! configured predicate pattern. Configured column names resolve through
//! [`Column::parse`]; cell lookup returns an explicit `Option` so unknown
//! predicate names surface as missing cells instead of panics.

use crate::scanner::BranchRecord;

/// A report column: a known field of [`BranchRecord`] or one of the
/// configured predicate patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    RepoName,
    BranchName,
    LastCommitDate,
    TimeSinceLastCommit,
    CommitCount,
    HostLine,
    LastDeveloper,
    LastDeveloperPercentage,
    TopDeveloper,
    TopDeveloperPercentage,
    Count,
    ForbiddenCount,
    SelectiveCount,
    IsShallow,
    CloneDepth,
    /// A required-file, required-term or forbidden-file pattern.
    Predicate(String),
}

impl Column {
    /// Map a configured column name to a column. Anything that is not a
    /// known field name is treated as a predicate pattern.
    pub fn parse(name: &str) -> Column {
        match name {
            "RepoName" => Column::RepoName,
            "BranchName" => Column::BranchName,
            "LastCommitDate" => Column::LastCommitDate,
            "TimeSinceLastCommit" => Column::TimeSinceLastCommit,
            "CommitCount" => Column::CommitCount,
            "HostLine" => Column::HostLine,
            "LastDeveloper" => Column::LastDeveloper,
            "LastDeveloperPercentage" => Column::LastDeveloperPercentage,
            "TopDeveloper" => Column::TopDeveloper,
            "TopDeveloperPercentage" => Column::TopDeveloperPercentage,
            "Count" => Column::Count,
            "ForbiddenCount" => Column::ForbiddenCount,
            "SelectiveCount" => Column::SelectiveCount,
            "IsShallow" => Column::IsShallow,
            "CloneDepth" => Column::CloneDepth,
            other => Column::Predicate(other.to_string()),
        }
    }

    /// Header cell text: uppercased with regex tokens stripped, so
    /// `(?i)sonar-project.properties$` renders as SONARPROJECTPROPERTIES.
    pub fn header(&self) -> String {
        let name = match self {
            Column::RepoName => "RepoName",
            Column::BranchName => "BranchName",
            Column::LastCommitDate => "LastCommitDate",
            Column::TimeSinceLastCommit => "TimeSinceLastCommit",
            Column::CommitCount => "CommitCount",
            Column::HostLine => "HostLine",
            Column::LastDeveloper => "LastDeveloper",
            Column::LastDeveloperPercentage => "LastDeveloperPercentage",
            Column::TopDeveloper => "TopDeveloper",
            Column::TopDeveloperPercentage => "TopDeveloperPercentage",
            Column::Count => "Count",
            Column::ForbiddenCount => "ForbiddenCount",
            Column::SelectiveCount => "SelectiveCount",
            Column::IsShallow => "IsShallow",
            Column::CloneDepth => "CloneDepth",
            Column::Predicate(pattern) => pattern,
        };
        name.replace("(?i)", "")
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_uppercase()
    }

    /// The configured pattern behind a predicate column.
    pub fn pattern(&self) -> Option<&str> {
        match self {
            Column::Predicate(pattern) => Some(pattern),
            _ => None,
        }
    }
}

/// Resolve a record's cell for a column. `None` only for predicate
/// columns the record does not carry.
pub fn cell(record: &BranchRecord, column: &Column) -> Option<String> {
    Some(match column {
        Column::RepoName => record.repo_name.clone(),
        Column::BranchName => record.branch_name.clone(),
        Column::LastCommitDate => record.last_commit_date.format("%Y-%m-%d %H:%M").to_string(),
        Column::TimeSinceLastCommit => record.time_since_last_commit.clone(),
        Column::CommitCount => record.commit_count.to_string(),
        Column::HostLine => record.host_line.clone(),
        Column::LastDeveloper => record.last_developer.clone(),
        Column::LastDeveloperPercentage => {
            format!("{:.2}%", record.last_developer_percentage)
        }
        Column::TopDeveloper => record.top_developer.clone(),
        Column::TopDeveloperPercentage => format!("{:.2}%", record.top_developer_percentage),
        Column::Count => record.count.clone(),
        Column::ForbiddenCount => record.forbidden_count.clone(),
        Column::SelectiveCount => record.selective_count.clone(),
        Column::IsShallow => record.is_shallow.to_string().to_uppercase(),
        Column::CloneDepth => record.clone_depth.to_string(),
        Column::Predicate(pattern) => {
            let found = record
                .required_files
                .get(pattern)
                .or_else(|| record.required_terms.get(pattern))
                .or_else(|| record.forbidden_files.get(pattern))?;
            found.to_string().to_uppercase()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn record() -> BranchRecord {
        BranchRecord {
            repo_name: "payments".to_string(),
            branch_name: "origin/develop".to_string(),
            last_commit_date: chrono::Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap(),
            time_since_last_commit: "2 weeks".to_string(),
            commit_count: 41,
            host_line: "api.example.com".to_string(),
            last_developer: "Alice".to_string(),
            last_developer_percentage: 33.5,
            top_developer: "Bob".to_string(),
            top_developer_percentage: 66.5,
            required_files: BTreeMap::from([("(?i)Dockerfile$".to_string(), true)]),
            required_terms: BTreeMap::from([("(?i)swagger".to_string(), false)]),
            forbidden_files: BTreeMap::new(),
            count: "1/2".to_string(),
            forbidden_count: "0/0".to_string(),
            selective_count: "0/0".to_string(),
            is_shallow: false,
            clone_depth: -1,
        }
    }

    #[test]
    fn test_parse_known_fields_and_predicates() {
        assert_eq!(Column::parse("RepoName"), Column::RepoName);
        assert_eq!(Column::parse("Count"), Column::Count);
        assert_eq!(
            Column::parse("(?i)Dockerfile$"),
            Column::Predicate("(?i)Dockerfile$".to_string())
        );
    }

    #[test]
    fn test_header_strips_regex_tokens() {
        assert_eq!(
            Column::Predicate("(?i)sonar-project.properties$".to_string()).header(),
            "SONARPROJECTPROPERTIES"
        );
        assert_eq!(Column::RepoName.header(), "REPONAME");
    }

    #[test]
    fn test_cell_known_fields() {
        let record = record();
        assert_eq!(cell(&record, &Column::RepoName).unwrap(), "payments");
        assert_eq!(
            cell(&record, &Column::LastCommitDate).unwrap(),
            "2025-03-14 09:30"
        );
        assert_eq!(
            cell(&record, &Column::LastDeveloperPercentage).unwrap(),
            "33.50%"
        );
        assert_eq!(cell(&record, &Column::IsShallow).unwrap(), "FALSE");
        assert_eq!(cell(&record, &Column::CloneDepth).unwrap(), "-1");
    }

    #[test]
    fn test_cell_predicate_lookup() {
        let record = record();
        let found = Column::Predicate("(?i)Dockerfile$".to_string());
        let missing = Column::Predicate("(?i)Jenkinsfile$".to_string());
        assert_eq!(cell(&record, &found).unwrap(), "TRUE");
        assert_eq!(
            cell(&record, &Column::Predicate("(?i)swagger".to_string())).unwrap(),
            "FALSE"
        );
        assert!(cell(&record, &missing).is_none());
    }
}
