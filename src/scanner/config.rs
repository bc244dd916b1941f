//! Collection engine configuration.

use crate::stats::AliasMap;

/// Default bot identity excluded from ownership statistics.
pub const DEFAULT_EXCLUDED_AUTHOR: &str = "bitbucket-pipelines";

/// Settings consumed by the collection engine. Built once from the
/// application configuration and passed down explicitly; read-only for
/// the duration of a run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Worker pool size, at least 1.
    pub workers: usize,
    /// Author identity excluded from ownership statistics.
    pub excluded_author: String,
    /// Regex patterns matched against working-tree file names.
    pub required_files: Vec<String>,
    /// Regex patterns matched against working-tree file contents.
    pub required_terms: Vec<String>,
    /// File-name patterns that should not be present.
    pub forbidden_files: Vec<String>,
    /// Subset of pattern names feeding the selective count.
    pub selective_columns: Vec<String>,
    /// Raw author name to canonical developer name.
    pub aliases: AliasMap,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            excluded_author: DEFAULT_EXCLUDED_AUTHOR.to_string(),
            required_files: Vec::new(),
            required_terms: Vec::new(),
            forbidden_files: Vec::new(),
            selective_columns: Vec::new(),
            aliases: AliasMap::new(),
        }
    }
}
