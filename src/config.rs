//! Layered application configuration.
//!
//! Defaults, then an optional TOML file (`garchive.toml` in the working
//! directory or under `config/`), then explicit environment-variable
//! overrides. The loaded value is passed down to every subsystem; there
//! is no global configuration state.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use log::debug;
use serde::Deserialize;

use crate::report::ReportSettings;
use crate::scanner::{ScanConfig, DEFAULT_EXCLUDED_AUTHOR};

const CONFIG_FILE_CANDIDATES: &[&str] = &["garchive.toml", "config/garchive.toml"];

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub bitbucket: BitbucketConfig,
    pub logger: LoggerConfig,
    pub app: WorkspaceConfig,
    pub jira: JiraConfig,
}

/// Credentials for the external clone tool.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BitbucketConfig {
    pub token: String,
    pub username: String,
    pub workspace: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WorkspaceConfig {
    /// Worker count for the collection engine, capped at the machine's
    /// core count.
    pub cpu: usize,
    pub clone_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub shallow_clone: bool,
    pub main_branch_only: bool,
    pub excluded_author: String,
    pub default_columns: Vec<String>,
    pub files_to_search: Vec<String>,
    pub terms_to_search: Vec<String>,
    pub forbidden_files: Vec<String>,
    pub selective_columns: Vec<String>,
    /// Raw author display name to canonical developer name.
    pub developers: HashMap<String, String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            cpu: 1,
            clone_dir: PathBuf::from("./repositories"),
            dest_dir: PathBuf::from("./archive"),
            shallow_clone: false,
            main_branch_only: false,
            excluded_author: DEFAULT_EXCLUDED_AUTHOR.to_string(),
            default_columns: vec![
                "RepoName".to_string(),
                "BranchName".to_string(),
                "LastCommitDate".to_string(),
                "TimeSinceLastCommit".to_string(),
                "CommitCount".to_string(),
                "HostLine".to_string(),
                "LastDeveloper".to_string(),
                "LastDeveloperPercentage".to_string(),
                "TopDeveloper".to_string(),
                "TopDeveloperPercentage".to_string(),
                "Count".to_string(),
                "IsShallow".to_string(),
                "CloneDepth".to_string(),
            ],
            files_to_search: vec![
                "(?i)sonar-project.properties$".to_string(),
                "(?i)bitbucket-pipelines.yml$".to_string(),
                "(?i)Dockerfile$".to_string(),
                "(?i)docker-compose(-\\w+)?\\.yaml$".to_string(),
            ],
            terms_to_search: vec!["vaumt".to_string(), "swagger".to_string()],
            forbidden_files: Vec::new(),
            selective_columns: Vec::new(),
            developers: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct JiraConfig {
    pub enabled: bool,
    pub base_url: String,
    pub username: String,
    pub api_token: String,
    pub project_key: String,
    pub issue_type: String,
    pub parent_task: String,
}

impl AppConfig {
    /// Load configuration: an explicit file, or the first discovered
    /// candidate, or plain defaults. Environment overrides apply last.
    pub fn load(explicit_file: Option<&Path>) -> Result<Self> {
        let mut config = match explicit_file {
            Some(path) => Self::load_from_file(path)?,
            None => match CONFIG_FILE_CANDIDATES
                .iter()
                .map(PathBuf::from)
                .find(|path| path.exists())
            {
                Some(path) => Self::load_from_file(&path)?,
                None => {
                    debug!("No configuration file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        override_string("BITBUCKET_TOKEN", &mut self.bitbucket.token);
        override_string("BITBUCKET_USERNAME", &mut self.bitbucket.username);
        override_string("BITBUCKET_WORKSPACE", &mut self.bitbucket.workspace);
        override_string("LOG_LEVEL", &mut self.logger.level);
        override_string("JIRA_BASE_URL", &mut self.jira.base_url);
        override_string("JIRA_USERNAME", &mut self.jira.username);
        override_string("JIRA_API_TOKEN", &mut self.jira.api_token);
        override_string("JIRA_PROJECT_KEY", &mut self.jira.project_key);
        if let Some(cpu) = env_parse::<usize>("APP_CPU") {
            self.app.cpu = cpu;
        }
        if let Ok(dir) = env::var("APP_CLONE_DIR") {
            if !dir.is_empty() {
                self.app.clone_dir = PathBuf::from(dir);
            }
        }
        if let Some(main_only) = env_parse::<bool>("APP_MAIN_BRANCH_ONLY") {
            self.app.main_branch_only = main_only;
        }
    }

    /// Worker count for the collection engine: at least 1, at most the
    /// machine's core count.
    pub fn workers(&self) -> usize {
        self.app.cpu.clamp(1, num_cpus::get())
    }

    /// Directory the workspace is cloned into.
    pub fn workspace_dir(&self) -> PathBuf {
        if self.bitbucket.workspace.is_empty() {
            self.app.clone_dir.clone()
        } else {
            self.app.clone_dir.join(&self.bitbucket.workspace)
        }
    }

    /// Settings consumed by the collection engine.
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            workers: self.workers(),
            excluded_author: self.app.excluded_author.clone(),
            required_files: self.app.files_to_search.clone(),
            required_terms: self.app.terms_to_search.clone(),
            forbidden_files: self.app.forbidden_files.clone(),
            selective_columns: self.app.selective_columns.clone(),
            aliases: self.app.developers.clone(),
        }
    }

    /// Settings consumed by the report renderer.
    pub fn report_settings(&self, dev_sheets: bool) -> ReportSettings {
        ReportSettings {
            columns: self.app.default_columns.clone(),
            required_files: self.app.files_to_search.clone(),
            required_terms: self.app.terms_to_search.clone(),
            forbidden_files: self.app.forbidden_files.clone(),
            selective_columns: self.app.selective_columns.clone(),
            dev_sheets,
        }
    }

    /// The clone command needs full Bitbucket credentials.
    pub fn validate_bitbucket(&self) -> Result<()> {
        if self.bitbucket.token.is_empty() {
            bail!("bitbucket token is required (BITBUCKET_TOKEN)");
        }
        if self.bitbucket.username.is_empty() {
            bail!("bitbucket username is required (BITBUCKET_USERNAME)");
        }
        if self.bitbucket.workspace.is_empty() {
            bail!("bitbucket workspace is required (BITBUCKET_WORKSPACE)");
        }
        Ok(())
    }

    /// The serve command needs JIRA credentials and a project.
    pub fn validate_jira(&self) -> Result<()> {
        if !self.jira.enabled {
            bail!("JIRA task creation is disabled in configuration");
        }
        if self.jira.api_token.is_empty() || self.jira.username.is_empty() {
            bail!("JIRA API credentials are not configured");
        }
        if self.jira.base_url.is_empty() {
            bail!("JIRA base URL is not configured (JIRA_BASE_URL)");
        }
        if self.jira.project_key.is_empty() {
            bail!("JIRA project key is not configured (JIRA_PROJECT_KEY)");
        }
        Ok(())
    }
}

fn override_string(var: &str, target: &mut String) {
    if let Ok(value) = env::var(var) {
        if !value.is_empty() {
            *target = value;
        }
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    env::var(var).ok().and_then(|value| value.parse().ok())
}
