//! Error taxonomy for the collection engine.

use thiserror::Error;

/// Errors raised while collecting branch metadata. Per-repository variants
/// are isolated at the worker boundary and never abort sibling
/// repositories.
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("failed to enumerate repositories under {path}: {source}")]
    Discover {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{repo}: failed to open repository: {source}")]
    Open {
        repo: String,
        #[source]
        source: git2::Error,
    },

    #[error("{repo}: failed to check out branch '{branch}': {source}")]
    Checkout {
        repo: String,
        branch: String,
        #[source]
        source: git2::Error,
    },

    #[error("{repo}: failed to read history on branch '{branch}': {source}")]
    HistoryRead {
        repo: String,
        branch: String,
        #[source]
        source: git2::Error,
    },

    #[error("no repositories could be processed ({failures} failed)")]
    AggregateFailure { failures: usize },
}

impl CollectError {
    /// Repository the error belongs to, when it is repository-scoped.
    pub fn repo(&self) -> Option<&str> {
        match self {
            CollectError::Open { repo, .. }
            | CollectError::Checkout { repo, .. }
            | CollectError::HistoryRead { repo, .. } => Some(repo),
            CollectError::Discover { .. } | CollectError::AggregateFailure { .. } => None,
        }
    }
}
