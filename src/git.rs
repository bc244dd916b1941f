//! Read access to cloned git repositories.
//!
//! Wraps git2 with the handful of operations the collection engine needs:
//! branch listing, working-tree checkout, history reads and shallow-clone
//! detection.

use git2::build::CheckoutBuilder;
use git2::{BranchType, ErrorCode, Repository, Sort};
use chrono::{DateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};
use log::{debug, trace};

/// Short-name prefix of remote-tracking branches on the default remote.
pub const REMOTE_PREFIX: &str = "origin/";

/// One entry of a branch commit log, most-recent-first.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitInfo {
    pub author_name: String,
    pub author_email: String,
    pub author_date: DateTime<Utc>,
    pub committer_date: DateTime<Utc>,
    pub summary: String,
}

/// A wrapper around git2::Repository scoped to one cloned repository.
pub struct RepositoryHandle {
    repository: Repository,
    path: PathBuf,
}

impl RepositoryHandle {
    /// Open a repository from its working-tree path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, git2::Error> {
        let path = path.as_ref();
        debug!("Opening repository at {}", path.display());
        let repository = Repository::open(path)?;
        Ok(Self {
            repository,
            path: path.to_path_buf(),
        })
    }

    /// Working-tree path this handle was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Repository name, taken from the directory name.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// List branch short names: local branches first, then remote-tracking
    /// ones (`origin/<name>`). The `origin/HEAD` pointer is not a real
    /// branch and is dropped.
    pub fn branches(&self) -> Result<Vec<String>, git2::Error> {
        let mut names = Vec::new();
        for entry in self.repository.branches(Some(BranchType::Local))? {
            let (branch, _) = entry?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        for entry in self.repository.branches(Some(BranchType::Remote))? {
            let (branch, _) = entry?;
            if let Some(name) = branch.name()? {
                if name.ends_with("/HEAD") {
                    continue;
                }
                names.push(name.to_string());
            }
        }
        trace!("Branches in {}: {:?}", self.name(), names);
        Ok(names)
    }

    /// Check out the given branch into the working tree. Local branches
    /// move HEAD to the branch ref; remote-tracking branches detach HEAD
    /// at the remote ref.
    pub fn checkout(&self, branch: &str) -> Result<(), git2::Error> {
        let refname = match branch.strip_prefix(REMOTE_PREFIX) {
            Some(short) => format!("refs/remotes/origin/{short}"),
            None => format!("refs/heads/{branch}"),
        };
        let object = self.repository.revparse_single(&refname)?;
        let mut options = CheckoutBuilder::new();
        options.force();
        self.repository.checkout_tree(&object, Some(&mut options))?;
        if branch.starts_with(REMOTE_PREFIX) {
            self.repository.set_head_detached(object.id())?;
        } else {
            self.repository.set_head(&refname)?;
        }
        debug!("Checked out branch {} in {}", branch, self.name());
        Ok(())
    }

    /// Commit log of the currently checked-out branch, most-recent-first.
    pub fn log(&self) -> Result<Vec<CommitInfo>, git2::Error> {
        let mut revwalk = self.repository.revwalk()?;
        revwalk.push_head()?;
        revwalk.set_sorting(Sort::TIME)?;
        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = self.repository.find_commit(oid?)?;
            commits.push(commit_info(&commit));
        }
        Ok(commits)
    }

    /// The single commit HEAD points at.
    pub fn head_commit(&self) -> Result<CommitInfo, git2::Error> {
        let head = self.repository.head()?;
        let commit = head.peel_to_commit()?;
        Ok(commit_info(&commit))
    }

    /// Whether the clone carries a shallow marker.
    pub fn is_shallow(&self) -> bool {
        self.repository.is_shallow()
    }

    /// Clone depth: shallow clones are always depth 1, full clones -1.
    pub fn clone_depth(&self) -> i32 {
        if self.is_shallow() {
            1
        } else {
            -1
        }
    }

    /// True when the repository has no commits at all (HEAD is unborn).
    /// Any error other than an unresolvable HEAD propagates.
    pub fn is_empty(&self) -> Result<bool, git2::Error> {
        match self.repository.head() {
            Ok(_) => Ok(false),
            Err(err) if matches!(err.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                Ok(true)
            }
            Err(err) => Err(err),
        }
    }
}

fn commit_info(commit: &git2::Commit) -> CommitInfo {
    let author = commit.author();
    CommitInfo {
        author_name: author.name().unwrap_or_default().to_string(),
        author_email: author.email().unwrap_or_default().to_string(),
        author_date: timestamp(author.when()),
        committer_date: timestamp(commit.committer().when()),
        summary: commit.summary().unwrap_or_default().to_string(),
    }
}

fn timestamp(time: git2::Time) -> DateTime<Utc> {
    Utc.timestamp_opt(time.seconds(), 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Check whether the given directory carries git metadata.
pub fn is_git_repository<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().join(".git").exists()
}
