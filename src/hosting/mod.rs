//! Repository-hosting services
//!
//! Provides the operations the update cycle needs from the remote:
//! default branch, branch tip, file read/write, branch and pull request
//! creation. [`GitHubHost`] implements them over the GitHub REST API.

mod detection;
mod github;

pub use detection::{parse_repo_url, DEFAULT_WEB_URL};
pub use github::{GitHubHost, DEFAULT_API_URL, GITHUB_ACCEPT};

use crate::error::HostingError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Owner and name of a hosted repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    /// Account or organization
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepoId {
    /// Creates a new repository identifier
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Result of reading a file at a ref
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileFetch {
    /// File exists; `sha` identifies this content for conditional updates
    Found { content: String, sha: String },
    /// No such file at that ref
    NotFound,
}

/// Result of creating a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchCreation {
    /// Branch created
    Created,
    /// A branch with that name already existed
    AlreadyExists,
}

/// Create-or-update of a single file on a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
    /// Path within the repository
    pub path: String,
    /// New file content (plain text)
    pub content: String,
    /// Identifier of the content being replaced
    pub sha: String,
    /// Target branch
    pub branch: String,
    /// Commit message
    pub message: String,
}

/// Pull request to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    /// Source branch
    pub head: String,
    /// Target branch
    pub base: String,
}

/// An open pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// Browser URL
    pub html_url: String,
}

/// Result of opening a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrCreation {
    /// A new pull request was opened
    Created(PullRequest),
    /// One is already open for this head branch
    AlreadyExists,
}

/// Repository-hosting operations used by the update cycle
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Name of the repository's default branch
    async fn default_branch(&self, repo: &RepoId) -> Result<String, HostingError>;

    /// Commit sha at the tip of a branch
    async fn branch_head(&self, repo: &RepoId, branch: &str) -> Result<String, HostingError>;

    /// Read a file at a ref
    async fn fetch_file(
        &self,
        repo: &RepoId,
        path: &str,
        git_ref: &str,
    ) -> Result<FileFetch, HostingError>;

    /// Create a branch pointing at `from_sha`
    async fn create_branch(
        &self,
        repo: &RepoId,
        branch: &str,
        from_sha: &str,
    ) -> Result<BranchCreation, HostingError>;

    /// Commit a file update; returns the new commit sha
    async fn put_file(&self, repo: &RepoId, update: &FileUpdate) -> Result<String, HostingError>;

    /// Open a pull request
    async fn create_pull_request(
        &self,
        repo: &RepoId,
        pr: &NewPullRequest,
    ) -> Result<PrCreation, HostingError>;

    /// Open pull request whose head is `branch`, if any
    async fn find_open_pull_request(
        &self,
        repo: &RepoId,
        branch: &str,
    ) -> Result<Option<PullRequest>, HostingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_id_display() {
        assert_eq!(RepoId::new("octo", "app").to_string(), "octo/app");
    }
}
