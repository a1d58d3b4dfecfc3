//! Publishing a mutated manifest
//!
//! This module provides:
//! - Branch naming, commit message and pull request text
//! - [`ApiPublisher`]: branch + commit through the hosting API
//! - [`GitCliPublisher`]: fresh clone, lock file refresh, commit and push with git
//! - Pull request opening that reuses an already-open PR for the branch

mod api;
mod branch;
mod git;
mod pull_request;

pub use api::ApiPublisher;
pub use branch::{
    branch_name, commit_message, pull_request_body, pull_request_title,
    COMMIT_AUTHOR_EMAIL, COMMIT_AUTHOR_NAME, DEFAULT_BRANCH_PREFIX,
};
pub use git::{redact_token, GitCliPublisher};
pub use pull_request::open_pull_request;

use crate::error::PublishError;
use crate::hosting::RepoId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How changes reach the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Workflow {
    /// Hosting API only; no local tools required
    #[default]
    Api,
    /// Local clone with git and npm
    Local,
}

impl std::str::FromStr for Workflow {
    type Err = crate::error::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "api" => Ok(Workflow::Api),
            "local" => Ok(Workflow::Local),
            _ => Err(crate::error::ConfigError::InvalidWorkflow {
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Workflow::Api => f.write_str("api"),
            Workflow::Local => f.write_str("local"),
        }
    }
}

/// Everything needed to put a mutated manifest on a new branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    /// Target repository
    pub repo: RepoId,
    /// Branch the change is based on
    pub base_branch: String,
    /// Tip of the base branch
    pub base_sha: String,
    /// Branch to create
    pub branch: String,
    /// Manifest path within the repository
    pub manifest_path: String,
    /// New manifest text
    pub manifest_content: String,
    /// Content identifier of the manifest being replaced
    pub manifest_sha: String,
    /// Commit message
    pub commit_message: String,
}

/// A change that reached the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedChange {
    /// Branch holding the commit
    pub branch: String,
    /// Commit sha, when the backend reports it
    pub commit_sha: Option<String>,
}

/// Branch, commit and push of a mutated manifest
#[async_trait]
pub trait ChangePublisher: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Put the manifest on `request.branch` in the remote
    async fn publish(&self, request: &PublishRequest) -> Result<PublishedChange, PublishError>;
}
