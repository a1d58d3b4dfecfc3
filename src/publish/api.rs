//! Publishing through the hosting API
//!
//! The branch is created from the base tip, then the manifest is updated on
//! it by content sha. The contents API commits directly on the remote, so a
//! successful update is also the push.

use super::{ChangePublisher, PublishRequest, PublishedChange};
use crate::error::{PublishError, PublishStage};
use crate::hosting::{BranchCreation, FileUpdate, RepositoryHost};
use async_trait::async_trait;
use std::sync::Arc;

/// Publisher backed by [`RepositoryHost`] calls
pub struct ApiPublisher {
    host: Arc<dyn RepositoryHost>,
}

impl ApiPublisher {
    /// Create a publisher using the given host
    pub fn new(host: Arc<dyn RepositoryHost>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl ChangePublisher for ApiPublisher {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishedChange, PublishError> {
        let created = self
            .host
            .create_branch(&request.repo, &request.branch, &request.base_sha)
            .await
            .map_err(|e| PublishError::before_push(PublishStage::Branch, e.to_string()))?;
        if created == BranchCreation::AlreadyExists {
            tracing::info!(branch = %request.branch, "branch already exists, reusing it");
        }

        let update = FileUpdate {
            path: request.manifest_path.clone(),
            content: request.manifest_content.clone(),
            sha: request.manifest_sha.clone(),
            branch: request.branch.clone(),
            message: request.commit_message.clone(),
        };
        let commit_sha = self
            .host
            .put_file(&request.repo, &update)
            .await
            .map_err(|e| PublishError::before_push(PublishStage::Commit, e.to_string()))?;

        Ok(PublishedChange {
            branch: request.branch.clone(),
            commit_sha: Some(commit_sha),
        })
    }
}
