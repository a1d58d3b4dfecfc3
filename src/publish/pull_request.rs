//! Pull request opening

use crate::error::{PublishError, PublishStage};
use crate::hosting::{NewPullRequest, PrCreation, RepoId, RepositoryHost};

/// Open a pull request, or return the one already open for its head branch
///
/// Called after the push, so every error is reported with `pushed = true`.
/// Returns the pull request URL.
pub async fn open_pull_request(
    host: &dyn RepositoryHost,
    repo: &RepoId,
    pr: &NewPullRequest,
) -> Result<String, PublishError> {
    let failed = |message: String| PublishError::after_push(PublishStage::PullRequest, message);

    match host.create_pull_request(repo, pr).await {
        Ok(PrCreation::Created(created)) => Ok(created.html_url),
        Ok(PrCreation::AlreadyExists) => {
            tracing::info!(branch = %pr.head, "pull request already open, looking it up");
            match host.find_open_pull_request(repo, &pr.head).await {
                Ok(Some(existing)) => Ok(existing.html_url),
                Ok(None) => Err(failed(format!(
                    "a pull request for {} reportedly exists but none is open",
                    pr.head
                ))),
                Err(e) => Err(failed(e.to_string())),
            }
        }
        Err(e) => Err(failed(e.to_string())),
    }
}
