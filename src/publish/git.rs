//! Publishing through a local clone
//!
//! Every cycle clones into a fresh directory under the working directory,
//! switches to the target branch (continuing it when the remote already has
//! it), writes the manifest, refreshes the lock file when the project has one,
//! commits and pushes. The clone is removed afterwards whether or not
//! publishing succeeded.

use super::branch::{COMMIT_AUTHOR_EMAIL, COMMIT_AUTHOR_NAME};
use super::{ChangePublisher, PublishRequest, PublishedChange};
use crate::error::{GitError, PublishError, PublishStage};
use crate::manifest::LOCK_FILE;
use crate::package_manager::{run_command, CommandOutput, PackageManagerRunner};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Replace every occurrence of `token` in `text`
pub fn redact_token(text: &str, token: &str) -> String {
    if token.is_empty() {
        text.to_string()
    } else {
        text.replace(token, "***")
    }
}

/// Publisher that shells out to git (and npm for the lock file)
pub struct GitCliPublisher {
    token: String,
    web_url: String,
    working_dir: PathBuf,
    timeout: Duration,
    package_manager: Arc<dyn PackageManagerRunner>,
    clone_url: Option<String>,
}

impl GitCliPublisher {
    /// Create a publisher cloning from `web_url` into `working_dir`
    pub fn new(
        token: impl Into<String>,
        web_url: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        timeout: Duration,
        package_manager: Arc<dyn PackageManagerRunner>,
    ) -> Self {
        Self {
            token: token.into(),
            web_url: web_url.into(),
            working_dir: working_dir.into(),
            timeout,
            package_manager,
            clone_url: None,
        }
    }

    /// Clone from a fixed URL or path instead of the authenticated web URL
    pub fn with_clone_url(mut self, url: impl Into<String>) -> Self {
        self.clone_url = Some(url.into());
        self
    }

    /// Authenticated HTTPS clone URL for the request's repository
    fn remote_url(&self, request: &PublishRequest) -> String {
        if let Some(url) = &self.clone_url {
            return url.clone();
        }
        let base = self.web_url.trim_end_matches('/');
        let (scheme, host) = base.split_once("://").unwrap_or(("https", base));
        format!(
            "{}://x-access-token:{}@{}/{}/{}.git",
            scheme, self.token, host, request.repo.owner, request.repo.name
        )
    }

    /// Per-cycle clone directory
    fn clone_dir(&self, request: &PublishRequest) -> PathBuf {
        let slug: String = request
            .branch
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        self.working_dir
            .join(format!("{}-{}-{}", request.repo.owner, request.repo.name, slug))
    }

    async fn git(
        &self,
        dir: &Path,
        args: &[&str],
        stage: PublishStage,
    ) -> Result<CommandOutput, PublishError> {
        let output = run_command("git", args, dir, self.timeout)
            .await
            .map_err(|e| PublishError::before_push(stage, redact_token(&e.to_string(), &self.token)))?;
        if !output.success {
            let command = redact_token(&format!("git {}", args.join(" ")), &self.token);
            let err = GitError::failed(command, redact_token(&output.stderr, &self.token));
            return Err(PublishError::before_push(stage, err.to_string()));
        }
        tracing::debug!(stage = %stage, args = %redact_token(&args.join(" "), &self.token), "git ok");
        Ok(output)
    }

    /// Switch the clone to `branch`, continuing it when it already exists on the remote
    async fn checkout_branch(&self, dir: &Path, branch: &str) -> Result<(), PublishError> {
        let heads = self
            .git(dir, &["ls-remote", "--heads", "origin", branch], PublishStage::Branch)
            .await?;
        let remote_ref = format!("refs/heads/{}", branch);
        let exists = heads
            .stdout
            .lines()
            .any(|line| line.split_whitespace().nth(1) == Some(remote_ref.as_str()));

        if !exists {
            self.git(dir, &["checkout", "-b", branch], PublishStage::Branch)
                .await?;
            return Ok(());
        }

        tracing::info!(branch = %branch, "branch already exists on the remote, continuing it");
        let tracking = format!("refs/remotes/origin/{}", branch);
        let refspec = format!("+{}:{}", remote_ref, tracking);
        self.git(
            dir,
            &["fetch", "--depth", "1", "origin", refspec.as_str()],
            PublishStage::Branch,
        )
        .await?;
        self.git(
            dir,
            &["checkout", "-b", branch, tracking.as_str()],
            PublishStage::Branch,
        )
        .await?;
        Ok(())
    }

    async fn publish_in(
        &self,
        dir: &Path,
        request: &PublishRequest,
    ) -> Result<PublishedChange, PublishError> {
        let remote = self.remote_url(request);
        // clone runs inside the working directory, so the target is relative to it
        let target = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.git(
            &self.working_dir,
            &[
                "clone",
                "--depth",
                "1",
                "--branch",
                request.base_branch.as_str(),
                remote.as_str(),
                target.as_str(),
            ],
            PublishStage::Clone,
        )
        .await?;

        self.checkout_branch(dir, &request.branch).await?;

        let manifest_path = dir.join(&request.manifest_path);
        tokio::fs::write(&manifest_path, &request.manifest_content)
            .await
            .map_err(|e| {
                PublishError::before_push(
                    PublishStage::Commit,
                    GitError::io(&manifest_path, &e).to_string(),
                )
            })?;

        let has_lock = dir.join(LOCK_FILE).exists();
        if has_lock {
            let install = self.package_manager.refresh_lockfile(dir).await;
            if !install.success {
                return Err(PublishError::before_push(
                    PublishStage::Lockfile,
                    format!("{} failed: {}", install.command, install.stderr),
                ));
            }
            if install.skipped {
                tracing::warn!(reason = %install.stderr, "lock file refresh skipped");
            }
        }

        let mut add_args = vec!["add", "--", request.manifest_path.as_str()];
        if has_lock {
            add_args.push(LOCK_FILE);
        }
        self.git(dir, &add_args, PublishStage::Commit).await?;

        let staged = self
            .git(dir, &["diff", "--cached", "--name-only"], PublishStage::Commit)
            .await?;
        if staged.stdout.is_empty() {
            // the existing branch already carries this manifest
            tracing::info!(branch = %request.branch, "nothing to commit, branch is current");
        } else {
            let name_config = format!("user.name={}", COMMIT_AUTHOR_NAME);
            let email_config = format!("user.email={}", COMMIT_AUTHOR_EMAIL);
            self.git(
                dir,
                &[
                    "-c",
                    name_config.as_str(),
                    "-c",
                    email_config.as_str(),
                    "commit",
                    "-m",
                    request.commit_message.as_str(),
                ],
                PublishStage::Commit,
            )
            .await?;
        }

        let commit_sha = self
            .git(dir, &["rev-parse", "HEAD"], PublishStage::Commit)
            .await
            .ok()
            .map(|output| output.stdout)
            .filter(|sha| !sha.is_empty());

        self.git(dir, &["push", "origin", request.branch.as_str()], PublishStage::Push)
            .await?;

        Ok(PublishedChange {
            branch: request.branch.clone(),
            commit_sha,
        })
    }
}

#[async_trait]
impl ChangePublisher for GitCliPublisher {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishedChange, PublishError> {
        tokio::fs::create_dir_all(&self.working_dir)
            .await
            .map_err(|e| {
                PublishError::before_push(
                    PublishStage::Clone,
                    GitError::io(&self.working_dir, &e).to_string(),
                )
            })?;

        let dir = self.clone_dir(request);
        if dir.exists() {
            tracing::info!(path = %dir.display(), "removing stale clone");
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                return Err(PublishError::before_push(
                    PublishStage::Clone,
                    GitError::io(&dir, &e).to_string(),
                ));
            }
        }

        let result = self.publish_in(&dir, request).await;

        if dir.exists() {
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                tracing::warn!(path = %dir.display(), error = %e, "failed to remove clone");
            }
        }
        result
    }
}
