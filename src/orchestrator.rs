//! Cycle orchestrator for one dependency-update pass
//!
//! This module provides:
//! - Stage sequencing: resolve → fetch → diff → mutate → publish → pull request
//! - Mapping of every stage failure onto the cycle error taxonomy
//! - Construction of the production stage adapters from [`CycleSettings`]
//!
//! A cycle never returns an error: each failure ends it with a
//! [`CycleReport`] describing what went wrong and whether anything was pushed.

use crate::domain::{CycleFailure, CycleReport, OutdatedEntry};
use crate::error::{ConfigError, ErrorKind};
use crate::hosting::{
    parse_repo_url, FileFetch, GitHubHost, NewPullRequest, RepositoryHost, DEFAULT_API_URL,
    DEFAULT_WEB_URL,
};
use crate::logbook::ActivityLog;
use crate::manifest::{apply_upgrades, parse_dependencies, MANIFEST_FILE};
use crate::package_manager::{SystemPackageManager, DEFAULT_COMMAND_TIMEOUT};
use crate::publish::{
    branch_name, commit_message, open_pull_request, pull_request_body, pull_request_title,
    ApiPublisher, ChangePublisher, GitCliPublisher, PublishRequest, Workflow,
    DEFAULT_BRANCH_PREFIX,
};
use crate::registry::{
    HttpClient, NpmAdapter, VersionResolver, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, NPM_REGISTRY_URL,
};
use crate::update::{VersionDiffer, DEFAULT_CONCURRENCY};
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Settings the production adapters are built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSettings {
    /// REST API base URL
    pub api_url: String,
    /// Web URL prefix repository URLs must start with
    pub web_url: String,
    /// npm registry base URL
    pub registry_url: String,
    /// Prefix of generated branch names
    pub branch_prefix: String,
    /// How changes reach the remote
    pub workflow: Workflow,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
    /// Per-command timeout for git and npm
    pub command_timeout: Duration,
    /// Parent directory of per-cycle clones (local workflow)
    pub working_directory: PathBuf,
    /// Registry lookups in flight
    pub concurrency: usize,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            web_url: DEFAULT_WEB_URL.to_string(),
            registry_url: NPM_REGISTRY_URL.to_string(),
            branch_prefix: DEFAULT_BRANCH_PREFIX.to_string(),
            workflow: Workflow::default(),
            http_timeout: DEFAULT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            working_directory: std::env::temp_dir().join("depguard"),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Runs dependency-update cycles against one hosting backend
pub struct Orchestrator {
    host: Arc<dyn RepositoryHost>,
    differ: VersionDiffer,
    publisher: Arc<dyn ChangePublisher>,
    log: Arc<ActivityLog>,
    web_url: String,
    branch_prefix: String,
    fixed_time: Option<DateTime<Local>>,
}

impl Orchestrator {
    /// Create an orchestrator from explicit stage adapters
    pub fn new(
        host: Arc<dyn RepositoryHost>,
        resolver: Arc<dyn VersionResolver>,
        publisher: Arc<dyn ChangePublisher>,
        log: Arc<ActivityLog>,
    ) -> Self {
        Self {
            host,
            differ: VersionDiffer::new(resolver),
            publisher,
            log,
            web_url: DEFAULT_WEB_URL.to_string(),
            branch_prefix: DEFAULT_BRANCH_PREFIX.to_string(),
            fixed_time: None,
        }
    }

    /// Build the GitHub, npm and publisher adapters for `token`
    pub fn connect(
        token: &str,
        settings: &CycleSettings,
        log: Arc<ActivityLog>,
    ) -> Result<Self, ConfigError> {
        let host = GitHubHost::new(token, settings.api_url.clone(), settings.http_timeout)
            .map_err(|e| ConfigError::initialisation("GitHub client", e.to_string()))?;
        let host: Arc<dyn RepositoryHost> = Arc::new(host);

        let registry_client = HttpClient::with_config(settings.http_timeout, DEFAULT_USER_AGENT)
            .map_err(|e| ConfigError::initialisation("registry client", e.to_string()))?;
        let resolver = Arc::new(NpmAdapter::with_base_url(
            registry_client,
            settings.registry_url.clone(),
        ));

        let publisher: Arc<dyn ChangePublisher> = match settings.workflow {
            Workflow::Api => Arc::new(ApiPublisher::new(Arc::clone(&host))),
            Workflow::Local => Arc::new(GitCliPublisher::new(
                token,
                settings.web_url.clone(),
                settings.working_directory.clone(),
                settings.command_timeout,
                Arc::new(SystemPackageManager::with_timeout(settings.command_timeout)),
            )),
        };

        Ok(Self::new(host, resolver, publisher, log)
            .with_web_url(settings.web_url.clone())
            .with_branch_prefix(settings.branch_prefix.clone())
            .with_concurrency(settings.concurrency))
    }

    /// Set the web URL prefix repository URLs are parsed against
    pub fn with_web_url(mut self, web_url: impl Into<String>) -> Self {
        self.web_url = web_url.into();
        self
    }

    /// Set the prefix of generated branch names
    pub fn with_branch_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.branch_prefix = prefix.into();
        self
    }

    /// Set the number of registry lookups in flight
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.differ = self.differ.with_concurrency(concurrency);
        self
    }

    /// Use a fixed clock for branch names and pull request bodies (for testing)
    pub fn with_fixed_time(mut self, now: DateTime<Local>) -> Self {
        self.fixed_time = Some(now);
        self
    }

    /// Run one cycle for the repository at `repo_url`
    pub async fn run_cycle(&self, repo_url: &str) -> CycleReport {
        match self.cycle(repo_url).await {
            Ok(report) => report,
            Err(failure) => {
                self.log.error(failure.to_string());
                CycleReport::failed(failure)
            }
        }
    }

    async fn cycle(&self, repo_url: &str) -> Result<CycleReport, CycleFailure> {
        // Start -> ResolvedRepo
        let repo = parse_repo_url(repo_url, &self.web_url)
            .map_err(|e| CycleFailure::new(ErrorKind::ConfigInvalid, e.to_string()))?;
        self.log.info(format!("Checking {}", repo));

        let transport = |e: crate::error::HostingError| {
            CycleFailure::new(ErrorKind::TransportError, e.to_string())
        };
        let base_branch = self.host.default_branch(&repo).await.map_err(transport)?;
        let base_sha = self
            .host
            .branch_head(&repo, &base_branch)
            .await
            .map_err(transport)?;
        tracing::debug!(%repo, branch = %base_branch, sha = %base_sha, "resolved default branch");

        // ResolvedRepo -> FetchedManifest
        let (content, manifest_sha) = match self
            .host
            .fetch_file(&repo, MANIFEST_FILE, &base_branch)
            .await
            .map_err(transport)?
        {
            FileFetch::Found { content, sha } => (content, sha),
            FileFetch::NotFound => {
                let reason = format!("no {} on {} of {}", MANIFEST_FILE, base_branch, repo);
                self.log.warning(format!("Not an npm project: {}", reason));
                return Ok(CycleReport::not_applicable(reason));
            }
        };

        let dependencies = parse_dependencies(&content)
            .map_err(|e| CycleFailure::new(ErrorKind::MutationFailed, e.to_string()))?;
        self.log.info(format!(
            "Found {} dependencies in {}",
            dependencies.len(),
            MANIFEST_FILE
        ));

        // FetchedManifest -> Diffed
        let diff = self.differ.find_outdated(&dependencies).await;
        for skipped in &diff.skipped {
            self.log
                .warning(format!("Skipping {}: {}", skipped.name, skipped.reason));
        }
        if diff.outdated.is_empty() {
            self.log.success("All dependencies are up to date");
            return Ok(CycleReport::up_to_date());
        }
        for entry in &diff.outdated {
            self.log.info(format!(
                "{}: {} -> {}",
                entry.name, entry.current_version, entry.latest_version
            ));
        }

        // Diffed -> Mutated
        let mutated = apply_upgrades(&content, &diff.outdated)
            .map_err(|e| CycleFailure::new(ErrorKind::MutationFailed, e.to_string()))?;
        if mutated.is_unchanged() {
            return Err(CycleFailure::new(
                ErrorKind::MutationFailed,
                format!(
                    "{} outdated packages flagged but no entry in {} changed",
                    diff.outdated.len(),
                    MANIFEST_FILE
                ),
            ));
        }
        let upgraded: Vec<OutdatedEntry> = diff
            .outdated
            .into_iter()
            .filter(|entry| mutated.changed.contains(&entry.upgraded_name()))
            .collect();

        // Mutated -> Pushed
        let now = self.fixed_time.unwrap_or_else(Local::now);
        let branch = branch_name(&self.branch_prefix, &now);
        self.log.info(format!(
            "Publishing {} package(s) to {} ({} workflow)",
            upgraded.len(),
            branch,
            self.publisher.name()
        ));
        let request = PublishRequest {
            repo: repo.clone(),
            base_branch: base_branch.clone(),
            base_sha,
            branch: branch.clone(),
            manifest_path: MANIFEST_FILE.to_string(),
            manifest_content: mutated.content,
            manifest_sha,
            commit_message: commit_message(&upgraded),
        };
        let published = self.publisher.publish(&request).await.map_err(|e| {
            CycleFailure::new(ErrorKind::PublishFailed, e.to_string()).with_pushed(e.pushed)
        })?;
        self.log.success(match &published.commit_sha {
            Some(sha) => format!("Pushed {} ({})", published.branch, sha),
            None => format!("Pushed {}", published.branch),
        });

        // Pushed -> PRed
        let pr = NewPullRequest {
            title: pull_request_title(&upgraded),
            body: pull_request_body(&upgraded, &now),
            head: branch.clone(),
            base: base_branch,
        };
        let url = open_pull_request(self.host.as_ref(), &repo, &pr)
            .await
            .map_err(|e| {
                CycleFailure::new(ErrorKind::PublishFailed, e.to_string()).with_pushed(e.pushed)
            })?;
        self.log.success(format!("Pull request: {}", url));

        Ok(CycleReport::upgraded(branch, mutated.changed, upgraded, url))
    }
}
