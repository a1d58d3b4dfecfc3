//! Agent control surface and result recording
//!
//! [`Agent`] is the per-process context: it holds the credentials, counters,
//! run history and activity log, and runs at most one cycle at a time.

use crate::domain::{CycleReport, RunHistory, RunHistoryEntry, SessionStats};
use crate::error::{AgentError, ConfigError};
use crate::hosting::parse_repo_url;
use crate::logbook::{ActivityLog, LogPage};
use crate::orchestrator::{CycleSettings, Orchestrator};
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Smallest accepted check interval in seconds
pub const MIN_CHECK_INTERVAL: u64 = 60;

/// Check interval used until one is configured (1 hour)
pub const DEFAULT_CHECK_INTERVAL: u64 = 3600;

/// Repository URL and token supplied by the operator
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Web URL of the repository
    pub repo_url: String,
    token: String,
}

impl Credentials {
    /// Creates credentials; both values are expected to be trimmed
    pub fn new(repo_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            token: token.into(),
        }
    }

    /// Bearer token for the hosting API
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("repo_url", &self.repo_url)
            .field("token", &"***")
            .finish()
    }
}

/// Builds the orchestrator for one cycle
pub type OrchestratorFactory =
    Box<dyn Fn(&Credentials, Arc<ActivityLog>) -> Result<Orchestrator, ConfigError> + Send + Sync>;

/// Configuration as shown to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigView {
    /// Configured repository, empty before `configure`
    pub repo_url: String,
    /// Whether a token is stored (the token itself is never shown)
    pub token_configured: bool,
    /// Seconds between cycles
    pub check_interval: u64,
}

/// Snapshot returned by [`Agent::status`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentStatus {
    /// Whether a cycle is in flight
    pub running: bool,
    /// Current configuration
    pub config: ConfigView,
    /// Session counters
    pub stats: SessionStats,
    /// Successful upgrade cycles, oldest first
    pub history: Vec<RunHistoryEntry>,
}

/// Result of [`Agent::run_once`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOnceResponse {
    /// Outcome of the cycle that just ran
    pub report: CycleReport,
    /// Counters after recording it
    pub stats: SessionStats,
    /// History after recording it
    pub history: Vec<RunHistoryEntry>,
}

#[derive(Debug)]
struct SessionState {
    credentials: Option<Credentials>,
    check_interval: u64,
    stats: SessionStats,
    history: RunHistory,
}

/// Per-process agent context
pub struct Agent {
    web_url: String,
    factory: OrchestratorFactory,
    state: Mutex<SessionState>,
    log: Arc<ActivityLog>,
    cycle: tokio::sync::Mutex<()>,
}

impl Agent {
    /// Create an agent building production adapters from `settings`
    pub fn new(settings: CycleSettings) -> Self {
        let web_url = settings.web_url.clone();
        Self::with_factory(
            web_url,
            Box::new(move |credentials: &Credentials, log: Arc<ActivityLog>| {
                Orchestrator::connect(credentials.token(), &settings, log)
            }),
        )
    }

    /// Create an agent with a custom orchestrator factory
    pub fn with_factory(web_url: impl Into<String>, factory: OrchestratorFactory) -> Self {
        Self {
            web_url: web_url.into(),
            factory,
            state: Mutex::new(SessionState {
                credentials: None,
                check_interval: DEFAULT_CHECK_INTERVAL,
                stats: SessionStats::default(),
                history: RunHistory::new(),
            }),
            log: Arc::new(ActivityLog::new()),
            cycle: tokio::sync::Mutex::new(()),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate and store credentials, then reset the session
    pub fn configure(
        &self,
        repo_url: &str,
        token: &str,
        check_interval: u64,
    ) -> Result<(), ConfigError> {
        let repo_url = repo_url.trim();
        let token = token.trim();
        if repo_url.is_empty() {
            return Err(ConfigError::MissingRepoUrl);
        }
        if token.is_empty() {
            return Err(ConfigError::MissingToken);
        }
        parse_repo_url(repo_url, &self.web_url)?;
        if check_interval < MIN_CHECK_INTERVAL {
            return Err(ConfigError::IntervalTooLow {
                value: check_interval,
                minimum: MIN_CHECK_INTERVAL,
            });
        }

        {
            let mut state = self.state();
            state.credentials = Some(Credentials::new(repo_url, token));
            state.check_interval = check_interval;
        }
        self.reset();
        self.log.info(format!(
            "Configured {} (every {}s)",
            repo_url, check_interval
        ));
        Ok(())
    }

    /// Run exactly one cycle with the stored credentials
    ///
    /// Fails with [`AgentError::CycleInProgress`] if a cycle is already
    /// running. Stage failures are not errors; they are in the report.
    pub async fn run_once(&self) -> Result<RunOnceResponse, AgentError> {
        let _running = self
            .cycle
            .try_lock()
            .map_err(|_| AgentError::CycleInProgress)?;

        let credentials = self
            .state()
            .credentials
            .clone()
            .ok_or(ConfigError::MissingRepoUrl)?;
        let orchestrator = (self.factory)(&credentials, Arc::clone(&self.log))?;

        let report = orchestrator.run_cycle(&credentials.repo_url).await;

        let mut state = self.state();
        state.stats.record(&report.result);
        if state.history.record(&report.result, Utc::now()) {
            tracing::debug!(entries = state.history.len(), "history entry recorded");
        }
        Ok(RunOnceResponse {
            report,
            stats: state.stats,
            history: state.history.entries().to_vec(),
        })
    }

    /// Whether a cycle is running right now
    pub fn is_running(&self) -> bool {
        self.cycle.try_lock().is_err()
    }

    /// Current configuration, counters and history; never the token
    pub fn status(&self) -> AgentStatus {
        let running = self.is_running();
        let state = self.state();
        AgentStatus {
            running,
            config: ConfigView {
                repo_url: state
                    .credentials
                    .as_ref()
                    .map(|c| c.repo_url.clone())
                    .unwrap_or_default(),
                token_configured: state.credentials.is_some(),
                check_interval: state.check_interval,
            },
            stats: state.stats,
            history: state.history.entries().to_vec(),
        }
    }

    /// Configured check interval in seconds
    pub fn check_interval(&self) -> u64 {
        self.state().check_interval
    }

    /// Activity lines appended since `offset`
    pub fn logs(&self, offset: usize) -> LogPage {
        self.log.since(offset)
    }

    /// Clear counters, history and activity log; credentials are kept
    pub fn reset(&self) {
        {
            let mut state = self.state();
            state.stats = SessionStats::default();
            state.history.clear();
        }
        self.log.clear();
    }
}
