//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ConfigError: Invalid or missing agent configuration
//! - HttpError: Transport-level failures of a single HTTP request
//! - RegistryError: Issues with package registry communication
//! - HostingError: Issues with the repository-hosting API
//! - ManifestError: Issues with manifest parsing and rewriting
//! - GitError: Failures of local git/npm subprocesses
//! - PublishError: Branch, commit, push or pull request step failures
//! - AgentError: Control-surface rejections
//!
//! The cycle itself never raises: stage failures are folded into an
//! [`ErrorKind`] and a message by the orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Taxonomy of terminal cycle outcomes other than success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad URL, missing token or interval too low; not retryable without a fix
    ConfigInvalid,
    /// Network/API unreachable, rate limited, timed out or tool missing
    TransportError,
    /// No manifest in the repository
    NotApplicable,
    /// Manifest unparsable, or nothing changed despite outdated entries
    MutationFailed,
    /// Branch, commit, push or pull request step failed
    PublishFailed,
}

impl ErrorKind {
    /// Returns true if running the cycle again later may succeed unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::TransportError | ErrorKind::PublishFailed)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::ConfigInvalid => "config invalid",
            ErrorKind::TransportError => "transport error",
            ErrorKind::NotApplicable => "not applicable",
            ErrorKind::MutationFailed => "mutation failed",
            ErrorKind::PublishFailed => "publish failed",
        };
        f.write_str(label)
    }
}

/// Errors related to configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Repository URL missing
    #[error("repository URL is required")]
    MissingRepoUrl,

    /// Token missing
    #[error("GitHub token is required")]
    MissingToken,

    /// Repository URL does not start with the expected host prefix
    #[error("invalid repository URL '{url}': must start with {expected}")]
    InvalidRepoUrl { url: String, expected: String },

    /// Check interval below the minimum
    #[error("check interval must be at least {minimum} seconds, got {value}")]
    IntervalTooLow { value: u64, minimum: u64 },

    /// Timeout of zero seconds
    #[error("timeouts.{name} must be at least 1 second")]
    ZeroTimeout { name: String },

    /// Unknown workflow name
    #[error("invalid workflow '{value}': expected 'api' or 'local'")]
    InvalidWorkflow { value: String },

    /// Environment variable holds an unusable value
    #[error("invalid value '{value}' in environment variable {name}")]
    InvalidEnvVar { name: String, value: String },

    /// Config file could not be read
    #[error("failed to read config file {path}: {message}")]
    ReadError { path: PathBuf, message: String },

    /// Config file is not valid TOML
    #[error("failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    /// Service construction failed (e.g. HTTP client)
    #[error("failed to initialise {component}: {message}")]
    Initialisation { component: String, message: String },
}

/// Transport errors of a single HTTP request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// Request exceeded the configured timeout
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// Connection or protocol failure
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    /// Non-success HTTP status
    #[error("request to {url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// Body could not be decoded
    #[error("invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// Client could not be built
    #[error("failed to create HTTP client: {message}")]
    Client { message: String },
}

impl HttpError {
    /// HTTP status code, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors related to package registry communication
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Transport failure
    #[error("failed to fetch '{package}' from {registry}: {source}")]
    Transport {
        package: String,
        registry: String,
        #[source]
        source: HttpError,
    },

    /// Response parsed but carried no usable version
    #[error("invalid response from {registry} for '{package}': {message}")]
    InvalidResponse {
        package: String,
        registry: String,
        message: String,
    },
}

/// Errors related to the repository-hosting API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostingError {
    /// Transport failure or unexpected status
    #[error("{operation} failed: {source}")]
    Transport {
        operation: String,
        #[source]
        source: HttpError,
    },

    /// Response was well-formed HTTP but missing expected data
    #[error("{operation} returned an unexpected response: {message}")]
    UnexpectedResponse { operation: String, message: String },
}

/// Errors related to manifest operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// JSON parsing error
    #[error("failed to parse JSON in {file}: {message}")]
    JsonParse { file: String, message: String },

    /// Manifest root is not an object
    #[error("{file} must contain a JSON object at the top level")]
    NotAnObject { file: String },

    /// Invalid rewrite pattern
    #[error("cannot rewrite '{package}' in {file}: {message}")]
    Rewrite {
        file: String,
        package: String,
        message: String,
    },

    /// File content is not valid UTF-8 / base64
    #[error("failed to decode {file}: {message}")]
    Decode { file: String, message: String },
}

/// Errors from local git and npm subprocesses
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GitError {
    /// Binary missing or could not be spawned
    #[error("failed to run {program}: {message}")]
    Spawn { program: String, message: String },

    /// Exceeded the command timeout
    #[error("{command} timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    /// Non-zero exit status
    #[error("{command} failed: {stderr}")]
    Failed { command: String, stderr: String },

    /// Local filesystem problem
    #[error("IO error at {path}: {message}")]
    Io { path: PathBuf, message: String },
}

/// Step of publishing a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStage {
    /// Fresh clone of the repository (local workflow)
    Clone,
    /// Branch creation or checkout
    Branch,
    /// Lock file refresh (local workflow)
    Lockfile,
    /// Writing and committing the manifest
    Commit,
    /// Pushing the branch
    Push,
    /// Opening the pull request
    PullRequest,
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PublishStage::Clone => "clone",
            PublishStage::Branch => "branch",
            PublishStage::Lockfile => "lock file refresh",
            PublishStage::Commit => "commit",
            PublishStage::Push => "push",
            PublishStage::PullRequest => "pull request",
        };
        f.write_str(label)
    }
}

/// Failure of the branch/commit/push/pull request steps
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{stage} failed: {message}")]
pub struct PublishError {
    /// Step that failed
    pub stage: PublishStage,
    /// Human-readable reason
    pub message: String,
    /// Whether the commit already reached the remote
    pub pushed: bool,
}

impl PublishError {
    /// Failure before anything reached the remote
    pub fn before_push(stage: PublishStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            pushed: false,
        }
    }

    /// Failure after the commit reached the remote
    pub fn after_push(stage: PublishStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            pushed: true,
        }
    }
}

/// Errors returned by the control surface
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// Configuration rejected or incomplete
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Another cycle is already running
    #[error("a cycle is already in progress")]
    CycleInProgress,
}

impl ConfigError {
    /// Creates an InvalidRepoUrl error
    pub fn invalid_repo_url(url: impl Into<String>, expected: impl Into<String>) -> Self {
        ConfigError::InvalidRepoUrl {
            url: url.into(),
            expected: expected.into(),
        }
    }

    /// Creates an Initialisation error
    pub fn initialisation(component: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Initialisation {
            component: component.into(),
            message: message.into(),
        }
    }
}

impl HttpError {
    /// Map a reqwest error into an HttpError
    pub fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            HttpError::Timeout {
                url: url.to_string(),
            }
        } else {
            HttpError::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

impl RegistryError {
    /// Creates a Transport error
    pub fn transport(
        package: impl Into<String>,
        registry: impl Into<String>,
        source: HttpError,
    ) -> Self {
        RegistryError::Transport {
            package: package.into(),
            registry: registry.into(),
            source,
        }
    }

    /// Creates an InvalidResponse error
    pub fn invalid_response(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::InvalidResponse {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }
}

impl HostingError {
    /// Creates a Transport error
    pub fn transport(operation: impl Into<String>, source: HttpError) -> Self {
        HostingError::Transport {
            operation: operation.into(),
            source,
        }
    }

    /// Creates an UnexpectedResponse error
    pub fn unexpected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        HostingError::UnexpectedResponse {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl ManifestError {
    /// Creates a new JsonParse error
    pub fn json_parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        ManifestError::JsonParse {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Creates a new Decode error
    pub fn decode(file: impl Into<String>, message: impl Into<String>) -> Self {
        ManifestError::Decode {
            file: file.into(),
            message: message.into(),
        }
    }
}

impl GitError {
    /// Creates a new Failed error
    pub fn failed(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        GitError::Failed {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Creates a new Io error
    pub fn io(path: impl Into<PathBuf>, source: &std::io::Error) -> Self {
        GitError::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::NotApplicable.to_string(), "not applicable");
        assert_eq!(ErrorKind::PublishFailed.to_string(), "publish failed");
    }

    #[test]
    fn test_error_kind_retryable() {
        assert!(ErrorKind::TransportError.is_retryable());
        assert!(ErrorKind::PublishFailed.is_retryable());
        assert!(!ErrorKind::ConfigInvalid.is_retryable());
        assert!(!ErrorKind::MutationFailed.is_retryable());
        assert!(!ErrorKind::NotApplicable.is_retryable());
    }

    #[test]
    fn test_error_kind_serde() {
        let json = serde_json::to_string(&ErrorKind::TransportError).unwrap();
        assert_eq!(json, "\"transport_error\"");
    }

    #[test]
    fn test_config_error_invalid_url() {
        let err = ConfigError::invalid_repo_url("http://gitlab.com/a/b", "https://github.com/");
        let msg = err.to_string();
        assert!(msg.contains("invalid repository URL"));
        assert!(msg.contains("https://github.com/"));
    }

    #[test]
    fn test_config_error_interval() {
        let err = ConfigError::IntervalTooLow {
            value: 30,
            minimum: 60,
        };
        assert!(err.to_string().contains("at least 60 seconds"));
    }

    #[test]
    fn test_http_error_status() {
        let err = HttpError::Status {
            url: "https://api.github.com/repos/a/b".to_string(),
            status: 422,
            body: "Reference already exists".to_string(),
        };
        assert_eq!(err.status(), Some(422));
        assert!(err.to_string().contains("HTTP 422"));

        let err = HttpError::Timeout {
            url: "https://registry.npmjs.org/lodash/latest".to_string(),
        };
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_registry_error_transport() {
        let err = RegistryError::transport(
            "lodash",
            "npm",
            HttpError::Network {
                url: "https://registry.npmjs.org/lodash/latest".to_string(),
                message: "connection refused".to_string(),
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("failed to fetch 'lodash' from npm"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_hosting_error_unexpected() {
        let err = HostingError::unexpected("read default branch", "missing default_branch");
        assert!(err.to_string().contains("read default branch"));
    }

    #[test]
    fn test_manifest_error_json_parse() {
        let err = ManifestError::json_parse("package.json", "expected value");
        let msg = err.to_string();
        assert!(msg.contains("failed to parse JSON"));
        assert!(msg.contains("expected value"));
    }

    #[test]
    fn test_git_error_failed() {
        let err = GitError::failed("git push origin auto/x", "permission denied");
        assert!(err.to_string().contains("git push origin auto/x failed"));
    }

    #[test]
    fn test_publish_error_display() {
        let err = PublishError::after_push(PublishStage::PullRequest, "HTTP 500");
        assert!(err.pushed);
        assert_eq!(err.to_string(), "pull request failed: HTTP 500");

        let err = PublishError::before_push(PublishStage::Lockfile, "npm missing");
        assert!(!err.pushed);
        assert!(err.to_string().starts_with("lock file refresh failed"));
    }

    #[test]
    fn test_agent_error_from_config() {
        let err: AgentError = ConfigError::MissingToken.into();
        assert_eq!(err.to_string(), "GitHub token is required");
    }
}
