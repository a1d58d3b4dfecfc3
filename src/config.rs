//! Typed agent configuration
//!
//! Loaded from a TOML file with `[github]`, `[agent]`, `[registry]`,
//! `[timeouts]` and `[paths]` sections. Every field has a default.
//! `${VAR}` placeholders are replaced from the environment before parsing,
//! and `GITHUB_TOKEN`, `REPO_URL` and `CHECK_INTERVAL` fill values the file
//! leaves empty.

use crate::error::ConfigError;
use crate::hosting::{DEFAULT_API_URL, DEFAULT_WEB_URL};
use crate::orchestrator::CycleSettings;
use crate::package_manager::DEFAULT_COMMAND_TIMEOUT;
use crate::publish::{Workflow, DEFAULT_BRANCH_PREFIX};
use crate::registry::{DEFAULT_TIMEOUT, NPM_REGISTRY_URL};
use crate::session::{DEFAULT_CHECK_INTERVAL, MIN_CHECK_INTERVAL};
use crate::update::DEFAULT_CONCURRENCY;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

/// `${NAME}` placeholder
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

/// Environment fallbacks for empty config values
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const REPO_URL_ENV: &str = "REPO_URL";
pub const CHECK_INTERVAL_ENV: &str = "CHECK_INTERVAL";

/// `[github]`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubSection {
    pub repo_url: String,
    pub token: String,
    pub api_url: String,
    pub web_url: String,
}

impl Default for GitHubSection {
    fn default() -> Self {
        Self {
            repo_url: String::new(),
            token: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            web_url: DEFAULT_WEB_URL.to_string(),
        }
    }
}

impl fmt::Debug for GitHubSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubSection")
            .field("repo_url", &self.repo_url)
            .field("token", &if self.token.is_empty() { "" } else { "***" })
            .field("api_url", &self.api_url)
            .field("web_url", &self.web_url)
            .finish()
    }
}

/// `[agent]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentSection {
    /// Seconds between cycles in watch mode
    pub check_interval: Option<u64>,
    pub branch_prefix: String,
    pub workflow: Workflow,
    /// Registry lookups in flight
    pub concurrency: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            check_interval: None,
            branch_prefix: DEFAULT_BRANCH_PREFIX.to_string(),
            workflow: Workflow::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// `[registry]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrySection {
    pub url: String,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            url: NPM_REGISTRY_URL.to_string(),
        }
    }
}

/// `[timeouts]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutSection {
    /// Per HTTP request
    pub http_secs: u64,
    /// Per git or npm command
    pub command_secs: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            http_secs: DEFAULT_TIMEOUT.as_secs(),
            command_secs: DEFAULT_COMMAND_TIMEOUT.as_secs(),
        }
    }
}

/// `[paths]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsSection {
    /// Parent directory of per-cycle clones
    pub working_directory: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            working_directory: std::env::temp_dir().join("depguard"),
        }
    }
}

/// Complete agent configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    pub github: GitHubSection,
    pub agent: AgentSection,
    pub registry: RegistrySection,
    pub timeouts: TimeoutSection,
    pub paths: PathsSection,
}

impl AgentConfig {
    /// Load a TOML file, substituting placeholders from the process environment
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&content, path, |name| std::env::var(name).ok())
    }

    /// Defaults plus environment fallbacks, for running without a file
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse TOML text with an explicit environment lookup
    pub fn parse<F>(content: &str, path: &Path, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let substituted = substitute_placeholders(content, &env);
        let mut config: Self =
            toml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.apply_env(env)?;
        Ok(config)
    }

    /// Fill empty repository URL and token, and a missing interval, from the environment
    pub fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.github.repo_url.trim().is_empty() {
            if let Some(url) = env(REPO_URL_ENV) {
                self.github.repo_url = url;
            }
        }
        if self.github.token.trim().is_empty() {
            if let Some(token) = env(TOKEN_ENV) {
                self.github.token = token;
            }
        }
        if self.agent.check_interval.is_none() {
            if let Some(raw) = env(CHECK_INTERVAL_ENV) {
                let seconds = raw.trim().parse().map_err(|_| ConfigError::InvalidEnvVar {
                    name: CHECK_INTERVAL_ENV.to_string(),
                    value: raw.clone(),
                })?;
                self.agent.check_interval = Some(seconds);
            }
        }
        Ok(())
    }

    /// Seconds between cycles, defaulting to one hour
    pub fn check_interval(&self) -> u64 {
        self.agent.check_interval.unwrap_or(DEFAULT_CHECK_INTERVAL)
    }

    /// Check the values that do not depend on the credentials
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval() < MIN_CHECK_INTERVAL {
            return Err(ConfigError::IntervalTooLow {
                value: self.check_interval(),
                minimum: MIN_CHECK_INTERVAL,
            });
        }
        for (name, seconds) in [
            ("http_secs", self.timeouts.http_secs),
            ("command_secs", self.timeouts.command_secs),
        ] {
            if seconds == 0 {
                return Err(ConfigError::ZeroTimeout {
                    name: name.to_string(),
                });
            }
        }
        if self.github.web_url.trim().is_empty() {
            return Err(ConfigError::invalid_repo_url(
                &self.github.repo_url,
                "a non-empty github.web_url",
            ));
        }
        Ok(())
    }

    /// Settings for building the cycle adapters
    pub fn cycle_settings(&self) -> CycleSettings {
        CycleSettings {
            api_url: self.github.api_url.clone(),
            web_url: self.github.web_url.clone(),
            registry_url: self.registry.url.clone(),
            branch_prefix: self.agent.branch_prefix.clone(),
            workflow: self.agent.workflow,
            http_timeout: Duration::from_secs(self.timeouts.http_secs.max(1)),
            command_timeout: Duration::from_secs(self.timeouts.command_secs.max(1)),
            working_directory: self.paths.working_directory.clone(),
            concurrency: self.agent.concurrency,
        }
    }
}

/// Replace every `${NAME}` with `env(NAME)`, or an empty string if unset
pub fn substitute_placeholders<F>(content: &str, env: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    PLACEHOLDER_RE
        .replace_all(content, |caps: &Captures| {
            env(caps[1].trim()).unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn no_env() -> impl Fn(&str) -> Option<String> {
        env_of(&[])
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::parse("", Path::new("x.toml"), no_env()).unwrap();
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.web_url, "https://github.com/");
        assert_eq!(config.agent.check_interval, None);
        assert_eq!(config.check_interval(), 3600);
        assert_eq!(config.agent.branch_prefix, "auto/dependency-update");
        assert_eq!(config.agent.workflow, Workflow::Api);
        assert_eq!(config.registry.url, "https://registry.npmjs.org");
        assert_eq!(config.timeouts.http_secs, 15);
        assert_eq!(config.timeouts.command_secs, 300);
    }

    #[test]
    fn test_full_file() {
        let toml = r#"
[github]
repo_url = "https://github.com/octo/app"
token = "ghp_x"
api_url = "http://localhost:9000"

[agent]
check_interval = 600
branch_prefix = "deps/bump"
workflow = "local"
concurrency = 4

[registry]
url = "http://localhost:9001"

[timeouts]
http_secs = 5
command_secs = 60

[paths]
working_directory = "/tmp/clones"
"#;
        let config = AgentConfig::parse(toml, Path::new("x.toml"), no_env()).unwrap();
        assert_eq!(config.github.repo_url, "https://github.com/octo/app");
        assert_eq!(config.agent.workflow, Workflow::Local);

        let settings = config.cycle_settings();
        assert_eq!(settings.api_url, "http://localhost:9000");
        assert_eq!(settings.registry_url, "http://localhost:9001");
        assert_eq!(settings.branch_prefix, "deps/bump");
        assert_eq!(settings.http_timeout, Duration::from_secs(5));
        assert_eq!(settings.command_timeout, Duration::from_secs(60));
        assert_eq!(settings.working_directory, PathBuf::from("/tmp/clones"));
        assert_eq!(settings.concurrency, 4);
    }

    #[test]
    fn test_placeholder_substitution() {
        let toml = "[github]\ntoken = \"${MY_TOKEN}\"\nrepo_url = \"${MISSING}\"\n";
        let config = AgentConfig::parse(
            toml,
            Path::new("x.toml"),
            env_of(&[("MY_TOKEN", "ghp_sub")]),
        )
        .unwrap();
        assert_eq!(config.github.token, "ghp_sub");
        assert_eq!(config.github.repo_url, "");
    }

    #[test]
    fn test_env_fallbacks_fill_empty_values() {
        let config = AgentConfig::parse(
            "",
            Path::new("x.toml"),
            env_of(&[
                ("GITHUB_TOKEN", "ghp_env"),
                ("REPO_URL", "https://github.com/octo/app"),
                ("CHECK_INTERVAL", "120"),
            ]),
        )
        .unwrap();
        assert_eq!(config.github.token, "ghp_env");
        assert_eq!(config.github.repo_url, "https://github.com/octo/app");
        assert_eq!(config.check_interval(), 120);
    }

    #[test]
    fn test_file_interval_wins_over_env() {
        let config = AgentConfig::parse(
            "[agent]\ncheck_interval = 900\n",
            Path::new("x.toml"),
            env_of(&[("CHECK_INTERVAL", "120")]),
        )
        .unwrap();
        assert_eq!(config.check_interval(), 900);
    }

    #[test]
    fn test_file_values_win_over_env() {
        let config = AgentConfig::parse(
            "[github]\ntoken = \"from_file\"\n",
            Path::new("x.toml"),
            env_of(&[("GITHUB_TOKEN", "from_env")]),
        )
        .unwrap();
        assert_eq!(config.github.token, "from_file");
    }

    #[test]
    fn test_invalid_check_interval_env() {
        let err = AgentConfig::parse(
            "",
            Path::new("x.toml"),
            env_of(&[("CHECK_INTERVAL", "hourly")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err =
            AgentConfig::parse("[github]\nrepo = \"x\"\n", Path::new("bad.toml"), no_env())
                .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_invalid_workflow_rejected() {
        let err = AgentConfig::parse(
            "[agent]\nworkflow = \"ssh\"\n",
            Path::new("bad.toml"),
            no_env(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_validate_interval() {
        let mut config = AgentConfig::default();
        assert!(config.validate().is_ok());
        config.agent.check_interval = Some(30);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IntervalTooLow { value: 30, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = AgentConfig::default();
        config.timeouts.http_secs = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroTimeout {
                name: "http_secs".to_string()
            })
        );

        let mut config = AgentConfig::default();
        config.timeouts.command_secs = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "timeouts.command_secs must be at least 1 second");
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depguard.toml");
        std::fs::write(&path, "[agent]\ncheck_interval = 900\n").unwrap();

        let config = AgentConfig::from_file(&path).unwrap();
        assert_eq!(config.check_interval(), 900);
    }

    #[test]
    fn test_from_missing_file() {
        let err = AgentConfig::from_file(Path::new("/nonexistent/depguard.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut config = AgentConfig::default();
        config.github.token = "ghp_secret".to_string();
        assert!(!format!("{:?}", config).contains("ghp_secret"));
    }
}
