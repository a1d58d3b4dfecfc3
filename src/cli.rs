//! CLI argument parsing module for depguard

use crate::config::AgentConfig;
use crate::publish::Workflow;
use clap::Parser;
use std::path::PathBuf;

/// Parse an interval: plain seconds, or Ns (seconds), Nm (minutes), Nh (hours)
fn parse_interval(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty interval".to_string());
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 60 * 60)
    } else {
        (s, 1)
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid number in interval: {}", num_str))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| format!("interval too large: {}", s))
}

/// npm dependency update agent for a GitHub repository
#[derive(Parser, Debug, Clone)]
#[command(
    name = "depguard",
    version,
    about = "Keeps the npm dependencies of a GitHub repository up to date"
)]
pub struct CliArgs {
    /// TOML configuration file
    #[arg(short, long, env = "DEPGUARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Repository web URL (e.g. https://github.com/owner/repo)
    #[arg(long)]
    pub repo: Option<String>,

    /// GitHub token (falls back to the config file, then $GITHUB_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Seconds between cycles in watch mode (e.g. 3600, 30m, 2h)
    #[arg(long, value_parser = parse_interval)]
    pub interval: Option<u64>,

    /// How changes are pushed: api or local
    #[arg(long)]
    pub workflow: Option<Workflow>,

    /// GitHub REST API base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// npm registry base URL
    #[arg(long)]
    pub registry_url: Option<String>,

    // Run options
    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,

    // Output options
    /// Output results in JSON format
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl CliArgs {
    /// Override config values with the flags that were given
    pub fn apply_to(&self, config: &mut AgentConfig) {
        if let Some(repo) = &self.repo {
            config.github.repo_url = repo.clone();
        }
        if let Some(token) = &self.token {
            config.github.token = token.clone();
        }
        if let Some(interval) = self.interval {
            config.agent.check_interval = Some(interval);
        }
        if let Some(workflow) = self.workflow {
            config.agent.workflow = workflow;
        }
        if let Some(api_url) = &self.api_url {
            config.github.api_url = api_url.clone();
        }
        if let Some(registry_url) = &self.registry_url {
            config.registry.url = registry_url.clone();
        }
    }

    /// Default `tracing` filter for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "warn,depguard=debug"
        } else if self.quiet {
            "error"
        } else {
            "warn,depguard=info"
        }
    }
}
