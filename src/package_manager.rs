//! Package manager integration for refreshing the lock file after updates
//!
//! This module provides:
//! - A bounded-time subprocess helper shared with the git workflow
//! - npm lock file refresh for a cloned working copy

use crate::error::GitError;
use crate::manifest::LOCK_FILE;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

/// Default timeout for external commands (5 minutes)
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// npm invocation that rewrites only package-lock.json
const NPM_LOCK_REFRESH: [&str; 5] = [
    "install",
    "--package-lock-only",
    "--ignore-scripts",
    "--legacy-peer-deps",
    "--no-audit",
];

/// Captured output of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Whether the command exited successfully
    pub success: bool,
    /// Standard output from the command
    pub stdout: String,
    /// Standard error from the command
    pub stderr: String,
}

/// Run a command in `working_dir`, killing it if it outlives `timeout`
///
/// A non-zero exit is returned as `Ok` with `success == false`; only spawn
/// failures and timeouts are errors.
pub async fn run_command(
    program: &str,
    args: &[&str],
    working_dir: &Path,
    timeout: Duration,
) -> Result<CommandOutput, GitError> {
    let display = format!("{} {}", program, args.first().copied().unwrap_or_default());
    let child = Command::new(program)
        .args(args)
        .current_dir(working_dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(GitError::Spawn {
                program: program.to_string(),
                message: e.to_string(),
            })
        }
        Err(_) => {
            return Err(GitError::Timeout {
                command: display,
                seconds: timeout.as_secs(),
            })
        }
    };

    Ok(CommandOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Result of a lock file refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallResult {
    /// The command that was executed (empty when skipped)
    pub command: String,
    /// Whether the command succeeded
    pub success: bool,
    /// Whether the refresh was skipped
    pub skipped: bool,
    /// Standard output from the command
    pub stdout: String,
    /// Standard error from the command, or the skip reason
    pub stderr: String,
}

impl InstallResult {
    /// Create a successful install result
    pub fn success(command: String, stdout: String, stderr: String) -> Self {
        Self {
            command,
            success: true,
            skipped: false,
            stdout,
            stderr,
        }
    }

    /// Create a failed install result
    pub fn failure(command: String, stdout: String, stderr: String) -> Self {
        Self {
            command,
            success: false,
            skipped: false,
            stdout,
            stderr,
        }
    }

    /// Create a skipped result (no lock file, or npm not installed)
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            command: String::new(),
            success: true,
            skipped: true,
            stdout: String::new(),
            stderr: reason.into(),
        }
    }
}

/// Trait for refreshing the lock file of a working copy
#[async_trait]
pub trait PackageManagerRunner: Send + Sync {
    /// Bring the lock file in `working_dir` in line with its package.json
    async fn refresh_lockfile(&self, working_dir: &Path) -> InstallResult;
}

/// Package manager runner that executes the real npm binary
#[derive(Debug, Clone)]
pub struct SystemPackageManager {
    timeout: Duration,
}

impl SystemPackageManager {
    /// Create a runner with the default command timeout
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_COMMAND_TIMEOUT)
    }

    /// Create a runner with a custom command timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn command_line() -> String {
        format!("npm {}", NPM_LOCK_REFRESH.join(" "))
    }
}

impl Default for SystemPackageManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackageManagerRunner for SystemPackageManager {
    async fn refresh_lockfile(&self, working_dir: &Path) -> InstallResult {
        if !working_dir.join(LOCK_FILE).exists() {
            return InstallResult::skipped(format!("no {}", LOCK_FILE));
        }

        let command = Self::command_line();
        match run_command("npm", &NPM_LOCK_REFRESH, working_dir, self.timeout).await {
            Ok(output) if output.success => {
                InstallResult::success(command, output.stdout, output.stderr)
            }
            Ok(output) => InstallResult::failure(command, output.stdout, output.stderr),
            Err(GitError::Spawn { message, .. }) => {
                tracing::warn!(%message, "npm is not available, lock file left as is");
                InstallResult::skipped(format!("npm not available: {}", message))
            }
            Err(e) => InstallResult::failure(command, String::new(), e.to_string()),
        }
    }
}
