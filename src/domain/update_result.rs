//! Cycle result types

use super::OutdatedEntry;
use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Uniform terminal output of one cycle
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpgradeResult {
    /// Whether the cycle ended in success (including "nothing to do")
    pub success: bool,
    /// `name@version` for every package actually changed
    pub upgraded_names: Vec<String>,
    /// URL of the opened or existing pull request, empty when none
    pub pull_request_url: String,
}

impl UpgradeResult {
    /// Successful cycle that opened a pull request
    pub fn upgraded(upgraded_names: Vec<String>, pull_request_url: impl Into<String>) -> Self {
        Self {
            success: true,
            upgraded_names,
            pull_request_url: pull_request_url.into(),
        }
    }

    /// Successful cycle with nothing to upgrade
    pub fn noop() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Unsuccessful cycle
    pub fn failed() -> Self {
        Self::default()
    }

    /// Returns true if any package was upgraded
    pub fn has_upgrades(&self) -> bool {
        !self.upgraded_names.is_empty()
    }
}

/// Structured failure of a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleFailure {
    /// Taxonomy bucket
    pub kind: ErrorKind,
    /// Human-readable message, shown verbatim to the user
    pub message: String,
    /// Whether a commit already reached the remote before the failure
    pub pushed: bool,
}

impl CycleFailure {
    /// Creates a failure with nothing pushed
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            pushed: false,
        }
    }

    /// Marks the failure as happening after the push
    pub fn with_pushed(mut self, pushed: bool) -> Self {
        self.pushed = pushed;
        self
    }
}

impl fmt::Display for CycleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if self.pushed {
            write!(f, " (commit was already pushed)")?;
        }
        Ok(())
    }
}

/// How a cycle ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Packages bumped, branch pushed and pull request opened
    Upgraded {
        /// Branch the change was pushed to
        branch: String,
        /// Packages bumped, with old and new versions
        packages: Vec<OutdatedEntry>,
    },
    /// Every dependency already at its latest version
    UpToDate,
    /// The repository has no manifest
    NotApplicable {
        /// Why the repository was not processed
        reason: String,
    },
    /// A stage failed
    Failed(CycleFailure),
}

impl CycleOutcome {
    /// Taxonomy bucket for outcomes other than success
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            CycleOutcome::Upgraded { .. } | CycleOutcome::UpToDate => None,
            CycleOutcome::NotApplicable { .. } => Some(ErrorKind::NotApplicable),
            CycleOutcome::Failed(failure) => Some(failure.kind),
        }
    }

    /// Returns true for `Failed`
    pub fn is_failure(&self) -> bool {
        matches!(self, CycleOutcome::Failed(_))
    }
}

/// Result of one cycle: the uniform tuple plus the outcome detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Uniform result
    pub result: UpgradeResult,
    /// Outcome detail
    pub outcome: CycleOutcome,
}

impl CycleReport {
    /// Upgrades pushed and pull request opened
    pub fn upgraded(
        branch: impl Into<String>,
        upgraded_names: Vec<String>,
        packages: Vec<OutdatedEntry>,
        pull_request_url: impl Into<String>,
    ) -> Self {
        Self {
            result: UpgradeResult::upgraded(upgraded_names, pull_request_url),
            outcome: CycleOutcome::Upgraded {
                branch: branch.into(),
                packages,
            },
        }
    }

    /// Nothing to upgrade
    pub fn up_to_date() -> Self {
        Self {
            result: UpgradeResult::noop(),
            outcome: CycleOutcome::UpToDate,
        }
    }

    /// No manifest in the repository
    pub fn not_applicable(reason: impl Into<String>) -> Self {
        Self {
            result: UpgradeResult::failed(),
            outcome: CycleOutcome::NotApplicable {
                reason: reason.into(),
            },
        }
    }

    /// A stage failed
    pub fn failed(failure: CycleFailure) -> Self {
        Self {
            result: UpgradeResult::failed(),
            outcome: CycleOutcome::Failed(failure),
        }
    }

    /// Taxonomy bucket, if not a success
    pub fn kind(&self) -> Option<ErrorKind> {
        self.outcome.kind()
    }
}
