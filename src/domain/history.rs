//! Run history and session counters
//!
//! Both live only as long as the owning session; nothing is persisted.

use super::UpgradeResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One successful upgrade cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHistoryEntry {
    /// When the cycle finished
    pub timestamp: DateTime<Utc>,
    /// `name@version` of every upgraded package
    pub packages: Vec<String>,
    /// Pull request URL (empty when none was returned)
    pub pull_request_url: String,
}

impl RunHistoryEntry {
    /// Creates a new history entry
    pub fn new(
        timestamp: DateTime<Utc>,
        packages: Vec<String>,
        pull_request_url: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            packages,
            pull_request_url: pull_request_url.into(),
        }
    }
}

/// Append-only ordered list of history entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHistory {
    entries: Vec<RunHistoryEntry>,
}

impl RunHistory {
    /// Creates an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cycle result; only successful cycles with upgrades are kept
    ///
    /// Returns true if an entry was appended.
    pub fn record(&mut self, result: &UpgradeResult, at: DateTime<Utc>) -> bool {
        if !result.success || !result.has_upgrades() {
            return false;
        }
        self.entries.push(RunHistoryEntry::new(
            at,
            result.upgraded_names.clone(),
            result.pull_request_url.clone(),
        ));
        true
    }

    /// All entries, oldest first
    pub fn entries(&self) -> &[RunHistoryEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries were recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove everything (explicit session reset only)
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Counters displayed next to the history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Successful cycles
    pub cycles: u64,
    /// Pull requests returned
    pub prs: u64,
    /// Packages upgraded
    pub packages: u64,
}

impl SessionStats {
    /// Fold one cycle result into the counters
    pub fn record(&mut self, result: &UpgradeResult) {
        if !result.success {
            return;
        }
        self.cycles += 1;
        if !result.pull_request_url.is_empty() {
            self.prs += 1;
        }
        self.packages += result.upgraded_names.len() as u64;
    }
}
