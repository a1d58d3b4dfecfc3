//! Version differ
//!
//! This module provides:
//! - Per-dependency judgment: outdated, current, or skipped (with reason)
//! - Concurrent latest-version lookups bounded by a semaphore
//!
//! A failed or unusable lookup only skips its own package.

use crate::domain::{is_newer, DependencySpec, OutdatedEntry};
use crate::registry::VersionResolver;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Default number of registry lookups in flight
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Why a dependency was left out of the diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Registry request failed
    LookupFailed(String),
    /// Registry does not know the package
    UnknownPackage,
    /// Declared or published version is not a dotted integer tuple
    UnparsableVersion { current: String, latest: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::LookupFailed(message) => write!(f, "lookup failed: {}", message),
            SkipReason::UnknownPackage => write!(f, "not found in registry"),
            SkipReason::UnparsableVersion { current, latest } => {
                write!(f, "cannot compare '{}' with '{}'", current, latest)
            }
        }
    }
}

/// A dependency the differ could not evaluate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLookup {
    /// Package name
    pub name: String,
    /// Reason for skipping
    pub reason: SkipReason,
}

/// Result of one diff pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffReport {
    /// Outdated packages, in manifest order
    pub outdated: Vec<OutdatedEntry>,
    /// Packages that could not be evaluated, in manifest order
    pub skipped: Vec<SkippedLookup>,
}

/// Judgment for a single dependency given its lookup result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Judgment {
    /// Latest is strictly newer
    Outdated(OutdatedEntry),
    /// Already at or beyond latest
    Current,
    /// Could not be evaluated
    Skip(SkipReason),
}

/// Decide whether a dependency is outdated given the registry's latest version
pub fn judge(dependency: &DependencySpec, latest: Option<&str>) -> Judgment {
    let Some(latest) = latest else {
        return Judgment::Skip(SkipReason::UnknownPackage);
    };
    let current = dependency.current_version();
    match is_newer(latest, &current) {
        Some(true) => Judgment::Outdated(OutdatedEntry::new(&dependency.name, current, latest)),
        Some(false) => Judgment::Current,
        None => Judgment::Skip(SkipReason::UnparsableVersion {
            current: dependency.declared_range.clone(),
            latest: latest.to_string(),
        }),
    }
}

/// Compares declared ranges against the registry
pub struct VersionDiffer {
    resolver: Arc<dyn VersionResolver>,
    concurrency: usize,
}

impl VersionDiffer {
    /// Create a differ with the default concurrency
    pub fn new(resolver: Arc<dyn VersionResolver>) -> Self {
        Self {
            resolver,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Set the maximum number of lookups in flight (at least 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Look up every dependency and collect the outdated ones
    pub async fn find_outdated(&self, dependencies: &[DependencySpec]) -> DiffReport {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (index, dependency) in dependencies.iter().enumerate() {
            let resolver = Arc::clone(&self.resolver);
            let semaphore = Arc::clone(&semaphore);
            let dependency = dependency.clone();
            tasks.spawn(async move {
                // a closed semaphore only happens on drop; treat as a failed lookup
                let judgment = match semaphore.acquire_owned().await {
                    Ok(_permit) => match resolver.latest_version(&dependency.name).await {
                        Ok(latest) => judge(&dependency, latest.as_deref()),
                        Err(e) => Judgment::Skip(SkipReason::LookupFailed(e.to_string())),
                    },
                    Err(e) => Judgment::Skip(SkipReason::LookupFailed(e.to_string())),
                };
                (index, dependency.name, judgment)
            });
        }

        let mut judged = Vec::with_capacity(dependencies.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => judged.push(entry),
                Err(e) => tracing::warn!(error = %e, "version lookup task aborted"),
            }
        }
        judged.sort_by_key(|(index, _, _)| *index);

        let mut report = DiffReport::default();
        for (_, name, judgment) in judged {
            match judgment {
                Judgment::Outdated(entry) => {
                    tracing::debug!(package = %entry.name, from = %entry.current_version, to = %entry.latest_version, "outdated");
                    report.outdated.push(entry);
                }
                Judgment::Current => tracing::trace!(package = %name, "up to date"),
                Judgment::Skip(reason) => {
                    tracing::warn!(package = %name, %reason, "skipping package");
                    report.skipped.push(SkippedLookup { name, reason });
                }
            }
        }
        report
    }
}
