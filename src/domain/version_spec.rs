//! Declared version ranges and the numeric comparison used by the differ
//!
//! Handles npm range strings like `^1.2.3`, `~1.2.3`, `>=1.0.0`, `=1.2.3`,
//! `1.2.3` and `1.2.3-beta.1`. Only the leading operator run is recognized;
//! full semver range semantics are intentionally not modelled.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Characters that make up a range operator prefix
const OPERATOR_CHARS: &[char] = &['^', '~', '>', '=', '<'];

/// A declared range split into its operator prefix and version part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSpec {
    /// The raw range string as it appears in the manifest
    pub raw: String,
    /// Leading operator characters (empty for exact versions)
    pub prefix: String,
    /// The bare version: prefix stripped, pre-release suffix dropped
    pub version: String,
}

impl VersionSpec {
    /// Parse a declared range
    pub fn parse(raw: &str) -> Self {
        let (prefix, _) = split_range(raw);
        Self {
            raw: raw.to_string(),
            prefix: prefix.to_string(),
            version: bare_version(raw),
        }
    }

    /// Formats a new version while preserving the original prefix
    pub fn format_updated(&self, new_version: &str) -> String {
        format!("{}{}", self.prefix, new_version)
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Split a range into its leading operator run and the remainder
pub fn split_range(range: &str) -> (&str, &str) {
    let trimmed = range.trim_start();
    let end = trimmed
        .find(|c: char| !OPERATOR_CHARS.contains(&c))
        .unwrap_or(trimmed.len());
    trimmed.split_at(end)
}

/// Strip operators and any pre-release suffix after the first `-`
pub fn bare_version(range: &str) -> String {
    let (_, rest) = split_range(range);
    rest.split('-').next().unwrap_or_default().trim().to_string()
}

/// Parse a dot-separated version into integers
///
/// Any non-numeric component (including an empty string) yields `None`.
pub fn parse_numeric(version: &str) -> Option<Vec<u64>> {
    let version = version.trim();
    if version.is_empty() {
        return None;
    }
    version
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

/// Compare two versions as numeric tuples
///
/// Only the declared side has operators and a pre-release suffix stripped; a
/// pre-release published as latest does not parse. Returns `None` when either
/// side fails to parse.
pub fn compare_versions(latest: &str, current: &str) -> Option<Ordering> {
    let latest = parse_numeric(latest)?;
    let current = parse_numeric(&bare_version(current))?;
    Some(latest.cmp(&current))
}

/// Returns `Some(true)` if `latest` is strictly greater than `current`
pub fn is_newer(latest: &str, current: &str) -> Option<bool> {
    compare_versions(latest, current).map(|ord| ord == Ordering::Greater)
}
