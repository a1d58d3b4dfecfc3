//! Dependency information structures

use super::VersionSpec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry from a manifest's dependency section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Package name
    pub name: String,
    /// Declared range as written in the manifest (e.g. `^4.17.15`)
    pub declared_range: String,
}

impl DependencySpec {
    /// Creates a new dependency spec
    pub fn new(name: impl Into<String>, declared_range: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_range: declared_range.into(),
        }
    }

    /// Parsed view of the declared range
    pub fn version_spec(&self) -> VersionSpec {
        VersionSpec::parse(&self.declared_range)
    }

    /// The bare current version
    pub fn current_version(&self) -> String {
        self.version_spec().version
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.declared_range)
    }
}

/// A package whose latest published version exceeds the declared one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutdatedEntry {
    /// Package name
    pub name: String,
    /// Bare declared version
    pub current_version: String,
    /// Latest published version
    pub latest_version: String,
}

impl OutdatedEntry {
    /// Creates a new outdated entry
    pub fn new(
        name: impl Into<String>,
        current_version: impl Into<String>,
        latest_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            current_version: current_version.into(),
            latest_version: latest_version.into(),
        }
    }

    /// `name@latest`, the form recorded in results and history
    pub fn upgraded_name(&self) -> String {
        format!("{}@{}", self.name, self.latest_version)
    }
}

impl fmt::Display for OutdatedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.name, self.current_version, self.latest_version
        )
    }
}
