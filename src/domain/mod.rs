//! Core domain models for depguard
//!
//! This module contains the fundamental types used throughout the application:
//! - Declared ranges and the numeric version comparison
//! - Dependency and outdated-entry structures
//! - Cycle results and outcomes
//! - Run history and session counters

mod dependency;
mod history;
mod update_result;
mod version_spec;

pub use dependency::{DependencySpec, OutdatedEntry};
pub use history::{RunHistory, RunHistoryEntry, SessionStats};
pub use update_result::{CycleFailure, CycleOutcome, CycleReport, UpgradeResult};
pub use version_spec::{
    bare_version, compare_versions, is_newer, parse_numeric, split_range, VersionSpec,
};
