//! depguard - npm dependency update agent for a GitHub repository
//!
//! This library provides the core functionality for one update cycle:
//! - Fetching package.json from the repository's default branch
//! - Comparing declared versions against the npm registry
//! - Rewriting the manifest and pushing it to a fresh branch
//! - Opening (or finding) the pull request
//!
//! A [`session::Agent`] serializes cycles and keeps run history,
//! counters and the activity log for the lifetime of the process.

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod hosting;
pub mod logbook;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod package_manager;
pub mod progress;
pub mod publish;
pub mod registry;
pub mod session;
pub mod update;

#[cfg(test)]
mod testing;
