//! Registry adapters for resolving package versions
//!
//! This module provides:
//! - HTTP client shared foundation (also used by the hosting API)
//! - npm Registry adapter

mod client;
mod npm;

pub use client::{HttpClient, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
pub use npm::{NpmAdapter, NPM_REGISTRY_URL};

use crate::error::RegistryError;
use async_trait::async_trait;

/// Trait for "latest published version" lookups
#[async_trait]
pub trait VersionResolver: Send + Sync {
    /// Get the registry name
    fn registry_name(&self) -> &'static str;

    /// Latest published version of a package, `None` if the registry does not know it
    async fn latest_version(&self, package: &str) -> Result<Option<String>, RegistryError>;
}
