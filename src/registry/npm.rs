//! npm Registry adapter
//!
//! Resolves the latest published version of a package from the npm registry.
//! API endpoint: {registry}/{package}/latest

use crate::error::RegistryError;
use crate::registry::{HttpClient, VersionResolver};
use async_trait::async_trait;
use serde::Deserialize;

/// npm registry base URL
pub const NPM_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// npm Registry adapter
#[derive(Debug, Clone)]
pub struct NpmAdapter {
    client: HttpClient,
    base_url: String,
}

/// `/latest` dist-tag response
#[derive(Debug, Deserialize)]
struct NpmLatestResponse {
    version: Option<String>,
}

impl NpmAdapter {
    /// Create a new npm adapter against the public registry
    pub fn new(client: HttpClient) -> Self {
        Self::with_base_url(client, NPM_REGISTRY_URL)
    }

    /// Create a new npm adapter against a custom registry
    pub fn with_base_url(client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build the URL for a package
    ///
    /// Scoped names keep their `@scope/` form; the registry accepts it unescaped.
    fn build_url(&self, package: &str) -> String {
        format!("{}/{}/latest", self.base_url, package)
    }
}

#[async_trait]
impl VersionResolver for NpmAdapter {
    fn registry_name(&self) -> &'static str {
        "npm"
    }

    async fn latest_version(&self, package: &str) -> Result<Option<String>, RegistryError> {
        let url = self.build_url(package);
        let response: NpmLatestResponse = match self.client.get_json(&url).await {
            Ok(response) => response,
            Err(e) if e.status() == Some(404) => return Ok(None),
            Err(e) => return Err(RegistryError::transport(package, self.registry_name(), e)),
        };

        match response.version {
            Some(version) if !version.trim().is_empty() => Ok(Some(version.trim().to_string())),
            _ => Err(RegistryError::invalid_response(
                package,
                self.registry_name(),
                "missing 'version' field",
            )),
        }
    }
}
