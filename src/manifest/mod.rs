//! npm manifest handling
//!
//! This module provides functionality to:
//! - Parse dependencies from package.json content
//! - Rewrite outdated entries while keeping range prefixes and formatting
//! - Decode manifest content returned by the hosting API

mod package_json;

pub use package_json::{apply_upgrades, parse_dependencies, MutatedManifest};

use crate::error::ManifestError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Manifest file at the repository root
pub const MANIFEST_FILE: &str = "package.json";

/// Lock file refreshed by the local workflow when present
pub const LOCK_FILE: &str = "package-lock.json";

/// Dependency sections, in lookup order
pub const DEPENDENCY_SECTIONS: [&str; 4] = [
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// Decode base64 file content as returned by the contents API
///
/// Line breaks inside the payload are ignored.
pub fn decode_content(file: &str, encoded: &str) -> Result<String, ManifestError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ManifestError::decode(file, e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ManifestError::decode(file, e.to_string()))
}

/// Encode file content for the contents API
pub fn encode_content(content: &str) -> String {
    STANDARD.encode(content.as_bytes())
}
