//! Repository detection from web URLs

use super::RepoId;
use crate::error::ConfigError;

/// Web prefix every repository URL must start with
pub const DEFAULT_WEB_URL: &str = "https://github.com/";

/// Parse owner/repo from a repository web URL
///
/// The URL must start with `web_prefix`. A trailing `/` and `.git` are
/// ignored; the last two path segments are taken as owner and name.
pub fn parse_repo_url(url: &str, web_prefix: &str) -> Result<RepoId, ConfigError> {
    let url = url.trim();
    let invalid = || ConfigError::invalid_repo_url(url, web_prefix);

    let path = url.strip_prefix(web_prefix).ok_or_else(invalid)?;
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let segments: Vec<&str> = path.split('/').collect();
    match segments.as_slice() {
        [.., owner, name] if !owner.is_empty() && !name.is_empty() => {
            Ok(RepoId::new(*owner, *name))
        }
        _ => Err(invalid()),
    }
}
