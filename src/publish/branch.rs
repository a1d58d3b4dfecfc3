//! Branch naming and change descriptions

use crate::domain::OutdatedEntry;
use chrono::{DateTime, TimeZone};

/// Default branch name prefix
pub const DEFAULT_BRANCH_PREFIX: &str = "auto/dependency-update";

/// Git identity used for commits made by the agent
pub const COMMIT_AUTHOR_NAME: &str = "depguard";
pub const COMMIT_AUTHOR_EMAIL: &str = "depguard@users.noreply.github.com";

/// `<prefix>-YYYYMMDD-HHMMSS`
pub fn branch_name<Tz: TimeZone>(prefix: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}-{}",
        prefix.trim_end_matches('-'),
        now.format("%Y%m%d-%H%M%S")
    )
}

/// Commit message: summary line plus one line per package
pub fn commit_message(outdated: &[OutdatedEntry]) -> String {
    let mut message = format!(
        "chore(deps): bump {} package(s) to latest versions\n\n",
        outdated.len()
    );
    for entry in outdated {
        message.push_str(&format!(
            "- {}: {} -> {}\n",
            entry.name, entry.current_version, entry.latest_version
        ));
    }
    message
}

/// Pull request title naming the upgraded packages
pub fn pull_request_title(outdated: &[OutdatedEntry]) -> String {
    let names: Vec<&str> = outdated.iter().map(|e| e.name.as_str()).collect();
    match names.as_slice() {
        [] => "chore(deps): update outdated dependencies".to_string(),
        [only] => format!("chore(deps): update {}", only),
        few if few.len() <= 3 => format!("chore(deps): update {}", few.join(", ")),
        [first, rest @ ..] => format!(
            "chore(deps): update {} and {} more packages",
            first,
            rest.len()
        ),
    }
}

/// Markdown pull request body with a package/old/new table
pub fn pull_request_body<Tz: TimeZone>(outdated: &[OutdatedEntry], now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut body = String::from("## Automated Dependency Update\n\n");
    body.push_str("This PR upgrades outdated npm dependencies to their latest versions.\n\n");
    body.push_str("| Package | Old Version | New Version |\n");
    body.push_str("|---------|-------------|-------------|\n");
    for entry in outdated {
        body.push_str(&format!(
            "| `{}` | {} | {} |\n",
            entry.name, entry.current_version, entry.latest_version
        ));
    }
    body.push_str(&format!(
        "\n---\nCreated by **depguard** on {}\n",
        now.format("%Y-%m-%d %H:%M:%S")
    ));
    body
}
