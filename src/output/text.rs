//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Cycle outcome display with colors
//! - Semantic version change type indication (major/minor/patch)
//! - Session counters and run history in verbose mode

use crate::domain::{CycleOutcome, OutdatedEntry, RunHistoryEntry, SessionStats};
use crate::output::{OutputFormatter, Verbosity};
use crate::session::{AgentStatus, RunOnceResponse};
use colored::Colorize;
use std::io::Write;

/// Semantic version change type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionChangeType {
    /// Major version change (breaking)
    Major,
    /// Minor version change (features)
    Minor,
    /// Patch version change (fixes)
    Patch,
    /// Unknown or unparseable
    Unknown,
}

impl VersionChangeType {
    /// Determine the change type between two versions
    pub fn from_versions(old: &str, new: &str) -> Self {
        let parse = |v: &str| -> Option<(u64, u64)> {
            let v = v.strip_prefix('v').unwrap_or(v);
            // prerelease suffixes do not affect the bucket
            let mut parts = v.split(['.', '-']);
            let major = parts.next()?.parse().ok()?;
            let minor = parts.next().map_or(Some(0), |p| p.parse().ok())?;
            Some((major, minor))
        };

        match (parse(old), parse(new)) {
            (Some((old_major, old_minor)), Some((new_major, new_minor))) => {
                if new_major != old_major {
                    VersionChangeType::Major
                } else if new_minor != old_minor {
                    VersionChangeType::Minor
                } else {
                    VersionChangeType::Patch
                }
            }
            _ => VersionChangeType::Unknown,
        }
    }

    /// Get the display label with color
    pub fn colored_label(&self) -> String {
        match self {
            VersionChangeType::Major => "major".red().bold().to_string(),
            VersionChangeType::Minor => "minor".yellow().to_string(),
            VersionChangeType::Patch => "patch".green().to_string(),
            VersionChangeType::Unknown => "?".dimmed().to_string(),
        }
    }

    /// Get the plain label
    pub fn label(&self) -> &'static str {
        match self {
            VersionChangeType::Major => "major",
            VersionChangeType::Minor => "minor",
            VersionChangeType::Patch => "patch",
            VersionChangeType::Unknown => "?",
        }
    }
}

/// Text formatter for human-readable output
pub struct TextFormatter {
    /// Verbosity level
    verbosity: Verbosity,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self::with_color(verbosity, true)
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    /// Format a single upgrade line
    fn format_upgrade_line(
        &self,
        entry: &OutdatedEntry,
        max_name_len: usize,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let change_type =
            VersionChangeType::from_versions(&entry.current_version, &entry.latest_version);

        if self.color {
            let name_display = format!("{:width$}", entry.name, width = max_name_len);
            writeln!(
                writer,
                "  {} {} {} {} [{}]",
                name_display,
                entry.current_version.dimmed(),
                "→".dimmed(),
                entry.latest_version.bright_white().bold(),
                change_type.colored_label()
            )
        } else {
            writeln!(
                writer,
                "  {:width$} {} -> {} [{}]",
                entry.name,
                entry.current_version,
                entry.latest_version,
                change_type.label(),
                width = max_name_len
            )
        }
    }

    /// Format the outcome headline and details
    fn format_outcome(
        &self,
        response: &RunOnceResponse,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let result = &response.report.result;
        match &response.report.outcome {
            CycleOutcome::Upgraded { branch, packages } => {
                if self.verbosity == Verbosity::Quiet {
                    return writeln!(writer, "{}", result.pull_request_url);
                }
                let headline = format!(
                    "Upgraded {} {}",
                    packages.len(),
                    if packages.len() == 1 {
                        "package"
                    } else {
                        "packages"
                    }
                );
                if self.color {
                    writeln!(writer, "{} {} on {}", "✓".green(), headline.bold(), branch.cyan())?;
                } else {
                    writeln!(writer, "{} on {}", headline, branch)?;
                }

                let max_name_len = packages.iter().map(|p| p.name.len()).max().unwrap_or(0).max(20);
                for entry in packages {
                    self.format_upgrade_line(entry, max_name_len, writer)?;
                }
                if self.color {
                    writeln!(writer, "  Pull request: {}", result.pull_request_url.underline())
                } else {
                    writeln!(writer, "  Pull request: {}", result.pull_request_url)
                }
            }
            CycleOutcome::UpToDate => {
                if self.verbosity == Verbosity::Quiet {
                    return Ok(());
                }
                if self.color {
                    writeln!(writer, "{} All dependencies are up to date", "✓".green())
                } else {
                    writeln!(writer, "All dependencies are up to date")
                }
            }
            CycleOutcome::NotApplicable { reason } => {
                if self.color {
                    writeln!(writer, "{} Not applicable: {}", "-".yellow(), reason)
                } else {
                    writeln!(writer, "Not applicable: {}", reason)
                }
            }
            CycleOutcome::Failed(failure) => {
                if self.color {
                    writeln!(writer, "{} {}", "✗".red().bold(), failure.to_string().red())
                } else {
                    writeln!(writer, "Failed: {}", failure)
                }
            }
        }
    }

    /// Format session counters
    fn format_stats(&self, stats: &SessionStats, writer: &mut dyn Write) -> std::io::Result<()> {
        let line = format!(
            "Session: {} {}, {} {}, {} {} upgraded",
            stats.cycles,
            if stats.cycles == 1 { "cycle" } else { "cycles" },
            stats.prs,
            if stats.prs == 1 { "PR" } else { "PRs" },
            stats.packages,
            if stats.packages == 1 {
                "package"
            } else {
                "packages"
            }
        );
        if self.color {
            writeln!(writer, "{}", line.dimmed())
        } else {
            writeln!(writer, "{}", line)
        }
    }

    /// Format run history, oldest first
    fn format_history(
        &self,
        history: &[RunHistoryEntry],
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if history.is_empty() {
            return Ok(());
        }
        writeln!(writer, "History:")?;
        for (index, entry) in history.iter().enumerate() {
            let when = entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC");
            writeln!(
                writer,
                "  #{} {} {}",
                index + 1,
                when,
                entry.packages.join(", ")
            )?;
            if !entry.pull_request_url.is_empty() {
                writeln!(writer, "     {}", entry.pull_request_url)?;
            }
        }
        Ok(())
    }
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self::new(Verbosity::Normal)
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, response: &RunOnceResponse, writer: &mut dyn Write) -> std::io::Result<()> {
        self.format_outcome(response, writer)?;

        if self.verbosity == Verbosity::Verbose {
            writeln!(writer)?;
            self.format_stats(&response.stats, writer)?;
            self.format_history(&response.history, writer)?;
        }
        Ok(())
    }

    fn format_status(&self, status: &AgentStatus, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity == Verbosity::Quiet {
            return Ok(());
        }
        writeln!(
            writer,
            "Repository: {} (token {})",
            if status.config.repo_url.is_empty() {
                "<not configured>"
            } else {
                status.config.repo_url.as_str()
            },
            if status.config.token_configured {
                "configured"
            } else {
                "missing"
            }
        )?;
        writeln!(writer, "Interval: {}s", status.config.check_interval)?;
        self.format_stats(&status.stats, writer)?;
        if self.verbosity == Verbosity::Verbose {
            self.format_history(&status.history, writer)?;
        }
        Ok(())
    }
}
