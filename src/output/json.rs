//! JSON output formatter for machine processing
//!
//! This module provides:
//! - JSON serialization of cycle results
//! - Session counters and history in normal and verbose mode

use crate::domain::UpgradeResult;
use crate::output::{OutputFormatter, Verbosity};
use crate::session::{AgentStatus, RunOnceResponse};
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbosity level affects detail in output
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    fn write_json<T: Serialize>(value: &T, writer: &mut dyn Write) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{}", json)
    }
}

/// Quiet mode output: the uniform result only
#[derive(Serialize)]
struct JsonQuiet<'a> {
    #[serde(flatten)]
    result: &'a UpgradeResult,
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, response: &RunOnceResponse, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity == Verbosity::Quiet {
            return Self::write_json(
                &JsonQuiet {
                    result: &response.report.result,
                },
                writer,
            );
        }
        Self::write_json(response, writer)
    }

    fn format_status(&self, status: &AgentStatus, writer: &mut dyn Write) -> std::io::Result<()> {
        Self::write_json(status, writer)
    }
}
