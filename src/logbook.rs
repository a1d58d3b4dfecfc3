//! User-visible activity log
//!
//! A bounded line buffer polled by offset. Offsets are absolute: they keep
//! counting after old lines are evicted, so a poller never sees a line twice.
//! Every line is also emitted as a `tracing` event.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Lines kept before the oldest are evicted
pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// Severity of an activity line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Progress of a stage
    Info,
    /// A stage or cycle completed
    Success,
    /// Cycle ended without work, or a package was skipped
    Warning,
    /// Cycle failed
    Error,
}

/// One activity line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// Severity
    pub level: LogLevel,
    /// Human-readable text, never a stack trace
    pub message: String,
    /// Local wall-clock time, `HH:MM:SS`
    pub ts: String,
}

/// Lines appended since a given offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPage {
    /// Retained lines at or after the requested offset
    pub lines: Vec<LogLine>,
    /// Offset to pass on the next poll
    pub next_offset: usize,
    /// Lines ever appended since the last clear
    pub total: usize,
}

#[derive(Debug, Default)]
struct LogBuffer {
    lines: VecDeque<LogLine>,
    evicted: usize,
}

/// Append-only activity log shared between the agent and its cycles
#[derive(Debug)]
pub struct ActivityLog {
    buffer: Mutex<LogBuffer>,
    capacity: usize,
}

impl ActivityLog {
    /// Create a log with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    /// Create a log keeping at most `capacity` lines
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(LogBuffer::default()),
            capacity: capacity.max(1),
        }
    }

    /// Append a line
    pub fn push(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info | LogLevel::Success => tracing::info!(target: "depguard::activity", "{}", message),
            LogLevel::Warning => tracing::warn!(target: "depguard::activity", "{}", message),
            LogLevel::Error => tracing::error!(target: "depguard::activity", "{}", message),
        }

        let line = LogLine {
            level,
            message,
            ts: Local::now().format("%H:%M:%S").to_string(),
        };
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.lines.push_back(line);
        while buffer.lines.len() > self.capacity {
            buffer.lines.pop_front();
            buffer.evicted += 1;
        }
    }

    /// Append an [`LogLevel::Info`] line
    pub fn info(&self, message: impl Into<String>) {
        self.push(LogLevel::Info, message);
    }

    /// Append a [`LogLevel::Success`] line
    pub fn success(&self, message: impl Into<String>) {
        self.push(LogLevel::Success, message);
    }

    /// Append a [`LogLevel::Warning`] line
    pub fn warning(&self, message: impl Into<String>) {
        self.push(LogLevel::Warning, message);
    }

    /// Append an [`LogLevel::Error`] line
    pub fn error(&self, message: impl Into<String>) {
        self.push(LogLevel::Error, message);
    }

    /// Lines appended at or after `offset`
    ///
    /// Lines already evicted are silently skipped.
    pub fn since(&self, offset: usize) -> LogPage {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        let total = buffer.evicted + buffer.lines.len();
        let start = offset.max(buffer.evicted).min(total) - buffer.evicted;
        LogPage {
            lines: buffer.lines.iter().skip(start).cloned().collect(),
            next_offset: total,
            total,
        }
    }

    /// Lines currently retained
    pub fn len(&self) -> usize {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .lines
            .len()
    }

    /// Returns true if nothing is retained
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every line and restart offsets at zero
    pub fn clear(&self) {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.lines.clear();
        buffer.evicted = 0;
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}
