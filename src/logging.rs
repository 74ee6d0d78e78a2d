//! Lifecycle logging for the coordinator
//!
//! Every record is kept in memory so callers can inspect what the coordinator
//! did, and is also emitted through `tracing` for whatever subscriber the
//! host process installs.

use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use crate::types::FrameId;

/// Log level for coordinator events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level - detailed information
    Debug,
    /// Info level - general information
    Info,
    /// Warning level - potential issues
    Warn,
    /// Error level - errors that occurred
    Error,
}

/// A single coordinator log record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Timestamp from the coordinator clock
    pub timestamp: DateTime<Utc>,
    /// Frame the record refers to, if any
    pub frame_id: Option<FrameId>,
    /// Stack depth at the time of the record
    pub depth: Option<usize>,
    /// Log message
    pub message: String,
    /// Additional structured data
    pub metadata: Vec<(String, String)>,
}

impl LogEntry {
    /// Create a new log entry
    pub fn new(level: LogLevel, timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp,
            frame_id: None,
            depth: None,
            message: message.into(),
            metadata: Vec::new(),
        }
    }

    /// Add frame context to the log entry
    pub fn with_frame(mut self, id: FrameId, depth: usize) -> Self {
        self.frame_id = Some(id);
        self.depth = Some(depth);
        self
    }

    /// Add metadata to the log entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.push((key.into(), value.to_string()));
        self
    }

    fn emit(&self) {
        let frame = self.frame_id.map(|id| id.to_string()).unwrap_or_default();
        let depth = self.depth.unwrap_or(0);
        let metadata = self
            .metadata
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        match self.level {
            LogLevel::Trace => tracing::trace!(frame = %frame, depth, %metadata, "{}", self.message),
            LogLevel::Debug => tracing::debug!(frame = %frame, depth, %metadata, "{}", self.message),
            LogLevel::Info => tracing::info!(frame = %frame, depth, %metadata, "{}", self.message),
            LogLevel::Warn => tracing::warn!(frame = %frame, depth, %metadata, "{}", self.message),
            LogLevel::Error => tracing::error!(frame = %frame, depth, %metadata, "{}", self.message),
        }
    }
}

/// Logger that collects coordinator events and forwards them to `tracing`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogger {
    /// Collected log entries
    entries: Vec<LogEntry>,
    /// Minimum log level to record
    min_level: LogLevel,
}

impl EventLogger {
    /// Create a new logger
    pub fn new(min_level: LogLevel) -> Self {
        Self {
            entries: Vec::new(),
            min_level,
        }
    }

    /// Create a logger that captures all levels
    pub fn all() -> Self {
        Self::new(LogLevel::Trace)
    }

    /// Create a logger that captures info and above
    pub fn with_info_level() -> Self {
        Self::new(LogLevel::Info)
    }

    /// Log an entry if it meets the minimum level
    pub fn log(&mut self, entry: LogEntry) {
        if self.should_log(entry.level) {
            entry.emit();
            self.entries.push(entry);
        }
    }

    fn should_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    /// Minimum level this logger records
    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Get all log entries
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all log entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop entries recorded at or before `cutoff`, returning how many were removed
    pub fn retain_after(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.timestamp > cutoff);
        before - self.entries.len()
    }

    /// Filter entries by log level
    pub fn filter_by_level(&self, level: LogLevel) -> Vec<&LogEntry> {
        self.entries.iter()
            .filter(|e| e.level == level)
            .collect()
    }

    /// Filter entries by frame
    pub fn filter_by_frame(&self, frame_id: FrameId) -> Vec<&LogEntry> {
        self.entries.iter()
            .filter(|e| e.frame_id == Some(frame_id))
            .collect()
    }

    /// Messages in the order they were recorded
    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.message.as_str()).collect()
    }
}

impl Default for EventLogger {
    fn default() -> Self {
        Self::with_info_level()
    }
}
