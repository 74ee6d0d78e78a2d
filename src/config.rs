//! Coordinator configuration

use serde::{Deserialize, Serialize};
use crate::logging::LogLevel;

/// Retention applied by `prune_expired` unless configured otherwise
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Behavioural switches for a `TransactionCoordinator`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Reject operations on an empty stack instead of ignoring them
    pub strict_mode: bool,
    /// Days of history kept by `prune_expired`
    pub retention_days: u32,
    /// Whether pruning may drop frames that are still open on the stack
    pub prune_open_frames: bool,
    /// Minimum level recorded by the event logger
    pub log_level: LogLevel,
}

impl CoordinatorConfig {
    /// Create the default, lenient configuration
    pub fn new() -> Self {
        Self {
            strict_mode: false,
            retention_days: DEFAULT_RETENTION_DAYS,
            prune_open_frames: true,
            log_level: LogLevel::Info,
        }
    }

    /// Create a builder for constructing a configuration
    pub fn builder() -> CoordinatorConfigBuilder {
        CoordinatorConfigBuilder::new()
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing coordinator configurations
#[derive(Debug, Clone, Default)]
pub struct CoordinatorConfigBuilder {
    strict_mode: Option<bool>,
    retention_days: Option<u32>,
    prune_open_frames: Option<bool>,
    log_level: Option<LogLevel>,
}

impl CoordinatorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = Some(strict);
        self
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = Some(days);
        self
    }

    pub fn with_prune_open_frames(mut self, prune: bool) -> Self {
        self.prune_open_frames = Some(prune);
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn build(self) -> CoordinatorConfig {
        let defaults = CoordinatorConfig::new();
        CoordinatorConfig {
            strict_mode: self.strict_mode.unwrap_or(defaults.strict_mode),
            retention_days: self.retention_days.unwrap_or(defaults.retention_days),
            prune_open_frames: self.prune_open_frames.unwrap_or(defaults.prune_open_frames),
            log_level: self.log_level.unwrap_or(defaults.log_level),
        }
    }
}
