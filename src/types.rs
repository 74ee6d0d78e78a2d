//! Core data types for the coordinator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Audit kind recorded whenever a compensating action is registered
pub const ROLLBACK_ACTION_KIND: &str = "rollback_action";

/// Structured payload attached to an audit entry
pub type Details = serde_json::Map<String, serde_json::Value>;

/// Identifier of a transaction frame, unique per coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle status of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    InProgress,
    Committed,
    RolledBack,
}

impl FrameStatus {
    pub fn is_closed(&self) -> bool {
        !matches!(self, FrameStatus::InProgress)
    }
}

impl fmt::Display for FrameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FrameStatus::InProgress => "in_progress",
            FrameStatus::Committed => "committed",
            FrameStatus::RolledBack => "rolled_back",
        };
        f.write_str(s)
    }
}

/// A timestamped record of something that happened inside a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Details>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(kind: impl Into<String>, detail: Option<Details>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: kind.into(),
            detail,
            timestamp,
        }
    }

    /// Whether this entry records the registration of a compensating action
    pub fn is_rollback_registration(&self) -> bool {
        self.kind == ROLLBACK_ACTION_KIND && self.detail.is_none()
    }
}

/// Blake3 digest of a serialized transaction log
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogDigest(pub [u8; 32]);

impl fmt::Display for LogDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
