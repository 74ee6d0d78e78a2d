//! Transaction frames and their audit trail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::traits::CompensatingAction;
use crate::types::{AuditEntry, Details, FrameId, FrameStatus, ROLLBACK_ACTION_KIND};

/// Historical record of one begin/commit-or-rollback unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionFrame {
    pub id: FrameId,
    /// Nesting depth at which the frame was opened, 1 for the outermost
    pub depth: usize,
    pub status: FrameStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub audit_entries: Vec<AuditEntry>,
}

impl TransactionFrame {
    pub(crate) fn open(id: FrameId, depth: usize, start_time: DateTime<Utc>) -> Self {
        Self {
            id,
            depth,
            status: FrameStatus::InProgress,
            start_time,
            end_time: None,
            audit_entries: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == FrameStatus::InProgress
    }

    /// Time spent between begin and close, if the frame is closed
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// Number of compensating actions registered in this frame
    pub fn rollback_action_count(&self) -> usize {
        self.audit_entries
            .iter()
            .filter(|e| e.is_rollback_registration())
            .count()
    }

    /// Entries of a given kind
    pub fn entries_of_kind(&self, kind: &str) -> Vec<&AuditEntry> {
        self.audit_entries.iter().filter(|e| e.kind == kind).collect()
    }

    /// Clamp `now` so timestamps never run backwards within the frame
    pub(crate) fn stamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let floor = self
            .audit_entries
            .last()
            .map(|e| e.timestamp)
            .unwrap_or(self.start_time);
        now.max(floor)
    }

    pub(crate) fn record(&mut self, kind: &str, detail: Option<Details>, now: DateTime<Utc>) {
        let timestamp = self.stamp(now);
        self.audit_entries.push(AuditEntry::new(kind, detail, timestamp));
    }

    pub(crate) fn record_rollback_registration(&mut self, now: DateTime<Utc>) {
        self.record(ROLLBACK_ACTION_KIND, None, now);
    }

    /// Transition to a closed status; a closed frame is never reopened
    pub(crate) fn close(&mut self, status: FrameStatus, now: DateTime<Utc>) {
        debug_assert!(status.is_closed());
        if self.is_open() {
            self.end_time = Some(self.stamp(now));
            self.status = status;
        }
    }
}

/// A frame on the live stack, owning its pending compensations
pub(crate) struct OpenFrame {
    pub(crate) id: FrameId,
    pub(crate) compensations: Vec<Box<dyn CompensatingAction>>,
}

impl OpenFrame {
    pub(crate) fn new(id: FrameId) -> Self {
        Self {
            id,
            compensations: Vec::new(),
        }
    }
}

impl std::fmt::Debug for OpenFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenFrame")
            .field("id", &self.id)
            .field("compensations", &self.compensations.len())
            .finish()
    }
}
