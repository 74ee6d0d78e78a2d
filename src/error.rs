//! Error types for the transaction coordinator

use thiserror::Error;
use crate::types::FrameId;

/// Boxed failure raised by a compensating action or a unit of work
pub type ActionError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum TransactionError {
    /// A compensating action failed during rollback; the remaining ones were skipped
    #[error("Rollback failed: frame {frame_id}, compensation #{index} ({skipped} skipped): {source}")]
    RollbackFailure {
        frame_id: FrameId,
        index: usize,
        skipped: usize,
        #[source]
        source: ActionError,
    },

    /// The scoped unit of work failed and its frame was rolled back
    #[error("Transaction failed: frame {frame_id}: {source}")]
    TransactionFailure {
        frame_id: FrameId,
        #[source]
        source: ActionError,
    },

    #[error("Protocol violation in {operation}: no matching open transaction")]
    ProtocolViolation { operation: String },

    #[error("Cannot import a log while {depth} transaction(s) are open")]
    ImportWhileActive { depth: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
}

impl TransactionError {
    /// Frame the failure belongs to, if any
    pub fn frame_id(&self) -> Option<FrameId> {
        match self {
            Self::RollbackFailure { frame_id, .. } | Self::TransactionFailure { frame_id, .. } => {
                Some(*frame_id)
            }
            _ => None,
        }
    }

    pub fn is_rollback_failure(&self) -> bool {
        matches!(self, Self::RollbackFailure { .. })
    }

    pub fn is_transaction_failure(&self) -> bool {
        matches!(self, Self::TransactionFailure { .. })
    }

    /// The underlying failure carried by rollback and transaction failures
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::RollbackFailure { source, .. } | Self::TransactionFailure { source, .. } => {
                Some(source.as_ref())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("Serialization failed: {reason}")]
    SerializationFailed { reason: String },

    #[error("Deserialization failed: {reason}")]
    DeserializationFailed { reason: String },

    #[error("Log digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },
}
