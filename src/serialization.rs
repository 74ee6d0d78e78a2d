//! Export and import of the historical transaction log

use serde::{Deserialize, Serialize};
use crate::coordinator::TransactionCoordinator;
use crate::digest::LogHasher;
use crate::error::{SerializationError, TransactionError};
use crate::frame::TransactionFrame;

/// Point-in-time copy of a coordinator's log with its digest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSnapshot {
    pub frames: Vec<TransactionFrame>,
    /// Hex-encoded blake3 digest of `frames`
    pub digest: String,
}

impl LogSnapshot {
    /// Capture the log of a coordinator
    pub fn capture(coordinator: &TransactionCoordinator) -> Result<Self, SerializationError> {
        Self::from_frames(coordinator.transaction_log().to_vec())
    }

    pub fn from_frames(frames: Vec<TransactionFrame>) -> Result<Self, SerializationError> {
        let digest = LogHasher::new().hash_log(&frames)?.to_string();
        Ok(Self { frames, digest })
    }

    /// Check the stored digest against the frames
    pub fn verify(&self) -> Result<(), SerializationError> {
        let actual = LogHasher::new().hash_log(&self.frames)?.to_string();
        if actual != self.digest {
            return Err(SerializationError::DigestMismatch {
                expected: self.digest.clone(),
                actual,
            });
        }
        Ok(())
    }
}

/// Trait for pluggable snapshot encodings
pub trait LogSerializer {
    /// Encode a snapshot to bytes
    fn serialize(&self, snapshot: &LogSnapshot) -> Result<Vec<u8>, SerializationError>;

    /// Decode a snapshot and verify its digest
    fn deserialize(&self, bytes: &[u8]) -> Result<LogSnapshot, SerializationError>;

    /// Get the name of this encoding
    fn name(&self) -> &str;
}

/// JSON snapshot encoding
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Create a JSON serializer with pretty printing
    pub fn new_pretty() -> Self {
        Self { pretty: true }
    }
}

impl LogSerializer for JsonSerializer {
    fn serialize(&self, snapshot: &LogSnapshot) -> Result<Vec<u8>, SerializationError> {
        let result = if self.pretty {
            serde_json::to_vec_pretty(snapshot)
        } else {
            serde_json::to_vec(snapshot)
        };

        result.map_err(|e| SerializationError::SerializationFailed {
            reason: format!("JSON serialization failed: {}", e),
        })
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<LogSnapshot, SerializationError> {
        let snapshot: LogSnapshot = serde_json::from_slice(bytes).map_err(|e| {
            SerializationError::DeserializationFailed {
                reason: format!("JSON deserialization failed: {}", e),
            }
        })?;
        snapshot.verify()?;
        Ok(snapshot)
    }

    fn name(&self) -> &str {
        "json"
    }
}

impl TransactionCoordinator {
    /// Encode the current log with the given serializer
    pub fn export_log<S: LogSerializer>(&self, serializer: &S) -> Result<Vec<u8>, TransactionError> {
        Ok(serializer.serialize(&LogSnapshot::capture(self)?)?)
    }

    /// Replace the log with a verified snapshot, returning the number of frames imported
    pub fn import_log<S: LogSerializer>(&mut self, serializer: &S, bytes: &[u8]) -> Result<usize, TransactionError> {
        let snapshot = serializer.deserialize(bytes)?;
        self.restore_log(snapshot.frames)
    }
}
