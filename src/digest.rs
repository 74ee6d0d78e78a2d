//! Blake3 fingerprints of the transaction log

use blake3::Hasher as Blake3Hasher;
use crate::error::SerializationError;
use crate::frame::TransactionFrame;
use crate::types::LogDigest;

/// LogHasher fingerprints frames and whole logs
///
/// Frames are hashed over their JSON encoding, so a digest computed before
/// export can be checked again after the log is read back.
#[derive(Debug, Clone, Default)]
pub struct LogHasher {}

impl LogHasher {
    pub fn new() -> Self {
        Self {}
    }

    /// Compute the digest of a single frame
    pub fn hash_frame(&self, frame: &TransactionFrame) -> Result<LogDigest, SerializationError> {
        let serialized = serde_json::to_vec(frame).map_err(|e| SerializationError::SerializationFailed {
            reason: format!("Frame {} could not be encoded: {}", frame.id, e),
        })?;

        let mut hasher = Blake3Hasher::new();
        hasher.update(&serialized);
        Ok(LogDigest(*hasher.finalize().as_bytes()))
    }

    /// Compute the digest of a log, frame order included
    pub fn hash_log(&self, frames: &[TransactionFrame]) -> Result<LogDigest, SerializationError> {
        let digests = frames
            .iter()
            .map(|f| self.hash_frame(f))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.hash_chain(&digests))
    }

    /// Chain a sequence of digests into one
    pub fn hash_chain(&self, digests: &[LogDigest]) -> LogDigest {
        let mut hasher = Blake3Hasher::new();
        for digest in digests {
            hasher.update(&digest.0);
        }
        LogDigest(*hasher.finalize().as_bytes())
    }
}
