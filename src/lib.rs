//! Compensator
//!
//! A nested transaction coordinator: frames are opened and closed in LIFO
//! order, each carrying compensating actions that run in reverse on rollback
//! and an audit trail of what happened while the frame was open.

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod digest;
pub mod error;
pub mod frame;
pub mod logging;
pub mod serialization;
pub mod traits;
pub mod types;

// Re-export core types and traits
pub use clock::{ManualClock, SystemClock};
pub use config::{CoordinatorConfig, CoordinatorConfigBuilder, DEFAULT_RETENTION_DAYS};
pub use coordinator::{TransactionCoordinator, TransactionCoordinatorBuilder};
pub use digest::LogHasher;
pub use error::{ActionError, SerializationError, TransactionError};
pub use frame::TransactionFrame;
pub use logging::{EventLogger, LogEntry, LogLevel};
pub use serialization::{JsonSerializer, LogSerializer, LogSnapshot};
pub use traits::{infallible, Clock, CompensatingAction};
pub use types::{AuditEntry, Details, FrameId, FrameStatus, LogDigest, ROLLBACK_ACTION_KIND};
