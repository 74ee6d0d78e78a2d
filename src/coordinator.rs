//! Nested transaction coordinator with compensating-action rollback

use chrono::{DateTime, Duration, Utc};
use crate::clock::SystemClock;
use crate::config::CoordinatorConfig;
use crate::error::{ActionError, SerializationError, TransactionError};
use crate::frame::{OpenFrame, TransactionFrame};
use crate::logging::{EventLogger, LogEntry, LogLevel};
use crate::traits::{Clock, CompensatingAction};
use crate::types::{Details, FrameId, FrameStatus};

/// Coordinator owning the stack of open frames and the historical log
///
/// Work is bracketed either explicitly with [`begin`](Self::begin) and
/// [`commit`](Self::commit) / [`rollback`](Self::rollback), or with the scoped
/// [`with_transaction`](Self::with_transaction) wrapper. Compensations run in
/// reverse registration order and the first failing one halts the rollback.
pub struct TransactionCoordinator {
    config: CoordinatorConfig,
    clock: Box<dyn Clock>,
    stack: Vec<OpenFrame>,
    log: Vec<TransactionFrame>,
    next_id: u64,
    events: EventLogger,
}

impl TransactionCoordinator {
    /// Create a lenient coordinator backed by the system clock
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a coordinator with a specific configuration
    pub fn with_config(config: CoordinatorConfig) -> Self {
        Self::builder().with_config(config).build()
    }

    /// Create a builder for constructing a coordinator
    pub fn builder() -> TransactionCoordinatorBuilder {
        TransactionCoordinatorBuilder::new()
    }

    /// Open a new frame on top of the stack
    pub fn begin(&mut self) -> FrameId {
        let id = FrameId(self.next_id);
        self.next_id += 1;

        let now = self.clock.now();
        let depth = self.stack.len() + 1;
        self.log.push(TransactionFrame::open(id, depth, now));
        self.stack.push(OpenFrame::new(id));

        self.emit(LogLevel::Info, now, "Transaction started", Some((id, depth)), Vec::new());
        id
    }

    /// Register a compensation closure on the top frame
    pub fn add_rollback_action<F>(&mut self, action: F) -> Result<(), TransactionError>
    where
        F: FnOnce() -> Result<(), ActionError> + 'static,
    {
        self.add_compensation(action)
    }

    /// Register any [`CompensatingAction`] on the top frame
    pub fn add_compensation<A>(&mut self, action: A) -> Result<(), TransactionError>
    where
        A: CompensatingAction + 'static,
    {
        let depth = self.stack.len();
        let Some(top) = self.stack.last_mut() else {
            return self.misuse("add_rollback_action");
        };
        top.compensations.push(Box::new(action));
        let id = top.id;
        let registered = top.compensations.len();

        let now = self.clock.now();
        if let Some(frame) = self.record_mut(id) {
            frame.record_rollback_registration(now);
        }
        self.emit(
            LogLevel::Debug,
            now,
            "Rollback action registered",
            Some((id, depth)),
            vec![("registered", registered.to_string())],
        );
        Ok(())
    }

    /// Append an audit entry to the top frame
    pub fn add_action(
        &mut self,
        kind: impl Into<String>,
        details: Details,
    ) -> Result<(), TransactionError> {
        let Some(id) = self.current_frame_id() else {
            return self.misuse("add_action");
        };
        let kind = kind.into();
        let now = self.clock.now();
        if let Some(frame) = self.record_mut(id) {
            frame.record(&kind, Some(details), now);
        }
        self.emit(
            LogLevel::Trace,
            now,
            "Action recorded",
            Some((id, self.stack.len())),
            vec![("kind", kind)],
        );
        Ok(())
    }

    /// Close the top frame, discarding its compensations
    pub fn commit(&mut self) -> Result<(), TransactionError> {
        let depth = self.stack.len();
        let Some(frame) = self.stack.pop() else {
            return self.misuse("commit");
        };

        let now = self.clock.now();
        if let Some(record) = self.record_mut(frame.id) {
            record.close(FrameStatus::Committed, now);
        }
        self.emit(
            LogLevel::Info,
            now,
            "Transaction committed",
            Some((frame.id, depth)),
            vec![("discarded", frame.compensations.len().to_string())],
        );
        Ok(())
    }

    /// Close the top frame and run its compensations last-registered first
    ///
    /// The frame is marked rolled back before any compensation runs. The first
    /// failing compensation stops the sequence; the ones registered before it
    /// are dropped without running.
    pub fn rollback(&mut self) -> Result<(), TransactionError> {
        let depth = self.stack.len();
        let Some(frame) = self.stack.pop() else {
            return self.misuse("rollback");
        };
        let frame_id = frame.id;

        let now = self.clock.now();
        if let Some(record) = self.record_mut(frame_id) {
            record.close(FrameStatus::RolledBack, now);
        }

        let total = frame.compensations.len();
        for (offset, action) in frame.compensations.into_iter().rev().enumerate() {
            let index = total - 1 - offset;
            self.emit(
                LogLevel::Debug,
                self.clock.now(),
                "Running compensation",
                Some((frame_id, depth)),
                vec![("index", index.to_string())],
            );

            if let Err(source) = action.compensate() {
                self.emit(
                    LogLevel::Error,
                    self.clock.now(),
                    "Error during rollback",
                    Some((frame_id, depth)),
                    vec![
                        ("index", index.to_string()),
                        ("skipped", index.to_string()),
                        ("cause", source.to_string()),
                    ],
                );
                return Err(TransactionError::RollbackFailure {
                    frame_id,
                    index,
                    skipped: index,
                    source,
                });
            }
        }

        self.emit(
            LogLevel::Info,
            self.clock.now(),
            "Transaction rolled back",
            Some((frame_id, depth)),
            vec![("compensations", total.to_string())],
        );
        Ok(())
    }

    /// Run `work` inside its own frame
    ///
    /// Commits when `work` returns `Ok`. On `Err` the frame is rolled back and
    /// the failure is returned as [`TransactionError::TransactionFailure`]; a
    /// failing compensation takes precedence and surfaces as
    /// [`TransactionError::RollbackFailure`] instead.
    ///
    /// If `work` leaves its own frame off the top of the stack (an inner frame
    /// still open, or the scoped frame already closed) a warning is logged; in
    /// strict mode the call fails with a protocol violation and nothing is closed.
    pub fn with_transaction<T, E, F>(&mut self, work: F) -> Result<T, TransactionError>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: Into<ActionError>,
    {
        let frame_id = self.begin();

        match work(self) {
            Ok(value) => {
                self.check_scope(frame_id)?;
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                let source: ActionError = err.into();
                self.emit(
                    LogLevel::Warn,
                    self.clock.now(),
                    "Unit of work failed",
                    Some((frame_id, self.stack.len())),
                    vec![("cause", source.to_string())],
                );
                self.check_scope(frame_id)?;
                self.rollback()?;
                Err(TransactionError::TransactionFailure { frame_id, source })
            }
        }
    }

    /// Full historical log, oldest frame first
    pub fn transaction_log(&self) -> &[TransactionFrame] {
        &self.log
    }

    /// Look up a frame in the historical log
    pub fn frame(&self, id: FrameId) -> Option<&TransactionFrame> {
        self.log
            .binary_search_by_key(&id, |f| f.id)
            .ok()
            .map(|i| &self.log[i])
    }

    /// Remove frames that started more than `older_than_days` days ago
    ///
    /// Only the historical log is pruned; the live stack is never touched.
    /// Returns the number of frames removed.
    pub fn clear_logs(&mut self, older_than_days: u32) -> usize {
        let now = self.clock.now();
        let Some(cutoff) = Duration::try_days(i64::from(older_than_days))
            .and_then(|age| now.checked_sub_signed(age))
        else {
            // Cutoff predates the representable range, nothing can be older
            self.emit(
                LogLevel::Debug,
                now,
                "Retention cutoff out of range",
                None,
                vec![("older_than_days", older_than_days.to_string())],
            );
            return 0;
        };
        let prune_open = self.config.prune_open_frames;

        let before = self.log.len();
        self.log
            .retain(|f| f.start_time > cutoff || (!prune_open && f.is_open()));
        let removed = before - self.log.len();
        self.events.retain_after(cutoff);

        let open_dropped = self
            .stack
            .iter()
            .filter(|open| self.frame(open.id).is_none())
            .count();
        if open_dropped > 0 {
            self.emit(
                LogLevel::Warn,
                now,
                "Open frames pruned from log",
                None,
                vec![("open", open_dropped.to_string())],
            );
        }
        self.emit(
            LogLevel::Info,
            now,
            "Transaction logs cleared",
            None,
            vec![
                ("older_than_days", older_than_days.to_string()),
                ("removed", removed.to_string()),
            ],
        );
        removed
    }

    /// Prune the log using the configured retention
    pub fn prune_expired(&mut self) -> usize {
        self.clear_logs(self.config.retention_days)
    }

    /// Number of open frames
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether any frame is open
    pub fn is_active(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Id of the frame currently on top of the stack
    pub fn current_frame_id(&self) -> Option<FrameId> {
        self.stack.last().map(|f| f.id)
    }

    /// Compensations pending on the top frame
    pub fn pending_compensations(&self) -> usize {
        self.stack.last().map_or(0, |f| f.compensations.len())
    }

    /// Configuration the coordinator was built with
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Lifecycle events recorded so far
    pub fn events(&self) -> &EventLogger {
        &self.events
    }

    /// Drop every recorded lifecycle event
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Replace the historical log with previously exported frames
    ///
    /// Refused while any frame is open. Frames must be ordered by strictly
    /// increasing id; new frames are numbered after the highest imported id.
    pub(crate) fn restore_log(&mut self, frames: Vec<TransactionFrame>) -> Result<usize, TransactionError> {
        if !self.stack.is_empty() {
            return Err(TransactionError::ImportWhileActive {
                depth: self.stack.len(),
            });
        }
        if frames.windows(2).any(|pair| pair[0].id >= pair[1].id) {
            return Err(SerializationError::DeserializationFailed {
                reason: "Frames are not ordered by increasing id".to_string(),
            }
            .into());
        }

        if let Some(last) = frames.last() {
            self.next_id = self.next_id.max(last.id.0 + 1);
        }
        let imported = frames.len();
        self.log = frames;

        self.emit(
            LogLevel::Info,
            self.clock.now(),
            "Transaction log imported",
            None,
            vec![("frames", imported.to_string())],
        );
        Ok(imported)
    }

    fn check_scope(&mut self, frame_id: FrameId) -> Result<(), TransactionError> {
        let top = self.current_frame_id();
        if top == Some(frame_id) {
            return Ok(());
        }
        let level = if self.config.strict_mode { LogLevel::Error } else { LogLevel::Warn };
        self.emit(
            level,
            self.clock.now(),
            "Scoped frame is not on top of the stack",
            Some((frame_id, self.stack.len())),
            vec![(
                "top",
                top.map(|id| id.to_string()).unwrap_or_else(|| "none".to_string()),
            )],
        );
        if self.config.strict_mode {
            return Err(TransactionError::ProtocolViolation {
                operation: "with_transaction".to_string(),
            });
        }
        Ok(())
    }

    fn record_mut(&mut self, id: FrameId) -> Option<&mut TransactionFrame> {
        match self.log.binary_search_by_key(&id, |f| f.id) {
            Ok(i) => Some(&mut self.log[i]),
            Err(_) => None,
        }
    }

    fn misuse(&mut self, operation: &str) -> Result<(), TransactionError> {
        if self.config.strict_mode {
            self.emit(
                LogLevel::Error,
                self.clock.now(),
                "Protocol violation",
                None,
                vec![("operation", operation.to_string())],
            );
            return Err(TransactionError::ProtocolViolation {
                operation: operation.to_string(),
            });
        }
        self.emit(
            LogLevel::Debug,
            self.clock.now(),
            "Ignored call with no open transaction",
            None,
            vec![("operation", operation.to_string())],
        );
        Ok(())
    }

    fn emit(
        &mut self,
        level: LogLevel,
        timestamp: DateTime<Utc>,
        message: &str,
        frame: Option<(FrameId, usize)>,
        metadata: Vec<(&str, String)>,
    ) {
        let mut entry = LogEntry::new(level, timestamp, message);
        if let Some((id, depth)) = frame {
            entry = entry.with_frame(id, depth);
        }
        for (key, value) in metadata {
            entry = entry.with_metadata(key, value);
        }
        self.events.log(entry);
    }
}

impl Default for TransactionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransactionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionCoordinator")
            .field("config", &self.config)
            .field("stack", &self.stack)
            .field("log", &self.log.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

/// Builder for constructing coordinators
pub struct TransactionCoordinatorBuilder {
    config: Option<CoordinatorConfig>,
    clock: Option<Box<dyn Clock>>,
}

impl TransactionCoordinatorBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: None,
            clock: None,
        }
    }

    /// Set the configuration
    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the clock used for every timestamp
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Build the coordinator
    pub fn build(self) -> TransactionCoordinator {
        let config = self.config.unwrap_or_default();
        let events = EventLogger::new(config.log_level);

        TransactionCoordinator {
            config,
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock)),
            stack: Vec::new(),
            log: Vec::new(),
            next_id: 1,
            events,
        }
    }
}

impl Default for TransactionCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
