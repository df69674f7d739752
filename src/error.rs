//! Error types used by the taskward runtime, its primitives and units.
//!
//! - [`TaskError`] — errors raised by unit executions (and by the runtime on their behalf).
//! - [`SyncError`] — errors raised by the synchronization primitives in [`crate::sync`].
//! - [`OrchestratorError`] — setup errors raised by the [`Orchestrator`](crate::Orchestrator).
//!
//! Every enum provides `as_label` (stable snake_case string) for logs and metrics.
//!
//! Cancellation is structural: [`TaskError::Canceled`], [`TaskError::Timeout`] and
//! [`TaskError::CeilingExceeded`] all map to a [`CancelReason`], so a caller can tell a
//! framework-initiated timeout from an explicit caller request without string matching.

use std::any::Any;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::sync::CancelReason;

/// # Errors produced by unit execution.
///
/// `Fail` carries the unit's own failure as-is. The remaining variants are produced by the
/// runtime: deadlines, watchdog ceilings, caller cancellation and panics.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The unit's deadline elapsed before it produced a result.
    #[error("deadline of {timeout:?} exceeded")]
    Timeout {
        /// The deadline budget that was exceeded.
        timeout: Duration,
    },

    /// A watchdog ceiling elapsed and cancelled the whole scope.
    #[error("watchdog ceiling of {ceiling:?} exceeded")]
    CeilingExceeded {
        /// The ceiling configured on the watchdog.
        ceiling: Duration,
    },

    /// Non-recoverable error (panicked unit, broken runtime invariant).
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The unit's own logic failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The owner of the task requested cancellation.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`] from anything printable.
    ///
    /// ```
    /// use taskward::TaskError;
    ///
    /// let err = TaskError::fail("connection refused");
    /// assert_eq!(err.to_string(), "execution failed: connection refused");
    /// ```
    pub fn fail(error: impl fmt::Display) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }

    /// Shorthand for [`TaskError::Fatal`] from anything printable.
    pub fn fatal(error: impl fmt::Display) -> Self {
        TaskError::Fatal {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// ```
    /// use taskward::TaskError;
    /// use std::time::Duration;
    ///
    /// let err = TaskError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "task_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::CeilingExceeded { .. } => "task_ceiling_exceeded",
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns the cancellation reason this error stands for, if it is a cancellation.
    ///
    /// `Fail` and `Fatal` are real failures and return `None`.
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self {
            TaskError::Canceled => Some(CancelReason::Requested),
            TaskError::Timeout { timeout } => Some(CancelReason::DeadlineExceeded {
                deadline: *timeout,
            }),
            TaskError::CeilingExceeded { ceiling } => Some(CancelReason::CeilingExceeded {
                ceiling: *ceiling,
            }),
            TaskError::Fatal { .. } | TaskError::Fail { .. } => None,
        }
    }

    /// True for deadline and ceiling expiry (framework-initiated cancellation).
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            TaskError::Timeout { .. } | TaskError::CeilingExceeded { .. }
        )
    }
}

impl From<CancelReason> for TaskError {
    fn from(reason: CancelReason) -> Self {
        match reason {
            CancelReason::Requested => TaskError::Canceled,
            CancelReason::DeadlineExceeded { deadline } => TaskError::Timeout { timeout: deadline },
            CancelReason::CeilingExceeded { ceiling } => TaskError::CeilingExceeded { ceiling },
        }
    }
}

impl From<SyncError> for TaskError {
    /// Lets units use `?` on primitive operations.
    ///
    /// A cancelled wait keeps its reason; protocol violations are programmer errors and
    /// become [`TaskError::Fatal`].
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Cancelled { reason } => reason.into(),
            SyncError::ProtocolViolation { .. } | SyncError::Closed => TaskError::fatal(err),
        }
    }
}

/// # Errors produced by synchronization primitives.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// The caller's token was requested before or while waiting.
    ///
    /// An already-requested token never obtains a permit, a lock or an item.
    #[error("wait cancelled ({reason})")]
    Cancelled {
        /// Why the token was requested.
        reason: CancelReason,
    },

    /// The primitive was used in a way its protocol forbids (fatal, never retried).
    #[error("protocol violation: {what}")]
    ProtocolViolation {
        /// What was violated.
        what: &'static str,
    },

    /// The primitive was closed.
    #[error("primitive closed")]
    Closed,
}

impl SyncError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SyncError::Cancelled { .. } => "sync_cancelled",
            SyncError::ProtocolViolation { .. } => "sync_protocol_violation",
            SyncError::Closed => "sync_closed",
        }
    }
}

/// # Errors produced while setting up an orchestration.
///
/// Individual operation failures are never errors at this level; they are reported in the
/// [`Report`](crate::Report).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// The orchestrator or one of its operations is misconfigured.
    #[error("invalid orchestration config: {reason}")]
    InvalidConfig {
        /// What is wrong.
        reason: String,
    },
}

impl OrchestratorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// ```
    /// use taskward::OrchestratorError;
    ///
    /// let err = OrchestratorError::InvalidConfig { reason: "ceiling is zero".into() };
    /// assert_eq!(err.as_label(), "orchestrator_invalid_config");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            OrchestratorError::InvalidConfig { .. } => "orchestrator_invalid_config",
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        OrchestratorError::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
