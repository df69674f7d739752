//! # Task states and terminal outcomes.
//!
//! ```text
//! Pending ──► Running ──► Completed(T)
//!                    ├──► Failed(TaskError)
//!                    └──► Cancelled(CancelReason)
//! ```
//!
//! Terminal states are sticky. [`Outcome::Cancelled`] keeps the [`CancelReason`], so
//! `DeadlineExceeded` / `CeilingExceeded` (framework) and `Requested` (caller) stay
//! distinguishable by pattern matching.

use crate::error::TaskError;
use crate::sync::CancelReason;

/// Lifecycle state of a supervised task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Created, waiting for admission.
    Pending,
    /// The unit's future is being polled.
    Running,
    /// Produced a value.
    Completed,
    /// Failed with a non-cancellation error.
    Failed,
    /// Stopped because its token was requested.
    Cancelled,
}

impl TaskState {
    /// True for `Completed`, `Failed` and `Cancelled`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }
}

/// Result slot of a finished task: exactly one of value, error, cancellation marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The unit returned a value.
    Completed(T),
    /// The unit failed (its own error, or `Fatal` for a panic).
    Failed(TaskError),
    /// The task's token was requested.
    Cancelled(CancelReason),
}

impl<T> Outcome<T> {
    /// Classifies a unit result: errors carrying a cancel reason become `Cancelled`.
    pub fn from_result(res: Result<T, TaskError>) -> Self {
        match res {
            Ok(v) => Outcome::Completed(v),
            Err(e) => match e.cancel_reason() {
                Some(reason) => Outcome::Cancelled(reason),
                None => Outcome::Failed(e),
            },
        }
    }

    /// Converts back into a `Result`; cancellation maps to the matching [`TaskError`].
    pub fn into_result(self) -> Result<T, TaskError> {
        match self {
            Outcome::Completed(v) => Ok(v),
            Outcome::Failed(e) => Err(e),
            Outcome::Cancelled(reason) => Err(reason.into()),
        }
    }

    /// Terminal state this outcome corresponds to.
    pub fn state(&self) -> TaskState {
        match self {
            Outcome::Completed(_) => TaskState::Completed,
            Outcome::Failed(_) => TaskState::Failed,
            Outcome::Cancelled(_) => TaskState::Cancelled,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled(_))
    }

    /// True when the runtime (deadline or ceiling) cancelled the task.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Outcome::Cancelled(r) if r.is_timeout())
    }

    /// Borrowed value, if completed.
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Completed(v) => Some(v),
            _ => None,
        }
    }

    /// Owned value, if completed.
    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Completed(v) => Some(v),
            _ => None,
        }
    }

    /// Error, if failed.
    pub fn error(&self) -> Option<&TaskError> {
        match self {
            Outcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Cancel reason, if cancelled.
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self {
            Outcome::Cancelled(r) => Some(*r),
            _ => None,
        }
    }

    /// Maps the completed value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Completed(v) => Outcome::Completed(f(v)),
            Outcome::Failed(e) => Outcome::Failed(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
        }
    }

    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Outcome::Completed(_) => "completed",
            Outcome::Failed(e) => e.as_label(),
            Outcome::Cancelled(r) => r.as_label(),
        }
    }
}
