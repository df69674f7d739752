//! # Handle to a supervised task.
//!
//! A [`TaskHandle`] is returned by [`Supervisor::spawn`](crate::Supervisor::spawn). The
//! supervisor's driver owns the task until it is terminal; [`TaskHandle::join`] then hands
//! the [`Outcome`] to the caller. Dropping the handle detaches the task, it keeps running.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::core::context::TaskId;
use crate::core::outcome::{Outcome, TaskState};
use crate::error::{TaskError, panic_message};
use crate::sync::{CancelReason, CancelToken};

/// Progress published by the driver.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Progress {
    pub(crate) state: TaskState,
    pub(crate) deadline: Option<Instant>,
}

/// Caller-side view of a supervised task.
pub struct TaskHandle<T> {
    id: TaskId,
    name: Arc<str>,
    token: CancelToken,
    progress: watch::Receiver<Progress>,
    join: JoinHandle<Outcome<T>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(
        id: TaskId,
        name: Arc<str>,
        token: CancelToken,
        progress: watch::Receiver<Progress>,
        join: JoinHandle<Outcome<T>>,
    ) -> Self {
        Self {
            id,
            name,
            token,
            progress,
            join,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The task's token (linked below the supervisor root and the caller's token).
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Current state.
    pub fn state(&self) -> TaskState {
        self.progress.borrow().state
    }

    /// Absolute deadline, known once the task is running with a deadline.
    pub fn deadline(&self) -> Option<Instant> {
        self.progress.borrow().deadline
    }

    /// True once the task reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Requests cancellation. No-op once the task is terminal.
    ///
    /// Returns `true` if this call requested the token.
    pub fn cancel(&self) -> bool {
        if self.state().is_terminal() {
            return false;
        }
        self.token.request()
    }

    /// Waits for the terminal outcome.
    pub async fn join(self) -> Outcome<T> {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => {
                Outcome::Failed(TaskError::fatal(panic_message(e.into_panic().as_ref())))
            }
            // The runtime is shutting down and dropped the driver.
            Err(_) => Outcome::Cancelled(CancelReason::Requested),
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}
