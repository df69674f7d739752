//! # Runtime events emitted by the supervisor, runner and orchestrator.
//!
//! The [`EventKind`] enum classifies events into:
//! - **Task lifecycle**: starting, completed, failed, cancelled, deadline exceeded
//! - **Policies**: fallback engaged, watchdog ceiling exceeded, gather finished
//! - **Orchestration**: request started / finished
//! - **Runtime**: shutdown, subscriber overflow / panic
//!
//! The [`Event`] struct carries the metadata (task name and id, request id, timeout, reason).
//!
//! ## Ordering
//! `seq` comes from one process-wide counter, so sorting by it recovers publication order
//! even after events went through different subscriber queues.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskward::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::DeadlineExceeded)
//!     .with_task("fetch-profile")
//!     .with_request("req-1")
//!     .with_timeout(Duration::from_millis(250));
//!
//! assert_eq!(ev.kind, EventKind::DeadlineExceeded);
//! assert_eq!(ev.task.as_deref(), Some("fetch-profile"));
//! assert_eq!(ev.timeout_ms, Some(250));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::TaskId;

/// Next `Event::seq`.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `task` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `task` (subscriber name), `reason` ("full" / "closed").
    SubscriberOverflow,

    // === Runtime events ===
    /// `Supervisor::shutdown` was called; every task token is being requested.
    ShutdownRequested,

    // === Task lifecycle events ===
    /// Task was admitted and its unit starts running.
    ///
    /// Sets: `task`, `task_id`, `request`, `timeout_ms` (deadline, if any).
    TaskStarting,

    /// Unit returned a value.
    ///
    /// Sets: `task`, `task_id`, `request`.
    TaskCompleted,

    /// Unit failed with its own error or panicked.
    ///
    /// Sets: `task`, `task_id`, `request`, `reason` (error message).
    TaskFailed,

    /// Task ended because its token was requested.
    ///
    /// Sets: `task`, `task_id`, `request`, `reason` (cancel reason label).
    TaskCancelled,

    /// The task's deadline elapsed; its token was requested by the runtime.
    ///
    /// Sets: `task`, `task_id`, `request`, `timeout_ms`.
    /// Always followed by `TaskCancelled` for the same task.
    DeadlineExceeded,

    // === Policy events ===
    /// Primary failed or timed out; the fallback unit starts.
    ///
    /// Sets: `task` (fallback composite name), `request`, `reason` (primary outcome label).
    FallbackEngaged,

    /// A watchdog ceiling elapsed before its scope finished.
    ///
    /// Sets: `request`, `timeout_ms` (ceiling).
    CeilingExceeded,

    /// A gather finished collecting all outcomes.
    ///
    /// Sets: `request`, `reason` ("completed=X failed=Y cancelled=Z").
    GatherFinished,

    // === Orchestration events ===
    /// An orchestrated request starts.
    ///
    /// Sets: `request`, `timeout_ms` (ceiling).
    OrchestrationStarted,

    /// An orchestrated request finished.
    ///
    /// Sets: `request`, `reason` ("succeeded=X/N verdict=...").
    OrchestrationFinished,
}

/// One published transition. Which optional fields are filled depends on [`EventKind`].
#[derive(Clone, Debug)]
pub struct Event {
    /// Publication order across the whole process.
    pub seq: u64,
    /// Wall-clock time of creation, for logs only.
    pub at: SystemTime,
    pub kind: EventKind,

    /// Name of the task (or subscriber), if applicable.
    pub task: Option<Arc<str>>,
    /// Id of the task, if applicable.
    pub task_id: Option<TaskId>,
    /// Request id of the operation the event belongs to.
    pub request: Option<Arc<str>>,
    /// Deadline or ceiling in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, summaries).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Stamps a new event with the next `seq` and the current time.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            task_id: None,
            request: None,
            timeout_ms: None,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task_id(mut self, id: TaskId) -> Self {
        self.task_id = Some(id);
        self
    }

    /// Attaches a request id.
    #[inline]
    pub fn with_request(mut self, request: impl Into<Arc<str>>) -> Self {
        self.request = Some(request.into());
        self
    }

    /// Attaches an optional request id (no-op for `None`).
    #[inline]
    pub fn with_request_opt(mut self, request: Option<Arc<str>>) -> Self {
        if request.is_some() {
            self.request = request;
        }
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}
