//! # LogWriter — simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests and demos.
//!
//! ## Example output
//! ```text
//! [starting] task="fetch-profile" id=task-3 req="req-1" deadline=250ms
//! [deadline] task="fetch-profile" id=task-3 req="req-1" deadline=250ms
//! [cancelled] task="fetch-profile" id=task-3 req="req-1" reason="deadline_exceeded"
//! [fallback] task="fetch-profile" req="req-1" primary="deadline_exceeded"
//! [completed] task="fetch-profile:fallback" id=task-4 req="req-1"
//! [ceiling] req="req-1" ceiling=5000ms
//! [orchestration-finished] req="req-1" summary="succeeded=2/3 verdict=finished"
//! ```

use std::fmt::Write as _;

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn tag(kind: EventKind) -> &'static str {
        match kind {
            EventKind::SubscriberPanicked => "subscriber-panicked",
            EventKind::SubscriberOverflow => "subscriber-overflow",
            EventKind::ShutdownRequested => "shutdown-requested",
            EventKind::TaskStarting => "starting",
            EventKind::TaskCompleted => "completed",
            EventKind::TaskFailed => "failed",
            EventKind::TaskCancelled => "cancelled",
            EventKind::DeadlineExceeded => "deadline",
            EventKind::FallbackEngaged => "fallback",
            EventKind::CeilingExceeded => "ceiling",
            EventKind::GatherFinished => "gather-finished",
            EventKind::OrchestrationStarted => "orchestration-started",
            EventKind::OrchestrationFinished => "orchestration-finished",
        }
    }

    fn reason_key(kind: EventKind) -> &'static str {
        match kind {
            EventKind::TaskFailed => "err",
            EventKind::FallbackEngaged => "primary",
            EventKind::SubscriberPanicked => "info",
            EventKind::GatherFinished | EventKind::OrchestrationFinished => "summary",
            _ => "reason",
        }
    }

    fn timeout_key(kind: EventKind) -> &'static str {
        match kind {
            EventKind::CeilingExceeded | EventKind::OrchestrationStarted => "ceiling",
            _ => "deadline",
        }
    }

    /// Renders one event as a single line.
    pub fn render(e: &Event) -> String {
        let mut line = format!("[{}]", Self::tag(e.kind));
        if let Some(task) = &e.task {
            let _ = write!(line, " task={task:?}");
        }
        if let Some(id) = e.task_id {
            let _ = write!(line, " id={id}");
        }
        if let Some(req) = &e.request {
            let _ = write!(line, " req={req:?}");
        }
        if let Some(ms) = e.timeout_ms {
            let _ = write!(line, " {}={ms}ms", Self::timeout_key(e.kind));
        }
        if let Some(reason) = &e.reason {
            let _ = write!(line, " {}={reason:?}", Self::reason_key(e.kind));
        }
        line
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        println!("{}", Self::render(e));
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
