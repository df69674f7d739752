//! # Run a single unit to a terminal outcome.
//!
//! [`run_once`] drives one [`Unit`] under its task token and optional deadline, and publishes
//! its lifecycle events on the [`Bus`].
//!
//! ## Event flow
//!
//! ```text
//! TaskStarting
//!   │
//!   ├─ unit returns Ok(v)                 → TaskCompleted         → Completed(v)
//!   ├─ unit returns Err(Fail/Fatal)|panic → TaskFailed            → Failed(e)
//!   ├─ unit returns Err(cancel-kind)      → TaskCancelled         → Cancelled(reason)
//!   ├─ token requested                    → (unwind window)       → TaskCancelled → Cancelled(reason)
//!   └─ deadline elapsed → request token   → DeadlineExceeded
//!                                         → (unwind window)       → TaskCancelled → Cancelled(DeadlineExceeded)
//! ```
//!
//! ## Rules
//! - Exactly **one** terminal event per run.
//! - The deadline is a race against the unit sharing the task token: expiry requests the
//!   token with [`CancelReason::DeadlineExceeded`], never a bare drop of the unit.
//! - After a request the unit keeps being polled for up to `grace` so it can release what it
//!   holds; if it returns within the window the token is acknowledged, otherwise its future
//!   is dropped.
//! - When the token was requested, the token's reason wins over whatever the unit returned.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::{self, Instant};

use crate::core::context::{TaskContext, TaskId};
use crate::core::outcome::Outcome;
use crate::error::{TaskError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::sync::CancelReason;
use crate::tasks::Unit;

/// Absolute deadline plus the budget it was derived from.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    pub(crate) at: Instant,
    pub(crate) budget: Duration,
}

impl Deadline {
    /// Deadline `budget` from now; `None` for a zero budget or one past the clock's range.
    pub(crate) fn after(budget: Duration) -> Option<Self> {
        if budget.is_zero() {
            return None;
        }
        let at = Instant::now().checked_add(budget)?;
        Some(Self { at, budget })
    }
}

/// Runs `unit` once under `ctx` and returns its terminal outcome.
pub(crate) async fn run_once<U: Unit + ?Sized>(
    unit: &U,
    ctx: TaskContext,
    deadline: Option<Deadline>,
    grace: Duration,
    bus: &Bus,
) -> Outcome<U::Output> {
    let token = ctx.token().clone();
    let meta = EventMeta::of(&ctx);

    let mut starting = meta.event(EventKind::TaskStarting);
    if let Some(d) = deadline {
        starting = starting.with_timeout(d.budget);
    }
    bus.publish(starting);

    let mut run = std::pin::pin!(AssertUnwindSafe(unit.spawn(ctx)).catch_unwind());
    let expiry = async {
        match deadline {
            Some(d) => time::sleep_until(d.at).await,
            None => std::future::pending().await,
        }
    };

    let finished = tokio::select! {
        biased;
        res = &mut run => Some(res),
        _ = token.cancelled() => None,
        _ = expiry => {
            if let Some(d) = deadline {
                let reason = CancelReason::DeadlineExceeded { deadline: d.budget };
                if token.request_with(reason) {
                    bus.publish(meta.event(EventKind::DeadlineExceeded).with_timeout(d.budget));
                }
            }
            None
        }
    };

    let outcome = match finished {
        Some(Ok(Ok(value))) => Outcome::Completed(value),
        Some(Ok(Err(err))) => match err.cancel_reason() {
            Some(own) => {
                token.acknowledge();
                Outcome::Cancelled(token.reason().unwrap_or(own))
            }
            None => Outcome::Failed(err),
        },
        Some(Err(payload)) => Outcome::Failed(TaskError::fatal(panic_message(payload.as_ref()))),
        None => {
            if time::timeout(grace, &mut run).await.is_ok() {
                token.acknowledge();
            }
            Outcome::Cancelled(token.reason().unwrap_or(CancelReason::Requested))
        }
    };

    bus.publish(match &outcome {
        Outcome::Completed(_) => meta.event(EventKind::TaskCompleted),
        Outcome::Failed(err) => meta.event(EventKind::TaskFailed).with_reason(err.to_string()),
        Outcome::Cancelled(reason) => meta
            .event(EventKind::TaskCancelled)
            .with_reason(reason.as_label()),
    });
    outcome
}

/// Identity fields stamped on every event of one run.
struct EventMeta {
    task: Arc<str>,
    id: TaskId,
    request: Option<Arc<str>>,
}

impl EventMeta {
    fn of(ctx: &TaskContext) -> Self {
        Self {
            task: ctx.name_arc(),
            id: ctx.id(),
            request: ctx.request().request_id_arc(),
        }
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind)
            .with_task(Arc::clone(&self.task))
            .with_task_id(self.id)
            .with_request_opt(self.request.clone())
    }
}
