//! # Primary/fallback degradation.
//!
//! [`Fallback`] is itself a [`Unit`]: it runs the primary under its own deadline and, if the
//! primary does not complete, runs the fallback under a second deadline.
//!
//! ```text
//! primary (deadline P) ──► Completed(v) ─────────────────────────► Ok(v)
//!        │
//!        └─ Failed / Cancelled(deadline) / Cancelled(self-reported)
//!               │
//!               ├─ outer token requested? ──► yes ──► Err(reason)    (no fallback)
//!               └─ no ──► FallbackEngaged ──► fallback (deadline F) ──► its outcome
//! ```
//!
//! Only one hop is taken. Because a `Fallback` is a unit, a fallback chain is built by
//! nesting: `fallback(a, fallback(b, c))`.

use std::sync::Arc;
use std::time::Duration;

use crate::core::context::TaskContext;
use crate::core::outcome::Outcome;
use crate::core::runner::{Deadline, run_once};
use crate::core::supervisor::{SpawnOptions, Supervisor};
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{BoxUnitFuture, Unit, UnitRef};

/// Primary unit with a fallback.
pub struct Fallback<T> {
    name: Arc<str>,
    primary: UnitRef<T>,
    fallback: UnitRef<T>,
    primary_deadline: Duration,
    fallback_deadline: Duration,
    grace: Duration,
    bus: Bus,
}

impl<T> Fallback<T> {
    /// Deadline of the primary run (`0` = none).
    pub fn primary_deadline(&self) -> Duration {
        self.primary_deadline
    }

    /// Deadline of the fallback run (`0` = none).
    pub fn fallback_deadline(&self) -> Duration {
        self.fallback_deadline
    }
}

impl<T: Send + 'static> Unit for Fallback<T> {
    type Output = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, ctx: TaskContext) -> BoxUnitFuture<T> {
        let primary = Arc::clone(&self.primary);
        let fallback = Arc::clone(&self.fallback);
        let (primary_deadline, fallback_deadline) = (self.primary_deadline, self.fallback_deadline);
        let grace = self.grace;
        let bus = self.bus.clone();

        Box::pin(async move {
            let first = run_once(
                &*primary,
                ctx.child(primary.name()),
                Deadline::after(primary_deadline),
                grace,
                &bus,
            )
            .await;

            let primary_label = match first {
                Outcome::Completed(value) => return Ok(value),
                ref other => other.as_label(),
            };
            if let Some(reason) = ctx.token().reason() {
                return Err(reason.into());
            }

            bus.publish(
                Event::new(EventKind::FallbackEngaged)
                    .with_task(ctx.name_arc())
                    .with_task_id(ctx.id())
                    .with_request_opt(ctx.request().request_id_arc())
                    .with_reason(primary_label),
            );
            run_once(
                &*fallback,
                ctx.child(fallback.name()),
                Deadline::after(fallback_deadline),
                grace,
                &bus,
            )
            .await
            .into_result()
        })
    }
}

impl Supervisor {
    /// Builds a [`Fallback`] unit named `name`, for spawning, gathering or nesting.
    pub fn fallback<T: Send + 'static>(
        &self,
        name: impl Into<Arc<str>>,
        primary: UnitRef<T>,
        fallback: UnitRef<T>,
        primary_deadline: Duration,
        fallback_deadline: Duration,
    ) -> Arc<Fallback<T>> {
        Arc::new(Fallback {
            name: name.into(),
            primary,
            fallback,
            primary_deadline,
            fallback_deadline,
            grace: self.cfg.grace,
            bus: self.bus.clone(),
        })
    }

    /// Runs `primary` and, unless it completes or the caller cancels, `fallback`.
    ///
    /// The composite task is named after the primary. `opts` applies to the whole
    /// composite (its token, request context and an optional overall deadline).
    pub async fn with_fallback<T: Send + 'static>(
        &self,
        primary: UnitRef<T>,
        fallback: UnitRef<T>,
        primary_deadline: Duration,
        fallback_deadline: Duration,
        opts: SpawnOptions,
    ) -> Outcome<T> {
        let name = primary.name().to_string();
        let unit = self.fallback(name, primary, fallback, primary_deadline, fallback_deadline);
        self.supervise(unit, opts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time;

    use crate::core::Config;
    use crate::error::TaskError;
    use crate::sync::{CancelReason, CancelToken};
    use crate::tasks::UnitFn;

    fn value(name: &'static str, ms: u64, v: &'static str) -> UnitRef<&'static str> {
        UnitFn::arc(name, move |ctx: TaskContext| async move {
            ctx.sleep(Duration::from_millis(ms)).await?;
            Ok(v)
        })
    }

    fn counting(runs: Arc<AtomicUsize>) -> UnitRef<&'static str> {
        UnitFn::arc("fallback", move |_ctx: TaskContext| {
            runs.fetch_add(1, Ordering::SeqCst);
            async { Ok("fallback") }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_runs_when_primary_fails() {
        let sup = Supervisor::new(Config::default());
        let primary: UnitRef<&'static str> = UnitFn::arc("primary", |_ctx: TaskContext| async {
            Err(TaskError::fail("upstream 500"))
        });

        let out = sup
            .with_fallback(
                primary,
                value("fallback", 10, "cached"),
                Duration::from_millis(100),
                Duration::from_millis(100),
                SpawnOptions::new(),
            )
            .await;
        assert_eq!(out, Outcome::Completed("cached"));
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_runs_when_primary_times_out() {
        let sup = Supervisor::new(Config::default());
        let mut rx = sup.subscribe();

        let out = sup
            .with_fallback(
                value("primary", 1_000, "fresh"),
                value("fallback", 10, "stale"),
                Duration::from_millis(50),
                Duration::from_millis(100),
                SpawnOptions::new(),
            )
            .await;
        assert_eq!(out, Outcome::Completed("stale"));

        let mut engaged = None;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::FallbackEngaged {
                engaged = ev.reason;
            }
        }
        assert_eq!(engaged.as_deref(), Some("deadline_exceeded"));
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_runs_when_primary_reports_cancellation_itself() {
        let sup = Supervisor::new(Config::default());
        let primary: UnitRef<&'static str> =
            UnitFn::arc("primary", |_ctx: TaskContext| async { Err(TaskError::Canceled) });
        let out = sup
            .with_fallback(
                primary,
                value("fallback", 1, "ok"),
                Duration::ZERO,
                Duration::ZERO,
                SpawnOptions::new(),
            )
            .await;
        assert_eq!(out, Outcome::Completed("ok"));
    }

    #[tokio::test(start_paused = true)]
    async fn caller_cancel_skips_the_fallback() {
        let sup = Supervisor::new(Config::default());
        let runs = Arc::new(AtomicUsize::new(0));
        let caller = CancelToken::new();

        let canceller = caller.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(10)).await;
            canceller.request();
        });

        let out = sup
            .with_fallback(
                value("primary", 1_000, "fresh"),
                counting(Arc::clone(&runs)),
                Duration::from_millis(500),
                Duration::from_millis(500),
                SpawnOptions::new().with_token(caller.clone()),
            )
            .await;
        assert_eq!(out, Outcome::Cancelled(CancelReason::Requested));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_deadlines_keep_the_primary() {
        let sup = Supervisor::new(Config::default());
        let runs = Arc::new(AtomicUsize::new(0));
        let out = sup
            .with_fallback(
                value("primary", 5_000, "fresh"),
                counting(Arc::clone(&runs)),
                Duration::MAX,
                Duration::MAX,
                SpawnOptions::new(),
            )
            .await;
        assert_eq!(out, Outcome::Completed("fresh"));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fallbacks_nest_into_chains() {
        let sup = Supervisor::new(Config::default());
        let failing = |name: &'static str| -> UnitRef<&'static str> {
            UnitFn::arc(name, |_ctx: TaskContext| async { Err(TaskError::fail("down")) })
        };

        let inner = sup.fallback(
            "secondary",
            failing("secondary"),
            value("tertiary", 1, "last resort"),
            Duration::ZERO,
            Duration::ZERO,
        );
        let out = sup
            .with_fallback(
                failing("primary"),
                inner,
                Duration::ZERO,
                Duration::ZERO,
                SpawnOptions::new(),
            )
            .await;
        assert_eq!(out, Outcome::Completed("last resort"));
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_failure_is_reported() {
        let sup = Supervisor::new(Config::default());
        let out = sup
            .with_fallback(
                value("primary", 1_000, "x"),
                value("fallback", 1_000, "y"),
                Duration::from_millis(10),
                Duration::from_millis(20),
                SpawnOptions::new(),
            )
            .await;
        assert_eq!(
            out,
            Outcome::Cancelled(CancelReason::DeadlineExceeded {
                deadline: Duration::from_millis(20)
            })
        );
    }
}
