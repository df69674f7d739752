//! # Supervisor: spawns units, enforces deadlines and admission, fans out events.
//!
//! The [`Supervisor`] owns the event bus, the [`SubscriberSet`], the optional global
//! [`Gate`] and the root [`CancelToken`] every task token is linked to.
//!
//! ## Architecture
//! ```text
//! spawn(unit, opts)
//!   │
//!   ├─► token = new, linked under root and under opts.token
//!   └─► driver task:
//!          Pending ──► acquire global gate (cancellable, FIFO)       [max_concurrent > 0]
//!          Running ──► runner::run_once(unit, ctx, deadline, grace)
//!          terminal ─► Outcome ──► TaskHandle::join()
//!
//! Event flow:
//!   runner / policies ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//!
//! Shutdown:
//!   shutdown() ─► publish ShutdownRequested ─► root.request() ─► every task token requested
//!              └► gate.close() ─► pending tasks end Cancelled
//! ```
//!
//! Policies built on top live next to it: [`fallback`](super::fallback),
//! [`gather`](super::gather) and [`watchdog`](super::watchdog).
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskward::{Config, Outcome, SpawnOptions, Supervisor, TaskContext, UnitFn, UnitRef};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let sup = Supervisor::new(Config::default());
//!
//!     let unit: UnitRef<u32> = UnitFn::arc("lookup", |ctx: TaskContext| async move {
//!         ctx.sleep(Duration::from_millis(5)).await?;
//!         Ok(7)
//!     });
//!
//!     let opts = SpawnOptions::new().with_deadline(Duration::from_secs(1));
//!     assert_eq!(sup.supervise(unit, opts).await, Outcome::Completed(7));
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};

use crate::core::config::Config;
use crate::core::context::{RequestContext, TaskContext, TaskId};
use crate::core::handle::{Progress, TaskHandle};
use crate::core::outcome::{Outcome, TaskState};
use crate::core::runner::{Deadline, run_once};
use crate::core::SupervisorBuilder;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::SubscriberSet;
use crate::sync::{CancelReason, CancelToken, Gate};
use crate::tasks::Unit;

/// Per-call overrides for [`Supervisor::spawn`] and the policies built on it.
///
/// ## Example
/// ```
/// use std::time::Duration;
/// use taskward::{CancelToken, RequestContext, SpawnOptions};
///
/// let opts = SpawnOptions::new()
///     .with_deadline(Duration::from_millis(500))
///     .with_token(CancelToken::new())
///     .with_request(RequestContext::new("req-42"));
/// assert_eq!(opts.deadline(), Some(Duration::from_millis(500)));
/// ```
#[derive(Clone, Debug, Default)]
pub struct SpawnOptions {
    deadline: Option<Duration>,
    token: Option<CancelToken>,
    request: Option<Arc<RequestContext>>,
}

impl SpawnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deadline measured from the moment the task starts running.
    ///
    /// Overrides [`Config::timeout`]; `Duration::ZERO` disables the default deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Parent token: requesting it requests the task.
    pub fn with_token(mut self, token: CancelToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Request context handed to the unit.
    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = Some(Arc::new(request));
        self
    }

    pub(crate) fn with_shared_request(mut self, request: Arc<RequestContext>) -> Self {
        self.request = Some(request);
        self
    }

    /// Explicit deadline, if set.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Parent token, if set.
    pub fn token(&self) -> Option<&CancelToken> {
        self.token.as_ref()
    }

    pub(crate) fn request_id(&self) -> Option<Arc<str>> {
        self.request.as_ref().and_then(|r| r.request_id_arc())
    }
}

/// Task supervisor.
pub struct Supervisor {
    pub(crate) cfg: Config,
    pub(crate) bus: Bus,
    gate: Option<Gate>,
    root: CancelToken,
    // Keeps subscriber workers alive for the supervisor's lifetime.
    _subs: Arc<SubscriberSet>,
}

impl Supervisor {
    /// Supervisor without subscribers. Must be called inside a tokio runtime.
    pub fn new(cfg: Config) -> Arc<Self> {
        SupervisorBuilder::new(cfg).build()
    }

    /// Starts building a supervisor.
    pub fn builder(cfg: Config) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(cfg: Config, bus: Bus, subs: Arc<SubscriberSet>) -> Self {
        let gate = cfg.concurrency_limit().map(Gate::new);
        Self {
            cfg,
            bus,
            gate,
            root: CancelToken::new(),
            _subs: subs,
        }
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Raw receiver of every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// True once [`Supervisor::shutdown`] was called.
    pub fn is_shut_down(&self) -> bool {
        self.root.is_requested()
    }

    /// Spawns `unit` and returns a handle to it.
    ///
    /// The task is `Pending` until admitted by the global gate (if configured), then
    /// `Running` under its deadline. Must be called inside a tokio runtime.
    pub fn spawn<U>(&self, unit: Arc<U>, opts: SpawnOptions) -> TaskHandle<U::Output>
    where
        U: Unit + ?Sized,
    {
        let id = TaskId::next();
        let name: Arc<str> = Arc::from(unit.name());
        let token = CancelToken::new();
        self.root.link(&token);
        if let Some(parent) = &opts.token {
            parent.link(&token);
        }

        let budget = opts
            .deadline
            .or_else(|| self.cfg.default_deadline())
            .filter(|d| !d.is_zero());
        let request = opts.request.unwrap_or_default();
        let ctx = TaskContext::new(id, Arc::clone(&name), token.clone(), request);

        let (progress_tx, progress_rx) = watch::channel(Progress {
            state: TaskState::Pending,
            deadline: None,
        });
        let gate = self.gate.clone();
        let bus = self.bus.clone();
        let grace = self.cfg.grace;

        let join = tokio::spawn(async move {
            let _permit = match &gate {
                Some(gate) => match gate.acquire(ctx.token()).await {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        let reason = ctx.token().reason().unwrap_or(CancelReason::Requested);
                        bus.publish(
                            Event::new(EventKind::TaskCancelled)
                                .with_task(ctx.name_arc())
                                .with_task_id(ctx.id())
                                .with_request_opt(ctx.request().request_id_arc())
                                .with_reason(reason.as_label()),
                        );
                        progress_tx.send_modify(|p| p.state = TaskState::Cancelled);
                        return Outcome::Cancelled(reason);
                    }
                },
                None => None,
            };

            let deadline = budget.and_then(Deadline::after);
            progress_tx.send_replace(Progress {
                state: TaskState::Running,
                deadline: deadline.map(|d| d.at),
            });

            let outcome = run_once(&*unit, ctx, deadline, grace, &bus).await;
            progress_tx.send_modify(|p| p.state = outcome.state());
            outcome
        });

        TaskHandle::new(id, name, token, progress_rx, join)
    }

    /// Spawns `unit` and waits for its outcome.
    pub async fn supervise<U>(&self, unit: Arc<U>, opts: SpawnOptions) -> Outcome<U::Output>
    where
        U: Unit + ?Sized,
    {
        self.spawn(unit, opts).join().await
    }

    /// Requests every task token and closes the global gate.
    ///
    /// Running units get their unwind window; pending ones end `Cancelled` without starting.
    /// Idempotent.
    pub fn shutdown(&self) {
        if !self.root.request() {
            return;
        }
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        if let Some(gate) = &self.gate {
            gate.close();
        }
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("cfg", &self.cfg)
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{self, Instant};

    use crate::error::TaskError;
    use crate::tasks::{UnitFn, UnitRef};

    fn sleeper(name: &'static str, ms: u64) -> UnitRef<&'static str> {
        UnitFn::arc(name, move |ctx: TaskContext| async move {
            ctx.sleep(Duration::from_millis(ms)).await?;
            Ok(name)
        })
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_and_caller_cancel_are_distinguishable() {
        let sup = Supervisor::new(Config::default());

        let timed = sup
            .supervise(
                sleeper("slow", 1_000),
                SpawnOptions::new().with_deadline(Duration::from_millis(10)),
            )
            .await;
        assert_eq!(
            timed,
            Outcome::Cancelled(CancelReason::DeadlineExceeded {
                deadline: Duration::from_millis(10)
            })
        );

        let caller = CancelToken::new();
        let handle = sup.spawn(
            sleeper("slow", 1_000),
            SpawnOptions::new().with_token(caller.clone()),
        );
        time::sleep(Duration::from_millis(5)).await;
        caller.request();
        assert_eq!(handle.join().await, Outcome::Cancelled(CancelReason::Requested));
    }

    #[tokio::test(start_paused = true)]
    async fn config_timeout_is_the_default_deadline() {
        let sup = Supervisor::new(Config {
            timeout: Duration::from_millis(20),
            ..Config::default()
        });
        assert!(sup.supervise(sleeper("s", 100), SpawnOptions::new()).await.is_timeout());

        let unbounded = SpawnOptions::new().with_deadline(Duration::ZERO);
        assert_eq!(
            sup.supervise(sleeper("s", 100), unbounded).await,
            Outcome::Completed("s")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn handle_tracks_state_and_cancel_after_finish_is_noop() {
        let sup = Supervisor::new(Config::default());
        let handle = sup.spawn(
            sleeper("tick", 10),
            SpawnOptions::new().with_deadline(Duration::from_secs(1)),
        );
        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(handle.state(), TaskState::Running);
        assert!(handle.deadline().is_some());

        time::sleep(Duration::from_millis(20)).await;
        assert_eq!(handle.state(), TaskState::Completed);
        assert!(!handle.cancel());
        assert_eq!(handle.join().await, Outcome::Completed("tick"));
    }

    #[tokio::test(start_paused = true)]
    async fn global_gate_bounds_running_tasks() {
        let sup = Supervisor::new(Config {
            max_concurrent: 2,
            ..Config::default()
        });
        let started = Instant::now();
        let handles: Vec<_> = (0..5)
            .map(|_| sup.spawn(sleeper("w", 100), SpawnOptions::new()))
            .collect();
        for h in handles {
            assert!(h.join().await.is_completed());
        }
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_running_and_pending_tasks() {
        let sup = Supervisor::new(Config {
            max_concurrent: 1,
            ..Config::default()
        });
        let running = sup.spawn(sleeper("a", 10_000), SpawnOptions::new());
        let pending = sup.spawn(sleeper("b", 10_000), SpawnOptions::new());
        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(pending.state(), TaskState::Pending);

        sup.shutdown();
        assert!(sup.is_shut_down());
        assert_eq!(running.join().await, Outcome::Cancelled(CancelReason::Requested));
        assert_eq!(pending.join().await, Outcome::Cancelled(CancelReason::Requested));

        let late = sup.supervise(sleeper("c", 1), SpawnOptions::new()).await;
        assert!(late.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_shutdowns_announce_once() {
        let sup = Supervisor::new(Config::default());
        let mut rx = sup.subscribe();

        let callers: Vec<_> = (0..4)
            .map(|_| {
                let sup = Arc::clone(&sup);
                tokio::spawn(async move { sup.shutdown() })
            })
            .collect();
        for caller in callers {
            caller.await.expect("shutdown caller");
        }
        sup.shutdown();

        let mut announced = 0;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::ShutdownRequested {
                announced += 1;
            }
        }
        assert_eq!(announced, 1);
        assert!(sup.is_shut_down());
    }

    #[tokio::test(start_paused = true)]
    async fn unrepresentable_deadline_is_treated_as_none() {
        let sup = Supervisor::new(Config::default());
        let out = sup
            .supervise(
                sleeper("long", 60_000),
                SpawnOptions::new().with_deadline(Duration::MAX),
            )
            .await;
        assert_eq!(out, Outcome::Completed("long"));
    }

    #[tokio::test]
    async fn failures_are_reported_as_failed() {
        let sup = Supervisor::new(Config::default());
        let unit: UnitRef<()> = UnitFn::arc("bad", |_ctx: TaskContext| async {
            Err(TaskError::fail("invalid input"))
        });
        assert_eq!(
            sup.supervise(unit, SpawnOptions::new()).await,
            Outcome::Failed(TaskError::fail("invalid input"))
        );
    }
}
