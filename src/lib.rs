//! # taskward
//!
//! **Taskward** is a cooperative task orchestration library on top of tokio.
//!
//! It runs async units of work under deadlines, explicit cancellation tokens, bounded
//! concurrency and primary/fallback degradation, and reports every run as a tagged
//! [`Outcome`] instead of a panic or a lost error.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │     Unit     │   │   Fallback   │   │  Operation   │
//!     │  (UnitFn..)  │   │(primary, fb) │   │ (orchestr.)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - root CancelToken (shutdown)                                    │
//! │  - global Gate (Config::max_concurrent, 0 = unlimited)            │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!   spawn / supervise     gather           watchdog            │
//!   (deadline, grace)  (input order)   (ceiling ► scope)       │
//!        │                  │                  │               │
//!        ▼                  ▼                  ▼               ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                   (capacity: Config::bus_capacity)                │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                          (per-sub queues)
//!                        ┌─────────┼─────────┐
//!                        ▼         ▼         ▼
//!                     worker1   worker2   workerN
//! ```
//!
//! ### Lifecycle of one task
//! ```text
//! spawn(unit, opts) ──► Pending
//!   ├─► link token under supervisor root + opts.token
//!   ├─► acquire global gate (cancellable)   ── cancelled ──► Cancelled, TaskCancelled
//!   ├─► Running: start deadline, publish TaskStarting
//!   ├─► race { unit, token.cancelled(), deadline }
//!   │       ├─ unit returns Ok(v)   ──► Completed(v)          TaskCompleted
//!   │       ├─ unit returns Err(e)  ──► Failed(e)             TaskFailed
//!   │       ├─ unit panics          ──► Failed(Fatal)         TaskFailed
//!   │       ├─ deadline             ──► request(DeadlineExceeded), DeadlineExceeded
//!   │       └─ token requested      ──► grace window, then Cancelled(reason)
//!   └─► exactly one terminal event per task
//! ```
//!
//! ## Features
//! | Area              | Description                                                       | Key types / traits                           |
//! |-------------------|-------------------------------------------------------------------|----------------------------------------------|
//! | **Units**         | Describe work as closures or stateful types.                      | [`Unit`], [`UnitFn`], [`UnitRef`]            |
//! | **Supervision**   | Spawn, await, cancel and observe tasks.                           | [`Supervisor`], [`TaskHandle`], [`Outcome`]  |
//! | **Policies**      | Fallback, gather and watchdog ceilings.                           | [`Fallback`], [`GatherPolicy`], [`Watchdog`] |
//! | **Primitives**    | Cancellation-aware gate, lock, signal and channel.                | [`CancelToken`], [`Gate`], [`Lock`], [`Signal`], [`Channel`] |
//! | **Orchestration** | Requests of named operations under a ceiling.                     | [`Orchestrator`], [`Operation`], [`Report`]  |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom subscribers).| [`Subscribe`]                                |
//! | **Errors**        | Typed errors with stable labels.                                  | [`TaskError`], [`SyncError`], [`OrchestratorError`] |
//! | **Configuration** | Centralize runtime settings.                                      | [`Config`]                                   |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use taskward::{Config, Outcome, SpawnOptions, Supervisor, TaskContext, TaskError, UnitFn, UnitRef};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut cfg = Config::default();
//!     cfg.max_concurrent = 2;
//!
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn taskward::Subscribe>> = vec![Arc::new(taskward::LogWriter::default())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn taskward::Subscribe>> = Vec::new();
//!
//!     let sup = Supervisor::builder(cfg).with_subscribers(subs).build();
//!
//!     let fetch: UnitRef<u32> = UnitFn::arc("fetch", |ctx: TaskContext| async move {
//!         ctx.sleep(Duration::from_millis(10)).await?;
//!         Ok(42)
//!     });
//!     let slow: UnitRef<u32> = UnitFn::arc("slow", |ctx: TaskContext| async move {
//!         ctx.sleep(Duration::from_secs(60)).await?;
//!         Err(TaskError::fail("unreachable"))
//!     });
//!
//!     assert_eq!(sup.supervise(fetch, SpawnOptions::new()).await, Outcome::Completed(42));
//!
//!     let out = sup
//!         .supervise(slow, SpawnOptions::new().with_deadline(Duration::from_millis(20)))
//!         .await;
//!     assert!(out.is_timeout());
//! }
//! ```
mod core;
mod error;
mod events;
mod orchestrator;
pub mod sequence;
mod subscribers;
mod sync;
mod tasks;

// ---- Public re-exports ----

pub use core::{
    Config, Fallback, GatherPolicy, Outcome, RequestContext, SpawnOptions, Supervisor,
    SupervisorBuilder, TaskContext, TaskHandle, TaskId, TaskState, Watchdog, WatchdogVerdict,
    offload,
};
pub use error::{OrchestratorError, SyncError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use orchestrator::{
    BatchReport, Operation, OperationReport, Orchestrator, OrchestratorConfig, Report,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use sync::{
    CancelReason, CancelState, CancelToken, Channel, Gate, GatePermit, Lock, LockGuard, Signal,
};
pub use tasks::{BoxUnitFuture, Unit, UnitFn, UnitRef};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
