//! Runtime core: supervision and orchestration policies.
//!
//! Public API:
//! - [`Supervisor`] / [`SupervisorBuilder`] / [`Config`] / [`SpawnOptions`]
//! - [`TaskHandle`], [`TaskState`], [`Outcome`]
//! - [`TaskContext`], [`TaskId`], [`RequestContext`]
//! - [`Fallback`], [`GatherPolicy`], [`Watchdog`], [`WatchdogVerdict`]
//! - [`offload`]
//!
//! Internal modules:
//! - [`runner`]: runs one unit to a terminal outcome (deadline race, unwind window, events);
//! - [`supervisor`]: spawning, global admission, shutdown;
//! - [`fallback`], [`gather`], [`watchdog`]: composable policies on top of the supervisor;
//! - [`blocking`]: blocking-pool offload.

mod blocking;
mod builder;
mod config;
mod context;
mod fallback;
mod gather;
mod handle;
mod outcome;
mod runner;
mod supervisor;
mod watchdog;

pub use blocking::offload;
pub use builder::SupervisorBuilder;
pub use config::Config;
pub use context::{RequestContext, TaskContext, TaskId};
pub use fallback::Fallback;
pub use gather::GatherPolicy;
pub use handle::TaskHandle;
pub use outcome::{Outcome, TaskState};
pub use supervisor::{SpawnOptions, Supervisor};
pub use watchdog::{Watchdog, WatchdogVerdict};
