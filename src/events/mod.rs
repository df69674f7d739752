//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the supervisor, the runner,
//! the fallback/gather/watchdog policies, the orchestrator and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor`, `runner::run_once`, `Fallback`, `Watchdog`, `Orchestrator`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the supervisor's listener (fans out to `SubscriberSet`) and any
//!   receiver obtained from `Supervisor::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
