//! # Event subscriber trait.
//!
//! [`Subscribe`] plugs custom observers (logging, metrics, audit) into the runtime.
//!
//! ```text
//! Bus ──► supervisor listener ──► SubscriberSet ──► [bounded queue] ──► worker ──► on_event()
//!                                                                          └─► panic → SubscriberPanicked
//! ```
//!
//! ## Rules
//! - Each subscriber has its own worker and bounded queue; a slow one only delays itself.
//! - A full queue drops the event for that subscriber and publishes `SubscriberOverflow`.
//! - Events arrive in FIFO order per subscriber, never across subscribers.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use async_trait::async_trait;
//! use taskward::{Subscribe, Event, EventKind};
//!
//! #[derive(Default)]
//! struct TimeoutCounter(AtomicU64);
//!
//! #[async_trait]
//! impl Subscribe for TimeoutCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::DeadlineExceeded | EventKind::CeilingExceeded) {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "timeouts" }
//!     fn queue_capacity(&self) -> usize { 2048 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of runtime events.
///
/// Runs on a dedicated worker: use async I/O, handle errors internally and avoid panicking
/// (panics are caught and reported, but the event is lost for this subscriber).
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic events.
    ///
    /// Defaults to `type_name::<Self>()`; override it with something short.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue capacity for this subscriber (clamped to at least 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
