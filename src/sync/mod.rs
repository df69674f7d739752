//! # Cancellation-aware synchronization primitives.
//!
//! Every waiting operation takes a [`CancelToken`] and resolves with
//! [`SyncError::Cancelled`](crate::SyncError::Cancelled) once the token is requested, leaving
//! the primitive exactly as it was (no phantom permits, no lost items).
//!
//! - [`CancelToken`] — propagating cancellation signal with a typed [`CancelReason`].
//! - [`Gate`] — counting admission gate (FIFO semaphore).
//! - [`Lock`] — FIFO mutual exclusion owning the protected value.
//! - [`Signal`] — one-shot event.
//! - [`Channel`] — bounded FIFO with backpressure and a drain barrier.

mod channel;
mod gate;
mod lock;
mod signal;
mod token;

pub use channel::Channel;
pub use gate::{Gate, GatePermit};
pub use lock::{Lock, LockGuard};
pub use signal::Signal;
pub use token::{CancelReason, CancelState, CancelToken};
