//! # Event subscribers.
//!
//! - [`Subscribe`] - observer trait implemented by users
//! - [`SubscriberSet`] - per-subscriber queues and workers used by the supervisor
//! - [`LogWriter`] - prints events to stdout (feature `logging`)

mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
mod embedded;

pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
