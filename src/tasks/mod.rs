//! # Unit abstractions.
//!
//! A **unit** is the smallest piece of work the runtime schedules:
//! - [`Unit`] - trait for async, cancellable computations producing a value
//! - [`UnitFn`] - closure-backed implementation
//! - [`UnitRef`] - shared reference to a unit (`Arc<dyn Unit<Output = T>>`)
//!
//! The runtime only sees a unit as ready, suspended or done. What the unit does between
//! suspension points (network call, subprocess, timer) is opaque to it.

mod unit;
mod unit_fn;

pub use unit::{BoxUnitFuture, Unit, UnitRef};
pub use unit_fn::UnitFn;
