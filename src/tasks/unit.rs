//! # Suspendable unit contract.
//!
//! A [`Unit`] receives a [`TaskContext`] and either returns a value, fails with a
//! [`TaskError`], or observes cancellation and stops.
//!
//! ## Contract
//! - Observe `ctx.token()` at every suspension point. Passing the token to the
//!   primitives in [`crate::sync`] does this automatically.
//! - Release everything acquired (permits, locks) before propagating cancellation.
//!   Guards from [`crate::sync`] release on drop, so `?` is enough.
//! - Report cancellation with an error whose [`TaskError::cancel_reason`] is `Some`
//!   (e.g. by `?` on a cancelled primitive); the runtime records the token's reason.
//!
//! Each call to [`Unit::spawn`] creates a **fresh** future, so one unit value may be run
//! many times (and concurrently, e.g. inside a gather).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::core::TaskContext;
use crate::error::TaskError;

/// Boxed future returned by [`Unit::spawn`].
pub type BoxUnitFuture<T> = Pin<Box<dyn Future<Output = Result<T, TaskError>> + Send + 'static>>;

/// Shared handle to a unit producing `T`.
pub type UnitRef<T> = Arc<dyn Unit<Output = T>>;

/// # Asynchronous, cancellable computation.
///
/// Implement it directly for stateful units, or use [`UnitFn`](crate::UnitFn) for closures.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use taskward::{BoxUnitFuture, TaskContext, TaskError, Unit, UnitRef};
///
/// struct Echo(&'static str);
///
/// impl Unit for Echo {
///     type Output = String;
///
///     fn name(&self) -> &str { "echo" }
///
///     fn spawn(&self, ctx: TaskContext) -> BoxUnitFuture<String> {
///         let word = self.0;
///         Box::pin(async move {
///             if ctx.is_cancelled() {
///                 return Err(TaskError::Canceled);
///             }
///             Ok(word.to_string())
///         })
///     }
/// }
///
/// let unit: UnitRef<String> = Arc::new(Echo("hi"));
/// assert_eq!(unit.name(), "echo");
/// ```
pub trait Unit: Send + Sync + 'static {
    /// Value produced on success.
    type Output: Send + 'static;

    /// Stable, human-readable name used in events and reports.
    fn name(&self) -> &str;

    /// Creates a new future for one run of this unit.
    fn spawn(&self, ctx: TaskContext) -> BoxUnitFuture<Self::Output>;
}
