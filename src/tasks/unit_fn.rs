//! # Closure-backed unit (`UnitFn`)
//!
//! [`UnitFn`] wraps a closure `F: Fn(TaskContext) -> Fut`, producing a fresh future per run.
//! Nothing is shared between runs unless the closure captures it explicitly (use
//! `Arc<Lock<_>>` or another primitive from [`crate::sync`] for shared state).
//!
//! ## Example
//! ```rust
//! use taskward::{TaskContext, TaskError, UnitFn, UnitRef};
//!
//! let unit: UnitRef<u32> = UnitFn::arc("answer", |ctx: TaskContext| async move {
//!     if ctx.is_cancelled() {
//!         return Err(TaskError::Canceled);
//!     }
//!     Ok(42)
//! });
//!
//! assert_eq!(unit.name(), "answer");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::core::TaskContext;
use crate::error::TaskError;
use crate::tasks::unit::{BoxUnitFuture, Unit};

/// Closure-backed unit.
pub struct UnitFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> UnitFn<F> {
    /// Creates a new closure-backed unit.
    ///
    /// Prefer [`UnitFn::arc`] when you immediately need a [`UnitRef`](crate::UnitRef).
    pub fn new<Fut, T>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
        T: Send + 'static,
    {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the unit behind an `Arc`, ready to coerce into a [`UnitRef`](crate::UnitRef).
    ///
    /// The bounds sit on the constructor so the closure's result type is inferred at the
    /// call site.
    pub fn arc<Fut, T>(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self>
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
        T: Send + 'static,
    {
        Arc::new(Self::new(name, f))
    }
}

impl<F> fmt::Debug for UnitFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitFn").field("name", &self.name).finish()
    }
}

impl<F, Fut, T> Unit for UnitFn<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, ctx: TaskContext) -> BoxUnitFuture<T> {
        Box::pin((self.f)(ctx))
    }
}
