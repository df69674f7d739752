//! # Mutual exclusion lock guarding a value.
//!
//! [`Lock<T>`] serializes access to `T` across concurrently scheduled units. It is the only
//! sanctioned way to do read-modify-write on shared state: the value is unreachable
//! without a [`LockGuard`], and the guard releases on every exit path (return, `?`, panic,
//! or the holding future being dropped on cancellation).
//!
//! ## Rules
//! - At most one holder at any instant.
//! - Release hands the lock to the longest-waiting acquirer (FIFO, no queue jumping).
//! - Same cancellation contract as [`Gate`](crate::Gate): a cancelled acquire leaves the lock
//!   untouched and an already-requested token never gets the lock.

use std::fmt;
use std::ops::{Deref, DerefMut};

use tokio::sync::{Mutex, MutexGuard};

use crate::error::SyncError;
use crate::sync::CancelToken;

/// FIFO-fair async lock owning the protected value.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use taskward::{CancelToken, Lock};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), taskward::SyncError> {
/// let counter = Arc::new(Lock::new(0u64));
/// let token = CancelToken::new();
///
/// let next = counter.update(&token, |n| { *n += 1; *n }).await?;
/// assert_eq!(next, 1);
/// # Ok(())
/// # }
/// ```
pub struct Lock<T> {
    inner: Mutex<T>,
}

impl<T> Lock<T> {
    /// Creates an unlocked lock around `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Waits for the lock or for `token` to be requested.
    ///
    /// ### Errors
    /// [`SyncError::Cancelled`] if the token is (or becomes) requested first.
    pub async fn acquire(&self, token: &CancelToken) -> Result<LockGuard<'_, T>, SyncError> {
        if token.is_requested() {
            return Err(token.cancelled_error());
        }
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(token.cancelled_error()),
            guard = self.inner.lock() => Ok(LockGuard { guard }),
        }
    }

    /// Takes the lock if it is free and nobody is queued for it.
    pub fn try_acquire(&self) -> Option<LockGuard<'_, T>> {
        self.inner.try_lock().ok().map(|guard| LockGuard { guard })
    }

    /// Scoped read-modify-write: acquires, applies `f`, releases.
    pub async fn update<R>(
        &self,
        token: &CancelToken,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, SyncError> {
        let mut guard = self.acquire(token).await?;
        Ok(f(&mut guard))
    }

    /// True while someone holds the lock.
    pub fn is_held(&self) -> bool {
        self.inner.try_lock().is_err()
    }

    /// Consumes the lock and returns the value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Default> Default for Lock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for Lock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("held", &self.is_held())
            .finish_non_exhaustive()
    }
}

/// Exclusive access to the value inside a [`Lock`]. Released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a, T> {
    guard: MutexGuard<'a, T>,
}

impl<T> LockGuard<'_, T> {
    /// Releases the lock explicitly (same as dropping the guard).
    pub fn release(self) {
        drop(self.guard);
    }
}

impl<T> Deref for LockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for LockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
