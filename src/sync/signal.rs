//! # One-shot signal.
//!
//! [`Signal`] lets any number of waiters block until a producer declares a condition true.
//! Once set it stays set: every current and future [`Signal::wait`] returns immediately.
//! There is no clear; build a fresh signal per cycle when re-arming is needed.

use tokio::sync::watch;

use crate::error::SyncError;
use crate::sync::CancelToken;

/// Single-fire event.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use taskward::{CancelToken, Signal};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), taskward::SyncError> {
/// let ready = Arc::new(Signal::new());
/// let waiter = {
///     let ready = Arc::clone(&ready);
///     tokio::spawn(async move { ready.wait(&CancelToken::new()).await })
/// };
///
/// assert!(ready.set());
/// assert!(!ready.set()); // already set
/// waiter.await.expect("join")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Signal {
    tx: watch::Sender<bool>,
}

impl Signal {
    /// Creates an unset signal.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Sets the signal and wakes every waiter.
    ///
    /// Returns `true` if this call performed the transition.
    pub fn set(&self) -> bool {
        self.tx.send_if_modified(|set| {
            if *set {
                false
            } else {
                *set = true;
                true
            }
        })
    }

    /// Non-blocking check.
    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Returns immediately if set; otherwise waits for [`Signal::set`] or for `token`.
    ///
    /// ### Errors
    /// [`SyncError::Cancelled`] if the token is requested before the signal is set.
    pub async fn wait(&self, token: &CancelToken) -> Result<(), SyncError> {
        if self.is_set() {
            return Ok(());
        }
        let mut rx = self.tx.subscribe();

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(token.cancelled_error()),
            res = rx.wait_for(|set| *set) => res.map(|_| ()).map_err(|_| SyncError::Closed),
        }
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}
