//! # Admission gate (counting semaphore).
//!
//! [`Gate`] bounds how many units may be active against a shared resource at once,
//! e.g. "at most K concurrent external calls".
//!
//! ## Rules
//! - Available permits never exceed the configured capacity (permits only come back
//!   through [`GatePermit`]).
//! - Waiters are served **FIFO**: a released permit goes to the longest-waiting acquirer.
//! - A cancelled [`Gate::acquire`] leaves the gate untouched; an already-requested token
//!   never receives a permit.
//!
//! Built on [`tokio::sync::Semaphore`], which queues acquirers fairly and returns permits
//! assigned to a dropped `acquire` future.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::error::SyncError;
use crate::sync::CancelToken;

/// Counting admission gate.
///
/// Cloning is cheap; clones share the same permits.
///
/// ## Example
/// ```rust
/// use taskward::{CancelToken, Gate};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), taskward::SyncError> {
/// let gate = Gate::new(2);
/// let token = CancelToken::new();
///
/// let a = gate.acquire(&token).await?;
/// let _b = gate.acquire(&token).await?;
/// assert!(gate.try_acquire().is_none());
///
/// a.release();
/// assert_eq!(gate.available(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Gate {
    sem: Arc<Semaphore>,
    capacity: usize,
}

impl Gate {
    /// Creates a gate with `capacity` permits, clamped to `1..=Semaphore::MAX_PERMITS`.
    ///
    /// A `capacity` of `0` yields a single-permit gate, not an unlimited one. Callers that
    /// treat `0` as "no limit" (like [`Config::max_concurrent`](crate::Config::max_concurrent))
    /// skip the gate instead of constructing one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            sem: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits for a permit or for `token` to be requested.
    ///
    /// ### Errors
    /// - [`SyncError::Cancelled`] if the token is (or becomes) requested first.
    /// - [`SyncError::Closed`] if the gate was closed.
    pub async fn acquire(&self, token: &CancelToken) -> Result<GatePermit, SyncError> {
        if token.is_requested() {
            return Err(token.cancelled_error());
        }
        let acquire = Arc::clone(&self.sem).acquire_owned();

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(token.cancelled_error()),
            res = acquire => match res {
                Ok(permit) => Ok(GatePermit { permit }),
                Err(_closed) => Err(SyncError::Closed),
            },
        }
    }

    /// Takes a permit without waiting, or returns `None` if none is free.
    pub fn try_acquire(&self) -> Option<GatePermit> {
        match Arc::clone(&self.sem).try_acquire_owned() {
            Ok(permit) => Some(GatePermit { permit }),
            Err(TryAcquireError::NoPermits | TryAcquireError::Closed) => None,
        }
    }

    /// Number of permits free right now.
    pub fn available(&self) -> usize {
        self.sem.available_permits()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Closes the gate: current and future acquirers fail with [`SyncError::Closed`].
    ///
    /// Permits already handed out stay valid until released.
    pub fn close(&self) {
        self.sem.close();
    }

    /// True once [`Gate::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.sem.is_closed()
    }
}

/// A permit held against a [`Gate`]. Released on drop.
#[must_use = "the permit is released as soon as it is dropped"]
#[derive(Debug)]
pub struct GatePermit {
    permit: OwnedSemaphorePermit,
}

impl GatePermit {
    /// Releases the permit explicitly (same as dropping it).
    pub fn release(self) {
        drop(self.permit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time;

    #[tokio::test(start_paused = true)]
    async fn k_acquirers_pass_and_the_next_blocks_until_release() {
        for k in [1usize, 3, 8] {
            let gate = Gate::new(k);
            let token = CancelToken::new();
            let mut held = Vec::new();
            for _ in 0..k {
                held.push(gate.acquire(&token).await.expect("permit within capacity"));
            }
            assert_eq!(gate.available(), 0);

            let extra = {
                let gate = gate.clone();
                let token = token.clone();
                tokio::spawn(async move { gate.acquire(&token).await.map(|_| ()) })
            };
            time::sleep(Duration::from_millis(10)).await;
            assert!(!extra.is_finished(), "k+1-th acquirer must block");

            if let Some(permit) = held.pop() {
                permit.release();
            }
            extra.await.expect("join").expect("permit after release");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_acquire_leaves_no_phantom_permit() {
        let gate = Gate::new(1);
        let token = CancelToken::new();
        let held = gate.acquire(&token).await.expect("first permit");

        let waiter_token = CancelToken::new();
        let waiter = {
            let gate = gate.clone();
            let t = waiter_token.clone();
            tokio::spawn(async move { gate.acquire(&t).await.map(|_| ()) })
        };
        time::sleep(Duration::from_millis(1)).await;
        waiter_token.request();
        assert_eq!(
            waiter.await.expect("join"),
            Err(SyncError::Cancelled {
                reason: crate::CancelReason::Requested
            })
        );

        drop(held);
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn requested_token_never_gets_a_permit() {
        let gate = Gate::new(4);
        let token = CancelToken::new();
        token.request();
        assert!(gate.acquire(&token).await.is_err());
        assert_eq!(gate.available(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn release_serves_waiters_in_fifo_order() {
        let gate = Gate::new(1);
        let token = CancelToken::new();
        let held = gate.acquire(&token).await.expect("permit");
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        for id in 0..4u32 {
            let gate = gate.clone();
            let token = token.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let permit = gate.acquire(&token).await.expect("permit");
                let _ = tx.send(id);
                time::sleep(Duration::from_millis(5)).await;
                permit.release();
            });
            time::sleep(Duration::from_millis(1)).await;
        }
        drop(tx);
        held.release();

        let mut order = Vec::new();
        while let Some(id) = rx.recv().await {
            order.push(id);
        }
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn closed_gate_rejects_acquirers() {
        let gate = Gate::new(1);
        gate.close();
        assert!(gate.is_closed());
        assert_eq!(
            gate.acquire(&CancelToken::new()).await.err(),
            Some(SyncError::Closed)
        );
        assert!(gate.try_acquire().is_none());
    }

    #[test]
    fn zero_capacity_admits_exactly_one_holder() {
        let gate = Gate::new(0);
        assert_eq!(gate.capacity(), 1);

        let held = gate.try_acquire().expect("single permit");
        assert!(gate.try_acquire().is_none());
        held.release();
        assert_eq!(gate.available(), 1);
    }
}
