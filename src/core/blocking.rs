//! # Blocking work offload.
//!
//! [`offload`] moves a genuinely blocking call onto tokio's blocking pool and marshals the
//! result back, so other units keep running. The await is a suspension point: if the token
//! is requested first the caller gets the cancellation error right away and the blocking
//! closure finishes in the background with its result discarded.

use crate::error::{TaskError, panic_message};
use crate::sync::CancelToken;

/// Runs `f` on the blocking pool.
///
/// ### Errors
/// - cancellation error of `token` if it is requested before `f` returns;
/// - [`TaskError::Fatal`] if `f` panicked.
///
/// ## Example
/// ```
/// use taskward::{CancelToken, offload};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), taskward::TaskError> {
/// let sum = offload(&CancelToken::new(), || (1..=10u64).sum::<u64>()).await?;
/// assert_eq!(sum, 55);
/// # Ok(())
/// # }
/// ```
pub async fn offload<F, R>(token: &CancelToken, f: F) -> Result<R, TaskError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if token.is_requested() {
        return Err(token.cancelled_error().into());
    }
    let join = tokio::task::spawn_blocking(f);

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(token.cancelled_error().into()),
        res = join => match res {
            Ok(value) => Ok(value),
            Err(e) if e.is_panic() => Err(TaskError::fatal(panic_message(e.into_panic().as_ref()))),
            Err(e) => Err(TaskError::fatal(e)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn returns_the_closure_result() {
        let token = CancelToken::new();
        assert_eq!(offload(&token, || 6 * 7).await, Ok(42));
    }

    #[tokio::test]
    async fn panics_become_fatal() {
        let token = CancelToken::new();
        let res = offload(&token, || {
            if true {
                panic!("disk on fire");
            }
        })
        .await;
        assert_eq!(res, Err(TaskError::fatal("disk on fire")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancellation_does_not_wait_for_the_pool() {
        let token = CancelToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.request();
        });

        let started = std::time::Instant::now();
        let res = offload(&token, || std::thread::sleep(Duration::from_millis(500))).await;
        assert_eq!(res, Err(TaskError::Canceled));
        assert!(started.elapsed() < Duration::from_millis(400));
    }
}
