//! # Lazy paced sequences.
//!
//! Pull-based producers built on [`futures::Stream`]: each poll either yields the next value
//! or ends the stream. A non-zero `pace` sleeps before every yield, so suspension only happens
//! between values. Streams are finite; to restart one, build it again.
//!
//! ```rust
//! use std::time::Duration;
//! use futures::StreamExt;
//! use taskward::sequence;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let evens: Vec<i64> = sequence::range(0, 10, Duration::ZERO)
//!         .filter(|n| std::future::ready(n % 2 == 0))
//!         .collect()
//!         .await;
//!     assert_eq!(evens, vec![0, 2, 4, 6, 8]);
//! }
//! ```

use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use tokio::time;

use crate::sync::CancelToken;

/// Yields `start, start + 1, .., stop - 1`; empty when `start >= stop`.
pub fn range(start: i64, stop: i64, pace: Duration) -> impl Stream<Item = i64> + Send {
    stream::unfold(start, move |next| async move {
        if next >= stop {
            return None;
        }
        pause(pace).await;
        Some((next, next + 1))
    })
}

/// Yields `1, 2, .., limit`.
pub fn counter(limit: u64, pace: Duration) -> impl Stream<Item = u64> + Send {
    stream::unfold(0u64, move |count| async move {
        if count >= limit {
            return None;
        }
        pause(pace).await;
        Some((count + 1, count + 1))
    })
}

/// Ends `stream` as soon as `token` is requested.
///
/// Values already produced are kept; no value is yielded after the request is observed.
pub fn until_cancelled<S>(stream: S, token: &CancelToken) -> impl Stream<Item = S::Item> + Send
where
    S: Stream + Send,
{
    let token = token.clone();
    stream.take_until(async move { token.cancelled().await })
}

async fn pause(pace: Duration) {
    if !pace.is_zero() {
        time::sleep(pace).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test]
    async fn range_and_counter_yield_their_values() {
        let nums: Vec<i64> = range(1, 6, Duration::ZERO).collect().await;
        assert_eq!(nums, vec![1, 2, 3, 4, 5]);

        let counted: Vec<u64> = counter(5, Duration::ZERO).collect().await;
        assert_eq!(counted, vec![1, 2, 3, 4, 5]);

        assert_eq!(range(3, 3, Duration::ZERO).count().await, 0);
        assert_eq!(counter(0, Duration::ZERO).count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pace_sleeps_before_every_yield() {
        let started = Instant::now();
        let nums: Vec<u64> = counter(3, Duration::from_millis(100)).collect().await;
        assert_eq!(nums, vec![1, 2, 3]);
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn sequences_restart_by_reconstruction() {
        let first: Vec<i64> = range(0, 3, Duration::ZERO).collect().await;
        let second: Vec<i64> = range(0, 3, Duration::ZERO).collect().await;
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_ends_the_stream_between_values() {
        let token = CancelToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(250)).await;
            canceller.request();
        });

        let seen: Vec<u64> = until_cancelled(counter(10, Duration::from_millis(100)), &token)
            .collect()
            .await;
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn requested_token_yields_nothing() {
        let token = CancelToken::new();
        token.request();
        let seen: Vec<i64> = until_cancelled(range(0, 100, Duration::ZERO), &token)
            .collect()
            .await;
        assert!(seen.is_empty());
    }
}
