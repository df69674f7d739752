//! # Bounded channel with a drain barrier.
//!
//! [`Channel<T>`] is a FIFO between producers and consumers:
//! - [`Channel::put`] waits while the channel is full (backpressure);
//! - [`Channel::get`] waits while it is empty;
//! - [`Channel::mark_done`] reports that a dequeued item was processed;
//! - [`Channel::join`] waits until every item ever enqueued has been marked done.
//!
//! ## Architecture
//! ```text
//! put ──► [slots sem] ──► queue (VecDeque) ──► [items sem] ──► get ──► ... ──► mark_done
//!                              │                                            │
//!                              └────────────── unfinished count ◄───────────┘
//!                                                    │
//!                                              drain watch ──► join
//! ```
//!
//! ## Invariants
//! - `0 <= len <= capacity` (capacity `0` means unbounded).
//! - `unfinished >= len`: a dequeued item stays unfinished until `mark_done`.
//! - `mark_done` never drives `unfinished` below the number of queued items; an extra call
//!   is a [`SyncError::ProtocolViolation`].
//! - `join` releases once `unfinished` reaches zero, even if new items arrive right after.
//! - Every item is delivered to exactly one consumer exactly once, in enqueue order.
//!   With several consumers racing, no ordering is promised across consumers.
//!
//! Both wait queues are [`tokio::sync::Semaphore`]s, so blocked producers and consumers are
//! woken FIFO and a cancelled wait never consumes a slot or an item.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use tokio::sync::{Semaphore, watch};

use crate::error::SyncError;
use crate::sync::CancelToken;

struct Queue<T> {
    items: VecDeque<T>,
    unfinished: usize,
    drains: u64,
}

/// Snapshot published to `join` waiters.
#[derive(Clone, Copy, Debug)]
struct Drain {
    unfinished: usize,
    /// Bumped every time `unfinished` reaches zero.
    epoch: u64,
}

/// FIFO channel with backpressure and a drain barrier.
///
/// Share it behind an `Arc` between producers and consumers.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use taskward::{CancelToken, Channel};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), taskward::SyncError> {
/// let jobs = Arc::new(Channel::new(5));
/// let token = CancelToken::new();
///
/// let worker = {
///     let jobs = Arc::clone(&jobs);
///     let token = token.clone();
///     tokio::spawn(async move {
///         while let Ok(job) = jobs.get(&token).await {
///             let _ = job * 2;
///             jobs.mark_done()?;
///         }
///         Ok::<_, taskward::SyncError>(())
///     })
/// };
///
/// for job in 0..10u32 {
///     jobs.put(job, &token).await?;
/// }
/// jobs.join(&token).await?;
/// token.request();
/// worker.await.expect("join")?;
/// # Ok(())
/// # }
/// ```
pub struct Channel<T> {
    queue: Mutex<Queue<T>>,
    /// Free slots; `None` when unbounded.
    slots: Option<Semaphore>,
    /// Queued items ready to be taken.
    ready: Semaphore,
    drain: watch::Sender<Drain>,
    capacity: usize,
}

impl<T> Channel<T> {
    /// Creates a channel holding at most `capacity` items (`0` = unbounded).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(Semaphore::MAX_PERMITS);
        let (drain, _rx) = watch::channel(Drain {
            unfinished: 0,
            epoch: 0,
        });
        Self {
            queue: Mutex::new(Queue {
                items: VecDeque::new(),
                unfinished: 0,
                drains: 0,
            }),
            slots: (capacity > 0).then(|| Semaphore::new(capacity)),
            ready: Semaphore::new(0),
            drain,
            capacity,
        }
    }

    /// Creates a channel without a size limit; `put` never waits.
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Enqueues `item`, waiting for space if the channel is full.
    ///
    /// On cancellation the item is dropped and the channel is unchanged.
    pub async fn put(&self, item: T, token: &CancelToken) -> Result<(), SyncError> {
        if token.is_requested() {
            return Err(token.cancelled_error());
        }
        if let Some(slots) = &self.slots {
            let permit = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(token.cancelled_error()),
                res = slots.acquire() => res.map_err(|_| SyncError::Closed)?,
            };
            permit.forget();
        }
        self.push(item);
        Ok(())
    }

    /// Enqueues `item` if there is room right now; otherwise hands it back.
    pub fn try_put(&self, item: T) -> Result<(), T> {
        if let Some(slots) = &self.slots {
            match slots.try_acquire() {
                Ok(permit) => permit.forget(),
                Err(_) => return Err(item),
            }
        }
        self.push(item);
        Ok(())
    }

    /// Dequeues the oldest item, waiting while the channel is empty.
    ///
    /// The item stays counted as unfinished until [`Channel::mark_done`].
    pub async fn get(&self, token: &CancelToken) -> Result<T, SyncError> {
        if token.is_requested() {
            return Err(token.cancelled_error());
        }
        let permit = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(token.cancelled_error()),
            res = self.ready.acquire() => res.map_err(|_| SyncError::Closed)?,
        };
        permit.forget();
        Ok(self.pop())
    }

    /// Dequeues the oldest item if one is queued.
    pub fn try_get(&self) -> Option<T> {
        let permit = self.ready.try_acquire().ok()?;
        permit.forget();
        Some(self.pop())
    }

    /// Marks one previously dequeued item as processed.
    ///
    /// ### Errors
    /// [`SyncError::ProtocolViolation`] if no dequeued item is awaiting `mark_done`.
    pub fn mark_done(&self) -> Result<(), SyncError> {
        let mut queue = self.lock();
        let outstanding = queue.unfinished - queue.items.len();
        if outstanding == 0 {
            return Err(SyncError::ProtocolViolation {
                what: "mark_done called more times than items were taken",
            });
        }
        queue.unfinished -= 1;
        if queue.unfinished == 0 {
            queue.drains += 1;
        }
        self.publish(&queue);
        Ok(())
    }

    /// Waits until every enqueued item has been marked done.
    ///
    /// Returns immediately when nothing is unfinished.
    pub async fn join(&self, token: &CancelToken) -> Result<(), SyncError> {
        let mut rx = self.drain.subscribe();
        let start = rx.borrow().epoch;

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(token.cancelled_error()),
            res = rx.wait_for(|d| d.unfinished == 0 || d.epoch != start) => {
                res.map(|_| ()).map_err(|_| SyncError::Closed)
            }
        }
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when a bounded channel has no free slot.
    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.len() >= self.capacity
    }

    /// Configured capacity; `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        (self.capacity > 0).then_some(self.capacity)
    }

    /// Items enqueued but not yet marked done (queued ones included).
    pub fn unfinished(&self) -> usize {
        self.lock().unfinished
    }

    fn push(&self, item: T) {
        {
            let mut queue = self.lock();
            queue.items.push_back(item);
            queue.unfinished += 1;
            self.publish(&queue);
        }
        self.ready.add_permits(1);
    }

    fn pop(&self) -> T {
        let item = self.lock().items.pop_front();
        if let Some(slots) = &self.slots {
            slots.add_permits(1);
        }
        match item {
            Some(item) => item,
            None => unreachable!("ready permits never exceed queued items"),
        }
    }

    fn publish(&self, queue: &Queue<T>) {
        self.drain.send_replace(Drain {
            unfinished: queue.unfinished,
            epoch: queue.drains,
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Queue<T>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = self.lock();
        f.debug_struct("Channel")
            .field("len", &queue.items.len())
            .field("unfinished", &queue.unfinished)
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use rand::Rng;
    use tokio::time;

    use crate::CancelReason;

    #[tokio::test]
    async fn fifo_single_consumer() {
        let ch = Channel::new(3);
        let token = CancelToken::new();
        for i in 0..3 {
            ch.put(i, &token).await.expect("room");
        }
        assert!(ch.is_full());
        assert_eq!(ch.try_put(99), Err(99));

        let got: Vec<i32> = vec![
            ch.get(&token).await.expect("item"),
            ch.get(&token).await.expect("item"),
            ch.get(&token).await.expect("item"),
        ];
        assert_eq!(got, vec![0, 1, 2]);
        assert_eq!(ch.unfinished(), 3);
        assert!(ch.is_empty());
    }

    #[tokio::test]
    async fn extra_mark_done_is_a_protocol_violation() {
        let ch = Channel::new(2);
        let token = CancelToken::new();
        ch.put("a", &token).await.expect("room");

        // Queued but not taken: nothing may be marked yet.
        assert!(matches!(
            ch.mark_done(),
            Err(SyncError::ProtocolViolation { .. })
        ));

        ch.get(&token).await.expect("item");
        ch.mark_done().expect("one item outstanding");
        assert!(ch.mark_done().is_err());
        assert_eq!(ch.unfinished(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn put_blocks_while_full_and_resumes_after_get() {
        let ch = Arc::new(Channel::new(1));
        let token = CancelToken::new();
        ch.put(1u8, &token).await.expect("room");

        let producer = {
            let ch = Arc::clone(&ch);
            let token = token.clone();
            tokio::spawn(async move { ch.put(2u8, &token).await })
        };
        time::sleep(Duration::from_millis(5)).await;
        assert!(!producer.is_finished());

        assert_eq!(ch.get(&token).await, Ok(1));
        producer.await.expect("join").expect("room after get");
        assert_eq!(ch.try_get(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_get_and_join_observe_cancellation() {
        let ch = Arc::new(Channel::<u8>::new(1));
        let token = CancelToken::new();

        let getter = {
            let ch = Arc::clone(&ch);
            let token = token.clone();
            tokio::spawn(async move { ch.get(&token).await })
        };
        ch.put(0, &CancelToken::new()).await.expect("room");
        assert_eq!(getter.await.expect("join"), Ok(0));

        let getter = {
            let ch = Arc::clone(&ch);
            let token = token.clone();
            tokio::spawn(async move { ch.get(&token).await })
        };
        let joiner = {
            let ch = Arc::clone(&ch);
            let token = token.clone();
            tokio::spawn(async move { ch.join(&token).await })
        };
        time::sleep(Duration::from_millis(5)).await;
        token.request();

        let cancelled: Result<u8, SyncError> = Err(SyncError::Cancelled {
            reason: CancelReason::Requested,
        });
        assert_eq!(getter.await.expect("join"), cancelled);
        assert_eq!(joiner.await.expect("join"), cancelled.map(|_: u8| ()));
    }

    #[tokio::test]
    async fn join_returns_at_once_when_idle() {
        let ch = Channel::<()>::unbounded();
        ch.join(&CancelToken::new()).await.expect("nothing unfinished");
        assert_eq!(ch.capacity(), None);
    }

    async fn randomized_run(capacity: usize, producers: usize, per_producer: usize) {
        let ch = Arc::new(Channel::new(capacity));
        let token = CancelToken::new();
        let consumed = Arc::new(Mutex::new(Vec::new()));

        let mut consumers = Vec::new();
        for _ in 0..3 {
            let ch = Arc::clone(&ch);
            let token = token.clone();
            let consumed = Arc::clone(&consumed);
            consumers.push(tokio::spawn(async move {
                while let Ok(item) = ch.get(&token).await {
                    let pause = rand::rng().random_range(0..3u64);
                    time::sleep(Duration::from_millis(pause)).await;
                    consumed
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(item);
                    assert!(ch.unfinished() >= ch.len());
                    ch.mark_done().expect("item was taken");
                }
            }));
        }

        let mut feeders = Vec::new();
        for p in 0..producers {
            let ch = Arc::clone(&ch);
            let token = token.clone();
            feeders.push(tokio::spawn(async move {
                for i in 0..per_producer {
                    ch.put(p * 1_000 + i, &token).await.expect("put");
                    if let Some(cap) = ch.capacity() {
                        assert!(ch.len() <= cap);
                    }
                    let pause = rand::rng().random_range(0..2u64);
                    time::sleep(Duration::from_millis(pause)).await;
                }
            }));
        }
        for f in feeders {
            f.await.expect("producer");
        }

        ch.join(&token).await.expect("drained");
        assert_eq!(ch.unfinished(), 0);

        token.request();
        for c in consumers {
            c.await.expect("consumer");
        }

        let mut seen = consumed.lock().unwrap_or_else(PoisonError::into_inner).clone();
        seen.sort_unstable();
        let mut expected: Vec<usize> = (0..producers)
            .flat_map(|p| (0..per_producer).map(move |i| p * 1_000 + i))
            .collect();
        expected.sort_unstable();
        assert_eq!(seen, expected, "each item delivered exactly once");
    }

    #[tokio::test(start_paused = true)]
    async fn randomized_producers_consumers_capacity_one() {
        randomized_run(1, 3, 20).await;
    }

    #[tokio::test(start_paused = true)]
    async fn randomized_producers_consumers_capacity_five() {
        randomized_run(5, 3, 20).await;
    }

    #[tokio::test(start_paused = true)]
    async fn randomized_producers_consumers_unbounded() {
        randomized_run(0, 3, 20).await;
    }

    #[tokio::test(start_paused = true)]
    async fn join_releases_on_drain_even_if_refilled() {
        let ch = Arc::new(Channel::new(0));
        let token = CancelToken::new();
        ch.put(1u8, &token).await.expect("room");

        let joiner = {
            let ch = Arc::clone(&ch);
            let token = token.clone();
            tokio::spawn(async move { ch.join(&token).await })
        };
        time::sleep(Duration::from_millis(1)).await;

        ch.get(&token).await.expect("item");
        ch.mark_done().expect("outstanding");
        ch.put(2u8, &token).await.expect("room");

        joiner.await.expect("join").expect("drained once");
        assert_eq!(ch.unfinished(), 1);
    }
}
