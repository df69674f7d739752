//! # Propagating cancellation token.
//!
//! [`CancelToken`] is the cancellation signal shared by a task, the primitives it waits on,
//! and every token linked below it.
//!
//! ## States
//! ```text
//! NotRequested ──request()──► Requested ──acknowledge()──► Acknowledged
//! ```
//!
//! ## Rules
//! - A token is requested **once**; the first [`CancelReason`] wins, later requests are no-ops.
//! - [`CancelToken::link`] registers a child by **weak** reference: parents never keep
//!   children alive and children never reference their parents.
//! - Requesting a parent requests every live linked child, transitively, before `request`
//!   returns. Children inherit the parent's reason.
//! - A token may be linked under several parents (e.g. a caller token and the supervisor root).
//! - Acknowledgment is advisory: it records that the owner finished unwinding.
//!
//! The wake-up side is a [`tokio_util::sync::CancellationToken`] owned by each token, so
//! [`CancelToken::cancelled`] is cancel-safe and wakes every waiter.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

const NOT_REQUESTED: u8 = 0;
const REQUESTED: u8 = 1;
const ACKNOWLEDGED: u8 = 2;

/// Why a token was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The owner explicitly asked for cancellation.
    Requested,
    /// A per-task deadline elapsed (requested by the runtime).
    DeadlineExceeded {
        /// The deadline budget.
        deadline: Duration,
    },
    /// A watchdog ceiling elapsed (requested by the runtime).
    CeilingExceeded {
        /// The configured ceiling.
        ceiling: Duration,
    },
}

impl CancelReason {
    /// True when the runtime, not the caller, requested cancellation.
    pub fn is_timeout(&self) -> bool {
        !matches!(self, CancelReason::Requested)
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            CancelReason::Requested => "requested",
            CancelReason::DeadlineExceeded { .. } => "deadline_exceeded",
            CancelReason::CeilingExceeded { .. } => "ceiling_exceeded",
        }
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Requested => f.write_str("requested by owner"),
            CancelReason::DeadlineExceeded { deadline } => {
                write!(f, "deadline of {deadline:?} exceeded")
            }
            CancelReason::CeilingExceeded { ceiling } => {
                write!(f, "ceiling of {ceiling:?} exceeded")
            }
        }
    }
}

/// Observable state of a [`CancelToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelState {
    /// Nobody asked for cancellation yet.
    NotRequested,
    /// Cancellation was requested; the owner may still be unwinding.
    Requested,
    /// The owner reported that it finished unwinding.
    Acknowledged,
}

struct Inner {
    state: AtomicU8,
    reason: Mutex<Option<CancelReason>>,
    children: Mutex<Vec<Weak<Inner>>>,
    fired: CancellationToken,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(NOT_REQUESTED),
            reason: Mutex::new(None),
            children: Mutex::new(Vec::new()),
            fired: CancellationToken::new(),
        }
    }

    fn reason(&self) -> Option<CancelReason> {
        *self.reason.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks this node requested and fans out to its children.
    fn request(&self, reason: CancelReason) -> bool {
        {
            let mut slot = self.reason.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_some() {
                return false;
            }
            *slot = Some(reason);
            self.state.store(REQUESTED, Ordering::Release);
        }
        self.fired.cancel();

        let children: Vec<Arc<Inner>> = {
            let mut children = self.children.lock().unwrap_or_else(PoisonError::into_inner);
            children.drain(..).filter_map(|w| w.upgrade()).collect()
        };
        for child in children {
            child.request(reason);
        }
        true
    }
}

/// Cooperative, propagating cancellation signal.
///
/// Cloning is cheap and every clone observes the same state.
///
/// ## Example
/// ```rust
/// use taskward::{CancelReason, CancelToken};
///
/// let parent = CancelToken::new();
/// let child = parent.child_token();
/// let grandchild = child.child_token();
///
/// assert!(parent.request());
/// assert!(!parent.request()); // idempotent
/// assert!(grandchild.is_requested());
/// assert_eq!(grandchild.reason(), Some(CancelReason::Requested));
/// ```
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    /// Creates a fresh, unrequested token with no links.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new()),
        }
    }

    /// Requests cancellation on behalf of the owner.
    ///
    /// Returns `true` if this call performed the transition.
    pub fn request(&self) -> bool {
        self.inner.request(CancelReason::Requested)
    }

    /// Requests cancellation with an explicit reason (used for deadlines and ceilings).
    ///
    /// Returns `true` if this call performed the transition; otherwise the earlier reason stays.
    pub fn request_with(&self, reason: CancelReason) -> bool {
        self.inner.request(reason)
    }

    /// Non-blocking check.
    #[inline]
    pub fn is_requested(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) != NOT_REQUESTED
    }

    /// Returns the current state.
    pub fn state(&self) -> CancelState {
        match self.inner.state.load(Ordering::Acquire) {
            NOT_REQUESTED => CancelState::NotRequested,
            REQUESTED => CancelState::Requested,
            _ => CancelState::Acknowledged,
        }
    }

    /// Returns the reason of the (first) request, if any.
    pub fn reason(&self) -> Option<CancelReason> {
        self.inner.reason()
    }

    /// Records that the owner finished unwinding after a request.
    ///
    /// Returns `false` if the token was not requested or was already acknowledged.
    pub fn acknowledge(&self) -> bool {
        self.inner
            .state
            .compare_exchange(REQUESTED, ACKNOWLEDGED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Links `child` below this token.
    ///
    /// If this token is already requested the child is requested immediately with the same
    /// reason. Dead children are pruned on every link.
    pub fn link(&self, child: &CancelToken) {
        if Arc::ptr_eq(&self.inner, &child.inner) {
            return;
        }
        {
            let mut children = self
                .inner
                .children
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if self.inner.reason().is_none() {
                children.retain(|w| w.strong_count() > 0);
                children.push(Arc::downgrade(&child.inner));
                return;
            }
        }
        if let Some(reason) = self.inner.reason() {
            child.inner.request(reason);
        }
    }

    /// Creates a new token linked below this one.
    pub fn child_token(&self) -> CancelToken {
        let child = CancelToken::new();
        self.link(&child);
        child
    }

    /// Completes once the token is requested. Cancel-safe.
    pub async fn cancelled(&self) {
        self.inner.fired.cancelled().await
    }

    /// Runs `fut` until it completes or the token is requested, whichever happens first.
    ///
    /// Returns `None` on cancellation; a token that is already requested never polls `fut`.
    pub async fn run_until_requested<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancelled() => None,
            out = fut => Some(out),
        }
    }

    /// Returns the reason as a [`SyncError::Cancelled`](crate::SyncError::Cancelled),
    /// defaulting to `Requested` for a token that was never requested.
    pub(crate) fn cancelled_error(&self) -> crate::SyncError {
        crate::SyncError::Cancelled {
            reason: self.reason().unwrap_or(CancelReason::Requested),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("state", &self.state())
            .field("reason", &self.reason())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_idempotent_and_first_reason_wins() {
        let token = CancelToken::new();
        assert_eq!(token.state(), CancelState::NotRequested);

        let deadline = CancelReason::DeadlineExceeded {
            deadline: Duration::from_millis(10),
        };
        assert!(token.request_with(deadline));
        assert!(!token.request());
        assert_eq!(token.reason(), Some(deadline));
        assert_eq!(token.state(), CancelState::Requested);
    }

    #[test]
    fn link_propagates_transitively_with_reason() {
        let root = CancelToken::new();
        let mid = root.child_token();
        let leaf = mid.child_token();
        let ceiling = CancelReason::CeilingExceeded {
            ceiling: Duration::from_secs(5),
        };

        root.request_with(ceiling);
        assert!(mid.is_requested());
        assert!(leaf.is_requested());
        assert_eq!(leaf.reason(), Some(ceiling));
    }

    #[test]
    fn child_does_not_cancel_parent() {
        let parent = CancelToken::new();
        let child = parent.child_token();
        child.request();
        assert!(!parent.is_requested());
    }

    #[test]
    fn linking_under_requested_parent_requests_immediately() {
        let parent = CancelToken::new();
        parent.request();
        let late = CancelToken::new();
        parent.link(&late);
        assert!(late.is_requested());
    }

    #[test]
    fn token_with_two_parents_follows_either() {
        let a = CancelToken::new();
        let b = CancelToken::new();
        let child = CancelToken::new();
        a.link(&child);
        b.link(&child);
        b.request();
        assert!(child.is_requested());
        assert!(!a.is_requested());
    }

    #[test]
    fn dropped_children_are_not_kept_alive() {
        let parent = CancelToken::new();
        let child = parent.child_token();
        let weak = Arc::downgrade(&child.inner);
        drop(child);
        assert!(weak.upgrade().is_none());
        parent.request();
    }

    #[test]
    fn link_cycle_terminates() {
        let a = CancelToken::new();
        let b = CancelToken::new();
        a.link(&b);
        b.link(&a);
        a.request();
        assert!(b.is_requested());
    }

    #[test]
    fn acknowledge_only_after_request() {
        let token = CancelToken::new();
        assert!(!token.acknowledge());
        token.request();
        assert!(token.acknowledge());
        assert!(!token.acknowledge());
        assert_eq!(token.state(), CancelState::Acknowledged);
        assert!(token.is_requested());
    }

    #[tokio::test]
    async fn cancelled_wakes_waiters() {
        let parent = CancelToken::new();
        let child = parent.child_token();
        let waiter = tokio::spawn(async move { child.cancelled().await });
        tokio::task::yield_now().await;
        parent.request();
        waiter.await.expect("waiter panicked");
    }

    #[tokio::test]
    async fn run_until_requested_short_circuits() {
        let token = CancelToken::new();
        assert_eq!(token.run_until_requested(async { 7 }).await, Some(7));
        token.request();
        assert_eq!(token.run_until_requested(async { 7 }).await, None);
    }
}
