//! # Execution context handed to units.
//!
//! [`TaskContext`] is the only thing a unit receives: its identity, its cancellation token and
//! the [`RequestContext`] of the operation it belongs to. Request-scoped values travel
//! explicitly from the supervisor to the unit and on to any child context; there is no
//! ambient or task-local state.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::blocking;
use crate::error::TaskError;
use crate::sync::CancelToken;

/// Global counter for task identifiers.
static TASK_SEQ: AtomicU64 = AtomicU64::new(1);

/// Opaque, process-unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn next() -> Self {
        TaskId(TASK_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Request-scoped values (request id plus free-form fields).
///
/// ## Example
/// ```
/// use taskward::RequestContext;
///
/// let req = RequestContext::new("req-7").with_field("tenant", "acme");
/// assert_eq!(req.request_id(), Some("req-7"));
/// assert_eq!(req.field("tenant"), Some("acme"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    request_id: Option<Arc<str>>,
    fields: BTreeMap<String, String>,
}

impl RequestContext {
    /// Creates a context for the given request id.
    pub fn new(request_id: impl Into<Arc<str>>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            fields: BTreeMap::new(),
        }
    }

    /// Context without a request id.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// The request id, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub(crate) fn request_id_arc(&self) -> Option<Arc<str>> {
        self.request_id.clone()
    }

    /// Looks up a field.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Iterates over fields in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Identity, cancellation token and request context of one running unit.
#[derive(Debug, Clone)]
pub struct TaskContext {
    id: TaskId,
    name: Arc<str>,
    token: CancelToken,
    request: Arc<RequestContext>,
}

impl TaskContext {
    pub(crate) fn new(
        id: TaskId,
        name: Arc<str>,
        token: CancelToken,
        request: Arc<RequestContext>,
    ) -> Self {
        Self {
            id,
            name,
            token,
            request,
        }
    }

    /// A standalone context with a fresh token, for running a unit outside a supervisor.
    pub fn detached(name: impl Into<Arc<str>>) -> Self {
        Self::new(
            TaskId::next(),
            name.into(),
            CancelToken::new(),
            Arc::new(RequestContext::anonymous()),
        )
    }

    /// Derives a context for a nested unit: new id, token linked below this one,
    /// same request context.
    pub fn child(&self, name: impl Into<Arc<str>>) -> Self {
        Self::new(
            TaskId::next(),
            name.into(),
            self.token.child_token(),
            Arc::clone(&self.request),
        )
    }

    /// Task id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Unit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// The task's cancellation token. Pass it to every primitive the unit waits on.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Request context of the operation this task belongs to.
    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    pub(crate) fn request_arc(&self) -> Arc<RequestContext> {
        Arc::clone(&self.request)
    }

    /// Shorthand for `self.token().is_requested()`.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_requested()
    }

    /// Completes once cancellation is requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Suspends for `dur`, returning early with the cancellation error if the token is requested.
    pub async fn sleep(&self, dur: std::time::Duration) -> Result<(), TaskError> {
        match self.token.run_until_requested(tokio::time::sleep(dur)).await {
            Some(()) => Ok(()),
            None => Err(TaskError::from(self.token.cancelled_error())),
        }
    }

    /// Runs blocking work on the blocking pool; see [`offload`](crate::offload).
    pub async fn offload<F, R>(&self, f: F) -> Result<R, TaskError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        blocking::offload(&self.token, f).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn ids_are_unique_and_increasing() {
        let a = TaskId::next();
        let b = TaskId::next();
        assert!(b > a);
        assert!(a.to_string().starts_with("task-"));
    }

    #[test]
    fn child_shares_request_and_links_token() {
        let parent = TaskContext::new(
            TaskId::next(),
            "parent".into(),
            CancelToken::new(),
            Arc::new(RequestContext::new("r1").with_field("user", "u1")),
        );
        let child = parent.child("child");

        assert_ne!(parent.id(), child.id());
        assert_eq!(child.request().request_id(), Some("r1"));
        assert_eq!(child.request().field("user"), Some("u1"));

        parent.token().request();
        assert!(child.is_cancelled());
    }

    #[test]
    fn sibling_requests_do_not_mix() {
        let a = RequestContext::new("a").with_field("k", "1");
        let b = RequestContext::new("b").with_field("k", "2");
        assert_eq!(a.field("k"), Some("1"));
        assert_eq!(b.field("k"), Some("2"));
        assert_eq!(a.fields().count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_is_a_cancellable_suspension_point() {
        let ctx = TaskContext::detached("sleeper");
        ctx.sleep(Duration::from_millis(10)).await.expect("not cancelled");

        ctx.token().request();
        assert_eq!(
            ctx.sleep(Duration::from_secs(60)).await,
            Err(TaskError::Canceled)
        );
    }
}
