//! # Watchdog: an overall ceiling for a scope.
//!
//! A [`Watchdog`] races a "work finished" [`Signal`] against a ceiling. If the ceiling wins,
//! the scope token is requested with [`CancelReason::CeilingExceeded`]; every task linked
//! under the scope sees the request at its next suspension point (cooperative, never a
//! forced abort).
//!
//! ```text
//! watchdog(ceiling, scope) ──► monitor task
//!                                 ├─ done.wait()     ──► Finished
//!                                 └─ sleep(ceiling)  ──► scope.request_with(CeilingExceeded)
//!                                                        publish CeilingExceeded
//!                                                        ──► CeilingExceeded
//! finish() ──► done.set() ──► join monitor ──► verdict
//! ```
//!
//! A scope that was already requested when the ceiling elapses keeps its reason; the verdict
//! is then `Finished` and no `CeilingExceeded` event is published.
//!
//! The monitor is always joined by [`Watchdog::finish`]; dropping an unfinished watchdog
//! sets the done signal so the monitor exits instead of lingering.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;

use crate::core::supervisor::Supervisor;
use crate::events::{Event, EventKind};
use crate::sync::{CancelReason, CancelToken, Signal};

/// Which branch of the watchdog race fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogVerdict {
    /// The scope finished before the ceiling.
    Finished,
    /// The ceiling elapsed first and cancelled the scope.
    CeilingExceeded {
        /// The configured ceiling.
        ceiling: Duration,
    },
}

impl WatchdogVerdict {
    pub fn is_ceiling_exceeded(&self) -> bool {
        matches!(self, WatchdogVerdict::CeilingExceeded { .. })
    }

    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            WatchdogVerdict::Finished => "finished",
            WatchdogVerdict::CeilingExceeded { .. } => "ceiling_exceeded",
        }
    }
}

/// Running watchdog over a scope token.
#[must_use = "a watchdog should be finished to learn its verdict"]
pub struct Watchdog {
    done: Arc<Signal>,
    monitor: Option<JoinHandle<WatchdogVerdict>>,
    ceiling: Duration,
}

impl Watchdog {
    /// The configured ceiling.
    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Marks the scope finished, joins the monitor and returns the verdict.
    pub async fn finish(mut self) -> WatchdogVerdict {
        self.done.set();
        match self.monitor.take() {
            Some(monitor) => monitor.await.unwrap_or(WatchdogVerdict::Finished),
            None => WatchdogVerdict::Finished,
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.done.set();
    }
}

impl Supervisor {
    /// Starts a watchdog that requests `scope` once `ceiling` elapses.
    ///
    /// Must be called inside a tokio runtime.
    pub fn watchdog(&self, ceiling: Duration, scope: &CancelToken) -> Watchdog {
        self.watchdog_for(ceiling, scope, None)
    }

    /// Same as [`Supervisor::watchdog`], tagging the `CeilingExceeded` event with `request`.
    pub(crate) fn watchdog_for(
        &self,
        ceiling: Duration,
        scope: &CancelToken,
        request: Option<Arc<str>>,
    ) -> Watchdog {
        let done = Arc::new(Signal::new());
        let scope = scope.clone();
        let bus = self.bus.clone();
        let signal = Arc::clone(&done);

        let monitor = tokio::spawn(async move {
            // The monitor itself is never cancelled; only `done` or the ceiling end it.
            let never = CancelToken::new();
            tokio::select! {
                biased;
                _ = signal.wait(&never) => WatchdogVerdict::Finished,
                _ = time::sleep(ceiling) => {
                    if !scope.request_with(CancelReason::CeilingExceeded { ceiling }) {
                        return WatchdogVerdict::Finished;
                    }
                    bus.publish(
                        Event::new(EventKind::CeilingExceeded)
                            .with_request_opt(request)
                            .with_timeout(ceiling),
                    );
                    WatchdogVerdict::CeilingExceeded { ceiling }
                }
            }
        });

        Watchdog {
            done,
            monitor: Some(monitor),
            ceiling,
        }
    }
}
