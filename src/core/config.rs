//! # Runtime configuration.
//!
//! [`Config`] centralizes the supervisor settings. It is consumed by
//! [`SupervisorBuilder`](crate::SupervisorBuilder); per-call overrides travel in
//! [`SpawnOptions`](crate::SpawnOptions).
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited (no global gate created)
//! - `timeout = 0s` → no default deadline
//! - `grace = 0s` → a cancelled unit's future is dropped immediately

use std::time::Duration;

/// Global configuration for the supervisor runtime.
///
/// All fields are public; prefer the accessor helpers over checking the `0` sentinels inline.
#[derive(Clone, Debug)]
pub struct Config {
    /// Unwind window granted to a unit after its token is requested.
    ///
    /// The runtime keeps polling the unit for up to `grace` so it can release what it holds
    /// and return; after that its future is dropped (which still runs its destructors).
    pub grace: Duration,

    /// Maximum number of supervised tasks running at once (`0` = unlimited).
    ///
    /// Tasks beyond the limit stay `Pending` in FIFO order.
    pub max_concurrent: usize,

    /// Capacity of the event bus ring buffer (min 1).
    pub bus_capacity: usize,

    /// Default per-task deadline (`0s` = none). Overridden by `SpawnOptions::deadline`.
    pub timeout: Duration,
}

impl Config {
    /// Global concurrency limit, `None` when unlimited.
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }

    /// Default deadline, `None` when disabled.
    #[inline]
    pub fn default_deadline(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// - `grace = 100ms`
    /// - `max_concurrent = 0` (unlimited)
    /// - `bus_capacity = 1024`
    /// - `timeout = 0s` (no default deadline)
    fn default() -> Self {
        Self {
            grace: Duration::from_millis(100),
            max_concurrent: 0,
            bus_capacity: 1024,
            timeout: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sentinels_mean_disabled() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.concurrency_limit(), None);
        assert_eq!(cfg.default_deadline(), None);
        assert_eq!(cfg.bus_capacity_clamped(), 1);

        let cfg = Config {
            max_concurrent: 3,
            timeout: Duration::from_secs(2),
            ..Config::default()
        };
        assert_eq!(cfg.concurrency_limit(), Some(3));
        assert_eq!(cfg.default_deadline(), Some(Duration::from_secs(2)));
    }
}
