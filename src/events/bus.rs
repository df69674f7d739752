//! # Event bus.
//!
//! Every lifecycle transition the runtime observes becomes one [`Event`] on the [`Bus`]:
//!
//! ```text
//!   runner (task states, deadlines) ──┐
//!   fallback (FallbackEngaged)      ──┤                ┌─► builder listener ─► SubscriberSet
//!   gather (GatherFinished)         ──┼──► Bus ────────┤
//!   watchdog (CeilingExceeded)      ──┤   broadcast    └─► Supervisor::subscribe() receivers
//!   orchestrator (Orchestration*)   ──┘
//! ```
//!
//! Publishing is fire-and-forget and never suspends, so it is safe on every exit path of
//! a task, cancellation included. The ring buffer holds `Config::bus_capacity` events shared by
//! all receivers; a receiver that falls further behind gets `RecvError::Lagged(n)` and resumes
//! at the oldest retained event. Events published while nobody listens are dropped.

use tokio::sync::broadcast;

use super::event::Event;

/// Cloneable publishing handle over a `tokio::sync::broadcast` channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus retaining up to `capacity` events (min 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Sends `ev` to every current receiver; returns at once even when there are none.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// New receiver that sees events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn receivers_only_see_events_after_subscribing() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::ShutdownRequested));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::TaskStarting).with_task("a"));

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::TaskStarting);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn lagging_receiver_skips_to_the_retained_window() {
        let bus = Bus::new(2);
        let mut rx = bus.subscribe();
        for kind in [
            EventKind::TaskStarting,
            EventKind::TaskCompleted,
            EventKind::GatherFinished,
        ] {
            bus.publish(Event::new(kind));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(rx.recv().await.expect("event").kind, EventKind::TaskCompleted);
    }
}
