use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use super::supervisor::Supervisor;
use crate::{
    core::Config,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for a [`Supervisor`] with optional subscribers.
pub struct SupervisorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers.
    ///
    /// Each subscriber gets a dedicated worker with a bounded queue.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the supervisor: event bus, subscriber workers, listener and global gate.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        if !subs.is_empty() {
            subscriber_listener(&bus, Arc::clone(&subs));
        }
        Arc::new(Supervisor::new_internal(self.cfg, bus, subs))
    }
}

/// Forwards bus events to the subscriber set; lagged receivers skip ahead.
fn subscriber_listener(bus: &Bus, set: Arc<SubscriberSet>) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => set.emit(&ev),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::events::{Event, EventKind};
    use crate::{SpawnOptions, TaskContext, UnitFn, UnitRef};

    #[derive(Default)]
    struct Collect(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().expect("poisoned").push(ev.kind);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_receive_task_events() {
        let collect = Arc::new(Collect::default());
        let sup = SupervisorBuilder::new(Config::default())
            .with_subscriber(collect.clone())
            .build();

        let unit: UnitRef<()> = UnitFn::arc("noop", |_ctx: TaskContext| async { Ok(()) });
        sup.supervise(unit, SpawnOptions::new()).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let seen = collect.0.lock().expect("poisoned").clone();
        assert_eq!(seen, vec![EventKind::TaskStarting, EventKind::TaskCompleted]);
    }
}
