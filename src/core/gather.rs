//! # Aggregate gather.
//!
//! [`Supervisor::gather`] runs N units concurrently and returns one [`Outcome`] per unit,
//! **in input order** regardless of completion order. Every slot is filled: a failure in one
//! unit never hides another unit's value.
//!
//! All units share a group token linked under the caller's token, so cancelling the caller
//! cancels the whole group. With [`GatherPolicy::CancelOnFirstFailure`] the first non-success
//! requests the group token; the remaining siblings end `Cancelled(Requested)` (or whatever
//! they manage to return in their unwind window).

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;

use crate::core::outcome::Outcome;
use crate::core::supervisor::{SpawnOptions, Supervisor};
use crate::events::{Event, EventKind};
use crate::sync::CancelToken;
use crate::tasks::Unit;

/// What a gather does when one unit fails or is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatherPolicy {
    /// Keep waiting for every sibling and collect all outcomes.
    #[default]
    CollectAll,
    /// Cancel the remaining siblings on the first non-success.
    CancelOnFirstFailure,
}

impl Supervisor {
    /// Runs `units` concurrently and returns their outcomes in input order.
    ///
    /// `opts` is applied to every unit (deadline per unit, caller token, request context).
    pub async fn gather<U>(
        &self,
        units: Vec<Arc<U>>,
        policy: GatherPolicy,
        opts: SpawnOptions,
    ) -> Vec<Outcome<U::Output>>
    where
        U: Unit + ?Sized,
    {
        let group = CancelToken::new();
        if let Some(parent) = opts.token() {
            parent.link(&group);
        }
        let request = opts.request_id();
        let member = opts.with_token(group.clone());

        let mut slots: Vec<Option<Outcome<U::Output>>> = Vec::with_capacity(units.len());
        let mut running = FuturesUnordered::new();
        for (idx, unit) in units.into_iter().enumerate() {
            slots.push(None);
            let handle = self.spawn(unit, member.clone());
            running.push(async move { (idx, handle.join().await) });
        }

        let (mut completed, mut failed, mut cancelled) = (0usize, 0usize, 0usize);
        while let Some((idx, outcome)) = running.next().await {
            match &outcome {
                Outcome::Completed(_) => completed += 1,
                Outcome::Failed(_) => failed += 1,
                Outcome::Cancelled(_) => cancelled += 1,
            }
            if policy == GatherPolicy::CancelOnFirstFailure && !outcome.is_completed() {
                group.request();
            }
            slots[idx] = Some(outcome);
        }

        self.bus.publish(
            Event::new(EventKind::GatherFinished)
                .with_request_opt(request)
                .with_reason(format!(
                    "completed={completed} failed={failed} cancelled={cancelled}"
                )),
        );
        slots.into_iter().flatten().collect()
    }
}
