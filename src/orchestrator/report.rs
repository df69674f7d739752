use std::sync::Arc;
use std::time::Duration;

use crate::core::{Outcome, WatchdogVerdict};

/// Outcome of one named operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationReport<T> {
    pub name: Arc<str>,
    pub outcome: Outcome<T>,
}

/// Result of one orchestrated request.
#[derive(Debug, Clone)]
pub struct Report<T> {
    /// Request id from the [`RequestContext`](crate::RequestContext), if any.
    pub request_id: Option<Arc<str>>,
    /// Per-operation outcomes in the order the operations were given.
    pub operations: Vec<OperationReport<T>>,
    /// Number of operations that completed (through the primary or the fallback).
    pub succeeded: usize,
    /// Which branch of the watchdog race fired.
    pub verdict: WatchdogVerdict,
    pub elapsed: Duration,
}

impl<T> Report<T> {
    /// Number of operations.
    pub fn total(&self) -> usize {
        self.operations.len()
    }

    /// True when every operation completed.
    pub fn is_success(&self) -> bool {
        self.succeeded == self.operations.len()
    }

    /// Looks up an operation by name.
    pub fn get(&self, name: &str) -> Option<&OperationReport<T>> {
        self.operations.iter().find(|op| &*op.name == name)
    }
}

/// Result of [`Orchestrator::run_batch`](crate::Orchestrator::run_batch).
#[derive(Debug, Clone)]
pub struct BatchReport<T> {
    /// One report per request, in input order.
    pub reports: Vec<Report<T>>,
    /// Number of requests whose operations all completed.
    pub succeeded: usize,
}

impl<T> BatchReport<T> {
    pub fn total(&self) -> usize {
        self.reports.len()
    }
}
