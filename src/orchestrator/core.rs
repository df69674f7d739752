use std::collections::HashSet;
use std::sync::Arc;

use tokio::time::Instant;

use super::{BatchReport, Operation, OperationReport, OrchestratorConfig, Report};
use crate::core::{GatherPolicy, RequestContext, SpawnOptions, Supervisor};
use crate::error::OrchestratorError;
use crate::events::{Event, EventKind};
use crate::sync::CancelToken;
use crate::tasks::UnitRef;

/// Runs requests made of named, fallback-protected operations under a watchdog ceiling.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use taskward::{
///     CancelToken, Config, Operation, Orchestrator, OrchestratorConfig, RequestContext,
///     Supervisor, TaskContext, TaskError, UnitFn, UnitRef,
/// };
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), taskward::OrchestratorError> {
///     let sup = Supervisor::new(Config::default());
///     let orch = Orchestrator::new(sup, OrchestratorConfig { ceiling: Duration::from_secs(1) })?;
///
///     let primary: UnitRef<&str> = UnitFn::arc("live", |_ctx: TaskContext| async {
///         Err(TaskError::fail("connection refused"))
///     });
///     let fallback: UnitRef<&str> = UnitFn::arc("cache", |_ctx: TaskContext| async { Ok("cached") });
///     let op = Operation::new(
///         "profile",
///         primary,
///         fallback,
///         Duration::from_millis(100),
///         Duration::from_millis(200),
///     );
///
///     let report = orch.run(RequestContext::new("req-1"), vec![op], &CancelToken::new()).await?;
///     assert!(report.is_success());
///     assert_eq!(report.get("profile").and_then(|r| r.outcome.value()), Some(&"cached"));
///     Ok(())
/// }
/// ```
pub struct Orchestrator {
    supervisor: Arc<Supervisor>,
    cfg: OrchestratorConfig,
}

impl Orchestrator {
    /// Creates an orchestrator on top of `supervisor`.
    ///
    /// ### Errors
    /// [`OrchestratorError::InvalidConfig`] for a zero ceiling.
    pub fn new(
        supervisor: Arc<Supervisor>,
        cfg: OrchestratorConfig,
    ) -> Result<Self, OrchestratorError> {
        if cfg.ceiling.is_zero() {
            return Err(OrchestratorError::invalid("ceiling must be non-zero"));
        }
        Ok(Self { supervisor, cfg })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.cfg
    }

    pub fn supervisor(&self) -> &Arc<Supervisor> {
        &self.supervisor
    }

    /// Runs every operation concurrently, each as primary-with-fallback, under the ceiling.
    ///
    /// Requesting `token` cancels the whole request; fallbacks do not run after that.
    ///
    /// ### Errors
    /// Only setup errors: no operations, duplicate or empty names, zero deadlines.
    pub async fn run<T: Send + 'static>(
        &self,
        request: RequestContext,
        operations: Vec<Operation<T>>,
        token: &CancelToken,
    ) -> Result<Report<T>, OrchestratorError> {
        validate(&operations)?;

        let request = Arc::new(request);
        let request_id = request.request_id_arc();
        let scope = token.child_token();
        let started = Instant::now();

        self.supervisor.bus.publish(
            Event::new(EventKind::OrchestrationStarted)
                .with_request_opt(request_id.clone())
                .with_timeout(self.cfg.ceiling),
        );
        let watchdog = self
            .supervisor
            .watchdog_for(self.cfg.ceiling, &scope, request_id.clone());

        let names: Vec<Arc<str>> = operations.iter().map(|op| Arc::clone(&op.name)).collect();
        let units: Vec<UnitRef<T>> = operations
            .into_iter()
            .map(|op| -> UnitRef<T> {
                self.supervisor.fallback(
                    op.name,
                    op.primary,
                    op.fallback,
                    op.primary_deadline,
                    op.fallback_deadline,
                )
            })
            .collect();

        let opts = SpawnOptions::new()
            .with_token(scope)
            .with_shared_request(Arc::clone(&request));
        let outcomes = self
            .supervisor
            .gather(units, GatherPolicy::CollectAll, opts)
            .await;
        let verdict = watchdog.finish().await;

        let operations: Vec<OperationReport<T>> = names
            .into_iter()
            .zip(outcomes)
            .map(|(name, outcome)| OperationReport { name, outcome })
            .collect();
        let succeeded = operations
            .iter()
            .filter(|op| op.outcome.is_completed())
            .count();

        let report = Report {
            request_id,
            succeeded,
            verdict,
            elapsed: started.elapsed(),
            operations,
        };
        self.supervisor.bus.publish(
            Event::new(EventKind::OrchestrationFinished)
                .with_request_opt(report.request_id.clone())
                .with_reason(format!(
                    "succeeded={}/{} verdict={}",
                    report.succeeded,
                    report.total(),
                    report.verdict.as_label()
                )),
        );
        Ok(report)
    }

    /// Runs several requests concurrently and counts those that fully succeeded.
    ///
    /// Every request is validated before any starts.
    pub async fn run_batch<T: Send + 'static>(
        &self,
        requests: Vec<(RequestContext, Vec<Operation<T>>)>,
        token: &CancelToken,
    ) -> Result<BatchReport<T>, OrchestratorError> {
        for (_, operations) in &requests {
            validate(operations)?;
        }

        let runs = requests
            .into_iter()
            .map(|(request, operations)| self.run(request, operations, token));
        let reports = futures::future::try_join_all(runs).await?;
        let succeeded = reports.iter().filter(|r| r.is_success()).count();
        Ok(BatchReport { reports, succeeded })
    }
}

fn validate<T>(operations: &[Operation<T>]) -> Result<(), OrchestratorError> {
    if operations.is_empty() {
        return Err(OrchestratorError::invalid("no operations to run"));
    }
    let mut seen = HashSet::new();
    for op in operations {
        op.validate()?;
        if !seen.insert(op.name()) {
            return Err(OrchestratorError::invalid(format!(
                "duplicate operation name {:?}",
                op.name()
            )));
        }
    }
    Ok(())
}
