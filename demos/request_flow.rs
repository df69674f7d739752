//! # Orchestrated request with fallbacks and a ceiling
//!
//! Demonstrates the orchestrator on one request with three operations:
//! - `profile`: the live call misses its deadline, the cache answers
//! - `recommendations`: the live call fails, static defaults answer
//! - `pricing`: blocking computation offloaded to the blocking pool
//!
//! A second request is cut off by the watchdog ceiling.
//!
//! ## Flow
//! ```text
//! Orchestrator::run(request, ops)
//!     ├─► OrchestrationStarted
//!     ├─► gather ── Fallback(profile-live, profile-cache)
//!     │          ├─ Fallback(reco-live, reco-defaults)
//!     │          └─ Fallback(pricing, pricing-estimate)
//!     ├─► watchdog.finish()
//!     └─► OrchestrationFinished ──► LogWriter prints every event
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example request_flow --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use taskward::{
    CancelToken, Config, LogWriter, Operation, Orchestrator, OrchestratorConfig, RequestContext,
    Supervisor, TaskContext, TaskError, UnitFn, UnitRef,
};

fn after(name: &'static str, ms: u64, value: &'static str) -> UnitRef<String> {
    UnitFn::arc(name, move |ctx: TaskContext| async move {
        ctx.sleep(Duration::from_millis(ms)).await?;
        Ok(value.to_string())
    })
}

fn failing(name: &'static str, error: &'static str) -> UnitRef<String> {
    UnitFn::arc(name, move |ctx: TaskContext| async move {
        ctx.sleep(Duration::from_millis(20)).await?;
        Err(TaskError::fail(error))
    })
}

fn pricing() -> UnitRef<String> {
    UnitFn::arc("pricing", |ctx: TaskContext| async move {
        let region = ctx.request().field("region").unwrap_or("eu").to_string();
        let total = ctx
            .offload(move || {
                std::thread::sleep(Duration::from_millis(30));
                (1..=100u64).sum::<u64>()
            })
            .await?;
        Ok(format!("{region}: {total}"))
    })
}

fn operations() -> Vec<Operation<String>> {
    vec![
        Operation::new(
            "profile",
            after("profile-live", 500, "live profile"),
            after("profile-cache", 5, "cached profile"),
            Duration::from_millis(100),
            Duration::from_millis(100),
        ),
        Operation::new(
            "recommendations",
            failing("reco-live", "upstream returned 503"),
            after("reco-defaults", 1, "top sellers"),
            Duration::from_millis(200),
            Duration::from_millis(50),
        ),
        Operation::new(
            "pricing",
            pricing(),
            after("pricing-estimate", 1, "estimate"),
            Duration::from_millis(500),
            Duration::from_millis(50),
        ),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cfg = Config::default();
    cfg.max_concurrent = 4;
    cfg.grace = Duration::from_millis(50);

    let sup = Supervisor::builder(cfg)
        .with_subscriber(Arc::new(LogWriter::new()))
        .build();
    let orch = Orchestrator::new(
        Arc::clone(&sup),
        OrchestratorConfig {
            ceiling: Duration::from_millis(400),
        },
    )?;
    let token = CancelToken::new();

    let request = RequestContext::new("req-1").with_field("region", "us");
    let report = orch.run(request, operations(), &token).await?;
    for op in &report.operations {
        println!("  {:<16} {:<10} {:?}", op.name, op.outcome.as_label(), op.outcome.value());
    }
    println!(
        "req-1: {}/{} succeeded in {:?} ({})",
        report.succeeded,
        report.total(),
        report.elapsed,
        report.verdict.as_label()
    );

    let slow = vec![Operation::new(
        "archive",
        after("archive-live", 10_000, "archive"),
        after("archive-replica", 10_000, "replica"),
        Duration::from_secs(30),
        Duration::from_secs(30),
    )];
    let report = orch.run(RequestContext::new("req-2"), slow, &token).await?;
    println!(
        "req-2: {}/{} succeeded ({})",
        report.succeeded,
        report.total(),
        report.verdict.as_label()
    );

    // Let the subscriber worker drain before exiting.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
