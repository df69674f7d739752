//! # Orchestrator: watchdog-bounded, fallback-protected business operations.
//!
//! One orchestrated request combines the supervisor policies:
//!
//! ```text
//! run(request, operations, token)
//!   ├─► validate (OrchestratorError::InvalidConfig)
//!   ├─► scope = token.child_token()
//!   ├─► watchdog(ceiling, scope)
//!   ├─► gather(CollectAll)  ── op 1: Fallback(primary, fallback)
//!   │                       ├─ op 2: Fallback(primary, fallback)
//!   │                       └─ op N: ...
//!   ├─► watchdog.finish() ──► verdict
//!   └─► Report { per-operation outcome, succeeded, verdict, elapsed }
//! ```
//!
//! Individual operation failures never surface as errors; they are slots in the [`Report`].

mod config;
mod core;
mod operation;
mod report;

pub use config::OrchestratorConfig;
pub use core::Orchestrator;
pub use operation::Operation;
pub use report::{BatchReport, OperationReport, Report};
