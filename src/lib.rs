//! # dispatchload
//!
//! **dispatchload** drives a batch-job scheduler with concurrent parameterized
//! dispatches, waits for every instance to finish, and reports per-attempt
//! outcomes and a run summary.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   CancellationSource (SIGINT/SIGTERM, time budget)
//!            │ token
//!            ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Harness                                                          │
//! │  - Bus (broadcast lifecycle events) ─► SubscriberSet              │
//! │  - WorkerPool (W workers, CompletionLatch, single channel close)  │
//! │  - Aggregator (drains outcomes, builds RunSummary)                │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────┐       ┌──────────┐       ┌──────────┐
//!     │ Worker 1 │       │ Worker 2 │  ...  │ Worker W │   param = i % max_param
//!     └────┬─────┘       └────┬─────┘       └────┬─────┘
//!          │ N × InstancePoller::wait_for_completion
//!          ▼                  ▼                  ▼
//!     ┌───────────────────────────────────────────────┐
//!     │  Scheduler (register / dispatch / query)      │  NomadClient, or any impl
//!     └───────────────────────────────────────────────┘
//!          │ Outcome            │ Outcome            │ Outcome
//!          └────────────► [bounded mpsc] ◄───────────┘
//!                              ▼
//!                   Aggregator ─► OutcomeSink ─► "<n> done after <t> with <e> errors"
//! ```
//!
//! ### Per-attempt lifecycle
//! ```text
//! cancelled? ─► dispatch ─► every poll_interval:
//!                             cancelled? ─► Cancelled
//!                             query (bounded retry) ─► no units: keep polling
//!                                                   ─► task missing: Structural (+ snapshot)
//!                                                   ─► dead+failed: TaskFailed("<e1> <e2>")
//!                                                   ─► dead: ok
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types                                  |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Run**           | Configure, build and run one load test.                      | [`Harness`], [`HarnessConfig`]             |
//! | **Cancellation**  | Interrupts and time budget, cooperative.                     | [`CancellationSource`]                     |
//! | **Scheduler**     | Facade over the batch scheduler, Nomad implementation.       | [`Scheduler`], [`NomadClient`]             |
//! | **Reporting**     | Per-attempt outcomes and the final summary.                  | [`Outcome`], [`OutcomeSink`], [`RunSummary`] |
//! | **Events**        | Lifecycle events for logging and diagnostics.                | [`Event`], [`Subscribe`], [`DiagnosticWriter`] |
//! | **Policies**      | Bounded retry of flaky state queries.                        | [`QueryRetryPolicy`], [`BackoffPolicy`]    |
//! | **Errors**        | Fatal startup errors vs per-attempt errors.                  | [`InitError`], [`PollError`]               |
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use dispatchload::{
//!     CancellationSource, Harness, HarnessConfig, LogWriter, NomadClient, NomadConfig,
//!     Scheduler, Subscribe,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(NomadClient::new(NomadConfig::from_env())?);
//!     let def = client.parse_job(&std::fs::read_to_string("sleeper.nomad.hcl")?).await?;
//!     let job = client.register_job(&def).await?;
//!
//!     let cfg = HarnessConfig { workers: 10, iterations: 5, ..HarnessConfig::default() };
//!     let source = CancellationSource::new(cfg.time_budget());
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let harness = Harness::builder(cfg).with_subscribers(subs).build(client);
//!
//!     let token = source.token();
//!     let armed = source.arm(harness.bus());
//!     let summary = harness.run(&job, token).await;
//!     armed.disarm().await;
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod policies;
mod report;
mod scheduler;
mod subscribers;

// ---- Public re-exports ----

pub use core::{
    ArmedSource, CancellationSource, CompletionGuard, CompletionLatch, Harness, HarnessBuilder,
    HarnessConfig, InstancePoller, PoolReport, StopReason, WorkParameter, Worker, WorkerPool,
    wait_for_shutdown_signal,
};
pub use error::{CancelStage, InitError, PollError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, QueryRetryPolicy};
pub use report::{Aggregator, Outcome, OutcomeKind, OutcomeSink, RunSummary, TracingSink};
pub use scheduler::{
    DispatchHandle, InstanceSnapshot, InstanceState, JobDefinition, JobId, NomadClient,
    NomadConfig, RunningUnit, Scheduler, SchedulerError, TaskEvent, TaskState,
};
pub use subscribers::{DiagnosticWriter, LogWriter, Subscribe, SubscriberSet};
