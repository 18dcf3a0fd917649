//! # LogWriter: lifecycle events to `tracing`
//!
//! Forwards every [`Event`] to the `tracing` pipeline with structured fields.
//! Per-tick noise goes to `debug`, worker and run transitions to `info`,
//! anomalies to `warn`.
//!
//! ## Example output (`RUST_LOG=dispatchload=debug`)
//! ```text
//! INFO  worker started worker=3 param="0"
//! DEBUG instance dispatched param="0" dispatch="sleeper/dispatch-1718-abcd"
//! DEBUG instance polled dispatch="sleeper/dispatch-1718-abcd" state=running
//! WARN  query retry scheduled dispatch="..." retry=1 delay_ms=200 err="..."
//! WARN  shutdown requested
//! INFO  all workers stopped workers=50
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let param = e.parameter.as_deref().unwrap_or("");
        let dispatch = e.dispatch.as_ref().map(|d| d.as_str()).unwrap_or("");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::ShutdownRequested => tracing::warn!("shutdown requested"),
            EventKind::BudgetExhausted => {
                tracing::warn!(budget_ms = ?e.delay_ms, "time budget exhausted")
            }
            EventKind::AllWorkersStopped => tracing::info!(workers = reason, "all workers stopped"),
            EventKind::WorkerStarted => {
                tracing::info!(worker = ?e.worker, param, "worker started")
            }
            EventKind::WorkerStopped => tracing::info!(
                worker = ?e.worker,
                param,
                iterations = ?e.index,
                reason,
                "worker stopped"
            ),
            EventKind::InstanceDispatched => {
                tracing::debug!(param, dispatch, "instance dispatched")
            }
            EventKind::InstancePolled => tracing::debug!(
                dispatch,
                state = e.state.map(|s| s.as_str()).unwrap_or("unknown"),
                "instance polled"
            ),
            EventKind::QueryRetryScheduled => tracing::warn!(
                dispatch,
                retry = ?e.index,
                delay_ms = ?e.delay_ms,
                err = reason,
                "query retry scheduled"
            ),
            EventKind::StructuralAnomaly => {
                tracing::warn!(worker = ?e.worker, param, dispatch, "named task missing from instance")
            }
            EventKind::SubscriberOverflow => tracing::warn!(reason, "subscriber overflow"),
            EventKind::SubscriberPanicked => tracing::error!(reason, "subscriber panicked"),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
