//! # WorkerPool: fixed fan-out with an explicit close protocol.
//!
//! ```text
//! spawn():
//!   (tx, rx) = mpsc::channel(channel_capacity)
//!   latch    = CompletionLatch(W)
//!   for id in 1..=W:
//!       JoinSet.spawn(Worker{ id, param = id % max_param, tx.clone() }.run(token, latch.guard()))
//!   closer:  latch.wait() ──► drop(tx)          (pool's own sender, dropped once)
//!
//! channel closed  ⇐  every worker sender dropped  ∧  closer dropped tx
//!                 ⇐  every CompletionGuard dropped
//! ```
//!
//! The receiver therefore observes closure only after the last worker has
//! signalled completion; no path closes the channel twice or early.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::core::worker::{StopReason, Worker};
use crate::core::{CompletionLatch, HarnessConfig, InstancePoller, WorkParameter};
use crate::events::{Bus, Event, EventKind};
use crate::report::Outcome;

/// How the pool's workers ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub completed: usize,
    pub cancelled: usize,
    pub receiver_closed: usize,
    /// Workers whose task panicked or was aborted outside an attempt.
    pub crashed: usize,
}

/// Owns the running workers and the channel-close protocol.
pub struct WorkerPool {
    set: JoinSet<StopReason>,
    latch: Arc<CompletionLatch>,
    closer: JoinHandle<()>,
    bus: Bus,
    size: usize,
}

impl WorkerPool {
    /// Spawns `cfg.workers` workers and returns the pool with the outcome receiver.
    pub fn spawn(
        cfg: &HarnessConfig,
        poller: Arc<InstancePoller>,
        bus: Bus,
        token: &CancellationToken,
    ) -> (Self, mpsc::Receiver<Outcome>) {
        let (tx, rx) = mpsc::channel(cfg.channel_capacity_clamped());
        let latch = CompletionLatch::new(cfg.workers);
        let mut set = JoinSet::new();

        for id in 1..=cfg.workers {
            let worker = Worker {
                id,
                parameter: WorkParameter::distribute(id, cfg.max_param_clamped()),
                iterations: cfg.iterations,
                poller: Arc::clone(&poller),
                tx: tx.clone(),
                bus: bus.clone(),
            };
            set.spawn(worker.run(token.clone(), latch.guard()));
        }

        let closer = {
            let latch = Arc::clone(&latch);
            tokio::spawn(async move {
                latch.wait().await;
                drop(tx);
            })
        };

        let pool = Self {
            set,
            latch,
            closer,
            bus,
            size: cfg.workers,
        };
        (pool, rx)
    }

    /// Workers that have not yet signalled completion.
    pub fn outstanding(&self) -> usize {
        self.latch.remaining()
    }

    /// Handle on the completion latch (for observers that outlive `join`).
    pub fn latch(&self) -> Arc<CompletionLatch> {
        Arc::clone(&self.latch)
    }

    /// Waits for every worker task and for the channel to be closed.
    pub async fn join(mut self) -> PoolReport {
        let mut report = PoolReport::default();
        while let Some(res) = self.set.join_next().await {
            match res {
                Ok(StopReason::Completed) => report.completed += 1,
                Ok(StopReason::Cancelled) => report.cancelled += 1,
                Ok(StopReason::ReceiverClosed) => report.receiver_closed += 1,
                Err(err) => {
                    report.crashed += 1;
                    if err.is_panic() {
                        tracing::error!(%err, "worker task panicked");
                    } else {
                        tracing::warn!(%err, "worker task aborted");
                    }
                }
            }
        }

        if let Err(err) = self.closer.await {
            tracing::error!(%err, "outcome channel closer failed");
        }
        self.bus.publish(
            Event::new(EventKind::AllWorkersStopped).with_reason(self.size.to_string()),
        );
        report
    }
}
