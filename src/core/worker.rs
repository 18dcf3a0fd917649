//! # Worker: sequential dispatch loop with a fixed parameter.
//!
//! ## Loop
//! ```text
//! publish WorkerStarted
//! for index in 0..iterations {
//!   ├─► poller.wait_for_completion(token, parameter)   (panic → Panicked)
//!   ├─► Structural? publish StructuralAnomaly(snapshot) (best-effort diagnostics)
//!   ├─► send Outcome { index, parameter, result }       (receiver gone → stop)
//!   └─► token cancelled? → stop
//! }
//! publish WorkerStopped
//! drop(CompletionGuard)                                 (always, even on unwind)
//! ```
//!
//! ## Rules
//! - At most one instance in flight per worker.
//! - Outcomes of one worker are sent in index order.
//! - An iteration already in flight is never aborted; the poller itself
//!   observes cancellation and returns promptly.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::{CompletionGuard, InstancePoller, WorkParameter};
use crate::error::PollError;
use crate::events::{Bus, Event, EventKind};
use crate::report::Outcome;
use crate::subscribers::panic_message;

/// Why a worker left its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Completed,
    Cancelled,
    ReceiverClosed,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Completed => "completed",
            StopReason::Cancelled => "cancelled",
            StopReason::ReceiverClosed => "receiver closed",
        }
    }
}

/// One concurrent load slot.
pub struct Worker {
    /// Ordinal within the pool (1-based).
    pub id: usize,
    pub parameter: WorkParameter,
    pub iterations: u32,
    pub poller: Arc<InstancePoller>,
    pub tx: mpsc::Sender<Outcome>,
    pub bus: Bus,
}

impl Worker {
    /// Runs up to `iterations` cycles. `guard` is released when this future
    /// completes or is dropped.
    pub async fn run(self, token: CancellationToken, guard: CompletionGuard) -> StopReason {
        let _guard = guard;
        self.bus.publish(
            Event::new(EventKind::WorkerStarted)
                .with_worker(self.id)
                .with_parameter(self.parameter.shared()),
        );

        let mut done: u32 = 0;
        let mut reason = StopReason::Completed;
        for index in 0..self.iterations {
            let result = self.attempt(&token).await;
            if let Err(PollError::Structural {
                dispatch, snapshot, ..
            }) = &result
            {
                self.bus.publish(
                    Event::new(EventKind::StructuralAnomaly)
                        .with_worker(self.id)
                        .with_parameter(self.parameter.shared())
                        .with_dispatch(dispatch)
                        .with_snapshot(Arc::clone(snapshot)),
                );
            }

            let outcome = Outcome {
                worker: self.id,
                index,
                parameter: self.parameter.clone(),
                result,
            };
            if self.tx.send(outcome).await.is_err() {
                reason = StopReason::ReceiverClosed;
                break;
            }
            done += 1;

            if token.is_cancelled() {
                reason = StopReason::Cancelled;
                break;
            }
        }

        self.bus.publish(
            Event::new(EventKind::WorkerStopped)
                .with_worker(self.id)
                .with_parameter(self.parameter.shared())
                .with_index(done)
                .with_reason(reason.as_str()),
        );
        reason
    }

    /// One cycle; a panic inside the poller becomes a reported error.
    async fn attempt(&self, token: &CancellationToken) -> Result<(), PollError> {
        let fut = self.poller.wait_for_completion(token, &self.parameter);
        match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
            Ok(res) => res,
            Err(panic_err) => Err(PollError::Panicked {
                info: panic_message(&*panic_err),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::core::CompletionLatch;
    use crate::policies::QueryRetryPolicy;
    use crate::report::OutcomeKind;
    use crate::scheduler::JobId;
    use crate::scheduler::scripted::{PARAM_KEY, Plan, ScriptedScheduler, TASK, Tick};

    fn worker(
        sched: Arc<ScriptedScheduler>,
        iterations: u32,
        tx: mpsc::Sender<Outcome>,
    ) -> Worker {
        let bus = Bus::new(64);
        let poller = InstancePoller::new(
            sched,
            JobId::new("sleeper"),
            TASK,
            PARAM_KEY,
            Duration::from_secs(3),
            QueryRetryPolicy::never(),
            bus.clone(),
        );
        Worker {
            id: 1,
            parameter: WorkParameter::new("1"),
            iterations,
            poller: Arc::new(poller),
            tx,
            bus,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failures_do_not_stop_remaining_iterations() {
        let sched = Arc::new(ScriptedScheduler::new(|_, n| match n {
            0 => Plan::reject_dispatch("quota"),
            1 => Plan::ticks(vec![Tick::QueryError("timeout")]),
            2 => Plan::ticks(vec![Tick::MissingTask]),
            3 => Plan::fail_with(vec!["oom"]),
            _ => Plan::succeed_on_tick(1),
        }));
        let (tx, mut rx) = mpsc::channel(16);
        let latch = CompletionLatch::new(1);

        let reason = worker(sched, 6, tx)
            .run(CancellationToken::new(), latch.guard())
            .await;
        assert_eq!(reason, StopReason::Completed);
        assert_eq!(latch.remaining(), 0);

        let mut kinds = Vec::new();
        let mut indexes = Vec::new();
        while let Some(o) = rx.recv().await {
            kinds.push(o.kind());
            indexes.push(o.index);
        }
        assert_eq!(indexes, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(
            kinds.iter().filter(|k| **k == OutcomeKind::Failed).count(),
            4
        );
        assert_eq!(
            kinds.iter().filter(|k| **k == OutcomeKind::Succeeded).count(),
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_cancellation_check() {
        let sched = Arc::new(ScriptedScheduler::uniform(Plan::never_finishes()));
        let (tx, mut rx) = mpsc::channel(16);
        let latch = CompletionLatch::new(1);
        let token = CancellationToken::new();

        let handle = tokio::spawn(worker(sched.clone(), 10, tx).run(token.clone(), latch.guard()));
        tokio::time::sleep(Duration::from_secs(4)).await;
        token.cancel();

        assert_eq!(handle.await.unwrap(), StopReason::Cancelled);
        let only = rx.recv().await.unwrap();
        assert_eq!(only.kind(), OutcomeKind::Cancelled);
        assert!(rx.recv().await.is_none());
        assert_eq!(sched.dispatched(), 1);
        assert_eq!(latch.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn poller_panic_becomes_outcome() {
        let sched = Arc::new(ScriptedScheduler::new(|_, n| {
            if n == 0 {
                Plan::ticks(vec![Tick::Panic])
            } else {
                Plan::succeed_on_tick(1)
            }
        }));
        let (tx, mut rx) = mpsc::channel(16);
        let latch = CompletionLatch::new(1);

        worker(sched, 2, tx)
            .run(CancellationToken::new(), latch.guard())
            .await;

        let first = rx.recv().await.unwrap();
        assert!(matches!(first.result, Err(PollError::Panicked { .. })));
        assert!(rx.recv().await.unwrap().result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn structural_anomaly_is_published_with_snapshot() {
        let sched = Arc::new(ScriptedScheduler::uniform(Plan::ticks(vec![Tick::MissingTask])));
        let (tx, _rx) = mpsc::channel(16);
        let w = worker(sched, 1, tx);
        let mut events = w.bus.subscribe();
        let latch = CompletionLatch::new(1);

        w.run(CancellationToken::new(), latch.guard()).await;

        let mut anomaly = None;
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::StructuralAnomaly {
                anomaly = Some(ev);
            }
        }
        let anomaly = anomaly.expect("no structural anomaly published");
        assert_eq!(anomaly.worker, Some(1));
        assert!(anomaly.snapshot.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_receiver_stops_worker() {
        let sched = Arc::new(ScriptedScheduler::uniform(Plan::succeed_on_tick(1)));
        let (tx, rx) = mpsc::channel(16);
        drop(rx);
        let latch = CompletionLatch::new(1);

        let reason = worker(sched.clone(), 5, tx)
            .run(CancellationToken::new(), latch.guard())
            .await;
        assert_eq!(reason, StopReason::ReceiverClosed);
        assert_eq!(sched.dispatched(), 1);
    }
}
