//! # Harness: wires pool, aggregator and subscribers for one run.
//!
//! ## High-level architecture
//! ```text
//! Harness::run(job, token):
//!   subscriber listener: Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   started = now
//!   WorkerPool::spawn(cfg, poller, bus, token) ─► (pool, rx)
//!   join!(
//!       Aggregator::drain(rx, started)  ─► RunSummary     (ends when rx closes)
//!       pool.join()                     ─► PoolReport
//!   )
//!   stop listener ─► SubscriberSet::shutdown()           (flush diagnostics/logs)
//! ```
//!
//! The summary is only produced once every worker has signalled completion,
//! so an interrupt never drops in-flight outcomes.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::{HarnessBuilder, HarnessConfig, InstancePoller, WorkerPool};
use crate::events::Bus;
use crate::report::{Aggregator, OutcomeSink, RunSummary};
use crate::scheduler::{JobId, Scheduler};
use crate::subscribers::{Subscribe, SubscriberSet};

/// One configured load run.
pub struct Harness {
    cfg: HarnessConfig,
    bus: Bus,
    scheduler: Arc<dyn Scheduler>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    sink: Arc<dyn OutcomeSink>,
}

impl Harness {
    /// Starts building a harness from `cfg`.
    pub fn builder(cfg: HarnessConfig) -> HarnessBuilder {
        HarnessBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: HarnessConfig,
        bus: Bus,
        scheduler: Arc<dyn Scheduler>,
        subscribers: Vec<Arc<dyn Subscribe>>,
        sink: Arc<dyn OutcomeSink>,
    ) -> Self {
        Self {
            cfg,
            bus,
            scheduler,
            subscribers,
            sink,
        }
    }

    /// Event bus of this harness (for the cancellation source and custom publishers).
    pub fn bus(&self) -> Bus {
        self.bus.clone()
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.cfg
    }

    /// Runs the pool against `job` until every worker has finished, then
    /// returns the summary. Cancelling `token` stops workers cooperatively.
    pub async fn run(&self, job: &JobId, token: CancellationToken) -> RunSummary {
        let listener_stop = CancellationToken::new();
        let listener = self.subscriber_listener(listener_stop.clone());

        let poller = Arc::new(InstancePoller::new(
            Arc::clone(&self.scheduler),
            job.clone(),
            self.cfg.task_name.clone(),
            self.cfg.param_key.clone(),
            self.cfg.poll_interval,
            self.cfg.query_retry,
            self.bus.clone(),
        ));

        tracing::info!(
            workers = self.cfg.workers,
            iterations = self.cfg.iterations,
            job = %job,
            "starting dispatch run"
        );
        let started = Instant::now();
        let (pool, rx) = WorkerPool::spawn(&self.cfg, poller, self.bus.clone(), &token);
        let aggregator = Aggregator::new(Arc::clone(&self.sink));
        let (summary, report) = tokio::join!(aggregator.drain(rx, started), pool.join());

        if report.crashed > 0 {
            tracing::error!(crashed = report.crashed, "some workers did not finish cleanly");
        }
        tracing::debug!(?report, "pool joined");

        listener_stop.cancel();
        if let Err(err) = listener.await {
            tracing::warn!(%err, "subscriber listener failed");
        }
        summary
    }

    /// Forwards bus events to the subscriber set until stopped, then flushes it.
    fn subscriber_listener(&self, stop: CancellationToken) -> tokio::task::JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let set = SubscriberSet::new(self.subscribers.clone(), self.bus.clone());
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "event listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => {
                        while let Ok(ev) = rx.try_recv() {
                            set.emit(&ev);
                        }
                        break;
                    }
                }
            }
            set.shutdown().await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::PollError;
    use crate::events::{Event, EventKind};
    use crate::report::RecordingSink;
    use crate::scheduler::scripted::{Plan, ScriptedScheduler, Tick};
    use crate::subscribers::DiagnosticWriter;

    fn cfg(workers: usize, iterations: u32) -> HarnessConfig {
        HarnessConfig {
            workers,
            iterations,
            ..HarnessConfig::default()
        }
    }

    async fn run(
        cfg: HarnessConfig,
        sched: Arc<ScriptedScheduler>,
        sink: Arc<RecordingSink>,
        subs: Vec<Arc<dyn Subscribe>>,
        token: CancellationToken,
    ) -> RunSummary {
        Harness::builder(cfg)
            .with_subscribers(subs)
            .with_sink(sink)
            .build(sched)
            .run(&JobId::new("sleeper"), token)
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn three_workers_two_iterations_all_succeed() {
        let sched = Arc::new(ScriptedScheduler::uniform(Plan::succeed_on_tick(2)));
        let sink = Arc::new(RecordingSink::default());
        let summary = run(cfg(3, 2), sched, sink.clone(), vec![], CancellationToken::new()).await;

        assert_eq!(summary.counts(), (6, 6, 0, 0));
        let lines = sink.lines();
        assert_eq!(lines.len(), 6);
        for line in &lines {
            assert!(
                ["[ 1:", "[ 2:", "[ 0:"].iter().any(|p| line.starts_with(p)),
                "bad prefix: {line}"
            );
            assert!(line.ends_with("] ok"), "bad status: {line}");
        }
        assert!(lines.contains(&"[ 1:0   ] ok".to_string()));
        assert!(lines.contains(&"[ 0:1   ] ok".to_string()));
        assert!(summary.to_string().starts_with("6 done after "));
        assert!(summary.to_string().ends_with(" with 0 errors"));
    }

    #[tokio::test(start_paused = true)]
    async fn single_task_failure_is_one_error_among_ten() {
        // worker 1 dispatches parameter "1"; its third iteration fails.
        let sched = Arc::new(ScriptedScheduler::new(|param, n| {
            if param == "1" && n == 2 {
                Plan::fail_with(vec!["oom", "killed"])
            } else {
                Plan::succeed_on_tick(1)
            }
        }));
        let sink = Arc::new(RecordingSink::default());
        let summary = run(cfg(2, 5), sched, sink.clone(), vec![], CancellationToken::new()).await;

        assert_eq!(summary.total, 10);
        assert_eq!(summary.errors(), 1);
        let failed: Vec<_> = sink
            .lines()
            .into_iter()
            .filter(|l| !l.ends_with("] ok"))
            .collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].starts_with("[ 1:2   ] "));
        assert!(failed[0].contains("<oom> <killed>"));
    }

    #[tokio::test(start_paused = true)]
    async fn each_injected_failure_counts_once() {
        let sched = Arc::new(ScriptedScheduler::new(|param, n| match (param, n) {
            ("1", 0) => Plan::reject_dispatch("quota"),
            ("1", 1) => Plan::ticks(vec![Tick::QueryError("502")]),
            ("2", 1) => Plan::ticks(vec![Tick::MissingTask]),
            ("0", 3) => Plan::fail_with(vec!["exit 1"]),
            _ => Plan::succeed_on_tick(2),
        }));
        let sink = Arc::new(RecordingSink::default());
        let summary = run(cfg(3, 4), sched, sink, vec![], CancellationToken::new()).await;
        assert_eq!(summary.counts(), (12, 8, 4, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn identical_inputs_give_identical_counts() {
        let script = |param: &str, n: usize| {
            if param == "2" && n % 2 == 1 {
                Plan::fail_with(vec!["flaky"])
            } else {
                Plan::succeed_on_tick(1 + n % 3)
            }
        };
        let mut runs = Vec::new();
        for _ in 0..2 {
            let sched = Arc::new(ScriptedScheduler::new(script));
            let sink = Arc::new(RecordingSink::default());
            runs.push(run(cfg(4, 3), sched, sink, vec![], CancellationToken::new()).await);
        }
        assert_eq!(runs[0].counts(), runs[1].counts());
        assert_eq!(runs[0].total, 12);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_mid_run_is_bounded_and_clean() {
        // 2 workers × 5 iterations; every instance needs 2 ticks (6s).
        let sched = Arc::new(ScriptedScheduler::uniform(Plan::succeed_on_tick(2)));
        let sink = Arc::new(RecordingSink::default());
        let token = CancellationToken::new();

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                // two full rounds done at 12s: 4 outcomes
                tokio::time::sleep(Duration::from_secs(13)).await;
                token.cancel();
            })
        };
        let summary = run(cfg(2, 5), sched, sink.clone(), vec![], token).await;
        canceller.await.unwrap();

        assert!((4..=10).contains(&summary.total), "total {}", summary.total);
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.cancelled, summary.total - 4);
        assert_eq!(summary.errors(), 0);

        let mut lines = sink.lines();
        let n = lines.len();
        lines.sort();
        lines.dedup();
        assert_eq!(lines.len(), n, "duplicate outcomes");
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_dispatches_nothing() {
        let sched = Arc::new(ScriptedScheduler::uniform(Plan::succeed_on_tick(1)));
        let token = CancellationToken::new();
        token.cancel();
        let summary = run(
            cfg(3, 10),
            sched.clone(),
            Arc::new(RecordingSink::default()),
            vec![],
            token,
        )
        .await;
        assert_eq!(summary.counts(), (3, 0, 0, 3));
        assert_eq!(sched.dispatched(), 0);
    }

    #[derive(Default)]
    struct Kinds(std::sync::Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Kinds {
        async fn on_event(&self, event: &Event) {
            self.0.lock().unwrap().push(event.kind);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_are_flushed_before_run_returns() {
        let dir = tempfile::tempdir().unwrap();
        let sched = Arc::new(ScriptedScheduler::new(|_, n| {
            if n == 0 {
                Plan::ticks(vec![Tick::MissingTask])
            } else {
                Plan::succeed_on_tick(1)
            }
        }));
        let kinds = Arc::new(Kinds::default());
        let subs: Vec<Arc<dyn Subscribe>> =
            vec![kinds.clone(), Arc::new(DiagnosticWriter::new(dir.path()))];
        let sink = Arc::new(RecordingSink::default());

        let summary = run(cfg(1, 2), sched, sink.clone(), subs, CancellationToken::new()).await;
        assert_eq!(summary.counts(), (2, 1, 1, 0));
        assert!(sink.lines()[0].contains("expected \"sleeper\" task but none is found"));

        let seen = kinds.0.lock().unwrap().clone();
        assert!(seen.contains(&EventKind::StructuralAnomaly));
        assert_eq!(seen.last(), Some(&EventKind::AllWorkersStopped));

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with(".alloc.json"));
    }

    #[test]
    fn panicked_label_is_reported() {
        let err = PollError::Panicked { info: "x".into() };
        assert_eq!(err.as_label(), "poll_panicked");
    }

    #[derive(Default)]
    struct Dispatches(std::sync::Mutex<Vec<String>>);

    #[async_trait]
    impl Subscribe for Dispatches {
        async fn on_event(&self, event: &Event) {
            if event.kind == EventKind::InstanceDispatched {
                if let Some(d) = &event.dispatch {
                    self.0.lock().unwrap().push(d.to_string());
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dispatches_target_the_job_given_to_run() {
        let sched = Arc::new(ScriptedScheduler::uniform(Plan::succeed_on_tick(1)));
        let seen = Arc::new(Dispatches::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![seen.clone()];

        let summary = Harness::builder(cfg(2, 2))
            .with_subscribers(subs)
            .with_sink(Arc::new(RecordingSink::default()))
            .build(sched)
            .run(&JobId::new("other-job"), CancellationToken::new())
            .await;

        assert_eq!(summary.counts(), (4, 4, 0, 0));
        let handles = seen.0.lock().unwrap().clone();
        assert_eq!(handles.len(), 4);
        assert!(
            handles.iter().all(|h| h.starts_with("other-job/dispatch-")),
            "{handles:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shared_bus_sees_run_events() {
        let bus = Bus::new(256);
        let mut rx = bus.subscribe();
        let sched = Arc::new(ScriptedScheduler::uniform(Plan::succeed_on_tick(1)));

        let harness = Harness::builder(cfg(1, 1))
            .with_bus(bus)
            .with_sink(Arc::new(RecordingSink::default()))
            .build(sched);
        harness.run(&JobId::new("sleeper"), CancellationToken::new()).await;

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert_eq!(kinds.first(), Some(&EventKind::WorkerStarted));
        assert_eq!(kinds.last(), Some(&EventKind::AllWorkersStopped));
    }
}
