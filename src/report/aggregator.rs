//! # Aggregator: drains the outcome channel into a [`RunSummary`].
//!
//! Outcomes from different workers interleave arbitrarily; the aggregator only
//! counts. It finishes when the channel reports closed, which the pool
//! guarantees happens after the last worker has signalled completion.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::report::{Outcome, OutcomeKind, OutcomeSink};

/// Totals of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Outcomes received.
    pub total: usize,
    pub succeeded: usize,
    /// Outcomes that ended in an error other than cancellation.
    pub failed: usize,
    /// Outcomes that ended because cancellation won.
    pub cancelled: usize,
    /// Wall time from pool start to channel closure, rounded to the nearest millisecond.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Error tally reported in the summary line.
    #[inline]
    pub fn errors(&self) -> usize {
        self.failed
    }

    /// Counts only, for comparing runs whose timing differs.
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (self.total, self.succeeded, self.failed, self.cancelled)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} done after {:?} with {} errors",
            self.total,
            self.elapsed,
            self.errors()
        )
    }
}

/// Consumes outcomes and reports them to a sink.
pub struct Aggregator {
    sink: Arc<dyn OutcomeSink>,
    summary: RunSummary,
}

impl Aggregator {
    pub fn new(sink: Arc<dyn OutcomeSink>) -> Self {
        Self {
            sink,
            summary: RunSummary::default(),
        }
    }

    /// Tallies one outcome and forwards it to the sink.
    pub fn observe(&mut self, outcome: &Outcome) {
        self.summary.total += 1;
        match outcome.kind() {
            OutcomeKind::Succeeded => self.summary.succeeded += 1,
            OutcomeKind::Failed => self.summary.failed += 1,
            OutcomeKind::Cancelled => self.summary.cancelled += 1,
        }
        self.sink.record(outcome);
    }

    /// Drains `rx` until it closes, then finalizes the summary.
    pub async fn drain(mut self, mut rx: mpsc::Receiver<Outcome>, started: Instant) -> RunSummary {
        while let Some(outcome) = rx.recv().await {
            self.observe(&outcome);
        }
        self.summary.elapsed = round_to_millis(started.elapsed());
        self.sink.finish(&self.summary);
        self.summary
    }
}

/// Nearest whole millisecond, halves rounded up.
fn round_to_millis(d: Duration) -> Duration {
    let millis = (d.as_micros() + 500) / 1000;
    Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}
