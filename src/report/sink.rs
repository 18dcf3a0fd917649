//! # Outcome sinks.
//!
//! The aggregator hands every [`Outcome`] and the final [`RunSummary`] to an
//! [`OutcomeSink`]. Sinks are called from the single aggregator task, in
//! arrival order.

use crate::report::{Outcome, OutcomeKind, RunSummary};

/// Destination for per-attempt outcomes and the final summary.
pub trait OutcomeSink: Send + Sync + 'static {
    /// Called once per outcome, as it arrives.
    fn record(&self, outcome: &Outcome);

    /// Called once, after the outcome channel has closed.
    fn finish(&self, summary: &RunSummary);
}

/// Logs outcomes through `tracing` (`info` for successes, `warn` otherwise).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl OutcomeSink for TracingSink {
    fn record(&self, outcome: &Outcome) {
        let line = outcome.log_line();
        match outcome.kind() {
            OutcomeKind::Succeeded => tracing::info!(worker = outcome.worker, "{line}"),
            OutcomeKind::Failed => tracing::warn!(
                worker = outcome.worker,
                kind = outcome.result.as_ref().err().map(|e| e.as_label()),
                "{line}"
            ),
            OutcomeKind::Cancelled => tracing::info!(worker = outcome.worker, "{line}"),
        }
    }

    fn finish(&self, summary: &RunSummary) {
        tracing::info!("{summary}");
        if summary.cancelled > 0 {
            tracing::info!(
                cancelled = summary.cancelled,
                "attempts interrupted by cancellation (not counted as errors)"
            );
        }
    }
}

#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) lines: std::sync::Mutex<Vec<String>>,
    pub(crate) summaries: std::sync::Mutex<Vec<RunSummary>>,
}

#[cfg(test)]
impl RecordingSink {
    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl OutcomeSink for RecordingSink {
    fn record(&self, outcome: &Outcome) {
        self.lines.lock().unwrap().push(outcome.log_line());
    }

    fn finish(&self, summary: &RunSummary) {
        self.summaries.lock().unwrap().push(summary.clone());
    }
}
