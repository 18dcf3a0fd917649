//! Result reporting: outcomes, sinks and the aggregator.
//!
//! ```text
//! Worker 1 ──┐
//! Worker 2 ──┼── Outcome ──► [bounded mpsc] ──► Aggregator::drain ──► OutcomeSink::record
//! Worker W ──┘                                        │
//!                                          (channel closed)
//!                                                     └──► RunSummary ──► OutcomeSink::finish
//! ```
//!
//! - [`Outcome`] one record per dispatch-and-wait cycle, produced once, consumed once.
//! - [`OutcomeSink`] caller-supplied destination; [`TracingSink`] logs through `tracing`.
//! - [`Aggregator`] tallies successes, failures and cancellations until the channel closes.
//! - [`RunSummary`] `"<total> done after <elapsed> with <errors> errors"`.

mod aggregator;
mod outcome;
mod sink;

pub use aggregator::{Aggregator, RunSummary};
pub use outcome::{Outcome, OutcomeKind};
pub use sink::{OutcomeSink, TracingSink};

#[cfg(test)]
pub(crate) use sink::RecordingSink;
