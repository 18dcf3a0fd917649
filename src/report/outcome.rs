//! # Outcome of one dispatch-and-wait cycle.

use std::borrow::Cow;

use crate::core::WorkParameter;
use crate::error::PollError;

/// Tally bucket of an [`Outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Succeeded,
    Failed,
    /// Cancellation won before the instance finished. Not counted as an error.
    Cancelled,
}

/// Final, immutable record of one cycle.
#[derive(Debug)]
pub struct Outcome {
    /// Worker ordinal (1-based).
    pub worker: usize,
    /// Iteration index within the worker (0-based).
    pub index: u32,
    /// Parameter the instance was dispatched with.
    pub parameter: WorkParameter,
    /// `Ok` on success, otherwise why the cycle ended.
    pub result: Result<(), PollError>,
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match &self.result {
            Ok(()) => OutcomeKind::Succeeded,
            Err(e) if e.is_cancellation() => OutcomeKind::Cancelled,
            Err(_) => OutcomeKind::Failed,
        }
    }

    /// `"ok"` or the error text.
    pub fn status(&self) -> Cow<'_, str> {
        match &self.result {
            Ok(()) => Cow::Borrowed("ok"),
            Err(e) => Cow::Owned(e.to_string()),
        }
    }

    /// Per-attempt line: `[<parameter>:<index>] <status>`, columns padded for alignment.
    pub fn log_line(&self) -> String {
        format!(
            "[{:>2}:{:<4}] {}",
            self.parameter.as_str(),
            self.index,
            self.status()
        )
    }
}
