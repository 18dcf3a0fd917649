//! Error types used by the harness and by individual dispatch attempts.
//!
//! This module defines two main error enums:
//!
//! - [`InitError`]: startup failures (client construction, job read/parse/register).
//!   Fatal: the run is aborted before any worker starts.
//! - [`PollError`]: failures of one dispatch-and-wait cycle. Local to one iteration:
//!   each becomes exactly one [`Outcome`](crate::Outcome) and the worker moves on.
//!
//! Both types provide `as_label` for logs/metrics.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::scheduler::{DispatchHandle, InstanceSnapshot, SchedulerError};

/// # Errors that abort the run before any worker starts.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum InitError {
    /// The scheduler client could not be constructed.
    #[error("error creating client: {error}")]
    Client {
        /// The underlying error message.
        error: String,
    },

    /// The job definition file could not be read.
    #[error("error reading jobspec {path:?}: {source}")]
    ReadJob {
        /// Path that was read.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The scheduler refused to parse the job definition.
    #[error("error parsing job definition: {source}")]
    ParseJob {
        #[source]
        source: SchedulerError,
    },

    /// The scheduler refused to register the job.
    #[error("error registering job: {source}")]
    RegisterJob {
        #[source]
        source: SchedulerError,
    },

    /// An interrupt or the time budget ended startup before the run began.
    #[error("interrupted before the run started")]
    Interrupted,
}

impl InitError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            InitError::Client { .. } => "init_client",
            InitError::ReadJob { .. } => "init_read_job",
            InitError::ParseJob { .. } => "init_parse_job",
            InitError::RegisterJob { .. } => "init_register_job",
            InitError::Interrupted => "init_interrupted",
        }
    }
}

/// Point in the dispatch-and-wait cycle at which cancellation was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelStage {
    /// Token was already cancelled; nothing was submitted.
    BeforeDispatch,
    /// Instance was submitted and the poll loop was waiting on it.
    AwaitingCompletion,
}

impl CancelStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelStage::BeforeDispatch => "before dispatch",
            CancelStage::AwaitingCompletion => "while waiting",
        }
    }
}

/// # Errors produced by one dispatch-and-wait cycle.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PollError {
    /// The scheduler rejected the submission.
    #[error("failed to dispatch job: {error}")]
    Dispatch {
        /// The underlying error message.
        error: String,
    },

    /// Querying the instance state failed (not retried beyond the configured policy).
    #[error("unexpected error fetching allocation from dispatch ID {dispatch}: {error}")]
    Query {
        /// Instance being polled.
        dispatch: DispatchHandle,
        /// The underlying error message.
        error: String,
    },

    /// The named task is absent from the instance.
    ///
    /// Carries the full instance view observed on that tick; the caller decides
    /// whether to persist it.
    #[error("expected {task:?} task but none is found for dispatch ID {dispatch}")]
    Structural {
        /// Named task that was expected.
        task: String,
        /// Instance being polled.
        dispatch: DispatchHandle,
        /// Everything the scheduler reported on the anomalous tick.
        snapshot: Arc<InstanceSnapshot>,
    },

    /// The named task reached a terminal state and is marked failed.
    #[error("{task} task failed {dispatch}: events: {events}")]
    TaskFailed {
        /// Named task.
        task: String,
        /// Instance being polled.
        dispatch: DispatchHandle,
        /// Diagnostic event messages, each bracketed, chronological.
        events: String,
    },

    /// Cancellation was observed before the instance reached a terminal state.
    #[error("context cancelled ({})", stage.as_str())]
    Cancelled {
        /// Where the cycle was when cancellation won.
        stage: CancelStage,
    },

    /// The attempt panicked; the worker survived and reported it.
    #[error("attempt panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl PollError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use dispatchload::{CancelStage, PollError};
    ///
    /// let err = PollError::Cancelled { stage: CancelStage::AwaitingCompletion };
    /// assert_eq!(err.as_label(), "poll_cancelled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            PollError::Dispatch { .. } => "poll_dispatch",
            PollError::Query { .. } => "poll_query",
            PollError::Structural { .. } => "poll_structural",
            PollError::TaskFailed { .. } => "poll_task_failed",
            PollError::Cancelled { .. } => "poll_cancelled",
            PollError::Panicked { .. } => "poll_panicked",
        }
    }

    /// True when the cycle ended because of cancellation rather than a failure.
    ///
    /// Cancelled cycles are tallied as incomplete, not as errors.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PollError::Cancelled { .. })
    }
}
