//! Scheduler client facade.
//!
//! The harness only ever talks to the batch scheduler through the [`Scheduler`]
//! trait: register a job once, dispatch parameterized instances, and query the
//! per-task state of a dispatched instance. Wire formats live in the concrete
//! clients.
//!
//! ## Contents
//! - [`Scheduler`] the three-operation facade (async, `Send + Sync`)
//! - [`JobId`], [`DispatchHandle`], [`JobDefinition`] identifiers and payloads
//! - [`RunningUnit`], [`TaskState`], [`TaskEvent`] what a query returns
//! - [`InstanceState`] the coarse state derived from a task view on each tick
//! - [`NomadClient`] HTTP implementation against the Nomad API
//!
//! Implementations must be safe for concurrent use: one client instance is
//! shared read-only by every worker.

mod nomad;
mod types;

#[cfg(test)]
pub(crate) mod scripted;

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

pub use nomad::{NomadClient, NomadConfig};
pub use types::{
    DispatchHandle, InstanceSnapshot, InstanceState, JobDefinition, JobId, RunningUnit,
    TaskEvent, TaskState,
};

/// Errors reported by a scheduler client.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Transport-level failure (connect, timeout, TLS, ...).
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    /// The scheduler answered with a non-success status.
    #[error("scheduler returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request was refused for a reason that is not transport related.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// # Batch scheduler facade.
///
/// Every method is a single round trip; none of them retry. Callers own retry
/// and cancellation policy.
#[async_trait]
pub trait Scheduler: Send + Sync + 'static {
    /// Registers (or updates) a job definition. Called once at startup.
    async fn register_job(&self, definition: &JobDefinition) -> Result<JobId, SchedulerError>;

    /// Submits one parameterized instance of `job`.
    async fn dispatch_instance(
        &self,
        job: &JobId,
        parameters: &BTreeMap<String, String>,
    ) -> Result<DispatchHandle, SchedulerError>;

    /// Returns the units currently running (or finished) for the instance.
    ///
    /// An empty list means nothing has been placed yet.
    async fn query_task_states(
        &self,
        handle: &DispatchHandle,
    ) -> Result<Vec<RunningUnit>, SchedulerError>;
}
