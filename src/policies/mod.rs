//! Retry policies for scheduler queries.
//!
//! ## Contents
//! - [`QueryRetryPolicy`] how many times a failed state query is retried before
//!   it becomes a reported error (default: never, one failure ends the attempt)
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy so that many workers hitting a
//!   flaky endpoint do not retry in lockstep
//!
//! ## Quick wiring
//! ```text
//! HarnessConfig { query_retry: QueryRetryPolicy { max_retries, backoff } }
//!      └─► core::poller::InstancePoller uses:
//!           - max_retries to decide retry/report
//!           - backoff.next(retry) to schedule the next query
//! ```

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::QueryRetryPolicy;
