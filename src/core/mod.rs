//! Harness core: configuration, polling, workers, pool and cancellation.
//!
//! Internal modules:
//! - [`poller`]: drives one dispatched instance to a terminal state;
//! - [`worker`]: sequential dispatch loop with a fixed parameter;
//! - [`pool`]: fixed fan-out, completion tracking, single channel close;
//! - [`latch`]: counting latch released by worker drop guards;
//! - [`shutdown`]: interrupt signals and time budget → run cancellation;
//! - [`harness`]: wires pool, aggregator and subscribers for one run.

mod builder;
mod config;
mod harness;
mod latch;
mod parameter;
mod poller;
mod pool;
mod shutdown;
mod worker;

pub use builder::HarnessBuilder;
pub use config::HarnessConfig;
pub use harness::Harness;
pub use latch::{CompletionGuard, CompletionLatch};
pub use parameter::WorkParameter;
pub use poller::InstancePoller;
pub use pool::{PoolReport, WorkerPool};
pub use shutdown::{ArmedSource, CancellationSource, wait_for_shutdown_signal};
pub use worker::{StopReason, Worker};
