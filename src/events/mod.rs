//! Harness events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the pool, workers,
//! pollers and the cancellation source.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `InstancePoller`, `Worker`, `WorkerPool`, `CancellationSource`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the harness listener, which fans out to `SubscriberSet`.
//!
//! Outcomes do **not** travel on the bus: they go through the dedicated
//! bounded outcome channel so that none can be dropped on lag.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
