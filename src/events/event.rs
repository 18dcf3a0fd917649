//! # Lifecycle events emitted by the harness.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Run events**: cancellation requested, budget exhausted, all workers stopped
//! - **Worker events**: started, stopped
//! - **Instance events**: dispatched, polled, query retry, structural anomaly
//! - **Subscriber events**: overflow, panic
//!
//! The [`Event`] struct carries optional metadata (worker id, parameter, dispatch
//! handle, derived state, ...).
//!
//! ## Ordering
//! `seq` comes from one process-wide counter, so events can be ordered even
//! after the broadcast ring has interleaved them.
//!
//! ## Example
//! ```rust
//! use dispatchload::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::WorkerStopped)
//!     .with_worker(3)
//!     .with_parameter("1")
//!     .with_index(9);
//!
//! assert_eq!(ev.kind, EventKind::WorkerStopped);
//! assert_eq!(ev.parameter.as_deref(), Some("1"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::scheduler::{DispatchHandle, InstanceSnapshot, InstanceState};

/// Source of `Event::seq`.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of harness events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// A subscriber's handler panicked; the subscriber keeps running.
    ///
    /// Sets: `reason` (subscriber name and panic info)
    SubscriberPanicked,

    /// A subscriber queue refused an event (full or closed).
    ///
    /// Sets: `reason`
    SubscriberOverflow,

    // === Run events ===
    /// Interrupt signal observed; the run token is being cancelled.
    ShutdownRequested,

    /// Global time budget elapsed; the run token is being cancelled.
    ///
    /// Sets: `delay_ms` (the budget)
    BudgetExhausted,

    /// Every worker has signalled completion and the outcome channel is closed.
    ///
    /// Sets: `reason` (worker count)
    AllWorkersStopped,

    // === Worker events ===
    /// Worker spawned and about to run its first iteration.
    ///
    /// Sets: `worker`, `parameter`
    WorkerStarted,

    /// Worker left its loop (done, cancelled or receiver gone).
    ///
    /// Sets: `worker`, `parameter`, `index` (iterations completed), `reason`
    WorkerStopped,

    // === Instance events ===
    /// One instance was submitted.
    ///
    /// Sets: `parameter`, `dispatch`
    InstanceDispatched,

    /// One poll tick completed.
    ///
    /// Sets: `parameter`, `dispatch`, `state`
    InstancePolled,

    /// A query failed and will be retried after a delay.
    ///
    /// Sets: `dispatch`, `index` (retry number), `delay_ms`, `reason`
    QueryRetryScheduled,

    /// Named task missing from an instance; carries the snapshot for post-mortems.
    ///
    /// Sets: `worker`, `parameter`, `dispatch`, `snapshot`
    StructuralAnomaly,
}

/// Harness event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Process-wide publication order.
    pub seq: u64,
    /// When the event was built.
    pub at: SystemTime,
    pub kind: EventKind,

    /// Worker ordinal (1-based).
    pub worker: Option<usize>,
    /// Work parameter in use.
    pub parameter: Option<Arc<str>>,
    /// Instance the event refers to.
    pub dispatch: Option<DispatchHandle>,
    /// Iteration or retry index.
    pub index: Option<u32>,
    /// Derived instance state on a poll tick.
    pub state: Option<InstanceState>,
    /// Delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
    /// Diagnostic snapshot (structural anomalies only).
    pub snapshot: Option<Arc<InstanceSnapshot>>,
}

impl Event {
    /// Bare event of `kind`, stamped now; attach metadata with the `with_*` builders.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            parameter: None,
            dispatch: None,
            index: None,
            state: None,
            delay_ms: None,
            reason: None,
            snapshot: None,
        }
    }

    #[inline]
    pub fn with_worker(mut self, id: usize) -> Self {
        self.worker = Some(id);
        self
    }

    #[inline]
    pub fn with_parameter(mut self, p: impl Into<Arc<str>>) -> Self {
        self.parameter = Some(p.into());
        self
    }

    #[inline]
    pub fn with_dispatch(mut self, handle: &DispatchHandle) -> Self {
        self.dispatch = Some(handle.clone());
        self
    }

    #[inline]
    pub fn with_index(mut self, n: u32) -> Self {
        self.index = Some(n);
        self
    }

    #[inline]
    pub fn with_state(mut self, state: InstanceState) -> Self {
        self.state = Some(state);
        self
    }

    /// Attaches a delay (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_snapshot(mut self, snapshot: Arc<InstanceSnapshot>) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::WorkerStarted);
        let b = Event::new(EventKind::WorkerStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn delay_saturates_at_u32() {
        let ev = Event::new(EventKind::BudgetExhausted).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }
}
