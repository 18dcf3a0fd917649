//! # Event bus.
//!
//! [`Bus`] carries lifecycle events from pollers, workers, the pool and the
//! cancellation source to the harness listener, which hands them to the
//! subscribers.
//!
//! ```text
//! InstancePoller ─┐
//! Worker         ─┤
//! WorkerPool     ─┼──► Bus (broadcast ring) ──► Harness listener ──► SubscriberSet
//! Cancellation   ─┘
//! ```
//!
//! Publishing never waits. Events sent while nobody listens are lost, and a
//! listener that falls behind the ring skips the oldest events.

use tokio::sync::broadcast;

use super::event::Event;

/// Cloneable publisher handle; every clone feeds the same ring.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// `capacity` is the ring size (at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Fire and forget.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Listener that sees events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
