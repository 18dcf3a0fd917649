//! # Event consumers.
//!
//! A [`Subscribe`] implementation reacts to harness [`Event`]s off the hot
//! path: the [`SubscriberSet`](crate::subscribers::SubscriberSet) gives it its
//! own queue and task, so a slow file write or a panic never delays a worker
//! or an outcome.

use async_trait::async_trait;

use crate::events::Event;

/// Receives lifecycle events of a run.
///
/// Events that do not fit in the queue are dropped for this subscriber only.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    async fn on_event(&self, event: &Event);

    /// Name used in overflow and panic reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Events buffered before new ones are dropped.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
