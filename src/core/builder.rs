use std::sync::Arc;

use super::{HarnessConfig, harness::Harness};
use crate::{
    events::Bus,
    report::{OutcomeSink, TracingSink},
    scheduler::Scheduler,
    subscribers::Subscribe,
};

/// Builder for constructing a [`Harness`].
pub struct HarnessBuilder {
    cfg: HarnessConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    sink: Option<Arc<dyn OutcomeSink>>,
    bus: Option<Bus>,
}

impl HarnessBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: HarnessConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            sink: None,
            bus: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive lifecycle events (dispatches, ticks, anomalies, ...)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets where outcomes and the final summary are reported.
    ///
    /// Defaults to [`TracingSink`].
    pub fn with_sink(mut self, sink: Arc<dyn OutcomeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Uses an existing bus, e.g. one a cancellation source was armed with
    /// before the harness was built. Otherwise a bus of `bus_capacity` is created.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Builds the harness around a shared scheduler client.
    pub fn build(self, scheduler: Arc<dyn Scheduler>) -> Harness {
        let bus = self.bus.unwrap_or_else(|| Bus::new(self.cfg.bus_capacity));
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        Harness::new_internal(self.cfg, bus, scheduler, self.subscribers, sink)
    }
}
