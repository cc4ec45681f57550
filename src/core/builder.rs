use std::sync::Arc;

use super::{SupervisorConfig, generation::GenerationBuilder, supervisor::Supervisor};
use crate::{
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
    workers::{ConsumerFactory, EndpointSource, SinkFactory},
};

/// Builder for constructing a [`Supervisor`] with its injected collaborators.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    endpoints: Arc<dyn EndpointSource>,
    sinks: Arc<dyn SinkFactory>,
    consumers: Arc<dyn ConsumerFactory>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    pub fn new(
        cfg: SupervisorConfig,
        endpoints: Arc<dyn EndpointSource>,
        sinks: Arc<dyn SinkFactory>,
        consumers: Arc<dyn ConsumerFactory>,
    ) -> Self {
        Self {
            cfg,
            endpoints,
            sinks,
            consumers,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers (loggers, metrics...).
    ///
    /// Subscribers receive runtime events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the supervisor and starts its subscriber workers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let generations =
            GenerationBuilder::new(self.endpoints, self.sinks, self.consumers, bus.clone());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());

        let sup = Arc::new(Supervisor::new_internal(self.cfg, bus, generations));
        sup.subscriber_listener(subs);
        sup
    }
}
