//! # Generation builder
//!
//! Assembles one concrete worker set for the current endpoint snapshot.
//!
//! ```text
//! SinkFactory::build() ──Err──► BuildError::Sink            (no endpoint attempted)
//!        │ Ok(sink)
//!        ▼
//! for endpoint in EndpointSource::endpoints():               (in list order)
//!     ConsumerFactory::build(endpoint, sink.handle())
//!        ├─ Ok  → keep, publish ConsumerCreated
//!        └─ Err → skip, publish EndpointSkipped
//!        ▼
//! consumers == 0 ──► BuildError::NoUsableConsumer
//! otherwise      ──► Generation [consumer.., sink]
//! ```

use std::sync::Arc;

use crate::error::{BuildError, ConnectionError};
use crate::events::{Bus, Event, EventKind};
use crate::workers::{ConsumerFactory, EndpointSource, SinkFactory, WorkerRef};

/// One assembled worker set: at least one consumer, then exactly one sink.
pub struct Generation {
    id: u64,
    workers: Vec<WorkerRef>,
    skipped: Vec<ConnectionError>,
}

impl Generation {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Workers in construction order: consumers first, the sink last.
    pub fn workers(&self) -> &[WorkerRef] {
        &self.workers
    }

    /// Number of workers to launch (consumers + 1).
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Always `false` for a built generation; provided for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn consumers(&self) -> usize {
        self.workers.len().saturating_sub(1)
    }

    /// Endpoints that failed to connect during this build.
    pub fn skipped(&self) -> &[ConnectionError] {
        &self.skipped
    }

    pub(crate) fn into_workers(self) -> Vec<WorkerRef> {
        self.workers
    }
}

/// Builds generations from injected collaborators, publishing per-endpoint outcomes.
pub struct GenerationBuilder {
    endpoints: Arc<dyn EndpointSource>,
    sinks: Arc<dyn SinkFactory>,
    consumers: Arc<dyn ConsumerFactory>,
    bus: Bus,
}

impl GenerationBuilder {
    pub fn new(
        endpoints: Arc<dyn EndpointSource>,
        sinks: Arc<dyn SinkFactory>,
        consumers: Arc<dyn ConsumerFactory>,
        bus: Bus,
    ) -> Self {
        Self {
            endpoints,
            sinks,
            consumers,
            bus,
        }
    }

    /// Builds generation `id` from a fresh read of the endpoint list.
    pub async fn build(&self, id: u64) -> Result<Generation, BuildError> {
        let sink = Arc::new(self.sinks.build().await?);
        let handle = sink.handle();

        let endpoints = self.endpoints.endpoints();
        let mut workers: Vec<WorkerRef> = Vec::with_capacity(endpoints.len() + 1);
        let mut skipped = Vec::new();

        for endpoint in &endpoints {
            match self.consumers.build(endpoint, &handle).await {
                Ok(consumer) => {
                    workers.push(consumer);
                    self.bus.publish(
                        Event::new(EventKind::ConsumerCreated)
                            .with_generation(id)
                            .with_endpoint(endpoint.as_str()),
                    );
                }
                Err(err) => {
                    self.bus.publish(
                        Event::new(EventKind::EndpointSkipped)
                            .with_generation(id)
                            .with_endpoint(endpoint.as_str())
                            .with_reason(err.to_string()),
                    );
                    skipped.push(err);
                }
            }
        }

        if workers.is_empty() {
            return Err(BuildError::NoUsableConsumer {
                attempted: endpoints.len(),
            });
        }
        workers.push(sink);

        Ok(Generation {
            id,
            workers,
            skipped,
        })
    }
}
