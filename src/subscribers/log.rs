//! # LogWriter: tracing-backed event logger
//!
//! A subscriber that turns incoming [`Event`]s into leveled, structured
//! [`tracing`] records. Install any `tracing` subscriber in the host process
//! (e.g. `tracing_subscriber::fmt`) to choose where they go.
//!
//! ## Levels
//! ```text
//! error: generation-failed, subscriber-panicked
//! warn : endpoint-skipped, grace-exceeded, subscriber-overflow
//! info : generation started/stopped, reload requested/applied, shutdown
//! debug: consumer-created, worker starting/stopped
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let generation = e.generation.unwrap_or_default();
        let endpoint = e.endpoint.as_deref().unwrap_or("");
        let worker = e.worker.as_deref().unwrap_or("");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::GenerationFailed => {
                error!(generation, error = reason, "unable to get list of the workers");
            }
            EventKind::SubscriberPanicked => {
                error!(subscriber = worker, info = reason, "subscriber panicked");
            }
            EventKind::EndpointSkipped => {
                warn!(generation, endpoint, error = reason, "unable to create consumer");
            }
            EventKind::GraceExceeded => {
                warn!(generation, error = reason, "workers did not stop within grace");
            }
            EventKind::SubscriberOverflow => {
                warn!(subscriber = worker, reason, "subscriber dropped an event");
            }
            EventKind::ConsumerCreated => {
                debug!(generation, endpoint, "created a new consumer");
            }
            EventKind::WorkerStarting => {
                debug!(generation, worker, "worker starting");
            }
            EventKind::WorkerStopped => {
                debug!(generation, worker, "worker stopped");
            }
            EventKind::GenerationStarted => {
                info!(generation, workers = e.workers.unwrap_or_default(), "generation started");
            }
            EventKind::GenerationStopped => {
                info!(generation, "generation stopped");
            }
            EventKind::ReloadRequested => {
                info!("reload requested");
            }
            EventKind::ReloadApplied => {
                info!(generation, "caught reload signal, stopping all workers");
            }
            EventKind::ShutdownRequested => {
                info!("shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                info!("all workers stopped within grace");
            }
            EventKind::SupervisorStopped => {
                info!("supervisor stopped");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
