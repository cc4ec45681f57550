//! # Runtime events emitted by the supervisor, the generation builder and worker wrappers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Build events**: consumer construction outcome per endpoint
//! - **Generation events**: generation lifecycle (started, stopped, failed) and reloads
//! - **Worker events**: worker task start/stop inside a generation
//! - **Shutdown events**: outer shutdown and grace handling
//!
//! The [`Event`] struct carries additional metadata such as timestamps, generation id,
//! worker name, endpoint, and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use genvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::EndpointSkipped)
//!     .with_generation(3)
//!     .with_endpoint("amqp://broker-a")
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::EndpointSkipped);
//! assert_eq!(ev.endpoint.as_deref(), Some("amqp://broker-a"));
//! assert_eq!(ev.reason.as_deref(), Some("connection refused"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `worker`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `worker`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Build events ===
    /// A consumer was constructed for an endpoint.
    ///
    /// Sets:
    /// - `generation`: id of the generation being built
    /// - `endpoint`: endpoint identifier
    ConsumerCreated,

    /// A consumer could not be constructed; the endpoint is skipped for this generation.
    ///
    /// Sets:
    /// - `generation`: id of the generation being built
    /// - `endpoint`: endpoint identifier
    /// - `reason`: connection error
    EndpointSkipped,

    // === Generation events ===
    /// All workers of a generation are about to be launched.
    ///
    /// Sets:
    /// - `generation`: generation id
    /// - `workers`: number of launched workers (consumers + 1)
    GenerationStarted,

    /// Every worker of a generation has exited and released its join slot.
    ///
    /// Sets:
    /// - `generation`: generation id
    GenerationStopped,

    /// The generation could not be built; the generation loop terminates.
    ///
    /// Sets:
    /// - `generation`: id the failed generation would have had
    /// - `reason`: build error
    GenerationFailed,

    /// `Supervisor::reload()` was called.
    ReloadRequested,

    /// A pending reload was consumed and the generation's cancellation token was closed.
    ///
    /// Sets:
    /// - `generation`: id of the cancelled generation
    ReloadApplied,

    // === Worker events ===
    /// A worker task has been spawned.
    ///
    /// Sets:
    /// - `generation`: generation id
    /// - `worker`: worker name
    WorkerStarting,

    /// A worker's `run` returned.
    ///
    /// Sets:
    /// - `generation`: generation id
    /// - `worker`: worker name
    WorkerStopped,

    // === Shutdown events ===
    /// Outer shutdown signal observed; the supervisor is now inactive.
    ShutdownRequested,

    /// The generation loop finished within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; the running generation did not drain in time.
    ///
    /// Sets:
    /// - `generation`: id of the stuck generation
    /// - `reason`: runtime error
    GraceExceeded,

    /// `Supervisor::run` is returning and releasing its join slot.
    SupervisorStopped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Generation id, if applicable.
    pub generation: Option<u64>,
    /// Worker (or subscriber) name, if applicable.
    pub worker: Option<Arc<str>>,
    /// Broker endpoint identifier, if applicable.
    pub endpoint: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Number of workers launched in a generation.
    pub workers: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            generation: None,
            worker: None,
            endpoint: None,
            reason: None,
            workers: None,
        }
    }

    /// Attaches a generation id.
    #[inline]
    pub fn with_generation(mut self, id: u64) -> Self {
        self.generation = Some(id);
        self
    }

    /// Attaches a worker name.
    #[inline]
    pub fn with_worker(mut self, name: impl Into<Arc<str>>) -> Self {
        self.worker = Some(name.into());
        self
    }

    /// Attaches an endpoint identifier.
    #[inline]
    pub fn with_endpoint(mut self, endpoint: impl Into<Arc<str>>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a launched worker count.
    #[inline]
    pub fn with_workers(mut self, n: usize) -> Self {
        self.workers = Some(u32::try_from(n).unwrap_or(u32::MAX));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}
