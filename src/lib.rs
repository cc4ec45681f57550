//! # genvisor
//!
//! **genvisor** is a worker-generation supervisor for message bridges.
//!
//! It owns a dynamic set of concurrent workers (one consumer per broker
//! endpoint, plus one shared sink they all forward into), can restart the whole
//! set on demand ("reload") and shuts it down cooperatively.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   EndpointSource      SinkFactory        ConsumerFactory      Subscribe (LogWriter, ...)
//!         │                  │                    │                     ▲
//!         └──────────┬───────┴────────────────────┘                     │
//!                    ▼                                                  │
//! ┌───────────────────────────────────────────────┐     ┌──────────────────────────┐
//! │  Supervisor                                   │     │  Bus ─► SubscriberSet    │
//! │  - run(slot, shutdown) / reload()             │────►│  (events for logs,       │
//! │  - generation loop                            │     │   metrics, tests)        │
//! │  - GenerationBuilder                          │     └──────────────────────────┘
//! └──────┬────────────────────────────────────────┘
//!        ▼   one generation at a time
//!  ┌─────────────┐  ┌─────────────┐        ┌──────────┐
//!  │ Consumer X  │  │ Consumer Y  │  ...   │   Sink   │
//!  └──────┬──────┘  └──────┬──────┘        └────▲─────┘
//!         └────── forward ─┴────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! run(slot, shutdown):
//!   active = true
//!   loop while active {
//!     ├─► build: sink first, then one consumer per endpoint (failures skipped)
//!     │     └─ no consumer / no sink ─► GenerationFailed, loop ends (no retry)
//!     ├─► fresh CancellationToken + JoinGroup
//!     ├─► launch every worker with its JoinSlot
//!     ├─► reload() or shutdown ─► token cancelled ─► workers exit
//!     └─► JoinGroup drained ─► next generation
//!   }
//!   shutdown ─► active = false ─► drain (≤ grace) ─► release slot
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                              |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------------|
//! | **Supervision**   | Generation loop, reload, cooperative shutdown.               | [`Supervisor`], [`SupervisorConfig`]            |
//! | **Workers**       | Run contract and the two concrete members.                   | [`Worker`], [`Consumer`], [`Sink`]              |
//! | **Collaborators** | Injected endpoint list and factories.                        | [`EndpointSource`], [`ConsumerFactory`], [`SinkFactory`] |
//! | **Join counter**  | Per-generation barrier released by worker slots.             | [`JoinGroup`], [`JoinSlot`]                     |
//! | **Events**        | Lifecycle events and pluggable subscribers.                  | [`Event`], [`Subscribe`]                        |
//! | **Policies**      | Worker-internal retry delays.                                | [`BackoffPolicy`], [`JitterPolicy`]             |
//! | **Errors**        | Typed errors for builds, workers and the runtime.            | [`BuildError`], [`ConnectionError`], [`RuntimeError`] |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], a `tracing`-backed subscriber.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use genvisor::{
//!     ConnectionError, ConsumerFactory, Destination, DeliveryError, InitializationError,
//!     JoinGroup, JoinSlot, Message, Role, Sink, SinkConfig, SinkFactory, SinkHandle,
//!     StaticEndpoints, Supervisor, SupervisorConfig, Worker, WorkerRef,
//! };
//!
//! struct Stdout;
//!
//! #[async_trait]
//! impl Destination for Stdout {
//!     async fn deliver(&self, msg: &Message) -> Result<(), DeliveryError> {
//!         println!("{}: {} bytes", msg.endpoint, msg.payload.len());
//!         Ok(())
//!     }
//! }
//!
//! struct Sinks;
//!
//! #[async_trait]
//! impl SinkFactory for Sinks {
//!     async fn build(&self) -> Result<Sink, InitializationError> {
//!         Ok(Sink::new(Arc::new(Stdout), SinkConfig::default()))
//!     }
//! }
//!
//! struct Idle(String);
//!
//! #[async_trait]
//! impl Worker for Idle {
//!     fn name(&self) -> &str { &self.0 }
//!     fn role(&self) -> Role { Role::Consumer }
//!     async fn run(&self, slot: JoinSlot, cancel: CancellationToken) {
//!         cancel.cancelled().await;
//!         slot.release();
//!     }
//! }
//!
//! struct Consumers;
//!
//! #[async_trait]
//! impl ConsumerFactory for Consumers {
//!     async fn build(&self, endpoint: &str, _sink: &SinkHandle) -> Result<WorkerRef, ConnectionError> {
//!         Ok(Arc::new(Idle(format!("consumer:{endpoint}"))))
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let endpoints = Arc::new(StaticEndpoints::new(["amqp://a", "amqp://b"]));
//!     let sup = Supervisor::builder(
//!         SupervisorConfig::default(),
//!         endpoints,
//!         Arc::new(Sinks),
//!         Arc::new(Consumers),
//!     )
//!     .build();
//!
//!     let group = JoinGroup::new();
//!     let shutdown = CancellationToken::new();
//!     tokio::spawn(Arc::clone(&sup).run(group.slot(), shutdown.clone()));
//!
//!     sup.reload();
//!     shutdown.cancel();
//!     group.wait().await;
//!     sup.close().await;
//! }
//! ```
mod core;
mod error;
mod events;
mod policies;
mod subscribers;
mod workers;

// ---- Public re-exports ----

pub use crate::core::{
    Generation, GenerationBuilder, JoinGroup, JoinSlot, Supervisor, SupervisorBuilder,
    SupervisorConfig, wait_for_shutdown_signal,
};
pub use error::{
    BuildError, ConnectionError, ConsumeError, DeliveryError, InitializationError, RuntimeError,
    SinkClosed,
};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use subscribers::{Subscribe, SubscriberSet};
pub use workers::{
    Connect, ConnectConsumers, Consumer, ConsumerFactory, Destination, DestinationSink,
    EndpointSource, Message, Open, Role, Sink, SinkConfig, SinkFactory, SinkHandle, Source,
    StaticEndpoints, Worker, WorkerRef,
};

// Optional: expose the built-in tracing subscriber.
// Enabled by default with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
