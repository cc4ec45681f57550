//! Generation members and the factories that build them.
//!
//! This module provides the worker-related types:
//! - [`Worker`] / [`Role`] - the run contract shared by consumers and the sink
//! - [`Consumer`] + [`Source`] - one endpoint forwarding into the sink
//! - [`Sink`] + [`SinkHandle`] + [`Destination`] - the shared outbound worker
//! - [`EndpointSource`], [`ConsumerFactory`], [`SinkFactory`] - injected collaborators

mod consumer;
mod factory;
mod message;
mod sink;
mod worker;

pub use consumer::{Consumer, Source};
pub use factory::{
    Connect, ConnectConsumers, ConsumerFactory, DestinationSink, EndpointSource, Open, SinkFactory,
    StaticEndpoints,
};
pub use message::Message;
pub use sink::{Destination, Sink, SinkConfig, SinkHandle};
pub use worker::{Role, Worker, WorkerRef};
