//! # Collaborators injected into the generation builder.
//!
//! - [`EndpointSource`]: the ordered endpoint list, re-read on every build.
//! - [`SinkFactory`]: builds the generation's single [`Sink`].
//! - [`ConsumerFactory`]: builds one consumer worker per endpoint.
//!
//! Two ready-made factories cover the common case where only the broker and
//! destination protocols are custom:
//! - [`ConnectConsumers`] wraps a [`Connect`] into [`Consumer`] workers;
//! - [`DestinationSink`] wraps an [`Open`] into a [`Sink`].

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::{ConnectionError, InitializationError};
use crate::policies::BackoffPolicy;
use crate::workers::{Consumer, Destination, Sink, SinkConfig, SinkHandle, Source, WorkerRef};

/// Ordered list of broker endpoint identifiers. May be empty.
pub trait EndpointSource: Send + Sync + 'static {
    fn endpoints(&self) -> Vec<String>;
}

/// In-memory endpoint list that can be replaced at runtime
/// (e.g. by a config watcher before calling `Supervisor::reload`).
#[derive(Debug, Default)]
pub struct StaticEndpoints {
    list: RwLock<Vec<String>>,
}

impl StaticEndpoints {
    pub fn new<I, S>(list: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            list: RwLock::new(list.into_iter().map(Into::into).collect()),
        }
    }

    /// Replaces the list; the next generation build sees the new one.
    pub fn replace<I, S>(&self, list: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = list.into_iter().map(Into::into).collect();
        *self.list.write().unwrap_or_else(PoisonError::into_inner) = list;
    }
}

impl EndpointSource for StaticEndpoints {
    fn endpoints(&self) -> Vec<String> {
        self.list
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Builds the shared sink of a generation.
#[async_trait]
pub trait SinkFactory: Send + Sync + 'static {
    async fn build(&self) -> Result<Sink, InitializationError>;
}

/// Builds the consumer worker for one endpoint, bound to the generation's sink.
#[async_trait]
pub trait ConsumerFactory: Send + Sync + 'static {
    async fn build(&self, endpoint: &str, sink: &SinkHandle) -> Result<WorkerRef, ConnectionError>;
}

/// Opens a subscription on a broker endpoint.
#[async_trait]
pub trait Connect: Send + Sync + 'static {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Source>, ConnectionError>;
}

/// Opens the outbound destination.
#[async_trait]
pub trait Open: Send + Sync + 'static {
    async fn open(&self) -> Result<Arc<dyn Destination>, InitializationError>;
}

/// [`ConsumerFactory`] producing [`Consumer`] workers from a [`Connect`].
pub struct ConnectConsumers<C> {
    connector: C,
    retry: BackoffPolicy,
}

impl<C: Connect> ConnectConsumers<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            retry: BackoffPolicy::default(),
        }
    }

    /// Receive-retry policy handed to every consumer built.
    pub fn with_retry(mut self, retry: BackoffPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl<C: Connect> ConsumerFactory for ConnectConsumers<C> {
    async fn build(&self, endpoint: &str, sink: &SinkHandle) -> Result<WorkerRef, ConnectionError> {
        let source = self.connector.connect(endpoint).await?;
        let consumer = Consumer::new(endpoint, source, sink.clone()).with_retry(self.retry);
        Ok(Arc::new(consumer))
    }
}

/// [`SinkFactory`] producing a [`Sink`] around a freshly opened [`Destination`].
pub struct DestinationSink<O> {
    opener: O,
    cfg: SinkConfig,
}

impl<O: Open> DestinationSink<O> {
    pub fn new(opener: O, cfg: SinkConfig) -> Self {
        Self { opener, cfg }
    }
}

#[async_trait]
impl<O: Open> SinkFactory for DestinationSink<O> {
    async fn build(&self) -> Result<Sink, InitializationError> {
        let destination = self.opener.open().await?;
        Ok(Sink::new(destination, self.cfg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConsumeError, DeliveryError};
    use crate::workers::{Message, Role, Worker};

    struct Never;

    #[async_trait]
    impl Source for Never {
        async fn next(&mut self) -> Result<Option<Message>, ConsumeError> {
            std::future::pending().await
        }
    }

    struct OnlyLocal;

    #[async_trait]
    impl Connect for OnlyLocal {
        async fn connect(&self, endpoint: &str) -> Result<Box<dyn Source>, ConnectionError> {
            if endpoint.starts_with("amqp://localhost") {
                Ok(Box::new(Never))
            } else {
                Err(ConnectionError::new(endpoint, "no route to host"))
            }
        }
    }

    struct Discard;

    #[async_trait]
    impl Destination for Discard {
        async fn deliver(&self, _msg: &Message) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    struct Opener(bool);

    #[async_trait]
    impl Open for Opener {
        async fn open(&self) -> Result<Arc<dyn Destination>, InitializationError> {
            if self.0 {
                Ok(Arc::new(Discard))
            } else {
                Err(InitializationError::new("no brokers"))
            }
        }
    }

    #[test]
    fn test_static_endpoints_replace() {
        let eps = StaticEndpoints::new(["a", "b"]);
        assert_eq!(eps.endpoints(), vec!["a", "b"]);
        eps.replace(["c"]);
        assert_eq!(eps.endpoints(), vec!["c"]);
        eps.replace(Vec::<String>::new());
        assert!(eps.endpoints().is_empty());
    }

    #[tokio::test]
    async fn test_connect_consumers_builds_named_consumer() {
        let sink = DestinationSink::new(Opener(true), SinkConfig::default())
            .build()
            .await
            .expect("sink");
        let factory = ConnectConsumers::new(OnlyLocal);

        let worker = factory
            .build("amqp://localhost:5672", &sink.handle())
            .await
            .expect("consumer");
        assert_eq!(worker.role(), Role::Consumer);
        assert_eq!(worker.name(), "consumer:amqp://localhost:5672");

        let err = factory
            .build("amqp://remote:5672", &sink.handle())
            .await
            .err()
            .expect("connection error");
        assert_eq!(err.endpoint, "amqp://remote:5672");
    }

    #[tokio::test]
    async fn test_destination_sink_propagates_open_failure() {
        let err = DestinationSink::new(Opener(false), SinkConfig::default())
            .build()
            .await
            .err()
            .expect("init error");
        assert_eq!(err.reason, "no brokers");
    }
}
