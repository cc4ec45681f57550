//! # Bridge demo
//!
//! Runs a supervisor over in-memory "brokers" that emit a message every 500ms
//! and a destination that logs what it receives.
//!
//! - endpoints starting with `bad://` refuse connections (skipped with a warning);
//! - `SIGHUP` reloads: the endpoint list is rotated and a new generation starts;
//! - `SIGINT`/`SIGTERM` shut down cooperatively.
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example bridge
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use genvisor::{
    Connect, ConnectConsumers, ConnectionError, ConsumeError, DeliveryError, Destination,
    DestinationSink, InitializationError, JoinGroup, LogWriter, Message, Open, SinkConfig,
    Source, StaticEndpoints, Subscribe, Supervisor, SupervisorConfig,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

struct Ticker {
    endpoint: String,
    interval: tokio::time::Interval,
    seq: u64,
}

#[async_trait]
impl Source for Ticker {
    async fn next(&mut self) -> Result<Option<Message>, ConsumeError> {
        self.interval.tick().await;
        self.seq += 1;
        let msg = Message::new(self.endpoint.as_str(), format!("tick #{}", self.seq))
            .with_header("x-seq", self.seq.to_string());
        Ok(Some(msg))
    }
}

struct InMemoryBroker;

#[async_trait]
impl Connect for InMemoryBroker {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Source>, ConnectionError> {
        if endpoint.starts_with("bad://") {
            return Err(ConnectionError::new(endpoint, "connection refused"));
        }
        Ok(Box::new(Ticker {
            endpoint: endpoint.to_string(),
            interval: tokio::time::interval(Duration::from_millis(500)),
            seq: 0,
        }))
    }
}

struct LogDestination;

#[async_trait]
impl Destination for LogDestination {
    async fn deliver(&self, msg: &Message) -> Result<(), DeliveryError> {
        tracing::info!(
            endpoint = %msg.endpoint,
            payload = %String::from_utf8_lossy(&msg.payload),
            "delivered"
        );
        Ok(())
    }
}

struct OpenLog;

#[async_trait]
impl Open for OpenLog {
    async fn open(&self) -> Result<Arc<dyn Destination>, InitializationError> {
        Ok(Arc::new(LogDestination))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let rotations: [&[&str]; 2] = [
        &["mem://orders", "bad://billing"],
        &["mem://orders", "mem://shipping"],
    ];
    let endpoints = Arc::new(StaticEndpoints::new(rotations[0].iter().copied()));

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sup = Supervisor::builder(
        SupervisorConfig::default(),
        endpoints.clone(),
        Arc::new(DestinationSink::new(OpenLog, SinkConfig::default())),
        Arc::new(ConnectConsumers::new(InMemoryBroker)),
    )
    .with_subscribers(subs)
    .build();

    let group = JoinGroup::new();
    let shutdown = CancellationToken::new();
    tokio::spawn(Arc::clone(&sup).run(group.slot(), shutdown.clone()));

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut hangup = signal(SignalKind::hangup())?;
        let sup = Arc::clone(&sup);
        let endpoints = Arc::clone(&endpoints);
        tokio::spawn(async move {
            let mut turn = 0usize;
            while hangup.recv().await.is_some() {
                turn += 1;
                endpoints.replace(rotations[turn % rotations.len()].iter().copied());
                sup.reload();
            }
        });
    }

    genvisor::wait_for_shutdown_signal().await?;
    shutdown.cancel();
    group.wait().await;
    sup.close().await;
    Ok(())
}
