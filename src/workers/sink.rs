//! # Sink: the shared outbound worker of a generation.
//!
//! A [`Sink`] owns the receiving end of a bounded queue. Consumers push into it
//! through cloned [`SinkHandle`]s and the sink delivers each message to its
//! [`Destination`].
//!
//! ```text
//! Consumer X ──forward()──┐
//! Consumer Y ──forward()──┼──► [mpsc, capacity] ──► Sink::run ──► Destination::deliver
//! Consumer Z ──forward()──┘                           │
//!                                                     └─ Err → backoff (cancellable) → retry same message
//! ```
//!
//! ## Rules
//! - Delivery failures are retried with [`BackoffPolicy`] until success or cancellation.
//! - On cancellation the sink stops immediately; queued messages are dropped with the generation.
//! - Once running, the sink holds no sender of its own: when every [`SinkHandle`] is
//!   gone it delivers what is queued and exits.
//! - A sink instance is run at most once; a second `run` releases its slot and returns.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::JoinSlot;
use crate::error::{DeliveryError, SinkClosed};
use crate::policies::BackoffPolicy;
use crate::workers::{Message, Role, Worker};

/// Where the sink hands messages off to (a Kafka producer, an HTTP endpoint...).
#[async_trait]
pub trait Destination: Send + Sync + 'static {
    /// Delivers one message. An error makes the sink retry the same message.
    async fn deliver(&self, msg: &Message) -> Result<(), DeliveryError>;
}

/// Sink tuning.
#[derive(Clone, Copy, Debug)]
pub struct SinkConfig {
    /// Capacity of the queue between consumers and the sink (min 1).
    pub capacity: usize,
    /// Delay policy between delivery retries.
    pub retry: BackoffPolicy,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            retry: BackoffPolicy::default(),
        }
    }
}

/// Capability for pushing messages into a sink. Cheap to clone.
#[derive(Clone, Debug)]
pub struct SinkHandle {
    tx: mpsc::Sender<Message>,
}

impl SinkHandle {
    /// Queues a message for delivery, waiting while the queue is full.
    pub async fn forward(&self, msg: Message) -> Result<(), SinkClosed> {
        self.tx.send(msg).await.map_err(|_| SinkClosed)
    }

    /// Returns `true` once the sink dropped its receiving end.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

struct Inbox {
    rx: mpsc::Receiver<Message>,
    /// Keeps the queue open until `run` starts.
    seed: Option<mpsc::Sender<Message>>,
}

/// The single shared outbound worker of a generation.
pub struct Sink {
    name: String,
    tx: mpsc::WeakSender<Message>,
    inbox: Mutex<Inbox>,
    destination: Arc<dyn Destination>,
    retry: BackoffPolicy,
}

impl Sink {
    pub fn new(destination: Arc<dyn Destination>, cfg: SinkConfig) -> Self {
        let (tx, rx) = mpsc::channel(cfg.capacity.max(1));
        Self {
            name: "sink".to_string(),
            tx: tx.downgrade(),
            inbox: Mutex::new(Inbox { rx, seed: Some(tx) }),
            destination,
            retry: cfg.retry,
        }
    }

    /// Overrides the worker name reported in events (default `"sink"`).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns a handle consumers use to forward into this sink.
    ///
    /// Asked for after the sink started and lost all its senders, the handle
    /// is already closed.
    pub fn handle(&self) -> SinkHandle {
        let tx = self
            .tx
            .upgrade()
            .unwrap_or_else(|| mpsc::channel(1).0);
        SinkHandle { tx }
    }

    /// Delivers `msg`, retrying on failure. Returns `false` if cancelled first.
    async fn deliver(&self, msg: &Message, cancel: &CancellationToken) -> bool {
        let mut retry: u32 = 0;
        loop {
            let res = tokio::select! {
                biased;
                _ = cancel.cancelled() => return false,
                res = self.destination.deliver(msg) => res,
            };
            let Err(err) = res else {
                return true;
            };

            let delay = self.retry.next(retry);
            retry = retry.saturating_add(1);
            warn!(sink = %self.name, endpoint = %msg.endpoint, error = %err, ?delay, "delivery failed, retrying");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[async_trait]
impl Worker for Sink {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> Role {
        Role::Sink
    }

    async fn run(&self, slot: JoinSlot, cancel: CancellationToken) {
        let _slot = slot;
        let Ok(mut inbox) = self.inbox.try_lock() else {
            warn!(sink = %self.name, "sink is already running");
            return;
        };
        inbox.seed = None;

        loop {
            let msg = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                msg = inbox.rx.recv() => match msg {
                    Some(msg) => msg,
                    None => {
                        debug!(sink = %self.name, "every handle dropped");
                        break;
                    }
                },
            };
            if !self.deliver(&msg, &cancel).await {
                break;
            }
        }
        debug!(sink = %self.name, "sink stopped");
    }
}
