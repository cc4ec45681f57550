//! # Consumer: one broker endpoint feeding the generation's sink.
//!
//! ```text
//! Source::next() ──Ok(Some)──► SinkHandle::forward() ──► (sink queue)
//!       │
//!       ├──Ok(None)──► source finished → exit
//!       └──Err──────► backoff (cancellable) → next()
//! ```
//!
//! Every wait (receive, forward, backoff sleep) is raced against the
//! generation's cancellation token, so a reload or shutdown interrupts it.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::JoinSlot;
use crate::error::ConsumeError;
use crate::policies::BackoffPolicy;
use crate::workers::{Message, Role, SinkHandle, Worker};

/// A connected subscription to one broker endpoint.
#[async_trait]
pub trait Source: Send + 'static {
    /// Waits for the next message.
    ///
    /// `Ok(None)` means the subscription ended for good (queue deleted,
    /// broker closed the channel); the consumer then exits.
    async fn next(&mut self) -> Result<Option<Message>, ConsumeError>;
}

/// Worker bound to exactly one endpoint and the sink of its generation.
pub struct Consumer {
    name: String,
    endpoint: Arc<str>,
    source: Mutex<Box<dyn Source>>,
    sink: SinkHandle,
    retry: BackoffPolicy,
}

impl Consumer {
    pub fn new(endpoint: impl Into<Arc<str>>, source: Box<dyn Source>, sink: SinkHandle) -> Self {
        let endpoint = endpoint.into();
        Self {
            name: format!("consumer:{endpoint}"),
            endpoint,
            source: Mutex::new(source),
            sink,
            retry: BackoffPolicy::default(),
        }
    }

    /// Sets the delay policy applied between failed receives.
    pub fn with_retry(mut self, retry: BackoffPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Worker for Consumer {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> Role {
        Role::Consumer
    }

    async fn run(&self, slot: JoinSlot, cancel: CancellationToken) {
        let _slot = slot;
        let Ok(mut source) = self.source.try_lock() else {
            warn!(endpoint = %self.endpoint, "consumer is already running");
            return;
        };

        let mut retry: u32 = 0;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = source.next() => next,
            };

            match next {
                Ok(Some(msg)) => {
                    retry = 0;
                    let sent = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        sent = self.sink.forward(msg) => sent,
                    };
                    if let Err(err) = sent {
                        warn!(endpoint = %self.endpoint, error = %err, "sink gone, stopping consumer");
                        break;
                    }
                }
                Ok(None) => {
                    info!(endpoint = %self.endpoint, "source finished, stopping consumer");
                    break;
                }
                Err(err) => {
                    let delay = self.retry.next(retry);
                    retry = retry.saturating_add(1);
                    warn!(endpoint = %self.endpoint, error = %err, label = err.as_label(), ?delay, "receive failed, retrying");

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
        debug!(endpoint = %self.endpoint, "consumer stopped");
    }
}
