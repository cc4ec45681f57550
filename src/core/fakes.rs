//! Test doubles shared by the `core` tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::JoinSlot;
use crate::error::{ConnectionError, DeliveryError, InitializationError};
use crate::workers::{
    ConsumerFactory, Destination, Message, Role, Sink, SinkConfig, SinkFactory, SinkHandle,
    Worker, WorkerRef,
};

/// Counts fake consumers currently inside `run`, across generations.
#[derive(Default)]
pub(crate) struct Probe {
    running: AtomicUsize,
    peak: AtomicUsize,
    started: AtomicUsize,
}

impl Probe {
    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn enter(&self) {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Highest number of consumers ever running at the same time.
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

struct FakeConsumer {
    name: String,
    probe: Arc<Probe>,
    stubborn: bool,
}

#[async_trait]
impl Worker for FakeConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> Role {
        Role::Consumer
    }

    async fn run(&self, slot: JoinSlot, cancel: CancellationToken) {
        self.probe.enter();
        if self.stubborn {
            std::future::pending::<()>().await;
        }
        cancel.cancelled().await;
        self.probe.exit();
        slot.release();
    }
}

/// Consumer factory that fails for the configured endpoints.
pub(crate) struct FakeConsumers {
    probe: Arc<Probe>,
    failing: HashSet<String>,
    stubborn: bool,
    attempted: Mutex<Vec<String>>,
}

impl FakeConsumers {
    pub(crate) fn new(probe: Arc<Probe>) -> Self {
        Self {
            probe,
            failing: HashSet::new(),
            stubborn: false,
            attempted: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(mut self, endpoints: &[&str]) -> Self {
        self.failing = endpoints.iter().map(|e| e.to_string()).collect();
        self
    }

    /// Built consumers ignore cancellation and never release their slot.
    pub(crate) fn stubborn(mut self) -> Self {
        self.stubborn = true;
        self
    }

    /// Every endpoint a build was attempted for, in call order.
    pub(crate) fn attempted(&self) -> Vec<String> {
        self.attempted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConsumerFactory for FakeConsumers {
    async fn build(&self, endpoint: &str, _sink: &SinkHandle) -> Result<WorkerRef, ConnectionError> {
        self.attempted.lock().unwrap().push(endpoint.to_string());
        if self.failing.contains(endpoint) {
            return Err(ConnectionError::new(endpoint, "connection refused"));
        }
        Ok(Arc::new(FakeConsumer {
            name: format!("consumer:{endpoint}"),
            probe: Arc::clone(&self.probe),
            stubborn: self.stubborn,
        }))
    }
}

struct Discard;

#[async_trait]
impl Destination for Discard {
    async fn deliver(&self, _msg: &Message) -> Result<(), DeliveryError> {
        Ok(())
    }
}

pub(crate) struct FakeSinks {
    fail: bool,
}

impl FakeSinks {
    pub(crate) fn ok() -> Self {
        Self { fail: false }
    }

    pub(crate) fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl SinkFactory for FakeSinks {
    async fn build(&self) -> Result<Sink, InitializationError> {
        if self.fail {
            return Err(InitializationError::new("producer unavailable"));
        }
        Ok(Sink::new(Arc::new(Discard), SinkConfig::default()))
    }
}
