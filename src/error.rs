//! Error types used by the genvisor runtime and its workers.
//!
//! This module defines the failures that cross the supervisor's boundaries:
//!
//! - [`ConnectionError`]: a consumer could not be built for one endpoint (recoverable, local).
//! - [`InitializationError`]: the shared sink could not be built (fatal for the build).
//! - [`BuildError`]: a whole generation could not be assembled.
//! - [`ConsumeError`] / [`DeliveryError`] / [`SinkClosed`]: worker-internal faults.
//! - [`RuntimeError`]: failures of the orchestration itself (shutdown grace).
//!
//! Every enum provides `as_label` (stable snake_case label for logs/metrics).

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the genvisor runtime.
///
/// These represent failures in the orchestration system itself,
/// such as a shutdown sequence exceeding its grace period.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some workers of the running generation never exited.
    #[error("shutdown timeout {grace:?} exceeded; generation {generation} still running")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Id of the generation whose workers did not stop in time.
        generation: u64,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use genvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), generation: 3 };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// A consumer could not be constructed for one broker endpoint
/// (unreachable, unauthenticated, rejected...).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unable to connect to {endpoint}: {reason}")]
pub struct ConnectionError {
    /// Endpoint identifier the connection was attempted for.
    pub endpoint: String,
    /// Underlying failure message.
    pub reason: String,
}

impl ConnectionError {
    pub fn new(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }
}

/// The shared sink could not be constructed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unable to initialize sink: {reason}")]
pub struct InitializationError {
    /// Underlying failure message.
    pub reason: String,
}

impl InitializationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// # Errors produced while assembling a generation.
///
/// Both variants are fatal to the generation loop: it stops and is not retried.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The sink factory failed; no endpoint was attempted.
    #[error("an error occurred while instantiating the sink: {0}")]
    Sink(#[from] InitializationError),

    /// Every configured endpoint failed (or none was configured).
    #[error("no usable consumer: {attempted} endpoint(s) attempted, all failed")]
    NoUsableConsumer {
        /// Number of endpoints that were attempted.
        attempted: usize,
    },
}

impl BuildError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use genvisor::BuildError;
    ///
    /// let err = BuildError::NoUsableConsumer { attempted: 0 };
    /// assert_eq!(err.as_label(), "build_no_usable_consumer");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BuildError::Sink(_) => "build_sink_failed",
            BuildError::NoUsableConsumer { .. } => "build_no_usable_consumer",
        }
    }
}

/// # Errors raised by a [`Source`](crate::Source) while receiving.
///
/// Consumers retry these internally; they never reach the supervisor.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsumeError {
    /// The broker connection dropped; the source may recover on the next call.
    #[error("connection lost: {0}")]
    Disconnected(String),

    /// A message could not be decoded from the broker frame.
    #[error("malformed message: {0}")]
    Malformed(String),
}

impl ConsumeError {
    pub fn as_label(&self) -> &'static str {
        match self {
            ConsumeError::Disconnected(_) => "consume_disconnected",
            ConsumeError::Malformed(_) => "consume_malformed",
        }
    }
}

/// A [`Destination`](crate::Destination) rejected or failed to accept a message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("delivery failed: {reason}")]
pub struct DeliveryError {
    pub reason: String,
}

impl DeliveryError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The sink of this generation stopped receiving; the message was not forwarded.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("sink closed")]
pub struct SinkClosed;
