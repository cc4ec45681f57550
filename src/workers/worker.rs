//! # Worker capability
//!
//! [`Worker`] is the uniform contract shared by every member of a generation:
//! the consumers (one per endpoint) and the single sink.
//!
//! ## Contract
//! When [`Worker::run`] is invoked, an implementation must:
//! - perform its work until `cancel` is cancelled, then exit promptly;
//! - release `slot` exactly once, however it exits (ownership makes this
//!   automatic: the slot is moved in and dropped at the latest when `run` returns);
//! - handle its own faults: retry internally or exit cleanly. `run` has no
//!   return value and the supervisor has no recovery path for worker faults.
//!
//! No timeout is applied. A worker that never observes cancellation keeps its
//! slot and stalls the generation loop; on shutdown this surfaces as `GraceExceeded`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::JoinSlot;

/// Role of a worker inside a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Bound to one endpoint; forwards into the generation's sink.
    Consumer,
    /// The single shared outbound worker of the generation.
    Sink,
}

/// # Cancelable generation member.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use genvisor::{JoinSlot, Role, Worker};
///
/// struct Idle;
///
/// #[async_trait]
/// impl Worker for Idle {
///     fn name(&self) -> &str { "idle" }
///     fn role(&self) -> Role { Role::Consumer }
///
///     async fn run(&self, slot: JoinSlot, cancel: CancellationToken) {
///         cancel.cancelled().await;
///         slot.release();
///     }
/// }
/// ```
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Stable, human-readable worker name (used in events).
    fn name(&self) -> &str;

    /// Whether this is a consumer or the sink.
    fn role(&self) -> Role;

    /// Runs until `cancel` fires (or the worker decides to stop), then releases `slot`.
    async fn run(&self, slot: JoinSlot, cancel: CancellationToken);
}

/// Shared handle to a worker.
pub type WorkerRef = Arc<dyn Worker>;
