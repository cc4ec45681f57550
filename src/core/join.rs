//! # Join counter for a generation.
//!
//! [`JoinGroup`] is a counting barrier built on [`TaskTracker`]: every
//! [`JoinGroup::slot`] call increments it and hands out a [`JoinSlot`]; the
//! count goes back down when that slot is released. [`JoinGroup::wait`]
//! completes once the group is closed and every slot has been released.
//!
//! ## Rules
//! - A slot is released **exactly once**: on [`JoinSlot::release`] or on drop,
//!   whichever comes first (including drop during panic unwinding).
//! - A slot cannot be released twice: `release` consumes it.
//! - A slot that is never released (e.g. leaked with `mem::forget`, or held by a
//!   worker that never returns) blocks [`JoinGroup::wait`] forever.
//!
//! ```rust
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use genvisor::JoinGroup;
//!
//! let group = JoinGroup::new();
//! let slot = group.slot();
//! assert_eq!(group.outstanding(), 1);
//!
//! tokio::spawn(async move {
//!     // ... work ...
//!     slot.release();
//! });
//! group.wait().await;
//! assert_eq!(group.outstanding(), 0);
//! # }
//! ```

use tokio_util::task::TaskTracker;
use tokio_util::task::task_tracker::TaskTrackerToken;

/// Counting barrier shared by the workers of one generation
/// (and by the host that runs the supervisor itself).
#[derive(Clone, Debug, Default)]
pub struct JoinGroup {
    tracker: TaskTracker,
}

impl JoinGroup {
    /// Creates an open, empty group.
    pub fn new() -> Self {
        Self {
            tracker: TaskTracker::new(),
        }
    }

    /// Increments the counter and returns the slot that will decrement it.
    pub fn slot(&self) -> JoinSlot {
        JoinSlot {
            _token: self.tracker.token(),
        }
    }

    /// Number of slots handed out and not yet released.
    pub fn outstanding(&self) -> usize {
        self.tracker.len()
    }

    /// Closes the group and waits until every slot has been released.
    ///
    /// Slots may still be handed out after closing; the wait then also covers them.
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

/// One membership in a [`JoinGroup`]. Released when consumed or dropped.
#[must_use = "dropping a JoinSlot releases it immediately"]
#[derive(Debug)]
pub struct JoinSlot {
    _token: TaskTrackerToken,
}

impl JoinSlot {
    /// Releases the slot. Equivalent to dropping it.
    pub fn release(self) {}
}
