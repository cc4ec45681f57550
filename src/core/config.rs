//! # Supervisor runtime configuration.
//!
//! [`SupervisorConfig`] holds the few knobs of the outer lifecycle. Loading
//! values from files or the environment is the host's job; this is a plain
//! struct with sensible defaults.

use std::time::Duration;

/// Configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `grace`: maximum wait, after shutdown fires, for the running generation to
///   drain before `run` gives up and returns (`0s` = don't wait)
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum time to wait for the generation loop after shutdown.
    ///
    /// If exceeded, a `GraceExceeded` event is published and `run` returns
    /// anyway; stuck workers are left running detached.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Receivers lagging by more than this many events skip the oldest ones.
    pub bus_capacity: usize,
}

impl SupervisorConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// - `grace = 30s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            bus_capacity: 1024,
        }
    }
}
