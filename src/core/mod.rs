//! Runtime core: generations and their lifecycle.
//!
//! The public API from this module is [`Supervisor`] (with its builder and
//! config), the [`GenerationBuilder`], and the [`JoinGroup`] / [`JoinSlot`]
//! join counter.
//!
//! Internal modules:
//! - [`supervisor`]: outer control, generation loop, reload monitor;
//! - [`generation`]: assembles one worker set (N consumers + 1 sink);
//! - [`join`]: counting barrier released by worker slots;
//! - [`builder`]: dependency injection for the supervisor;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod config;
mod generation;
mod join;
mod shutdown;
mod supervisor;

#[cfg(test)]
pub(crate) mod fakes;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use generation::{Generation, GenerationBuilder};
pub use join::{JoinGroup, JoinSlot};
pub use shutdown::wait_for_shutdown_signal;
pub use supervisor::Supervisor;
