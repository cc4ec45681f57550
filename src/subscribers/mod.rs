//! # Event subscribers for the genvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out,
//! and the built-in [`LogWriter`] (enabled by the `logging` feature).
//!
//! ## Architecture
//! ```text
//! Supervisor / builder ── publish(Event) ──► Bus ──► subscriber_listener
//!                                                          │
//!                                                  SubscriberSet::emit
//!                                               ┌──────────┼──────────┐
//!                                               ▼          ▼          ▼
//!                                           LogWriter   Metrics    Custom
//! ```
//!
//! Lifecycle reporting goes through events; subscribers decide how to render it.

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
