//! Retry policies for worker-internal faults.
//!
//! The supervisor itself never retries (a failed generation build is final).
//! Retrying lives *inside* workers: a consumer whose source errors and a sink
//! whose destination rejects a message both wait and try again, and these
//! knobs decide how long.
//!
//! ## Contents
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization to avoid every consumer reconnecting at once
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=100ms, factor=2.0, max=30s, jitter=None.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
