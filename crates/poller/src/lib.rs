//! Periodic sampler.
//!
//! A [`Poller`] runs a [`Probe`] on a fixed interval inside its own thread and
//! single-threaded tokio runtime, isolated from the caller's runtime. Stopping the
//! poller wakes the pending wait immediately instead of waiting out the interval,
//! joins the thread, and hands the probe (and whatever state it owns) back to the
//! caller.

pub mod error;
pub mod poller;

pub use error::{PollerError, Result};
pub use poller::{Poller, PollerState, Probe};
