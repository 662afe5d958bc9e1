//! Poller error types.

use thiserror::Error;

use crate::poller::PollerState;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, PollerError>;

#[derive(Error, Debug)]
pub enum PollerError {
    /// Lifecycle misuse, such as starting twice or stopping before start.
    #[error("Cannot {op} a poller in state {state}")]
    InvalidState { op: &'static str, state: PollerState },

    /// The isolated runtime could not be built.
    #[error("Failed to build poller runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// The poller thread could not be spawned.
    #[error("Failed to spawn poller thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The poller thread panicked outside of a probe invocation.
    #[error("Poller thread panicked")]
    Panicked,
}
