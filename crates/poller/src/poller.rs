//! Poller implementation.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::error::{PollerError, Result};

/// Upper bound on draining the isolated runtime after the loop exits.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Smallest interval accepted; `tokio::time::interval` rejects zero.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Lifecycle of a [`Poller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Created,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for PollerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "CREATED",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
        };
        f.write_str(s)
    }
}

/// A unit of periodic work.
///
/// The probe is owned by the poller thread while it runs and is returned by
/// [`Poller::stop`], so any state it mutates has exactly one writer at a time.
#[async_trait]
pub trait Probe: Send + 'static {
    type Error: fmt::Display + Send;

    /// Run one sample. Errors are logged and the next tick proceeds as usual.
    async fn probe(&mut self) -> std::result::Result<(), Self::Error>;
}

/// Runs a [`Probe`] on a fixed interval in a dedicated thread.
pub struct Poller<P: Probe> {
    name: String,
    interval: Duration,
    state: PollerState,
    probe: Option<P>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<P>>,
}

impl<P: Probe> Poller<P> {
    pub fn new(probe: P, interval: Duration) -> Self {
        Self {
            name: "poller".to_string(),
            interval: interval.max(MIN_INTERVAL),
            state: PollerState::Created,
            probe: Some(probe),
            cancel: CancellationToken::new(),
            handle: None,
        }
    }

    /// Name used for the thread and the tracing span.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    /// Whether the poller thread has exited on its own (e.g. after a probe panic).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.is_finished())
    }

    /// Spawn the poller thread. The first probe runs immediately.
    pub fn start(&mut self) -> Result<()> {
        if self.state != PollerState::Created {
            return Err(PollerError::InvalidState {
                op: "start",
                state: self.state,
            });
        }

        let probe = self.probe.take().ok_or(PollerError::InvalidState {
            op: "start",
            state: self.state,
        })?;
        let interval = self.interval;
        let cancel = self.cancel.clone();
        let span = info_span!("poller", name = %self.name);

        // The runtime is built and dropped on the poller thread only.
        let (ready_tx, ready_rx) = mpsc::sync_channel::<std::io::Result<()>>(1);
        let handle = std::thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return probe;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                let probe = runtime.block_on(run_loop(probe, interval, cancel).instrument(span));
                runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
                probe
            })
            .map_err(|e| {
                self.state = PollerState::Stopped;
                PollerError::Spawn(e)
            })?;

        let ready = ready_rx.recv();
        if !matches!(ready, Ok(Ok(()))) {
            self.state = PollerState::Stopped;
            // The thread hands the probe back when the runtime cannot be built.
            self.probe = handle.join().ok();
            return Err(match ready {
                Ok(Err(e)) => PollerError::Runtime(e),
                _ => PollerError::Panicked,
            });
        }

        debug!(name = %self.name, interval = ?interval, "poller started");
        self.handle = Some(handle);
        self.state = PollerState::Running;
        Ok(())
    }

    /// Signal the poller to stop and block until its thread has exited.
    ///
    /// A pending wait is woken immediately and an in-flight probe is dropped at its
    /// next suspension point. No probe runs after this returns.
    pub fn stop(&mut self) -> Result<P> {
        if self.state != PollerState::Running {
            return Err(PollerError::InvalidState {
                op: "stop",
                state: self.state,
            });
        }
        self.state = PollerState::Stopping;
        self.cancel.cancel();

        let handle = self.handle.take().ok_or(PollerError::InvalidState {
            op: "stop",
            state: self.state,
        })?;
        let joined = handle.join().map_err(|_| PollerError::Panicked);
        self.state = PollerState::Stopped;
        debug!(name = %self.name, "poller stopped");
        joined
    }
}

impl<P: Probe> Drop for Poller<P> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.cancel.cancel();
            let _ = handle.join();
        }
    }
}

impl<P: Probe> fmt::Debug for Poller<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("state", &self.state)
            .finish()
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn run_loop<P: Probe>(mut probe: P, interval: Duration, cancel: CancellationToken) -> P {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interrupted() => {
                info!("interrupt received by poller, exiting");
                break;
            }
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcome = AssertUnwindSafe(probe.probe()).catch_unwind() => outcome,
        };

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "probe failed"),
            Err(_) => {
                error!("probe panicked, shutting down poller");
                break;
            }
        }

        tokio::task::yield_now().await;
    }

    probe
}
