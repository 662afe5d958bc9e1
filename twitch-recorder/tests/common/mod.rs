//! In-memory collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use twitch_recorder::media::{MediaToolkit, StreamRecorder};
use twitch_recorder::twitch::{BroadcastState, StreamInfo, StreamSource};
use twitch_recorder::{Error, Result};

pub fn stream(game: &str, title: &str) -> StreamInfo {
    StreamInfo {
        id: "40123456789".to_string(),
        title: title.to_string(),
        user_login: "someone".to_string(),
        user_name: "SomeOne".to_string(),
        game_name: game.to_string(),
        ..StreamInfo::default()
    }
}

/// Replays scripted states, then reports the channel offline.
#[derive(Default)]
pub struct FakeSource {
    states: Mutex<VecDeque<BroadcastState>>,
    observations: AtomicUsize,
    refreshes: AtomicUsize,
}

impl FakeSource {
    pub fn new(states: Vec<BroadcastState>) -> Arc<Self> {
        Arc::new(Self {
            states: Mutex::new(states.into()),
            ..Self::default()
        })
    }

    pub fn observations(&self) -> usize {
        self.observations.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.states.lock().len()
    }
}

#[async_trait]
impl StreamSource for FakeSource {
    async fn observe(&self, _channel: &str) -> BroadcastState {
        self.observations.fetch_add(1, Ordering::SeqCst);
        self.states
            .lock()
            .pop_front()
            .unwrap_or(BroadcastState::NotLive)
    }

    async fn refresh_credentials(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Writes a placeholder video and keeps "recording" until the source has been
/// observed `until_observations` times or cancellation fires.
pub struct FakeRecorder {
    source: Arc<FakeSource>,
    until_observations: usize,
    fail_before_writing: bool,
    pub recordings: Mutex<Vec<PathBuf>>,
    pub cancelled: AtomicBool,
}

impl FakeRecorder {
    pub fn new(source: Arc<FakeSource>, until_observations: usize) -> Arc<Self> {
        Arc::new(Self {
            source,
            until_observations,
            fail_before_writing: false,
            recordings: Mutex::new(Vec::new()),
            cancelled: AtomicBool::new(false),
        })
    }

    /// A recorder whose process dies before producing any output.
    pub fn failing(source: Arc<FakeSource>) -> Arc<Self> {
        Arc::new(Self {
            source,
            until_observations: 0,
            fail_before_writing: true,
            recordings: Mutex::new(Vec::new()),
            cancelled: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl StreamRecorder for FakeRecorder {
    async fn record(&self, _channel: &str, output: &Path, cancel: &CancellationToken) -> Result<()> {
        self.recordings.lock().push(output.to_path_buf());
        if self.fail_before_writing {
            return Err(Error::Other("streamlink exited with exit status: 1".to_string()));
        }
        tokio::fs::write(output, b"video").await?;

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.source.observations() < self.until_observations
            && tokio::time::Instant::now() < deadline
        {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.cancelled.store(true, Ordering::SeqCst);
                    return Ok(());
                }
                _ = tokio::time::sleep(Duration::from_millis(10)) => {}
            }
        }
        Ok(())
    }
}

/// Media toolkit that copies files instead of running ffmpeg.
pub struct FakeToolkit {
    duration: f64,
    fail_merge: AtomicBool,
    /// Contents of the metadata file handed to each merge.
    pub merged_metadata: Mutex<Vec<String>>,
}

impl FakeToolkit {
    pub fn new(duration: f64) -> Arc<Self> {
        Arc::new(Self {
            duration,
            fail_merge: AtomicBool::new(false),
            merged_metadata: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_merge(duration: f64) -> Arc<Self> {
        let toolkit = Self::new(duration);
        toolkit.fail_merge.store(true, Ordering::SeqCst);
        toolkit
    }
}

#[async_trait]
impl MediaToolkit for FakeToolkit {
    async fn extract_metadata(&self, _src: &Path, dst: &Path) -> Result<()> {
        tokio::fs::write(dst, ";FFMETADATA1\nencoder=Lavf\n").await?;
        Ok(())
    }

    async fn measure(&self, _src: &Path) -> Result<f64> {
        Ok(self.duration)
    }

    async fn merge(&self, src: &Path, metadata: &Path, dst: &Path) -> Result<()> {
        if self.fail_merge.load(Ordering::SeqCst) {
            return Err(Error::Other("merge failed".to_string()));
        }
        let content = tokio::fs::read_to_string(metadata).await?;
        self.merged_metadata.lock().push(content);
        tokio::fs::copy(src, dst).await?;
        Ok(())
    }
}

/// Poll `condition` until it holds or a few seconds pass.
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
