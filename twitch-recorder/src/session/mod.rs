//! Recording session orchestration.
//!
//! [`SessionRecorder`] watches one channel. When it goes live a fresh [`Timeline`] is
//! saved next to the recording and handed to a [`Poller`] running [`MetadataProbe`],
//! which owns it until the recording ends. The poller is then stopped and joined, and
//! the recorded files are finalized by [`VodProcessor`] in the background.

mod postprocess;
mod probe;

pub use postprocess::VodProcessor;
pub use probe::MetadataProbe;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use poller::Poller;
use timeline::Timeline;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::media::{MediaToolkit, StreamRecorder};
use crate::twitch::{BroadcastState, StreamInfo, StreamSource};
use crate::utils::fs::{ensure_dir_all, remove_file_if_exists};
use crate::{Error, Result};

/// Basename shared by a session's video and timeline files.
pub fn session_basename(stream: &StreamInfo, now: DateTime<Utc>) -> String {
    format!(
        "{}-{}-{}",
        stream.user_login,
        now.format("%Y%m%d-%H%M%S"),
        stream.id
    )
}

/// Timeline for a session that has just gone live.
pub fn session_timeline(stream: &StreamInfo) -> Timeline {
    Timeline::new()
        .with_id(stream.id.clone())
        .with_title(stream.title.clone())
        .with_author(stream.user_name.clone())
        .with_description(format!(
            "Streamed on {} at twitch.tv/{}",
            stream.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            stream.user_login
        ))
}

/// Paths of one recording session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFiles {
    pub video: PathBuf,
    pub timeline: PathBuf,
}

pub struct SessionRecorder {
    config: Arc<AppConfig>,
    username: String,
    source: Arc<dyn StreamSource>,
    recorder: Arc<dyn StreamRecorder>,
    processor: Arc<VodProcessor>,
    recording_lock: Arc<Mutex<()>>,
}

impl SessionRecorder {
    pub fn new(
        config: Arc<AppConfig>,
        username: impl Into<String>,
        source: Arc<dyn StreamSource>,
        recorder: Arc<dyn StreamRecorder>,
        toolkit: Arc<dyn MediaToolkit>,
    ) -> Self {
        let username = username.into();
        let recording_lock = Arc::new(Mutex::new(()));
        let processor = Arc::new(VodProcessor::new(
            toolkit,
            config.recorded_dir(&username),
            config.processed_dir(&username),
            Arc::clone(&recording_lock),
        ));

        Self {
            config,
            username,
            source,
            recorder,
            processor,
            recording_lock,
        }
    }

    /// File paths for a session of `stream` starting at `now`.
    pub fn session_files(&self, stream: &StreamInfo, now: DateTime<Utc>) -> SessionFiles {
        let basename = session_basename(stream, now);
        let dir = self.config.recorded_dir(&self.username);
        SessionFiles {
            video: dir.join(format!("{basename}.mp4")),
            timeline: dir.join(format!("{basename}.json")),
        }
    }

    /// Watch the channel until `cancel` fires.
    ///
    /// Leftover recordings are processed once at startup and again after every
    /// session. Running post-processing tasks are awaited before returning.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        ensure_dir_all(&self.config.recorded_dir(&self.username)).await?;
        ensure_dir_all(&self.config.processed_dir(&self.username)).await?;

        let mut post_processing = JoinSet::new();
        self.spawn_post_processing(&mut post_processing);

        info!(
            channel = %self.username,
            interval_secs = self.config.stream_poll_interval_secs,
            quality = %self.config.quality,
            "watching channel"
        );
        self.source.refresh_credentials().await;

        let mut auth_failures = 0u32;
        loop {
            let state = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                state = self.source.observe(&self.username) => state,
            };

            if !matches!(state, BroadcastState::AuthExpired) {
                auth_failures = 0;
            }

            let observe_again = match state {
                BroadcastState::Live(stream) => {
                    let recorded = self.record_session(stream, &cancel).await;
                    if let Err(e) = &recorded {
                        error!(error = %e, "recording session failed");
                    }
                    if !cancel.is_cancelled() {
                        reap_finished(&mut post_processing);
                        self.spawn_post_processing(&mut post_processing);
                    }
                    // A broadcast that ended cleanly may already be live again.
                    recorded.is_ok()
                }
                BroadcastState::NotLive => {
                    debug!(channel = %self.username, "stream is not live");
                    false
                }
                BroadcastState::AuthExpired => {
                    auth_failures += 1;
                    info!("unauthorized, attempting to log back in");
                    self.source.refresh_credentials().await;
                    // Retry right away once, then fall back to the normal interval.
                    auth_failures == 1
                }
                other => {
                    error!(state = %other, "failed to query stream status");
                    false
                }
            };

            if cancel.is_cancelled() {
                break;
            }
            if !observe_again {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.config.stream_poll_interval()) => {}
                }
            }
        }

        if !post_processing.is_empty() {
            info!("waiting for post-processing to finish");
        }
        while let Some(result) = post_processing.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "post-processing task failed");
            }
        }
        info!(channel = %self.username, "stopped watching channel");
        Ok(())
    }

    /// Record one live session, sampling metadata for as long as the recording runs.
    pub async fn record_session(&self, stream: StreamInfo, cancel: &CancellationToken) -> Result<()> {
        let _recording = self.recording_lock.lock().await;

        let files = self.session_files(&stream, Utc::now());
        let timeline = session_timeline(&stream);
        timeline.save(&files.timeline)?;

        let probe = MetadataProbe::new(
            Arc::clone(&self.source),
            self.username.clone(),
            timeline,
            files.timeline.clone(),
        );
        let mut poller = Poller::new(probe, self.config.metadata_poll_interval())
            .with_name(format!("metadata-{}", self.username));
        if let Err(e) = poller.start() {
            discard_orphan_timeline(&files).await;
            return Err(e.into());
        }
        debug!(poller = %poller.name(), "metadata poller started");

        info!(
            channel = %self.username,
            title = %stream.title,
            path = %files.video.display(),
            "stream is live, recording"
        );
        let recorded = self.recorder.record(&self.username, &files.video, cancel).await;

        let stopped = tokio::task::spawn_blocking(move || poller.stop())
            .await
            .map_err(|e| Error::Other(format!("joining metadata poller: {e}")))?;
        match stopped {
            Ok(probe) => {
                let timeline = probe.into_timeline();
                info!(
                    categories = timeline.categories.len(),
                    titles = timeline.titles.len(),
                    "recording finished"
                );
            }
            Err(e) => warn!(error = %e, "metadata poller did not stop cleanly"),
        }

        if !files.video.exists() {
            discard_orphan_timeline(&files).await;
        }
        recorded
    }

    fn spawn_post_processing(&self, tasks: &mut JoinSet<usize>) {
        let processor = Arc::clone(&self.processor);
        tasks.spawn(async move { processor.process_all().await });
    }
}

/// Collect post-processing tasks that have already finished.
fn reap_finished(tasks: &mut JoinSet<usize>) {
    while let Some(result) = tasks.try_join_next() {
        if let Err(e) = result {
            error!(error = %e, "post-processing task failed");
        }
    }
}

/// Remove a session's timeline when no video was ever written for it.
async fn discard_orphan_timeline(files: &SessionFiles) {
    warn!(
        path = %files.video.display(),
        "no video was recorded, discarding session timeline"
    );
    if let Err(e) = remove_file_if_exists(&files.timeline).await {
        error!(error = %e, "failed to remove session timeline");
    }
}
