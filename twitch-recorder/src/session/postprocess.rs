//! Finalization of recorded VODs.
//!
//! A recording leaves `<name>.mp4` and `<name>.json` in the recorded directory. This
//! module fixes the session window from the artifact, renders the chapter block and
//! muxes it into `<processed>/<name>.mp4`. Sources are only removed once every step
//! has succeeded, so a failed run can simply be retried.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use timeline::Timeline;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::media::MediaToolkit;
use crate::utils::fs::{list_files_with_extension, modified_epoch_secs, remove_file_if_exists};
use crate::{Error, Result};

const VIDEO_EXTENSION: &str = "mp4";
const TIMELINE_EXTENSION: &str = "json";
const METADATA_EXTENSION: &str = "ffmetadata";

pub struct VodProcessor {
    toolkit: Arc<dyn MediaToolkit>,
    recorded_dir: PathBuf,
    processed_dir: PathBuf,
    recording_lock: Arc<Mutex<()>>,
}

impl VodProcessor {
    pub fn new(
        toolkit: Arc<dyn MediaToolkit>,
        recorded_dir: impl Into<PathBuf>,
        processed_dir: impl Into<PathBuf>,
        recording_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            toolkit,
            recorded_dir: recorded_dir.into(),
            processed_dir: processed_dir.into(),
            recording_lock,
        }
    }

    /// Process every recorded video. Returns the number finalized.
    ///
    /// Nothing is done while a recording holds the lock; the next call after that
    /// recording finishes picks everything up.
    pub async fn process_all(&self) -> usize {
        if self.recording_lock.try_lock().is_err() {
            debug!("recording in progress, deferring post-processing");
            return 0;
        }

        let videos = match list_files_with_extension(&self.recorded_dir, VIDEO_EXTENSION).await {
            Ok(videos) => videos,
            Err(e) => {
                error!(error = %e, "failed to list recorded videos");
                return 0;
            }
        };

        let mut processed = 0;
        for video in videos {
            if self.recording_lock.try_lock().is_err() {
                debug!("recording started, deferring remaining videos");
                break;
            }
            match self.process(&video).await {
                Ok(output) => {
                    info!(output = %output.display(), "finished processing {}", video.display());
                    processed += 1;
                }
                Err(e) => {
                    warn!(error = %e, "skipped processing {}", video.display());
                }
            }
        }
        processed
    }

    /// Finalize one recorded video and return the path of the muxed output.
    pub async fn process(&self, recorded_video: &Path) -> Result<PathBuf> {
        let stem = recorded_video
            .file_stem()
            .ok_or_else(|| Error::Other(format!("{} has no file name", recorded_video.display())))?;

        let recorded_timeline = sibling(&self.recorded_dir, stem, TIMELINE_EXTENSION);
        let processed_video = sibling(&self.processed_dir, stem, VIDEO_EXTENSION);
        let processed_timeline = sibling(&self.processed_dir, stem, TIMELINE_EXTENSION);
        let metadata = sibling(&self.processed_dir, stem, METADATA_EXTENSION);

        info!("processing recorded video {}", recorded_video.display());

        remove_file_if_exists(&processed_video).await?;
        remove_file_if_exists(&metadata).await?;

        self.toolkit.extract_metadata(recorded_video, &metadata).await?;
        let duration = self.toolkit.measure(recorded_video).await?;
        let modified_at = modified_epoch_secs(recorded_video).await?;

        let mut timeline = Timeline::load(&recorded_timeline).inspect_err(|_| {
            error!(
                "failed to read timeline {}, fix the file contents and try again",
                recorded_timeline.display()
            )
        })?;
        timeline.set_window_from_artifact(modified_at, duration);
        debug!(
            duration,
            categories = timeline.categories.len(),
            titles = timeline.titles.len(),
            "resolved session window"
        );

        timeline.append_ffmetadata(&metadata)?;
        self.toolkit.merge(recorded_video, &metadata, &processed_video).await?;
        timeline.save(&processed_timeline)?;

        remove_file_if_exists(recorded_video).await?;
        remove_file_if_exists(&recorded_timeline).await?;
        remove_file_if_exists(&metadata).await?;

        Ok(processed_video)
    }
}

/// `<dir>/<stem>.<extension>`, keeping any dots already in `stem`.
fn sibling(dir: &Path, stem: &OsStr, extension: &str) -> PathBuf {
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(extension);
    dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_keeps_dots() {
        let path = sibling(Path::new("/data"), OsStr::new("a.b-1"), "json");
        assert_eq!(path, PathBuf::from("/data/a.b-1.json"));
    }
}
