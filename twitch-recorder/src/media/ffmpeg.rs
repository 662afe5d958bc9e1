//! ffmpeg/ffprobe toolkit.

use std::path::Path;

use async_trait::async_trait;

use super::MediaToolkit;
use crate::Result;
use crate::config::AppConfig;
use process_utils::{ProcessError, run_checked, tokio_command};

pub struct FfmpegToolkit {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegToolkit {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg.clone(),
            ffprobe_path: config.ffprobe.clone(),
        }
    }

    pub fn extract_metadata_args(src: &Path, dst: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-i".to_string(),
            src.to_string_lossy().into_owned(),
            "-f".to_string(),
            "ffmetadata".to_string(),
            dst.to_string_lossy().into_owned(),
        ]
    }

    pub fn measure_args(src: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-i".to_string(),
            src.to_string_lossy().into_owned(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "default=noprint_wrappers=1:nokey=1".to_string(),
        ]
    }

    pub fn merge_args(src: &Path, metadata: &Path, dst: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-i".to_string(),
            src.to_string_lossy().into_owned(),
            "-i".to_string(),
            metadata.to_string_lossy().into_owned(),
            "-map_metadata".to_string(),
            "1".to_string(),
            "-c".to_string(),
            "copy".to_string(),
            dst.to_string_lossy().into_owned(),
        ]
    }

    /// Parse ffprobe's bare `format=duration` output.
    pub fn parse_duration(stdout: &[u8]) -> Option<f64> {
        std::str::from_utf8(stdout)
            .ok()?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d >= 0.0)
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn extract_metadata(&self, src: &Path, dst: &Path) -> Result<()> {
        run_checked(tokio_command(&self.ffmpeg_path).args(Self::extract_metadata_args(src, dst)))
            .await?;
        Ok(())
    }

    async fn measure(&self, src: &Path) -> Result<f64> {
        let output =
            run_checked(tokio_command(&self.ffprobe_path).args(Self::measure_args(src))).await?;
        Self::parse_duration(&output.stdout).ok_or_else(|| {
            ProcessError::invalid_output(
                &self.ffprobe_path,
                format!(
                    "expected a duration, got {:?}",
                    String::from_utf8_lossy(&output.stdout).trim()
                ),
            )
            .into()
        })
    }

    async fn merge(&self, src: &Path, metadata: &Path, dst: &Path) -> Result<()> {
        run_checked(tokio_command(&self.ffmpeg_path).args(Self::merge_args(src, metadata, dst)))
            .await?;
        Ok(())
    }
}
