//! External recording and muxing tools.

mod ffmpeg;
mod streamlink;

pub use ffmpeg::FfmpegToolkit;
pub use streamlink::StreamlinkRecorder;

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::Result;

/// Records a live channel to a file.
#[async_trait]
pub trait StreamRecorder: Send + Sync {
    /// Record `channel` to `output` until the broadcast ends or `cancel` fires.
    async fn record(&self, channel: &str, output: &Path, cancel: &CancellationToken) -> Result<()>;
}

/// Inspects and remuxes recorded files.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Dump the container's embedded metadata in FFMETADATA format to `dst`.
    async fn extract_metadata(&self, src: &Path, dst: &Path) -> Result<()>;

    /// Duration of the recording in seconds.
    async fn measure(&self, src: &Path) -> Result<f64>;

    /// Copy `src` to `dst` with metadata and chapters taken from `metadata`.
    async fn merge(&self, src: &Path, metadata: &Path, dst: &Path) -> Result<()>;
}
