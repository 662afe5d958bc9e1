//! Streamlink recorder.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::StreamRecorder;
use crate::{Error, Result};
use crate::config::AppConfig;

pub struct StreamlinkRecorder {
    binary_path: String,
    quality: String,
    oauth_token: String,
}

impl StreamlinkRecorder {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            binary_path: config.streamlink.clone(),
            quality: config.quality.clone(),
            oauth_token: config.oauth_token.clone(),
        }
    }

    /// Build streamlink command arguments.
    pub fn build_args(&self, channel: &str, output: &Path) -> Vec<String> {
        let mut args = vec!["--twitch-disable-ads".to_string()];

        if !self.oauth_token.is_empty() {
            args.push(format!(
                "--twitch-api-header=Authorization=OAuth {}",
                self.oauth_token
            ));
        }

        args.extend([
            "--output".to_string(),
            output.to_string_lossy().into_owned(),
            format!("twitch.tv/{channel}"),
            self.quality.clone(),
        ]);
        args
    }
}

/// Forward a child's output to the log, line by line.
fn spawn_line_logger<R>(reader: R, stream: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(stream, "streamlink: {}", line);
        }
    });
}

#[async_trait]
impl StreamRecorder for StreamlinkRecorder {
    async fn record(&self, channel: &str, output: &Path, cancel: &CancellationToken) -> Result<()> {
        let args = self.build_args(channel, output);
        debug!(args = ?args, "starting streamlink");

        let mut child = process_utils::tokio_command(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| process_utils::ProcessError::spawn(&self.binary_path, e))?;

        if let Some(stdout) = child.stdout.take() {
            spawn_line_logger(stdout, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_logger(stderr, "stderr");
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                info!(channel, "recording cancelled, stopping streamlink");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill streamlink");
                }
            }
            status = child.wait() => {
                let status = status?;
                if !status.success() {
                    warn!(channel, %status, "streamlink exited with failure");
                    return Err(Error::Other(format!("streamlink exited with {status}")));
                }
                info!(channel, "streamlink exited");
            }
        }

        Ok(())
    }
}
