//! Recorder configuration.
//!
//! Values are resolved from built-in defaults, then an optional TOML file, then the
//! environment (including a `.env` file). The resulting [`AppConfig`] is passed
//! explicitly to everything that needs it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Name of the config directory under the platform config dir.
const APP_DIR: &str = "twitch-recorder";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Path or name of the ffmpeg binary.
    pub ffmpeg: String,
    /// Path or name of the ffprobe binary.
    pub ffprobe: String,
    /// Path or name of the streamlink binary.
    pub streamlink: String,

    /// Twitch application client id.
    pub client_id: String,
    /// Twitch application client secret.
    pub client_secret: String,
    /// Optional user OAuth token passed to streamlink (e.g. to avoid ads as a subscriber).
    pub oauth_token: String,

    /// Root directory for `recorded/` and `processed/` videos.
    pub storage_dir: PathBuf,
    /// Directory for log files.
    pub logging_dir: PathBuf,

    /// Seconds between live checks while the channel is offline.
    pub stream_poll_interval_secs: u64,
    /// Seconds between title/category samples while recording.
    pub metadata_poll_interval_secs: u64,
    /// Streamlink quality selector.
    pub quality: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            streamlink: "streamlink".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            oauth_token: String::new(),
            storage_dir: PathBuf::from("recordings"),
            logging_dir: PathBuf::from("logs"),
            stream_poll_interval_secs: 10,
            metadata_poll_interval_secs: 30,
            quality: "best".to_string(),
        }
    }
}

impl AppConfig {
    /// Load the configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is used only
    /// if a file is present there.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Default config file location, e.g. `~/.config/twitch-recorder/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading configuration");
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io_path("reading config", path, e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("invalid config file: {e}")))
    }

    /// Override fields from environment variables looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key) {
                *target = value;
            }
        };
        set(&mut self.ffmpeg, "FFMPEG_PATH");
        set(&mut self.ffprobe, "FFPROBE_PATH");
        set(&mut self.streamlink, "STREAMLINK_PATH");
        set(&mut self.client_id, "TWITCH_CLIENT_ID");
        set(&mut self.client_secret, "TWITCH_CLIENT_SECRET");
        set(&mut self.oauth_token, "TWITCH_OAUTH_TOKEN");

        if let Some(dir) = lookup("RECORDER_STORAGE_DIR") {
            self.storage_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("RECORDER_LOGGING_DIR") {
            self.logging_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.stream_poll_interval_secs == 0 {
            return Err(Error::config("stream_poll_interval_secs must be positive"));
        }
        if self.metadata_poll_interval_secs == 0 {
            return Err(Error::config("metadata_poll_interval_secs must be positive"));
        }
        if self.quality.trim().is_empty() {
            return Err(Error::config("quality must not be empty"));
        }
        Ok(())
    }

    pub fn stream_poll_interval(&self) -> Duration {
        Duration::from_secs(self.stream_poll_interval_secs)
    }

    pub fn metadata_poll_interval(&self) -> Duration {
        Duration::from_secs(self.metadata_poll_interval_secs)
    }

    /// Directory holding in-progress and unprocessed recordings for `username`.
    pub fn recorded_dir(&self, username: &str) -> PathBuf {
        self.storage_dir.join("recorded").join(username)
    }

    /// Directory holding finished, chaptered recordings for `username`.
    pub fn processed_dir(&self, username: &str) -> PathBuf {
        self.storage_dir.join("processed").join(username)
    }

    /// External binaries that must be available before recording.
    pub fn executables(&self) -> [&str; 3] {
        [
            self.ffmpeg.as_str(),
            self.ffprobe.as_str(),
            self.streamlink.as_str(),
        ]
    }
}
