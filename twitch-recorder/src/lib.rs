//! Twitch stream recorder.
//!
//! Watches a channel, records it with streamlink while sampling its category and title,
//! and muxes the resulting chapters into the finished video with ffmpeg.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod media;
pub mod session;
pub mod twitch;
pub mod utils;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use session::{SessionRecorder, VodProcessor};
