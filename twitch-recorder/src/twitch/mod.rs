//! Twitch broadcast observation.

mod client;
mod models;

pub use client::{TokenRetry, TwitchClient};
pub use models::{OAuthToken, StreamInfo, StreamResponse};

use async_trait::async_trait;

/// Result of observing a channel once.
#[derive(Debug, Clone, PartialEq)]
pub enum BroadcastState {
    /// The channel is broadcasting.
    Live(StreamInfo),
    /// The channel is offline.
    NotLive,
    /// The API rejected our credentials; refresh and retry.
    AuthExpired,
    /// The API rejected the request itself (4xx other than 401).
    ClientError(String),
    /// Network failure, server error or undecodable response.
    TransportError(String),
}

impl BroadcastState {
    /// Short label for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live(_) => "LIVE",
            Self::NotLive => "NOT_LIVE",
            Self::AuthExpired => "AUTH_EXPIRED",
            Self::ClientError(_) => "CLIENT_ERROR",
            Self::TransportError(_) => "TRANSPORT_ERROR",
        }
    }
}

impl std::fmt::Display for BroadcastState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClientError(detail) | Self::TransportError(detail) => {
                write!(f, "{} ({detail})", self.as_str())
            }
            _ => f.write_str(self.as_str()),
        }
    }
}

/// Source of broadcast state for a channel.
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Observe the channel's current state. Failures are reported as states, not errors.
    async fn observe(&self, channel: &str) -> BroadcastState;

    /// Obtain fresh credentials after [`BroadcastState::AuthExpired`].
    async fn refresh_credentials(&self);
}
