//! Helix API client.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::random;
use reqwest::{Client, StatusCode};
use tokio::time::sleep;
use tracing::{debug, error, warn};

use super::models::{OAuthToken, StreamResponse};
use super::{BroadcastState, StreamSource};
use crate::config::AppConfig;
use crate::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Backoff for the OAuth token request.
///
/// Retry `n` (starting at 1) waits `base_delay * 2^(n-1)` plus up to `max_jitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRetry {
    /// Total attempts, including the first.
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for TokenRetry {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay: Duration::from_secs(2),
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl TokenRetry {
    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let backoff = self
            .base_delay
            .saturating_mul(1u32 << retry.saturating_sub(1).min(16));
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(random::<u64>() % (jitter_ms + 1))
        };
        backoff + jitter
    }
}

/// Server errors, rate limiting and connection failures are worth another attempt.
fn is_retryable(err: &Error) -> bool {
    let Error::Http(err) = err else {
        return false;
    };
    match err.status() {
        Some(status) => status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS,
        None => !err.is_decode(),
    }
}

/// Twitch Helix client using app access tokens (client credentials flow).
///
/// The access token is shared behind a lock so a single client can be used by the
/// session loop and the metadata sampler at the same time.
pub struct TwitchClient {
    http: Client,
    client_id: String,
    client_secret: String,
    access_token: RwLock<String>,
    token_retry: TokenRetry,
    oauth_url: String,
    api_url: String,
}

impl TwitchClient {
    pub const OAUTH_URL: &str = "https://id.twitch.tv/oauth2/token";
    pub const API_URL: &str = "https://api.twitch.tv/helix/streams";

    pub fn new(config: &AppConfig) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            access_token: RwLock::new(String::new()),
            token_retry: TokenRetry::default(),
            oauth_url: Self::OAUTH_URL.to_string(),
            api_url: Self::API_URL.to_string(),
        })
    }

    /// Point the client at different endpoints.
    pub fn with_endpoints(mut self, oauth_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        self.oauth_url = oauth_url.into();
        self.api_url = api_url.into();
        self
    }

    pub fn with_token_retry(mut self, token_retry: TokenRetry) -> Self {
        self.token_retry = token_retry;
        self
    }

    /// The access token currently in use.
    pub fn access_token(&self) -> String {
        self.access_token.read().clone()
    }

    /// Request a new app access token, retrying transient failures with backoff.
    pub async fn fetch_access_token(&self) -> Result<String> {
        let mut attempt = 1;
        loop {
            match self.request_access_token().await {
                Ok(token) => return Ok(token),
                Err(e) if attempt < self.token_retry.attempts && is_retryable(&e) => {
                    let delay = self.token_retry.delay(attempt);
                    debug!(
                        error = %e,
                        "token request failed, retrying in {:?} (attempt {}/{})",
                        delay,
                        attempt,
                        self.token_retry.attempts
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_access_token(&self) -> Result<String> {
        let response = self
            .http
            .post(&self.oauth_url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let token: OAuthToken = response.json().await?;
        debug!(expires_in = ?token.expires_in, "obtained access token");
        Ok(token.access_token)
    }
}

#[async_trait]
impl StreamSource for TwitchClient {
    async fn observe(&self, channel: &str) -> BroadcastState {
        let token = self.access_token();
        let response = match self
            .http
            .get(&self.api_url)
            .query(&[("user_login", channel)])
            .header("Client-ID", &self.client_id)
            .bearer_auth(token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "server error");
                return BroadcastState::TransportError(e.to_string());
            }
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return BroadcastState::AuthExpired;
        }
        if status.is_client_error() {
            error!(%status, "request rejected");
            return BroadcastState::ClientError(status.to_string());
        }
        if !status.is_success() {
            error!(%status, "server error");
            return BroadcastState::TransportError(status.to_string());
        }

        match response.json::<StreamResponse>().await {
            Ok(body) => match body.data.into_iter().next() {
                Some(stream) => BroadcastState::Live(stream),
                None => BroadcastState::NotLive,
            },
            Err(e) => {
                error!(error = %e, "unexpected response body");
                BroadcastState::TransportError(e.to_string())
            }
        }
    }

    async fn refresh_credentials(&self) {
        match self.fetch_access_token().await {
            Ok(token) => *self.access_token.write() = token,
            Err(e) => warn!(error = %e, "could not get access token, retrying later"),
        }
    }
}
