//! Helix API response models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A live stream as returned by `GET /helix/streams`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamInfo {
    pub id: String,
    pub title: String,
    pub user_login: String,
    pub user_name: String,
    pub game_name: String,
    pub started_at: DateTime<Utc>,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Default for StreamInfo {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            user_login: String::new(),
            user_name: String::new(),
            game_name: String::new(),
            started_at: Utc::now(),
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub cursor: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamResponse {
    pub data: Vec<StreamInfo>,
    pub pagination: Pagination,
}

/// Client-credentials token from `POST /oauth2/token`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}
