//! # Spotify Integration Module
//!
//! Thin adapter over the Spotify Web API. It resolves links into typed
//! references, authenticates with the client-credentials grant and fetches
//! the track and playlist metadata a download run starts from.
//!
//! ```text
//! Run Controller
//!      ↓  MetadataSource
//! SpotifyClient ── TokenManager (cached app token)
//!      ↓
//! Spotify Web API (reqwest, JSON)
//! ```
//!
//! ## Endpoints
//!
//! - `POST /api/token` - client-credentials token exchange
//! - `GET /tracks/{id}` - a single track
//! - `GET /playlists/{id}` - playlist details with the first page of items,
//!   followed by `next` links until the listing is exhausted
//!
//! ## Error Handling
//!
//! Every failure is reported as [`Error::MetadataFetch`], which is fatal for
//! the run. Transient conditions are absorbed here instead:
//! - 429 Too Many Requests waits for `Retry-After` (up to 120 seconds)
//! - 502/503 waits a fixed pause and retries
//! - 401 drops the cached token and authenticates again
//!
//! Retries are bounded by [`MAX_ATTEMPTS`].

pub mod auth;
pub mod link;
pub mod playlists;
pub mod tracks;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::{sync::Mutex, time::sleep};
use tracing::{debug, warn};

use crate::{
    config::SpotifyCredentials,
    error::{Error, Result},
    management::TokenManager,
    types::{PlaylistMetadata, TrackMetadata},
};

/// Upper bound on requests per API call, including retries.
pub const MAX_ATTEMPTS: usize = 5;

const MAX_RETRY_AFTER_SECS: u64 = 120;
const BAD_GATEWAY_PAUSE: Duration = Duration::from_secs(10);

/// Source of track and playlist metadata.
///
/// The run controller only talks to this trait so tests can substitute a
/// fixed catalogue for the real API.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn track(&self, id: &str) -> Result<TrackMetadata>;

    /// Fetches a playlist with all of its tracks in playlist order.
    async fn playlist(&self, id: &str) -> Result<PlaylistMetadata>;

    /// Downloads album artwork referenced by [`TrackMetadata::artwork_url`].
    async fn artwork(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct SpotifyClient {
    http: Client,
    creds: SpotifyCredentials,
    tokens: Mutex<TokenManager>,
}

impl SpotifyClient {
    pub async fn new(creds: SpotifyCredentials) -> Self {
        Self {
            http: Client::new(),
            creds,
            tokens: Mutex::new(TokenManager::load().await),
        }
    }

    pub fn api_url(&self) -> &str {
        self.creds.api_url.trim_end_matches('/')
    }

    /// Authenticated GET returning the decoded JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        for attempt in 1..=MAX_ATTEMPTS {
            let token = {
                let mut tokens = self.tokens.lock().await;
                tokens.get_valid_token(&self.http, &self.creds).await?
            };

            debug!(url, attempt, "GET");
            let response = self
                .http
                .get(url)
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| Error::MetadataFetch(format!("request to {} failed: {}", url, e)))?;

            match response.status() {
                status if status.is_success() => {
                    return response.json::<T>().await.map_err(|e| {
                        Error::MetadataFetch(format!("unexpected response from {}: {}", url, e))
                    });
                }
                StatusCode::UNAUTHORIZED => {
                    warn!(url, "access token rejected, re-authenticating");
                    self.tokens.lock().await.invalidate();
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after = response
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(1);
                    if retry_after > MAX_RETRY_AFTER_SECS {
                        return Err(Error::MetadataFetch(format!(
                            "rate limited by Spotify for {} seconds, try again later",
                            retry_after
                        )));
                    }
                    warn!(url, retry_after, "rate limited");
                    sleep(Duration::from_secs(retry_after)).await;
                }
                StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
                    warn!(url, status = %response.status(), "transient API error");
                    sleep(BAD_GATEWAY_PAUSE).await;
                }
                StatusCode::NOT_FOUND => {
                    return Err(Error::MetadataFetch(format!("{} not found", url)));
                }
                status => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::MetadataFetch(format!(
                        "Spotify API returned {} for {}: {}",
                        status, url, body
                    )));
                }
            }
        }

        Err(Error::MetadataFetch(format!(
            "giving up on {} after {} attempts",
            url, MAX_ATTEMPTS
        )))
    }
}

#[async_trait]
impl MetadataSource for SpotifyClient {
    async fn track(&self, id: &str) -> Result<TrackMetadata> {
        tracks::get_track(self, id).await
    }

    async fn playlist(&self, id: &str) -> Result<PlaylistMetadata> {
        playlists::get_playlist(self, id).await
    }

    async fn artwork(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}
