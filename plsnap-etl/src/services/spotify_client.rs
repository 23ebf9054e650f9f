//! Spotify Web API client
//!
//! Client-credentials flow: exchange the client id/secret for a bearer token at the
//! accounts service, then page through `GET /v1/playlists/{id}/tracks`. All pages are
//! merged into one payload so a snapshot always holds the whole playlist.

use crate::error::{PipelineError, PipelineResult};
use crate::models::{RawFileId, RawSnapshot};
use async_trait::async_trait;
use plsnap_common::config::ClientCredentials;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE_URL: &str = "https://api.spotify.com/v1";
const USER_AGENT: &str = concat!("plsnap-etl/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;
const PAGE_LIMIT: u32 = 100;
/// Refresh tokens this long before they expire
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Upstream collaborator producing raw snapshots
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the current contents of a playlist
    async fn fetch(&self, playlist_ref: &str) -> PipelineResult<RawSnapshot>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Spotify API client
pub struct SpotifyClient {
    http_client: reqwest::Client,
    credentials: ClientCredentials,
    token: Mutex<Option<CachedToken>>,
    token_url: String,
    api_base_url: String,
}

impl SpotifyClient {
    pub fn new(credentials: ClientCredentials) -> PipelineResult<Self> {
        Self::with_endpoints(credentials, TOKEN_URL, API_BASE_URL)
    }

    /// Client against non-default endpoints
    pub fn with_endpoints(
        credentials: ClientCredentials,
        token_url: &str,
        api_base_url: &str,
    ) -> PipelineResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| PipelineError::UpstreamUnavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            credentials,
            token: Mutex::new(None),
            token_url: token_url.to_string(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn access_token(&self) -> PipelineResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        tracing::debug!("Requesting Spotify access token");

        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| PipelineError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // the accounts service answers bad credentials with 400 invalid_client
            if status == StatusCode::BAD_REQUEST {
                return Err(PipelineError::Auth(format!("token request rejected: {}", body)));
            }
            return Err(classify_status(status, &body));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::UpstreamUnavailable(format!("token response: {}", e)))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    async fn get_page(&self, url: &str, token: &str) -> PipelineResult<Value> {
        tracing::debug!(url = %url, "Fetching playlist page");

        let response = self
            .http_client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PipelineError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| PipelineError::UpstreamUnavailable(format!("playlist page: {}", e)))
    }
}

#[async_trait]
impl SnapshotSource for SpotifyClient {
    async fn fetch(&self, playlist_ref: &str) -> PipelineResult<RawSnapshot> {
        let playlist_id = playlist_id_from_url(playlist_ref).ok_or_else(|| {
            PipelineError::Common(plsnap_common::Error::InvalidInput(format!(
                "no playlist id in {:?}",
                playlist_ref
            )))
        })?;

        let fetched_at = plsnap_common::time::now();
        let token = self.access_token().await?;

        let mut items: Vec<Value> = Vec::new();
        let mut next = Some(format!(
            "{}/playlists/{}/tracks?limit={}",
            self.api_base_url, playlist_id, PAGE_LIMIT
        ));
        let mut first_page: Option<Value> = None;
        let mut visited = HashSet::new();

        while let Some(url) = next.take() {
            visited.insert(url.clone());
            let mut page = self.get_page(&url, &token).await?;
            match page.get_mut("items").map(Value::take) {
                Some(Value::Array(page_items)) => items.extend(page_items),
                _ => {
                    return Err(PipelineError::UpstreamUnavailable(format!(
                        "playlist page without items: {}",
                        url
                    )))
                }
            }
            next = next_page_url(&page, &visited)?;
            if first_page.is_none() {
                first_page = Some(page);
            }
        }

        let total = items.len();
        let mut payload = first_page.unwrap_or_else(|| json!({}));
        payload["items"] = Value::Array(items);
        payload["next"] = Value::Null;

        tracing::info!(
            playlist_id = %playlist_id,
            items = total,
            "Fetched playlist snapshot"
        );

        Ok(RawSnapshot::new(RawFileId::for_fetch(fetched_at), payload))
    }
}

/// The page's `next` link, rejecting links that revisit an earlier page
fn next_page_url(page: &Value, visited: &HashSet<String>) -> PipelineResult<Option<String>> {
    match page.get("next").and_then(Value::as_str) {
        Some(url) if visited.contains(url) => Err(PipelineError::UpstreamUnavailable(format!(
            "playlist paging loops back to {}",
            url
        ))),
        other => Ok(other.map(str::to_string)),
    }
}

/// Map a non-success status to the error taxonomy
fn classify_status(status: StatusCode, body: &str) -> PipelineError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            PipelineError::Auth(format!("{}: {}", status, body))
        }
        _ => PipelineError::UpstreamUnavailable(format!("{}: {}", status, body)),
    }
}

/// Playlist id from a share URL, a `spotify:playlist:` URI, or a bare id
///
/// The id is the last path segment with any query string removed.
pub fn playlist_id_from_url(playlist_ref: &str) -> Option<&str> {
    let without_query = playlist_ref.split(|c: char| c == '?' || c == '#').next()?;
    let id = without_query
        .trim_end_matches('/')
        .rsplit(|c: char| c == '/' || c == ':')
        .next()?;
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}
