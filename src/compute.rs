//! Compute Engine REST client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::ComputeError;
use crate::inventory::ComputeApi;
use crate::models::{ComputeList, ComputeNetwork, ComputeSubnetwork};
use crate::state::Config;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Tokens are refreshed this long before they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Where bearer tokens come from.
#[derive(Debug)]
enum TokenSource {
    Static(String),
    Metadata(RwLock<Option<CachedToken>>),
}

/// Client for the `networks` and `subnetworks` collections.
#[derive(Debug)]
pub struct ComputeClient {
    http: reqwest::Client,
    endpoint: String,
    tokens: TokenSource,
}

impl ComputeClient {
    pub fn new(config: &Config) -> Result<Self, ComputeError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("vpc-discovery/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let tokens = match &config.access_token {
            Some(token) => TokenSource::Static(token.clone()),
            None => TokenSource::Metadata(RwLock::new(None)),
        };

        Ok(Self {
            http,
            endpoint: config.compute_endpoint.clone(),
            tokens,
        })
    }

    async fn access_token(&self) -> Result<String, ComputeError> {
        let cache = match &self.tokens {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Metadata(cache) => cache,
        };

        if let Some(token) = cache.read().await.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let mut guard = cache.write().await;
        if let Some(token) = guard.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        debug!("Fetching access token from metadata server");
        let mut headers = HeaderMap::new();
        headers.insert("Metadata-Flavor", HeaderValue::from_static("Google"));
        let response = self
            .http
            .get(METADATA_TOKEN_URL)
            .headers(headers)
            .send()
            .await
            .map_err(|e| ComputeError::Token(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ComputeError::Token(format!(
                "metadata server returned {}",
                response.status()
            )));
        }
        let token: MetadataToken = response
            .json()
            .await
            .map_err(|e| ComputeError::Token(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *guard = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    /// Fetches every page of a Compute `list` collection.
    async fn list_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ComputeError> {
        let base = reqwest::Url::parse(&format!("{}/{}", self.endpoint, path))
            .map_err(|e| ComputeError::InvalidUrl(e.to_string()))?;
        let token = self.access_token().await?;
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = base.clone();
            if let Some(page) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", page);
            }

            let response = self.http.get(url).bearer_auth(&token).send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ComputeError::Status { status, body });
            }

            let page: ComputeList<T> = response.json().await?;
            items.extend(page.items);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(path, count = items.len(), "Fetched compute collection");
        Ok(items)
    }
}

#[async_trait]
impl ComputeApi for ComputeClient {
    async fn list_networks(&self, project: &str) -> Result<Vec<ComputeNetwork>, ComputeError> {
        self.list_all(&format!("projects/{project}/global/networks"))
            .await
    }

    async fn list_subnetworks(
        &self,
        project: &str,
        region: &str,
    ) -> Result<Vec<ComputeSubnetwork>, ComputeError> {
        self.list_all(&format!("projects/{project}/regions/{region}/subnetworks"))
            .await
    }
}
