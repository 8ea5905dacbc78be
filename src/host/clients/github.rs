//! GitHub REST API client

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use reqwest::header::{ETAG, IF_NONE_MATCH};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::host::client::{
    RateLimitProbe, RateLimitSnapshot, RemoteHostClient, RemoteProject, RemoteRelease,
};
use crate::host::error::ClientError;
use crate::host::types::HostType;

/// Default base URL for GitHub API
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Base URL used to build links to tags on github.com
const WEB_BASE_URL: &str = "https://github.com";

/// Tags requested per page (GitHub maximum)
const TAGS_PER_PAGE: usize = 100;

/// Upper bound on tag pages fetched per project
const MAX_TAG_PAGES: usize = 10;

/// Default number of conditional responses kept per client
pub const DEFAULT_RESPONSE_CACHE_SIZE: usize = 256;

/// Response from GitHub repository API
#[derive(Debug, Deserialize)]
struct Repository {
    name: String,
    description: Option<String>,
}

/// Response item from GitHub tags API
#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

/// Response from GitHub rate limit API
#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    rate: Rate,
}

#[derive(Debug, Deserialize)]
struct Rate {
    limit: i64,
    remaining: i64,
    /// Reset time in UNIX epoch seconds
    reset: i64,
}

/// Body of a successful response, replayed when GitHub answers 304
#[derive(Debug, Clone)]
struct CachedResponse {
    etag: String,
    body: String,
}

/// Client for the GitHub REST API
///
/// Metadata and tag responses are cached by URL together with their `ETag`.
/// Later requests are conditional; a 304 reuses the cached body and does not
/// count against the rate limit.
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    /// Insertion ordered so the oldest entry is evicted first
    cache: Mutex<IndexMap<String, CachedResponse>>,
    cache_capacity: usize,
}

impl GitHubClient {
    /// Creates a new GitHubClient against `base_url`, authenticating with `token`
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent("release-monitor")
                .timeout(timeout)
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            cache: Mutex::new(IndexMap::new()),
            cache_capacity: DEFAULT_RESPONSE_CACHE_SIZE,
        })
    }

    /// Sets how many responses are kept for conditional requests; 0 disables caching
    pub fn with_response_cache(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    fn lock_cache(&self) -> MutexGuard<'_, IndexMap<String, CachedResponse>> {
        // Entries are replaced whole, so a poisoned map is still consistent
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cached(&self, url: &str) -> Option<CachedResponse> {
        self.lock_cache().get(url).cloned()
    }

    fn remember(&self, url: &str, etag: String, body: String) {
        if self.cache_capacity == 0 {
            return;
        }

        let mut cache = self.lock_cache();
        cache.shift_remove(url);
        while cache.len() >= self.cache_capacity {
            cache.shift_remove_index(0);
        }
        cache.insert(url.to_string(), CachedResponse { etag, body });
    }

    /// GETs `url` as JSON, revalidating any cached copy with `If-None-Match`
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        identifier: &str,
    ) -> Result<T, ClientError> {
        let cached = self.cached(url);

        let mut request = self.get(url);
        if let Some(cached) = &cached {
            request = request.header(IF_NONE_MATCH, &cached.etag);
        }
        let response = request.send().await?;

        let body = match (response.status(), cached) {
            (StatusCode::NOT_MODIFIED, Some(cached)) => {
                debug!("Not modified, using cached response: {}", url);
                cached.body
            }
            _ => {
                let response = Self::check_status(response, identifier)?;
                let etag = response
                    .headers()
                    .get(ETAG)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let body = response.text().await?;
                if let Some(etag) = etag {
                    self.remember(url, etag, body.clone());
                }
                body
            }
        };

        serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to parse GitHub response from {}: {}", url, e);
            ClientError::InvalidResponse(e.to_string())
        })
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(&self.token)
    }

    /// Maps non-success statuses to client errors
    fn check_status(response: Response, identifier: &str) -> Result<Response, ClientError> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(identifier.to_string()));
        }

        let budget_exhausted = status == StatusCode::FORBIDDEN
            && response
                .headers()
                .get("x-ratelimit-remaining")
                .is_some_and(|v| v == "0");

        if status == StatusCode::TOO_MANY_REQUESTS || budget_exhausted {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ClientError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            warn!("GitHub API returned status {}: {}", status, response.url());
            return Err(ClientError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        Ok(response)
    }

    async fn fetch_repository(&self, identifier: &str) -> Result<Repository, ClientError> {
        let url = format!("{}/repos/{}", self.base_url, identifier);
        self.get_json(&url, identifier).await
    }

    async fn fetch_tags(&self, identifier: &str) -> Result<Vec<Tag>, ClientError> {
        let mut tags = Vec::new();

        for page in 1..=MAX_TAG_PAGES {
            let url = format!(
                "{}/repos/{}/tags?per_page={}&page={}",
                self.base_url, identifier, TAGS_PER_PAGE, page
            );
            let batch: Vec<Tag> = self.get_json(&url, identifier).await?;

            let last_page = batch.len() < TAGS_PER_PAGE;
            tags.extend(batch);
            if last_page {
                return Ok(tags);
            }
        }

        debug!(
            "Stopped listing tags for {} after {} pages",
            identifier, MAX_TAG_PAGES
        );
        Ok(tags)
    }
}

#[async_trait::async_trait]
impl RemoteHostClient for GitHubClient {
    fn host_type(&self) -> HostType {
        HostType::GitHub
    }

    async fn fetch_project(&self, identifier: &str) -> Result<RemoteProject, ClientError> {
        let repository = self.fetch_repository(identifier).await?;
        let tags = self.fetch_tags(identifier).await?;

        let releases = tags
            .into_iter()
            .map(|tag| RemoteRelease {
                url: format!("{}/{}/releases/tag/{}", WEB_BASE_URL, identifier, tag.name),
                version: tag.name,
                published_at: None,
            })
            .collect();

        Ok(RemoteProject {
            name: repository.name,
            description: repository.description,
            releases,
        })
    }
}

#[async_trait::async_trait]
impl RateLimitProbe for GitHubClient {
    async fn fetch_rate_limit(&self) -> Result<RateLimitSnapshot, ClientError> {
        let url = format!("{}/rate_limit", self.base_url);
        let response = Self::check_status(self.get(&url).send().await?, "rate_limit")?;

        let body: RateLimitResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse GitHub rate limit response: {}", e);
            ClientError::InvalidResponse(e.to_string())
        })?;

        Ok(RateLimitSnapshot {
            limit: body.rate.limit,
            remaining: body.rate.remaining,
            reset_at: DateTime::<Utc>::from_timestamp(body.rate.reset, 0),
        })
    }
}
