//! npm registry API client

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::warn;

use crate::host::client::{RemoteHostClient, RemoteProject, RemoteRelease};
use crate::host::error::ClientError;
use crate::host::types::HostType;

/// Default base URL for npm registry
pub const DEFAULT_BASE_URL: &str = "https://registry.npmjs.org";

/// Base URL for package pages on npmjs.com
const PACKAGE_PAGE_URL: &str = "https://www.npmjs.com/package";

/// Response from npm registry API
#[derive(Debug, Deserialize)]
struct NpmPackageResponse {
    name: String,
    description: Option<String>,
    /// Keeps the registry's document order
    #[serde(default)]
    versions: IndexMap<String, serde_json::Value>,
    /// Version -> publish time, plus "created"/"modified" entries
    #[serde(default)]
    time: HashMap<String, serde_json::Value>,
}

/// Client for the npm registry API
#[derive(Clone)]
pub struct NpmClient {
    client: reqwest::Client,
    base_url: String,
}

impl NpmClient {
    /// Creates a new NpmClient with a custom base URL
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent("release-monitor")
                .timeout(timeout)
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Encode package name for URL (handles scoped packages)
    fn encode_package_name(package_name: &str) -> String {
        if package_name.starts_with('@') {
            // Scoped package: @scope/name -> @scope%2Fname
            package_name.replace('/', "%2F")
        } else {
            package_name.to_string()
        }
    }

    fn published_at(
        time: &HashMap<String, serde_json::Value>,
        version: &str,
    ) -> Option<DateTime<Utc>> {
        time.get(version)
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
    }
}

#[async_trait::async_trait]
impl RemoteHostClient for NpmClient {
    fn host_type(&self) -> HostType {
        HostType::Npm
    }

    async fn fetch_project(&self, identifier: &str) -> Result<RemoteProject, ClientError> {
        let encoded_name = Self::encode_package_name(identifier);
        let url = format!("{}/{}", self.base_url, encoded_name);

        let response = self.client.get(&url).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(identifier.to_string()));
        }

        if !status.is_success() {
            warn!("npm registry returned status {}: {}", status, url);
            return Err(ClientError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let package: NpmPackageResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse npm registry response: {}", e);
            ClientError::InvalidResponse(e.to_string())
        })?;

        let page_url = format!("{}/{}", PACKAGE_PAGE_URL, identifier);
        let releases = package
            .versions
            .keys()
            .map(|version| RemoteRelease {
                version: version.clone(),
                url: page_url.clone(),
                published_at: Self::published_at(&package.time, version),
            })
            .collect();

        Ok(RemoteProject {
            name: package.name,
            description: package.description,
            releases,
        })
    }
}
