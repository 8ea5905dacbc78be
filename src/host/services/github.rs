//! GitHub host service

use std::sync::Arc;
use std::time::Duration;

use regex::{Regex, RegexBuilder};
use tracing::info;

use crate::config::{ConfigError, GitHubConfig};
use crate::host::clients::GitHubClient;
use crate::host::rate_limit::RateLimiter;
use crate::host::service::{HostService, ServiceCore};
use crate::host::types::HostType;
use crate::store::ProjectStore;

/// Tracks tags of GitHub repositories, gated by the API rate limit
pub struct GitHubService {
    core: ServiceCore,
    /// Matches `owner/repo`, case-insensitive
    identifier_re: Regex,
}

impl GitHubService {
    pub fn new(core: ServiceCore) -> Self {
        Self {
            core,
            identifier_re: RegexBuilder::new(r"^[a-z0-9_-]+/[a-z0-9_-]+$")
                .case_insensitive(true)
                .build()
                .unwrap(),
        }
    }

    /// Wires the GitHub client and rate limiter from configuration
    ///
    /// Fails if no auth token is configured.
    pub fn from_config(
        config: &GitHubConfig,
        store: Arc<dyn ProjectStore>,
        fetch_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let token = config
            .token()
            .ok_or(ConfigError::MissingToken(HostType::GitHub))?;

        let client = Arc::new(
            GitHubClient::new(&config.base_url, &token, fetch_timeout)
                .map_err(|source| ConfigError::HttpClient {
                    host_type: HostType::GitHub,
                    source,
                })?
                .with_response_cache(config.response_cache_size),
        );

        let rate_limiter = RateLimiter::new(
            HostType::GitHub,
            client.clone(),
            config.rate_limit_buffer,
            fetch_timeout,
        );
        let core = ServiceCore::new(client, store, fetch_timeout).with_rate_limiter(rate_limiter);

        info!("GitHub service up and running");
        Ok(Self::new(core))
    }
}

impl HostService for GitHubService {
    fn host_type(&self) -> HostType {
        HostType::GitHub
    }

    fn valid_identifier(&self, identifier: &str) -> bool {
        self.identifier_re.is_match(identifier)
    }

    fn core(&self) -> &ServiceCore {
        &self.core
    }
}
