//! Host service contract
//!
//! A host service ties a [`RemoteHostClient`], an optional [`RateLimiter`] and
//! the [`reconciler`](crate::host::reconciler) together. Variants only decide
//! which projects they accept; fetching and reconciliation are shared.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::host::client::{RemoteHostClient, RemoteProject};
use crate::host::error::{ClientError, HostError};
use crate::host::rate_limit::RateLimiter;
use crate::host::reconciler::diff;
use crate::host::types::{HostType, Project, ProjectKey, Release};
use crate::store::ProjectStore;

/// Components shared by every host service variant
pub struct ServiceCore {
    client: Arc<dyn RemoteHostClient>,
    store: Arc<dyn ProjectStore>,
    rate_limiter: Option<RateLimiter>,
    fetch_timeout: Duration,
}

impl ServiceCore {
    pub fn new(
        client: Arc<dyn RemoteHostClient>,
        store: Arc<dyn ProjectStore>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            client,
            store,
            rate_limiter: None,
            fetch_timeout,
        }
    }

    /// Gates every check on the host's call budget
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    pub fn rate_limiter(&self) -> Option<&RateLimiter> {
        self.rate_limiter.as_ref()
    }

    /// Fetches a project from the remote host, mapping every failure to `None`
    async fn fetch(&self, identifier: &str) -> Option<Project> {
        let host_type = self.client.host_type();

        match timeout(self.fetch_timeout, self.client.fetch_project(identifier)).await {
            Ok(Ok(remote)) => Some(into_project(host_type, identifier, remote)),
            Ok(Err(ClientError::NotFound(_))) => {
                info!("{} project does not exist: {}", host_type, identifier);
                None
            }
            Ok(Err(e)) => {
                warn!("Failed to fetch {} project {}: {}", host_type, identifier, e);
                None
            }
            Err(_) => {
                warn!(
                    "Fetching {} project {} timed out after {:?}",
                    host_type, identifier, self.fetch_timeout
                );
                None
            }
        }
    }

    /// Persists new releases one by one in order, stopping at the first failure
    ///
    /// Returns the releases that made it to the store.
    fn persist_releases(&self, prefix: &str, candidates: Vec<Release>) -> Vec<Release> {
        let mut saved = Vec::with_capacity(candidates.len());

        for release in candidates {
            if let Err(e) = self.store.save_release(&release) {
                error!(
                    "{}: Failed to save release {}, deferring it to the next check: {}",
                    prefix, release.version, e
                );
                break;
            }
            saved.push(release);
        }

        saved
    }
}

fn into_project(host_type: HostType, identifier: &str, remote: RemoteProject) -> Project {
    let discovered_at = Utc::now();
    let key = ProjectKey::new(host_type, identifier);

    let releases = remote
        .releases
        .into_iter()
        .map(|r| Release {
            version: r.version,
            url: r.url,
            published_at: r.published_at.unwrap_or(discovered_at),
            project: key.clone(),
        })
        .collect();

    Project::new(host_type, identifier, remote.name)
        .with_description(remote.description)
        .with_releases(releases)
}

/// Uniform contract over the supported remote hosts
#[async_trait::async_trait]
pub trait HostService: Send + Sync {
    /// Returns the type of host this service handles
    fn host_type(&self) -> HostType;

    /// Key under which this service is registered
    fn host_identifier(&self) -> &str {
        self.host_type().as_str()
    }

    /// Syntactic validation of a host-specific identifier
    fn valid_identifier(&self, identifier: &str) -> bool;

    fn core(&self) -> &ServiceCore;

    /// True iff the project belongs to this host
    fn is_satisfied_by(&self, project: &Project) -> bool {
        project.host_type() == self.host_type()
    }

    /// Fetches current metadata and the full release list for an identifier
    ///
    /// # Returns
    /// * `Ok(Some(Project))` - The project as the host reports it now
    /// * `Ok(None)` - The project does not exist or the host could not be read
    /// * `Err(HostError::InvalidIdentifier)` - If the identifier is malformed
    async fn get_project(&self, identifier: &str) -> Result<Option<Project>, HostError> {
        debug!("Processing {} project with identifier: {}", self.host_type(), identifier);

        if !self.valid_identifier(identifier) {
            return Err(HostError::InvalidIdentifier {
                host_type: self.host_type(),
                identifier: identifier.to_string(),
            });
        }

        Ok(self.core().fetch(identifier).await)
    }

    /// Finds, persists and returns the releases not yet known for a project
    ///
    /// New releases are appended to `project` in discovery order. Rate limit
    /// exhaustion and fetch failures yield an empty list and leave `project`
    /// untouched.
    async fn check(&self, project: &mut Project) -> Result<Vec<Release>, HostError> {
        if !self.is_satisfied_by(project) {
            return Err(HostError::InvalidProject {
                expected: self.host_type(),
                identifier: project.identifier().to_string(),
            });
        }

        let core = self.core();
        let prefix = format!("{}[{}]", self.host_identifier(), project.identifier());

        if let Some(limiter) = core.rate_limiter()
            && !limiter.should_proceed().await
        {
            info!(
                "{}: Reached rate limit. Returning empty list of new releases.",
                prefix
            );
            return Ok(Vec::new());
        }

        let Some(remote) = self.get_project(project.identifier()).await? else {
            warn!("{}: Could not read project from host. Returning!", prefix);
            return Ok(Vec::new());
        };

        let candidates = diff(project.releases(), remote.releases());
        let new_releases = core.persist_releases(&prefix, candidates);

        if !new_releases.is_empty() {
            project.add_releases(new_releases.iter().cloned());

            if let Err(e) = core.store.save_project(project) {
                error!("{}: Failed to save project: {}", prefix, e);
            }
        }

        debug!("{}: Found {} new releases", prefix, new_releases.len());
        Ok(new_releases)
    }
}
