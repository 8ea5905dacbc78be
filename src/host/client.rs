//! Client traits for talking to remote hosts

use chrono::{DateTime, Utc};

#[cfg(test)]
use mockall::automock;

use crate::host::error::ClientError;
use crate::host::types::HostType;

/// Raw project data as reported by a remote host
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteProject {
    pub name: String,
    pub description: Option<String>,
    /// Releases in host-defined order
    pub releases: Vec<RemoteRelease>,
}

/// Raw release data as reported by a remote host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRelease {
    pub version: String,
    pub url: String,
    /// `None` when the host does not report a publish time (e.g. git tags)
    pub published_at: Option<DateTime<Utc>>,
}

/// Rate limit budget as reported by a remote host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub limit: i64,
    pub remaining: i64,
    pub reset_at: Option<DateTime<Utc>>,
}

/// Trait for fetching project metadata and releases from a remote host
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait RemoteHostClient: Send + Sync {
    /// Returns the type of host this client talks to
    fn host_type(&self) -> HostType;

    /// Fetches metadata and the full release list for a project
    ///
    /// # Arguments
    /// * `identifier` - Host-specific project identifier (e.g., "apple/swift" for GitHub)
    ///
    /// # Returns
    /// * `Ok(RemoteProject)` - Project data with releases in host order
    /// * `Err(ClientError::NotFound)` - If the project does not exist on the host
    /// * `Err(ClientError)` - If the fetch fails for any other reason
    async fn fetch_project(&self, identifier: &str) -> Result<RemoteProject, ClientError>;
}

/// Trait for hosts that enforce a call budget
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait RateLimitProbe: Send + Sync {
    /// Queries the remote host for its current call budget
    async fn fetch_rate_limit(&self) -> Result<RateLimitSnapshot, ClientError>;
}
