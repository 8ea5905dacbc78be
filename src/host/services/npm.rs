//! npm host service

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{ConfigError, NpmConfig};
use crate::host::clients::NpmClient;
use crate::host::service::{HostService, ServiceCore};
use crate::host::types::HostType;
use crate::store::ProjectStore;

/// Longest package name the npm registry accepts
const MAX_NAME_LENGTH: usize = 214;

/// Tracks published versions of npm packages
pub struct NpmService {
    core: ServiceCore,
}

impl NpmService {
    pub fn new(core: ServiceCore) -> Self {
        Self { core }
    }

    pub fn from_config(
        config: &NpmConfig,
        store: Arc<dyn ProjectStore>,
        fetch_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let client = NpmClient::new(&config.base_url, fetch_timeout).map_err(|source| {
            ConfigError::HttpClient {
                host_type: HostType::Npm,
                source,
            }
        })?;

        info!("npm service up and running");
        Ok(Self::new(ServiceCore::new(
            Arc::new(client),
            store,
            fetch_timeout,
        )))
    }
}

impl HostService for NpmService {
    fn host_type(&self) -> HostType {
        HostType::Npm
    }

    fn valid_identifier(&self, identifier: &str) -> bool {
        !identifier.is_empty()
            && identifier.len() <= MAX_NAME_LENGTH
            && !identifier.starts_with(['.', '-', '_'])
    }

    fn core(&self) -> &ServiceCore {
        &self.core
    }
}
