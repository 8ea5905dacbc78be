//! Registry of host services
//!
//! Services are registered once at startup through [`HostRegistryBuilder`].
//! [`HostRegistryBuilder::build`] freezes the set into a read-only
//! [`HostRegistry`] that is shared with the scheduler.

use std::sync::Arc;

use tracing::info;

use crate::config::{ConfigError, MonitorConfig};
use crate::host::error::RegistryError;
use crate::host::service::HostService;
use crate::host::services::{GitHubService, NpmService};
use crate::host::types::{HostType, Project};
use crate::store::ProjectStore;

/// Collects host services during startup
#[derive(Default)]
pub struct HostRegistryBuilder {
    services: Vec<Arc<dyn HostService>>,
}

impl HostRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a service under its host identifier
    pub fn register(&mut self, service: Arc<dyn HostService>) -> Result<(), RegistryError> {
        let identifier = service.host_identifier();

        if self
            .services
            .iter()
            .any(|s| s.host_identifier() == identifier)
        {
            return Err(RegistryError::DuplicateHost(identifier.to_string()));
        }

        info!("Registered host service: {}", identifier);
        self.services.push(service);
        Ok(())
    }

    /// Freezes the registered services
    pub fn build(self) -> HostRegistry {
        HostRegistry {
            services: self.services,
        }
    }
}

/// Read-only mapping from host identifier to host service
pub struct HostRegistry {
    services: Vec<Arc<dyn HostService>>,
}

impl HostRegistry {
    pub fn builder() -> HostRegistryBuilder {
        HostRegistryBuilder::new()
    }

    /// Finds the one service that accepts `project`
    pub fn resolve(&self, project: &Project) -> Result<&Arc<dyn HostService>, RegistryError> {
        let mut matching = self.services.iter().filter(|s| s.is_satisfied_by(project));

        let Some(first) = matching.next() else {
            return Err(RegistryError::NoMatchingHost {
                host_type: project.host_type(),
                identifier: project.identifier().to_string(),
            });
        };

        let others: Vec<_> = matching.map(|s| s.host_identifier().to_string()).collect();
        if !others.is_empty() {
            let hosts = std::iter::once(first.host_identifier().to_string())
                .chain(others)
                .collect();
            return Err(RegistryError::AmbiguousHost {
                host_type: project.host_type(),
                identifier: project.identifier().to_string(),
                hosts,
            });
        }

        Ok(first)
    }

    /// Looks up the service registered for a host type
    pub fn get(&self, host_type: HostType) -> Option<&Arc<dyn HostService>> {
        self.services.iter().find(|s| s.host_type() == host_type)
    }

    /// Identifiers of all registered services, in registration order
    pub fn host_identifiers(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.host_identifier()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Create the registry for every host enabled in `config`
///
/// Fails if an enabled host is misconfigured (e.g. GitHub without a token).
pub fn create_default_registry(
    config: &MonitorConfig,
    store: Arc<dyn ProjectStore>,
) -> Result<HostRegistry, ConfigError> {
    let fetch_timeout = config.polling.fetch_timeout();
    let mut builder = HostRegistry::builder();

    if config.hosts.github.enabled {
        builder.register(Arc::new(GitHubService::from_config(
            &config.hosts.github,
            store.clone(),
            fetch_timeout,
        )?))?;
    }

    if config.hosts.npm.enabled {
        builder.register(Arc::new(NpmService::from_config(
            &config.hosts.npm,
            store,
            fetch_timeout,
        )?))?;
    }

    Ok(builder.build())
}
