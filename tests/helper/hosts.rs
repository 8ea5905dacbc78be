//! Fake hosts, notifiers and stores for integration tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use release_monitor::config::PollingConfig;
use release_monitor::host::client::{RemoteHostClient, RemoteProject, RemoteRelease};
use release_monitor::host::error::{ClientError, StoreError};
use release_monitor::host::registry::HostRegistry;
use release_monitor::host::service::ServiceCore;
use release_monitor::host::services::NpmService;
use release_monitor::host::types::{HostType, Project, ProjectKey, Release};
use release_monitor::notify::{NotifyError, Notifier};
use release_monitor::scheduler::PollingScheduler;
use release_monitor::store::{ProjectStore, SqliteStore};

/// In-memory npm registry whose packages can change between cycles
#[derive(Default)]
pub struct FakeNpmClient {
    packages: Mutex<HashMap<String, Vec<String>>>,
    failing: Mutex<Vec<String>>,
}

impl FakeNpmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_versions(self, package: &str, versions: &[&str]) -> Self {
        self.set_versions(package, versions);
        self
    }

    pub fn set_versions(&self, package: &str, versions: &[&str]) {
        self.packages.lock().unwrap().insert(
            package.to_string(),
            versions.iter().map(|v| v.to_string()).collect(),
        );
    }

    /// Makes every fetch of `package` fail with a network-like error
    pub fn fail(&self, package: &str) {
        self.failing.lock().unwrap().push(package.to_string());
    }
}

#[async_trait]
impl RemoteHostClient for FakeNpmClient {
    fn host_type(&self) -> HostType {
        HostType::Npm
    }

    async fn fetch_project(&self, identifier: &str) -> Result<RemoteProject, ClientError> {
        if self.failing.lock().unwrap().iter().any(|p| p == identifier) {
            return Err(ClientError::InvalidResponse("connection reset".to_string()));
        }

        let packages = self.packages.lock().unwrap();
        let versions = packages
            .get(identifier)
            .ok_or_else(|| ClientError::NotFound(identifier.to_string()))?;

        Ok(RemoteProject {
            name: identifier.to_string(),
            description: None,
            releases: versions
                .iter()
                .map(|v| RemoteRelease {
                    version: v.clone(),
                    url: format!("https://www.npmjs.com/package/{}", identifier),
                    published_at: None,
                })
                .collect(),
        })
    }
}

/// Notifier that remembers every announcement
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    /// (project identifier, version) pairs in delivery order
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, project: &Project, release: &Release) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((project.identifier().to_string(), release.version.clone()));
        Ok(())
    }
}

/// Create a SQLite store in a temporary directory
pub fn create_test_store() -> (TempDir, Arc<SqliteStore>) {
    let temp_dir = TempDir::new().unwrap();
    let store = SqliteStore::new(&temp_dir.path().join("test.db")).unwrap();
    (temp_dir, Arc::new(store))
}

/// Persist an npm project as already tracked with the given versions
pub fn track_npm_project(store: &SqliteStore, package: &str, versions: &[&str]) -> Project {
    let key = ProjectKey::new(HostType::Npm, package);
    let releases = versions
        .iter()
        .map(|v| Release {
            version: v.to_string(),
            url: format!("https://www.npmjs.com/package/{}", package),
            published_at: chrono::Utc::now(),
            project: key.clone(),
        })
        .collect::<Vec<_>>();

    let project = Project::new(HostType::Npm, package, package).with_releases(releases);
    store.save_project(&project).unwrap();
    project
}

/// Store whose next `save_project` calls fail; every other call reaches SQLite
pub struct FlakyProjectSaves {
    inner: Arc<SqliteStore>,
    failures_left: AtomicUsize,
}

impl FlakyProjectSaves {
    pub fn new(inner: Arc<SqliteStore>, failures: usize) -> Self {
        Self {
            inner,
            failures_left: AtomicUsize::new(failures),
        }
    }
}

impl ProjectStore for FlakyProjectSaves {
    fn save_release(&self, release: &Release) -> Result<(), StoreError> {
        self.inner.save_release(release)
    }

    fn save_project(&self, project: &Project) -> Result<(), StoreError> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::LockPoisoned);
        }
        self.inner.save_project(project)
    }

    fn list_tracked_projects(&self) -> Result<Vec<Project>, StoreError> {
        self.inner.list_tracked_projects()
    }

    fn get_project(&self, key: &ProjectKey) -> Result<Option<Project>, StoreError> {
        self.inner.get_project(key)
    }
}

/// npm service backed by the fake client and the given store
pub fn create_npm_service(
    client: Arc<FakeNpmClient>,
    store: Arc<dyn ProjectStore>,
) -> NpmService {
    NpmService::new(ServiceCore::new(client, store, Duration::from_secs(5)))
}

/// Scheduler over an npm-only registry
pub fn create_scheduler(
    client: Arc<FakeNpmClient>,
    store: Arc<dyn ProjectStore>,
    notifier: Arc<RecordingNotifier>,
) -> PollingScheduler {
    let mut builder = HostRegistry::builder();
    builder
        .register(Arc::new(create_npm_service(client, store.clone())))
        .unwrap();

    PollingScheduler::new(
        Arc::new(builder.build()),
        store,
        notifier,
        &PollingConfig {
            interval_ms: 60_000,
            concurrency: 2,
            fetch_timeout_ms: 5_000,
        },
    )
}
