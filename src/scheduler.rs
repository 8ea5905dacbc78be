//! Periodic polling of all tracked projects

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::stream::{self, StreamExt};
use tokio::time::{MissedTickBehavior, sleep};
use tracing::{debug, error, info, warn};

use crate::config::{FETCH_STAGGER_DELAY_MS, PollingConfig};
use crate::host::registry::HostRegistry;
use crate::host::types::Project;
use crate::notify::Notifier;
use crate::store::ProjectStore;

/// Summary of one polling cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Projects checked without error
    pub checked: usize,
    /// Projects whose check failed
    pub failed: usize,
    /// New releases found across all projects
    pub new_releases: usize,
}

enum Outcome {
    Checked { new_releases: usize },
    Failed,
}

/// Drives periodic release checks over the tracked projects
///
/// Holds no domain state: every cycle starts from the store's project list.
pub struct PollingScheduler {
    registry: Arc<HostRegistry>,
    store: Arc<dyn ProjectStore>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    concurrency: usize,
}

impl PollingScheduler {
    pub fn new(
        registry: Arc<HostRegistry>,
        store: Arc<dyn ProjectStore>,
        notifier: Arc<dyn Notifier>,
        config: &PollingConfig,
    ) -> Self {
        Self {
            registry,
            store,
            notifier,
            // tokio intervals must be non-zero
            interval: config.interval().max(Duration::from_millis(1)),
            concurrency: config.concurrency.max(1),
        }
    }

    /// Runs cycles every interval until `shutdown` resolves
    ///
    /// The first cycle starts immediately. A running cycle is finished before
    /// shutdown is observed.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!("Polling scheduler started, interval {:?}", self.interval);

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Polling scheduler stopped");
                    return;
                }
                _ = interval.tick() => {
                    self.run_cycle().await;
                }
            }
        }
    }

    /// Checks every tracked project once
    ///
    /// Errors are logged but do not stop processing of other projects.
    /// Projects are checked concurrently, at most `concurrency` at a time, with
    /// staggered start times within each slot.
    pub async fn run_cycle(&self) -> CycleReport {
        let projects = match self.store.list_tracked_projects() {
            Ok(projects) => projects,
            Err(e) => {
                error!("Failed to list tracked projects: {}", e);
                return CycleReport::default();
            }
        };

        debug!("Checking {} tracked projects", projects.len());

        let outcomes: Vec<Outcome> = stream::iter(projects.into_iter().enumerate())
            .map(|(i, project)| {
                let delay =
                    Duration::from_millis(FETCH_STAGGER_DELAY_MS * (i % self.concurrency) as u64);
                async move {
                    sleep(delay).await;
                    self.process_isolated(project).await
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let report = outcomes
            .into_iter()
            .fold(CycleReport::default(), |mut report, outcome| {
                match outcome {
                    Outcome::Checked { new_releases } => {
                        report.checked += 1;
                        report.new_releases += new_releases;
                    }
                    Outcome::Failed => report.failed += 1,
                }
                report
            });

        info!(
            "Polling cycle finished: {} checked, {} failed, {} new releases",
            report.checked, report.failed, report.new_releases
        );
        report
    }

    /// Processes one project, turning a panic into a failed outcome
    async fn process_isolated(&self, project: Project) -> Outcome {
        let key = project.key();

        match AssertUnwindSafe(self.process(project)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("Check of {} panicked", key);
                Outcome::Failed
            }
        }
    }

    async fn process(&self, mut project: Project) -> Outcome {
        let key = project.key();

        let service = match self.registry.resolve(&project) {
            Ok(service) => service,
            Err(e) => {
                error!("Cannot check {}: {}", key, e);
                return Outcome::Failed;
            }
        };

        let new_releases = match service.check(&mut project).await {
            Ok(releases) => releases,
            Err(e) => {
                error!("Failed to check {}: {}", key, e);
                return Outcome::Failed;
            }
        };

        for release in &new_releases {
            info!("New release of {}: {}", key, release.version);

            let _ = self
                .notifier
                .notify(&project, release)
                .await
                .inspect_err(|e| {
                    warn!(
                        "Failed to notify about {} {}: {}",
                        key, release.version, e
                    )
                });
        }

        Outcome::Checked {
            new_releases: new_releases.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::client::MockRemoteHostClient;
    use crate::host::error::{HostError, StoreError};
    use crate::host::service::{HostService, ServiceCore};
    use crate::host::types::{HostType, Release};
    use crate::notify::{MockNotifier, NotifyError};
    use crate::store::MockProjectStore;
    use chrono::Utc;

    /// npm service whose check outcome depends on the project identifier
    struct ScriptedService {
        core: ServiceCore,
    }

    #[async_trait::async_trait]
    impl HostService for ScriptedService {
        fn host_type(&self) -> HostType {
            HostType::Npm
        }

        fn valid_identifier(&self, _identifier: &str) -> bool {
            true
        }

        fn core(&self) -> &ServiceCore {
            &self.core
        }

        async fn check(&self, project: &mut Project) -> Result<Vec<Release>, HostError> {
            match project.identifier() {
                "broken" => Err(HostError::InvalidProject {
                    expected: HostType::Npm,
                    identifier: "broken".to_string(),
                }),
                "panics" => panic!("unexpected failure"),
                _ => {
                    let releases: Vec<Release> = ["2.0.0", "2.1.0"]
                        .iter()
                        .map(|v| Release {
                            version: v.to_string(),
                            url: String::new(),
                            published_at: Utc::now(),
                            project: project.key(),
                        })
                        .collect();
                    project.add_releases(releases.clone());
                    Ok(releases)
                }
            }
        }
    }

    fn registry() -> Arc<HostRegistry> {
        let core = ServiceCore::new(
            Arc::new(MockRemoteHostClient::new()),
            Arc::new(MockProjectStore::new()),
            Duration::from_secs(1),
        );
        let mut builder = HostRegistry::builder();
        builder
            .register(Arc::new(ScriptedService { core }))
            .unwrap();
        Arc::new(builder.build())
    }

    fn store_listing(projects: Vec<Project>) -> MockProjectStore {
        let mut store = MockProjectStore::new();
        store
            .expect_list_tracked_projects()
            .returning(move || Ok(projects.clone()));
        store
    }

    fn scheduler(store: MockProjectStore, notifier: MockNotifier) -> PollingScheduler {
        PollingScheduler::new(
            registry(),
            Arc::new(store),
            Arc::new(notifier),
            &PollingConfig {
                interval_ms: 60 * 60 * 1000,
                concurrency: 2,
                fetch_timeout_ms: 1000,
            },
        )
    }

    fn npm(identifier: &str) -> Project {
        Project::new(HostType::Npm, identifier, identifier)
    }

    #[tokio::test]
    async fn run_cycle_notifies_new_releases_in_order() {
        let mut notifier = MockNotifier::new();
        let mut seq = mockall::Sequence::new();
        notifier
            .expect_notify()
            .withf(|p, r| p.identifier() == "lodash" && r.version == "2.0.0")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        notifier
            .expect_notify()
            .withf(|p, r| p.identifier() == "lodash" && r.version == "2.1.0")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let report = scheduler(store_listing(vec![npm("lodash")]), notifier)
            .run_cycle()
            .await;

        assert_eq!(
            report,
            CycleReport {
                checked: 1,
                failed: 0,
                new_releases: 2
            }
        );
    }

    #[tokio::test]
    async fn run_cycle_continues_after_failing_project() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|p, _| p.identifier() == "lodash")
            .times(2)
            .returning(|_, _| Ok(()));

        let projects = vec![npm("broken"), npm("lodash")];
        let report = scheduler(store_listing(projects), notifier)
            .run_cycle()
            .await;

        assert_eq!(
            report,
            CycleReport {
                checked: 1,
                failed: 1,
                new_releases: 2
            }
        );
    }

    #[tokio::test]
    async fn run_cycle_continues_after_panicking_project() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .times(2)
            .returning(|_, _| Ok(()));

        let projects = vec![npm("panics"), npm("lodash")];
        let report = scheduler(store_listing(projects), notifier)
            .run_cycle()
            .await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.checked, 1);
    }

    #[tokio::test]
    async fn run_cycle_counts_project_without_host_as_failed() {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(2).returning(|_, _| Ok(()));

        let projects = vec![
            Project::new(HostType::GitHub, "apple/swift", "swift"),
            npm("lodash"),
        ];
        let report = scheduler(store_listing(projects), notifier)
            .run_cycle()
            .await;

        assert_eq!(
            report,
            CycleReport {
                checked: 1,
                failed: 1,
                new_releases: 2
            }
        );
    }

    #[tokio::test]
    async fn run_cycle_ignores_notification_failures() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .times(2)
            .returning(|_, _| Err(NotifyError::Rejected(500)));

        let report = scheduler(store_listing(vec![npm("lodash")]), notifier)
            .run_cycle()
            .await;

        assert_eq!(report.checked, 1);
        assert_eq!(report.new_releases, 2);
    }

    #[tokio::test]
    async fn run_cycle_returns_empty_report_when_store_fails() {
        let mut store = MockProjectStore::new();
        store
            .expect_list_tracked_projects()
            .returning(|| Err(StoreError::LockPoisoned));
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(0);

        let report = scheduler(store, notifier).run_cycle().await;

        assert_eq!(report, CycleReport::default());
    }

    #[tokio::test]
    async fn run_returns_without_cycle_when_already_shut_down() {
        let mut store = MockProjectStore::new();
        store.expect_list_tracked_projects().times(0);

        scheduler(store, MockNotifier::new())
            .run(std::future::ready(()))
            .await;
    }

    #[tokio::test]
    async fn run_starts_first_cycle_immediately() {
        let mut store = MockProjectStore::new();
        store
            .expect_list_tracked_projects()
            .times(1)
            .returning(|| Ok(Vec::new()));

        scheduler(store, MockNotifier::new())
            .run(tokio::time::sleep(Duration::from_millis(50)))
            .await;
    }
}
