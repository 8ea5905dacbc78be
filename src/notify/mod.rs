//! Delivery of new-release notifications

#[cfg(test)]
use mockall::automock;

use thiserror::Error;
use tracing::info;

use crate::host::types::{Project, Release};

pub mod webhook;

pub use webhook::WebhookNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Notification rejected with status {0}")]
    Rejected(u16),
}

/// Trait for announcing newly discovered releases
///
/// Failures are reported to the caller for logging only; they never undo
/// persistence of the release.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, project: &Project, release: &Release) -> Result<(), NotifyError>;
}

/// Human-readable one-line announcement
pub fn format_message(project: &Project, release: &Release) -> String {
    format!(
        "New release of {} ({}): {} - {}",
        project.name,
        project.key(),
        release.version,
        release.url
    )
}

/// Writes every new release to the log
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, project: &Project, release: &Release) -> Result<(), NotifyError> {
        info!(
            host = project.host_type().as_str(),
            project = project.identifier(),
            version = %release.version,
            "{}",
            format_message(project, release)
        );
        Ok(())
    }
}
