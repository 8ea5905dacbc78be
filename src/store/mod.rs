//! Persistence of tracked projects and their releases

#[cfg(test)]
use mockall::automock;

use crate::host::error::StoreError;
use crate::host::types::{Project, ProjectKey, Release};

pub mod sqlite;

pub use sqlite::SqliteStore;

/// Trait for storing and retrieving tracked projects
///
/// Saves are idempotent upserts keyed by host type + identifier for projects
/// and by project + version for releases.
#[cfg_attr(test, automock)]
pub trait ProjectStore: Send + Sync + 'static {
    /// Save a single release, creating its project record if needed
    fn save_release(&self, release: &Release) -> Result<(), StoreError>;

    /// Save project metadata and every release it holds
    fn save_project(&self, project: &Project) -> Result<(), StoreError>;

    /// All tracked projects with their releases in discovery order
    fn list_tracked_projects(&self) -> Result<Vec<Project>, StoreError>;

    /// A single project with its releases, if stored
    fn get_project(&self, key: &ProjectKey) -> Result<Option<Project>, StoreError>;
}
