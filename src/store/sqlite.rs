use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction};
use tracing::{debug, info, warn};

use crate::host::error::StoreError;
use crate::host::types::{HostType, Project, ProjectKey, Release};
use crate::store::ProjectStore;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(db_path: &Path) -> Result<Self, StoreError> {
        info!("Initializing release database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        debug!("Database connection established");

        let store = Self {
            conn: Mutex::new(conn),
        };

        store.create_schema()?;
        info!("Release database initialized successfully");

        Ok(store)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                host_type TEXT NOT NULL,
                identifier TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                updated_at INTEGER NOT NULL,
                tracked INTEGER NOT NULL DEFAULT 1,
                UNIQUE(host_type, identifier)
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS releases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id INTEGER NOT NULL,
                version TEXT NOT NULL,
                url TEXT NOT NULL,
                published_at INTEGER NOT NULL,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
                UNIQUE(project_id, version)
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_releases_project_id ON releases(project_id)",
            [],
        )?;

        debug!("Database schema created successfully");
        Ok(())
    }

    /// Stop tracking a project. Its releases are kept.
    ///
    /// Returns false if the project is not stored.
    pub fn untrack(&self, key: &ProjectKey) -> Result<bool, StoreError> {
        let conn = self.lock_conn()?;

        let rows_affected = conn.execute(
            "UPDATE projects SET tracked = 0 WHERE host_type = ?1 AND identifier = ?2",
            (key.host_type.as_str(), &key.identifier),
        )?;

        Ok(rows_affected > 0)
    }

    fn project_id(tx: &Transaction<'_>, key: &ProjectKey) -> Result<i64, StoreError> {
        Ok(tx.query_row(
            "SELECT id FROM projects WHERE host_type = ?1 AND identifier = ?2",
            (key.host_type.as_str(), &key.identifier),
            |row| row.get(0),
        )?)
    }

    fn insert_release(
        tx: &Transaction<'_>,
        project_id: i64,
        release: &Release,
    ) -> Result<(), StoreError> {
        // Using INSERT OR IGNORE with UNIQUE constraint on (project_id, version)
        tx.execute(
            r#"
            INSERT OR IGNORE INTO releases (project_id, version, url, published_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            (
                project_id,
                &release.version,
                &release.url,
                release.published_at.timestamp_millis(),
            ),
        )?;
        Ok(())
    }

    fn load_releases(
        conn: &Connection,
        project_id: i64,
        key: &ProjectKey,
    ) -> Result<Vec<Release>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT version, url, published_at FROM releases WHERE project_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map([project_id], |row| {
                let version: String = row.get(0)?;
                let url: String = row.get(1)?;
                let published_at: i64 = row.get(2)?;
                Ok((version, url, published_at))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(version, url, published_at)| {
                let published_at = DateTime::<Utc>::from_timestamp_millis(published_at)
                    .ok_or_else(|| {
                        StoreError::Corrupt(format!(
                            "{}@{} has invalid timestamp {}",
                            key, version, published_at
                        ))
                    })?;
                Ok(Release {
                    version,
                    url,
                    published_at,
                    project: key.clone(),
                })
            })
            .collect()
    }

    fn load_project(
        conn: &Connection,
        project_id: i64,
        key: ProjectKey,
        name: String,
        description: Option<String>,
    ) -> Result<Project, StoreError> {
        let releases = Self::load_releases(conn, project_id, &key)?;

        Ok(Project::new(key.host_type, key.identifier, name)
            .with_description(description)
            .with_releases(releases))
    }
}

impl ProjectStore for SqliteStore {
    fn save_release(&self, release: &Release) -> Result<(), StoreError> {
        let key = &release.project;
        let now = Utc::now().timestamp_millis();

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        // Placeholder row in case the release is saved before its project
        tx.execute(
            r#"
            INSERT INTO projects (host_type, identifier, name, updated_at)
            VALUES (?1, ?2, ?2, ?3)
            ON CONFLICT(host_type, identifier) DO NOTHING
            "#,
            (key.host_type.as_str(), &key.identifier, now),
        )?;

        let project_id = Self::project_id(&tx, key)?;
        Self::insert_release(&tx, project_id, release)?;

        tx.commit()?;

        debug!("Saved release {} for {}", release.version, key);
        Ok(())
    }

    fn save_project(&self, project: &Project) -> Result<(), StoreError> {
        let key = project.key();
        let now = Utc::now().timestamp_millis();

        debug!(
            "Saving project {} with {} releases",
            key,
            project.releases().len()
        );

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO projects (host_type, identifier, name, description, updated_at, tracked)
            VALUES (?1, ?2, ?3, ?4, ?5, 1)
            ON CONFLICT(host_type, identifier) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                updated_at = excluded.updated_at,
                tracked = 1
            "#,
            (
                key.host_type.as_str(),
                &key.identifier,
                &project.name,
                &project.description,
                now,
            ),
        )?;

        let project_id = Self::project_id(&tx, &key)?;
        for release in project.releases() {
            Self::insert_release(&tx, project_id, release)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn list_tracked_projects(&self) -> Result<Vec<Project>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, host_type, identifier, name, description
            FROM projects
            WHERE tracked = 1
            ORDER BY id
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let host_type: String = row.get(1)?;
                let identifier: String = row.get(2)?;
                let name: String = row.get(3)?;
                let description: Option<String> = row.get(4)?;
                Ok((id, host_type, identifier, name, description))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut projects = Vec::with_capacity(rows.len());
        for (id, host_type, identifier, name, description) in rows {
            let Ok(host_type) = host_type.parse::<HostType>() else {
                warn!("Skipping project {} with unknown host type {}", identifier, host_type);
                continue;
            };
            let key = ProjectKey::new(host_type, identifier);
            projects.push(Self::load_project(&conn, id, key, name, description)?);
        }

        Ok(projects)
    }

    fn get_project(&self, key: &ProjectKey) -> Result<Option<Project>, StoreError> {
        let conn = self.lock_conn()?;

        let row = conn
            .query_row(
                r#"
                SELECT id, name, description FROM projects
                WHERE host_type = ?1 AND identifier = ?2
                "#,
                (key.host_type.as_str(), &key.identifier),
                |row| {
                    let id: i64 = row.get(0)?;
                    let name: String = row.get(1)?;
                    let description: Option<String> = row.get(2)?;
                    Ok((id, name, description))
                },
            )
            .optional()?;

        row.map(|(id, name, description)| {
            Self::load_project(&conn, id, key.clone(), name, description)
        })
        .transpose()
    }
}
