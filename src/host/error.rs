use thiserror::Error;

use crate::host::types::HostType;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Project not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Illegal {host_type} identifier: {identifier:?}")]
    InvalidIdentifier {
        host_type: HostType,
        identifier: String,
    },

    #[error("Project {identifier} is not a {expected} project")]
    InvalidProject {
        expected: HostType,
        identifier: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Host already registered: {0}")]
    DuplicateHost(String),

    #[error("No registered host accepts {host_type} project {identifier}")]
    NoMatchingHost {
        host_type: HostType,
        identifier: String,
    },

    #[error("Several hosts accept {host_type} project {identifier}: {hosts:?}")]
    AmbiguousHost {
        host_type: HostType,
        identifier: String,
        hosts: Vec<String>,
    },
}
