//! Common types for tracked projects and their releases

use chrono::{DateTime, Utc};

/// Type of remote host a project lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostType {
    /// GitHub repository (apple/swift)
    GitHub,
    /// npm package (lodash, @types/node)
    Npm,
}

impl HostType {
    /// Returns the string representation of the host type
    pub fn as_str(&self) -> &'static str {
        match self {
            HostType::GitHub => "github",
            HostType::Npm => "npm",
        }
    }
}

impl std::fmt::Display for HostType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HostType {
    type Err = UnknownHostType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" => Ok(HostType::GitHub),
            "npm" => Ok(HostType::Npm),
            _ => Err(UnknownHostType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown host type: {0}")]
pub struct UnknownHostType(pub String);

/// Identifies a project across hosts
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectKey {
    pub host_type: HostType,
    pub identifier: String,
}

impl ProjectKey {
    pub fn new(host_type: HostType, identifier: impl Into<String>) -> Self {
        Self {
            host_type,
            identifier: identifier.into(),
        }
    }
}

impl std::fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.host_type, self.identifier)
    }
}

/// One discovered version of a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Host-defined version string, never parsed
    pub version: String,
    /// Where the release can be looked at
    pub url: String,
    /// Publish time if the host reports one, otherwise discovery time
    pub published_at: DateTime<Utc>,
    /// Owning project. Used for traversal only; the project owns the release.
    pub project: ProjectKey,
}

/// A tracked project and the releases known for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    identifier: String,
    pub name: String,
    pub description: Option<String>,
    host_type: HostType,
    releases: Vec<Release>,
}

impl Project {
    pub fn new(
        host_type: HostType,
        identifier: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            description: None,
            host_type,
            releases: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_releases(mut self, releases: Vec<Release>) -> Self {
        self.releases = releases;
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn host_type(&self) -> HostType {
        self.host_type
    }

    pub fn key(&self) -> ProjectKey {
        ProjectKey::new(self.host_type, self.identifier.clone())
    }

    /// Releases in the order they were discovered
    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    /// Appends releases whose version is not yet known to this project
    pub fn add_releases(&mut self, releases: impl IntoIterator<Item = Release>) {
        for release in releases {
            if !self.releases.iter().any(|r| r.version == release.version) {
                self.releases.push(release);
            }
        }
    }
}
