//! Remote host client implementations

pub mod github;
pub mod npm;

pub use github::GitHubClient;
pub use npm::NpmClient;
