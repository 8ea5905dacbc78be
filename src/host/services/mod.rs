//! Host service variants

pub mod github;
pub mod npm;

pub use github::GitHubService;
pub use npm::NpmService;
