//! Release hosts: where tracked projects publish their releases
//!
//! Each supported host (GitHub, npm) is represented by a service that knows how
//! to validate identifiers, fetch project metadata through a client, and
//! reconcile fetched releases against the ones already known.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Registry   │────▶│   Service   │────▶│    Store    │
//! │  (resolve)  │     │   (check)   │     │  (persist)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                       │         │
//!                       ▼         ▼
//!              ┌─────────────┐ ┌─────────────┐
//!              │   Client    │ │ RateLimiter │
//!              │  (fetch)    │ │   (gate)    │
//!              └─────────────┘ └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`client`]: Client trait for fetching remote project data
//! - [`clients`]: HTTP clients for GitHub and the npm registry
//! - [`error`]: Error types for hosts, clients and storage
//! - [`rate_limit`]: Quota gate consulted before each remote fetch
//! - [`reconciler`]: Diff of fetched releases against known ones
//! - [`registry`]: Lookup of the service responsible for a project
//! - [`service`]: Shared check workflow for all hosts
//! - [`services`]: Concrete host services
//! - [`types`]: Projects, releases and host types

pub mod client;
pub mod clients;
pub mod error;
pub mod rate_limit;
pub mod reconciler;
pub mod registry;
pub mod service;
pub mod services;
pub mod types;
