pub mod config;
pub mod host;
pub mod logging;
pub mod notify;
pub mod scheduler;
pub mod store;
