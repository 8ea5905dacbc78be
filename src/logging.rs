//! Tracing subscriber setup

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Log file name prefix; the appender adds the date suffix
pub const LOG_FILE_PREFIX: &str = "release-monitor.log";

const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber
///
/// JSON lines go to a daily rolling file under `log_dir`; a compact copy goes
/// to stderr. `RUST_LOG` overrides the default `info` level. The returned guard
/// must be held until exit so buffered lines are flushed.
pub fn init(log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_writer(writer))
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init()?;

    Ok(guard)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_creates_log_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("nested").join("logs");

        // A subscriber may already be installed by another test; the directory
        // is created before that matters.
        let _guard = init(&log_dir);

        assert!(log_dir.is_dir());
    }
}
