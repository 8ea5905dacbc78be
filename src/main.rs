use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use release_monitor::config::{self, MonitorConfig};
use release_monitor::host::registry::{HostRegistry, create_default_registry};
use release_monitor::host::service::HostService;
use release_monitor::host::types::{HostType, ProjectKey};
use release_monitor::logging;
use release_monitor::notify::{LogNotifier, Notifier, WebhookNotifier};
use release_monitor::scheduler::PollingScheduler;
use release_monitor::store::{ProjectStore, SqliteStore};

#[derive(Parser)]
#[command(name = "release-monitor")]
#[command(version, about = "Watch GitHub repositories and npm packages for new releases")]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Poll tracked projects until interrupted (default)
    Run,
    /// Run a single polling cycle and exit
    Poll,
    /// Start tracking a project
    Track { host: HostType, identifier: String },
    /// Stop tracking a project
    Untrack { host: HostType, identifier: String },
    /// List tracked projects with the number of known releases
    List,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _guard = logging::init(&config::log_dir())?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = MonitorConfig::load(cli.config.as_deref())?;

    std::fs::create_dir_all(config::data_dir()).context("Failed to create data directory")?;
    let store = Arc::new(SqliteStore::new(&config::db_path())?);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let scheduler = build_scheduler(&config, store)?;
            scheduler
                .run(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!("Failed to listen for shutdown signal: {}", e);
                    }
                })
                .await;
        }
        Command::Poll => {
            let report = build_scheduler(&config, store)?.run_cycle().await;
            println!(
                "{} checked, {} failed, {} new releases",
                report.checked, report.failed, report.new_releases
            );
        }
        Command::Track { host, identifier } => {
            let registry = create_default_registry(&config, store.clone())?;
            let Some(service) = registry.get(host) else {
                bail!("Host {} is not enabled", host);
            };

            let Some(project) = service.get_project(&identifier).await? else {
                bail!("Project {}/{} could not be fetched", host, identifier);
            };

            store.save_project(&project)?;
            info!("Tracking {}", project.key());
            println!(
                "Tracking {} ({} releases known)",
                project.key(),
                project.releases().len()
            );
        }
        Command::Untrack { host, identifier } => {
            let key = ProjectKey::new(host, identifier);
            if store.untrack(&key)? {
                println!("Stopped tracking {}", key);
            } else {
                bail!("{} is not tracked", key);
            }
        }
        Command::List => {
            for project in store.list_tracked_projects()? {
                println!(
                    "{}\t{}\t{} releases",
                    project.key(),
                    project.name,
                    project.releases().len()
                );
            }
        }
    }

    Ok(())
}

fn build_scheduler(
    config: &MonitorConfig,
    store: Arc<SqliteStore>,
) -> anyhow::Result<PollingScheduler> {
    let registry: HostRegistry = create_default_registry(config, store.clone())?;
    if registry.is_empty() {
        bail!("No hosts enabled");
    }
    info!("Enabled hosts: {}", registry.host_identifiers().join(", "));

    let notifier: Arc<dyn Notifier> = match &config.notifications.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url, config.polling.fetch_timeout())?),
        None => Arc::new(LogNotifier),
    };

    Ok(PollingScheduler::new(
        Arc::new(registry),
        store,
        notifier,
        &config.polling,
    ))
}
