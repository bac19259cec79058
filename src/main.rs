//! beacon-monitor - region monitoring daemon
//!
//! Reads beacon sightings as JSON lines from stdin, tracks inside/outside
//! state per configured region and writes each transition to a JSONL file.
//! State is preserved in `state_dir` across restarts.
//!
//! Module structure:
//! - `domain/` - Core types (Region, Beacon, Identifier, MonitoringEvent)
//! - `io/` - Collaborators (state store, codec, notifier, egress, sightings)
//! - `services/` - Region state machine, registry, sweeper, notification worker
//! - `infra/` - Infrastructure (Config, Metrics, Clock)

use beacon_monitor::infra::{Config, Metrics, SystemClock};
use beacon_monitor::io::{
    create_notification_channel, run_sighting_reader, FileStateStore, TransitionEgress,
};
use beacon_monitor::services::{run_sweeper, NotificationWorker, RegionRegistry, RegistrySettings};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// beacon-monitor - debounced region enter/exit tracking
#[derive(Parser, Debug)]
#[command(name = "beacon-monitor", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// Delete saved state on exit and do not save again
    #[arg(long)]
    no_preserve_state: bool,
}

fn main() -> anyhow::Result<()> {
    // Default: INFO, use RUST_LOG=debug for per-sighting visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(git_hash = %env!("GIT_HASH"), "beacon-monitor starting");

    let args = Args::parse();

    // A pending stdin read holds a blocking thread, so bound the runtime shutdown
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(args));
    runtime.shutdown_timeout(Duration::from_millis(500));
    result
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        site = %config.site_id(),
        expiration_ms = %config.expiration_ms(),
        sweep_interval_ms = %config.sweep_interval_ms(),
        persistence = %config.persistence_enabled(),
        state_path = %config.state_path().display(),
        regions = %config.regions().len(),
        "config_loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let metrics = Arc::new(Metrics::new());

    let (notifier, notification_rx) = create_notification_channel(metrics.clone());
    let registry = Arc::new(
        RegionRegistry::new(
            RegistrySettings::from_config(&config),
            Arc::new(FileStateStore::new(config.state_dir())),
            Arc::new(notifier),
            Arc::new(SystemClock),
        )
        .with_metrics(metrics.clone()),
    );

    let restored = registry.regions_snapshot();
    for region in config.regions() {
        if registry.add(region.clone()) {
            continue;
        }
        // Already restored: the persisted criteria stay in effect
        if let Some(existing) = restored.iter().find(|r| *r == region) {
            if !existing.same_criteria(region) {
                info!(restored = %existing, configured = %region, "restored_region_criteria_differ");
            }
        }
    }
    for region in registry.regions_not_in(config.regions()) {
        info!(region = %region, "restored_region_not_in_config");
    }
    info!(regions = %registry.count(), outcome = ?registry.restore_outcome(), "regions_registered");

    let worker = NotificationWorker::new(
        notification_rx,
        TransitionEgress::new(config.egress_file()),
        config.site_id(),
    );
    let worker_handle = tokio::spawn(worker.run());

    let sweeper_handle =
        tokio::spawn(run_sweeper(registry.clone(), config.sweep_interval_ms(), shutdown_rx.clone()));

    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs().max(1);
    let mut metrics_shutdown = shutdown_rx.clone();
    let metrics_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
        interval.tick().await;
        loop {
            tokio::select! {
                changed = metrics_shutdown.changed() => {
                    if changed.is_err() || *metrics_shutdown.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => metrics_clone.report().log(),
            }
        }
    });

    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown_signal_received");
            let _ = ctrl_c_tx.send(true);
        }
    });

    // Consume sightings until stdin closes or a shutdown signal arrives
    let stdin = BufReader::new(tokio::io::stdin());
    run_sighting_reader(stdin, registry.clone(), metrics.clone(), shutdown_rx).await;
    let _ = shutdown_tx.send(true);

    sweeper_handle.await?;
    metrics_handle.await?;

    if args.no_preserve_state {
        registry.disable_persistence();
    }

    // Dropping the registry closes the notification channel
    drop(registry);
    worker_handle.await?;

    metrics.report().log();
    info!("beacon-monitor shutdown complete");
    Ok(())
}
