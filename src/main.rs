//! linkwatch - live network health monitor
//!
//! Probes a fixed catalog of endpoints in concurrent rounds and reports
//! each completed snapshot.

mod catalog;
mod config;
mod probe;
mod report;
mod scheduler;
mod stats;
mod target;

use config::{MonitorConfig, OutputFormat};
use probe::NetworkProber;
use scheduler::{Monitor, RoundRunner};
use target::{Snapshot, Target};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("linkwatch=info".parse()?))
        .init();

    // Load configuration
    let cfg = MonitorConfig::load();

    let specs = match &cfg.catalog_path {
        Some(path) => {
            tracing::info!("Loading catalog from {}", path.display());
            catalog::load_catalog(path)?
        }
        None => catalog::default_catalog(),
    };
    let targets: Vec<Target> = specs.iter().map(Target::from).collect();

    let runner = RoundRunner::new(NetworkProber, cfg.probe_config());
    tracing::info!(
        "Probe deadline {:?}, stagger up to {:?}",
        runner.config().deadline,
        runner.config().max_stagger
    );

    let monitor = Monitor::new(runner, targets);
    let mut rx = monitor.subscribe();
    monitor.start(cfg.interval).await;

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                emit(&snapshot, cfg.output)?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down...");
                monitor.stop().await;
                break;
            }
        }
    }

    Ok(())
}

fn emit(snapshot: &Snapshot, output: OutputFormat) -> Result<(), serde_json::Error> {
    match output {
        OutputFormat::Log => report::log_snapshot(snapshot),
        OutputFormat::Json => println!("{}", serde_json::to_string(snapshot)?),
    }
    Ok(())
}
