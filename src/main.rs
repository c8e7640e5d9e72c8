use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{debug, error, info, warn};

use pulsewatch::api::{self, ApiState};
use pulsewatch::cli::Cli;
use pulsewatch::config::MonitorConfig;
use pulsewatch::engine::Monitor;
use pulsewatch::models::RunMode;
use pulsewatch::notifier::{AlertSink, WebhookNotifier};
use pulsewatch::probe::HttpProber;
use pulsewatch::recorder::Recorder;
use pulsewatch::utils;

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_ansi(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = MonitorConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    let settings = cli.settings();

    let recorder = Recorder::open(&cli.log_file, &cli.metrics_file)
        .await
        .with_context(|| format!("Failed to open log file {}", cli.log_file.display()))?;

    let hostname = utils::local_hostname().unwrap_or_default();
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    info!(%hostname, os = std::env::consts::OS, cpus, "Starting pulsewatch");
    debug!(
        ?settings,
        endpoints = ?config.servers,
        notifications = config.notification().is_enabled(),
        "runtime settings"
    );
    if config.servers.is_empty() {
        warn!(config = %cli.config.display(), "no servers configured");
    }

    let notifier = Arc::new(
        WebhookNotifier::new(config.notification())
            .with_connectivity_url(cli.connectivity_url.clone()),
    );
    let startup = format!("Starting pulsewatch hostname: {}", hostname);
    notifier.notify(&format!("INFO: {}", startup)).await;
    if let Err(e) = recorder.log_event("INFO", &startup).await {
        warn!(error = %e, "failed to append to event log");
    }

    if cli.webserver {
        let listener = api::bind(cli.port)
            .await
            .with_context(|| format!("Failed to bind HTTP port {}", cli.port))?;
        let state = Arc::new(ApiState {
            log_path: recorder.log_path().to_path_buf(),
            metrics_path: recorder.metrics_path().to_path_buf(),
        });
        let app = api::create_router(state, &cli.static_dir);
        tokio::spawn(async move {
            if let Err(e) = api::serve(listener, app).await {
                error!("HTTP interface failed: {}", e);
            }
        });
    }

    let mut monitor = Monitor::new(
        settings.clone(),
        config.servers.clone(),
        Arc::new(HttpProber::new()),
        notifier,
        recorder,
    );

    tokio::select! {
        _ = monitor.run() => {
            if settings.mode == RunMode::Single {
                info!("exit");
            }
        }
        res = signal::ctrl_c() => {
            res.context("Failed to listen for shutdown signal")?;
            info!("Shutdown signal received. Stopping pulsewatch...");
        }
    }

    Ok(())
}
