//! Command line flags.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::api::DEFAULT_PORT;
use crate::config::{
    MonitorSettings, Schedule, DEFAULT_BATCH_REPEAT, DEFAULT_ERROR_ALERT_THRESHOLD,
    DEFAULT_INTERVAL_SECS, DEFAULT_LATENCY_THRESHOLD_MS,
};
use crate::models::RunMode;
use crate::notifier::DEFAULT_CONNECTIVITY_URL;
use crate::recorder::{DEFAULT_LOG_FILE, DEFAULT_METRICS_FILE};

#[derive(Parser, Debug)]
#[command(name = "pulsewatch")]
#[command(about = "HTTP uptime and latency monitor with webhook alerts")]
#[command(version)]
pub struct Cli {
    /// Verbose logging of internal state
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Run one cycle of checks, then exit
    #[arg(short = 's', long)]
    pub single: bool,

    /// Latency threshold in milliseconds
    #[arg(short = 't', long = "threshold", default_value_t = DEFAULT_LATENCY_THRESHOLD_MS)]
    pub threshold_ms: u64,

    /// Serve the log and metrics files over HTTP
    #[arg(short = 'w', long)]
    pub webserver: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Port for the HTTP interface
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Event log file
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Metrics file
    #[arg(long, default_value = DEFAULT_METRICS_FILE)]
    pub metrics_file: PathBuf,

    /// Directory served as static files by the HTTP interface
    #[arg(long, default_value = "public")]
    pub static_dir: PathBuf,

    /// URL probed before sending an alert
    #[arg(long, default_value = DEFAULT_CONNECTIVITY_URL)]
    pub connectivity_url: String,

    /// Batches per cycle
    #[arg(
        long,
        default_value_t = DEFAULT_BATCH_REPEAT,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub batch_repeat: u32,

    /// Seconds to pause between batches
    #[arg(long, default_value_t = DEFAULT_INTERVAL_SECS)]
    pub batch_pause_secs: u64,

    /// Seconds to sleep between cycles
    #[arg(long, default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval_secs: u64,

    /// Failure count from which every failed check alerts
    #[arg(
        long,
        default_value_t = DEFAULT_ERROR_ALERT_THRESHOLD,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub error_alert_threshold: u64,
}

impl Cli {
    pub fn settings(&self) -> MonitorSettings {
        MonitorSettings {
            mode: if self.single {
                RunMode::Single
            } else {
                RunMode::Continuous
            },
            latency_threshold_ms: self.threshold_ms,
            error_alert_threshold: self.error_alert_threshold,
            schedule: Schedule {
                batch_repeat: self.batch_repeat,
                batch_pause: Duration::from_secs(self.batch_pause_secs),
                cycle_interval: Duration::from_secs(self.interval_secs),
            },
        }
    }
}
