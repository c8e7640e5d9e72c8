//! pulsewatch - HTTP uptime and latency monitor.
//!
//! Endpoints from the config file are probed in batches. Failures and slow
//! responses feed the alert policy, alerts go out through a webhook, and
//! every outcome lands in a flat event log and metrics file that can be
//! served over HTTP.

pub mod alert;
pub mod api;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod notifier;
pub mod probe;
pub mod recorder;
pub mod utils;
