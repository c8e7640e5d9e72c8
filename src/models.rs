use chrono::{DateTime, Local};
use std::time::Duration;

use crate::utils;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One full cycle of batches, then return.
    Single,
    /// Cycles forever.
    Continuous,
}

/// Result of a single probe against one endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub endpoint: String,
    pub timestamp: DateTime<Local>,
    pub success: bool,
    pub latency: Duration,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn succeeded(
        endpoint: impl Into<String>,
        timestamp: DateTime<Local>,
        latency: Duration,
        status_code: u16,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            timestamp,
            success: true,
            latency,
            status_code: Some(status_code),
            error: None,
        }
    }

    pub fn failed(
        endpoint: impl Into<String>,
        timestamp: DateTime<Local>,
        latency: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            timestamp,
            success: false,
            latency,
            status_code: None,
            error: Some(error.into()),
        }
    }

    pub fn latency_ms(&self) -> u64 {
        u64::try_from(self.latency.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Counters carried across every batch for the lifetime of the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorState {
    pub hostname: String,
    /// Never reset on success.
    pub consecutive_error_count: u64,
    pub run_count: u64,
}

impl MonitorState {
    pub fn new() -> Self {
        Self {
            hostname: utils::local_hostname().unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn record_failure(&mut self) {
        self.consecutive_error_count += 1;
        if let Some(hostname) = utils::local_hostname() {
            self.hostname = hostname;
        }
    }

    pub fn record_run_completion(&mut self) {
        self.run_count += 1;
    }
}
