//! Alert decisions.
//!
//! Two triggers are evaluated for every probe:
//!
//! - **error rate**: a failed probe alerts once the process-wide error count
//!   has reached the configured threshold, and keeps alerting on every later
//!   failure.
//! - **latency**: each probe slower than the threshold is a breach. The first
//!   breach of a batch is silent; every later breach in the same batch alerts.

use std::fmt;

use crate::config::MonitorSettings;
use crate::models::{MonitorState, ProbeOutcome};
use crate::utils::alert_timestamp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    ErrorRate {
        endpoint: String,
        threshold: u64,
        error_count: u64,
        at: String,
    },
    Latency {
        endpoint: String,
        latency_ms: u64,
        at: String,
    },
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alert::ErrorRate {
                endpoint,
                threshold,
                error_count,
                at,
            } => write!(
                f,
                "ALERT: error with site over {} errors: {}: {} Date: {}",
                threshold, endpoint, error_count, at
            ),
            Alert::Latency {
                endpoint,
                latency_ms,
                at,
            } => write!(
                f,
                "ALERT: error site over threshold: {}: Duration(ms): {} Date: {}",
                endpoint, latency_ms, at
            ),
        }
    }
}

/// Per-batch counters. A fresh tracker is created for every batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchTracker {
    threshold_breaches: u32,
    failures: u32,
}

impl BatchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn threshold_breaches(&self) -> u32 {
        self.threshold_breaches
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPolicy {
    pub error_alert_threshold: u64,
    pub latency_threshold_ms: u64,
}

impl AlertPolicy {
    pub fn from_settings(settings: &MonitorSettings) -> Self {
        Self {
            error_alert_threshold: settings.error_alert_threshold,
            latency_threshold_ms: settings.latency_threshold_ms,
        }
    }

    /// Decides which alerts `outcome` raises. `state` must already reflect
    /// this outcome (i.e. `record_failure` has run for a failed probe).
    pub fn evaluate(
        &self,
        outcome: &ProbeOutcome,
        state: &MonitorState,
        batch: &mut BatchTracker,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let at = alert_timestamp(&outcome.timestamp);

        if !outcome.success {
            batch.failures += 1;
            if state.consecutive_error_count >= self.error_alert_threshold {
                alerts.push(Alert::ErrorRate {
                    endpoint: outcome.endpoint.clone(),
                    threshold: self.error_alert_threshold,
                    error_count: state.consecutive_error_count,
                    at: at.clone(),
                });
            }
        }

        let latency_ms = outcome.latency_ms();
        if latency_ms > self.latency_threshold_ms {
            batch.threshold_breaches += 1;
            if batch.threshold_breaches > 1 {
                alerts.push(Alert::Latency {
                    endpoint: outcome.endpoint.clone(),
                    latency_ms,
                    at,
                });
            }
        }

        alerts
    }
}
