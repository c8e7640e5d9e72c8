use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::alert::{AlertPolicy, BatchTracker};
use crate::config::MonitorSettings;
use crate::models::{MonitorState, ProbeOutcome, RunMode};
use crate::notifier::AlertSink;
use crate::probe::Prober;
use crate::recorder::Recorder;

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Summary of one pass over every endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub probes: usize,
    pub failures: u32,
    pub threshold_breaches: u32,
    pub alerts: usize,
}

pub struct Monitor {
    settings: MonitorSettings,
    endpoints: Vec<String>,
    policy: AlertPolicy,
    state: MonitorState,
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn AlertSink>,
    recorder: Recorder,
    sleeper: Arc<dyn Sleeper>,
}

impl Monitor {
    pub fn new(
        settings: MonitorSettings,
        endpoints: Vec<String>,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn AlertSink>,
        recorder: Recorder,
    ) -> Self {
        Self {
            policy: AlertPolicy::from_settings(&settings),
            settings,
            endpoints,
            state: MonitorState::new(),
            prober,
            notifier,
            recorder,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Runs the loop. In single mode this returns after one cycle; in
    /// continuous mode it never returns.
    pub async fn run(&mut self) {
        match self.settings.mode {
            RunMode::Single => {
                info!(endpoints = self.endpoints.len(), "single run");
                self.log_event("INFO", "single run").await;
                self.run_cycle().await;
                info!(
                    runs = self.state.run_count,
                    errors = self.state.consecutive_error_count,
                    "single run complete"
                );
            }
            RunMode::Continuous => {
                info!(endpoints = self.endpoints.len(), "loop run");
                self.log_event("INFO", "loop run").await;
                loop {
                    self.run_cycle().await;
                    info!(
                        interval = ?self.settings.schedule.cycle_interval,
                        "cycle done, sleeping"
                    );
                    self.sleeper.sleep(self.settings.schedule.cycle_interval).await;
                }
            }
        }
    }

    /// Runs `batch_repeat` batches, pausing between them but not after the last.
    pub async fn run_cycle(&mut self) -> Vec<BatchReport> {
        let schedule = self.settings.schedule;
        let mut reports = Vec::with_capacity(schedule.batch_repeat as usize);

        for batch in 0..schedule.batch_repeat {
            let report = self.run_batch().await;
            debug!(batch, ?report, "batch finished");
            reports.push(report);

            if batch + 1 < schedule.batch_repeat {
                debug!(pause = ?schedule.batch_pause, "pausing before next batch");
                self.sleeper.sleep(schedule.batch_pause).await;
            }
        }
        reports
    }

    /// Probes every endpoint once, in config order.
    pub async fn run_batch(&mut self) -> BatchReport {
        debug!(
            hostname = %self.state.hostname,
            errors = self.state.consecutive_error_count,
            runs = self.state.run_count,
            endpoints = ?self.endpoints,
            "starting batch"
        );

        let mut tracker = BatchTracker::new();
        let mut report = BatchReport::default();
        let endpoints = self.endpoints.clone();

        for (index, endpoint) in endpoints.iter().enumerate() {
            let outcome = self.prober.probe(endpoint).await;
            report.alerts += self.process_outcome(&outcome, index == 0, &mut tracker).await;
            report.probes += 1;
        }

        self.state.record_run_completion();
        report.failures = tracker.failures();
        report.threshold_breaches = tracker.threshold_breaches();
        report
    }

    async fn process_outcome(
        &mut self,
        outcome: &ProbeOutcome,
        first_in_batch: bool,
        tracker: &mut BatchTracker,
    ) -> usize {
        let endpoint = outcome.endpoint.as_str();
        let latency_ms = outcome.latency_ms();

        if outcome.success {
            info!(endpoint, status = ?outcome.status_code, latency_ms, "CHECK_OK");
            self.log_event("CHECK_OK", endpoint).await;
        } else {
            self.state.record_failure();
            let detail = outcome.error.as_deref().unwrap_or("unknown error");
            warn!(
                endpoint,
                error = detail,
                count = self.state.consecutive_error_count,
                "CHECK_ERROR"
            );
            self.log_event("CHECK_ERROR", &format!("{} error: {}", endpoint, detail)).await;
        }

        self.log_event(
            "LATENCY",
            &format!(
                "{} Duration(ms) {} threshold {}",
                endpoint, latency_ms, self.settings.latency_threshold_ms
            ),
        )
        .await;

        let alerts = self.policy.evaluate(outcome, &self.state, tracker);
        for alert in &alerts {
            let message = alert.to_string();
            warn!(%message, "raising alert");
            self.log_event("ALERT", &message).await;
            let delivery = self.notifier.notify(&message).await;
            debug!(?delivery, "alert dispatched");
        }

        if let Err(e) = self.recorder.record_metric(outcome, first_in_batch).await {
            warn!(
                path = %self.recorder.metrics_path().display(),
                error = %e,
                "failed to write metrics"
            );
        }

        alerts.len()
    }

    async fn log_event(&self, tag: &str, message: &str) {
        if let Err(e) = self.recorder.log_event(tag, message).await {
            warn!(
                path = %self.recorder.log_path().display(),
                error = %e,
                "failed to append to event log"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Schedule;
    use crate::notifier::Delivery;
    use chrono::Local;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Clone, Copy)]
    enum Step {
        Ok(u64),
        Fail(u64),
    }

    /// Replays scripted steps per endpoint; the last step repeats forever.
    #[derive(Default)]
    struct ScriptedProber {
        scripts: Mutex<HashMap<String, VecDeque<Step>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedProber {
        fn with(mut self, endpoint: &str, steps: &[Step]) -> Self {
            self.scripts
                .get_mut()
                .unwrap()
                .insert(endpoint.to_string(), steps.iter().copied().collect());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn probe(&self, endpoint: &str) -> ProbeOutcome {
            self.calls.lock().unwrap().push(endpoint.to_string());
            let step = {
                let mut scripts = self.scripts.lock().unwrap();
                let script = scripts.get_mut(endpoint).expect("unscripted endpoint");
                if script.len() > 1 {
                    script.pop_front().unwrap()
                } else {
                    *script.front().unwrap()
                }
            };
            match step {
                Step::Ok(ms) => {
                    ProbeOutcome::succeeded(endpoint, Local::now(), Duration::from_millis(ms), 200)
                }
                Step::Fail(ms) => ProbeOutcome::failed(
                    endpoint,
                    Local::now(),
                    Duration::from_millis(ms),
                    "connection refused",
                ),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn notify(&self, message: &str) -> Delivery {
            self.messages.lock().unwrap().push(message.to_string());
            Delivery::Sent { status: 200 }
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    struct Harness {
        monitor: Monitor,
        prober: Arc<ScriptedProber>,
        sink: Arc<RecordingSink>,
        sleeper: Arc<RecordingSleeper>,
        recorder: Recorder,
        _dir: TempDir,
    }

    fn harness(mode: RunMode, prober: ScriptedProber, endpoints: &[&str]) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::new(dir.path().join("events.log"), dir.path().join("metrics.log"));
        let prober = Arc::new(prober);
        let sink = Arc::new(RecordingSink::default());
        let sleeper = Arc::new(RecordingSleeper::default());
        let settings = MonitorSettings {
            mode,
            schedule: Schedule {
                batch_repeat: 3,
                batch_pause: Duration::from_secs(60),
                cycle_interval: Duration::from_secs(120),
            },
            ..MonitorSettings::default()
        };
        let monitor = Monitor::new(
            settings,
            endpoints.iter().map(|e| e.to_string()).collect(),
            prober.clone(),
            sink.clone(),
            recorder.clone(),
        )
        .with_sleeper(sleeper.clone());

        Harness {
            monitor,
            prober,
            sink,
            sleeper,
            recorder,
            _dir: dir,
        }
    }

    fn read(path: &std::path::Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[tokio::test]
    async fn test_single_run_probes_three_batches_in_order() {
        let prober = ScriptedProber::default()
            .with("http://a", &[Step::Ok(10)])
            .with("http://b", &[Step::Ok(20)]);
        let mut h = harness(RunMode::Single, prober, &["http://a", "http://b"]);

        h.monitor.run().await;

        assert_eq!(
            h.prober.calls(),
            vec!["http://a", "http://b", "http://a", "http://b", "http://a", "http://b"]
        );
        assert_eq!(h.monitor.state().run_count, 3);
        // Pauses between batches only; none after the final batch.
        assert_eq!(*h.sleeper.sleeps.lock().unwrap(), vec![Duration::from_secs(60); 2]);
        assert!(h.sink.messages().is_empty());
    }

    #[tokio::test]
    async fn test_one_batch_end_to_end() {
        let prober = ScriptedProber::default()
            .with("http://ok.test", &[Step::Ok(50)])
            .with("http://down.test", &[Step::Fail(3)]);
        let mut h = harness(RunMode::Single, prober, &["http://ok.test", "http://down.test"]);

        let report = h.monitor.run_batch().await;

        assert_eq!(report.probes, 2);
        assert_eq!(report.failures, 1);
        assert_eq!(report.alerts, 0);
        assert_eq!(h.monitor.state().consecutive_error_count, 1);
        assert_eq!(h.monitor.state().run_count, 1);
        assert!(h.sink.messages().is_empty());

        assert_eq!(read(h.recorder.metrics_path()), "http___ok_test 50\nhttp___down_test 3\n");
        let log = read(h.recorder.log_path());
        assert!(log.lines().any(|l| l.contains("CHECK_OK http://ok.test")));
        assert!(log
            .lines()
            .any(|l| l.contains("CHECK_ERROR http://down.test error: connection refused")));
    }

    #[tokio::test]
    async fn test_error_alert_on_every_failure_past_threshold() {
        let prober = ScriptedProber::default().with("http://down", &[Step::Fail(1)]);
        let mut h = harness(RunMode::Single, prober, &["http://down"]);

        h.monitor.run_cycle().await;

        assert_eq!(h.monitor.state().consecutive_error_count, 3);
        let messages = h.sink.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0]
            .starts_with("ALERT: error with site over 2 errors: http://down: 2 Date: "));
        assert!(messages[1]
            .starts_with("ALERT: error with site over 2 errors: http://down: 3 Date: "));
    }

    #[tokio::test]
    async fn test_success_does_not_reset_error_count() {
        let prober = ScriptedProber::default().with(
            "http://flaky",
            &[Step::Fail(1), Step::Ok(1), Step::Fail(1)],
        );
        let mut h = harness(RunMode::Single, prober, &["http://flaky"]);

        h.monitor.run_cycle().await;

        assert_eq!(h.monitor.state().consecutive_error_count, 2);
        let messages = h.sink.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("http://flaky: 2 Date:"));
    }

    #[tokio::test]
    async fn test_latency_breaches_reset_each_batch() {
        let prober = ScriptedProber::default()
            .with("http://a", &[Step::Ok(800)])
            .with("http://b", &[Step::Ok(900)])
            .with("http://c", &[Step::Ok(100)]);
        let mut h = harness(RunMode::Single, prober, &["http://a", "http://b", "http://c"]);

        let first = h.monitor.run_batch().await;
        assert_eq!(first.threshold_breaches, 2);
        assert_eq!(first.alerts, 1);

        let second = h.monitor.run_batch().await;
        assert_eq!(second.threshold_breaches, 2);
        assert_eq!(second.alerts, 1);

        let messages = h.sink.messages();
        assert_eq!(messages.len(), 2);
        for message in messages {
            assert!(message.starts_with(
                "ALERT: error site over threshold: http://b: Duration(ms): 900 Date: "
            ));
        }
    }

    #[tokio::test]
    async fn test_metrics_hold_only_latest_batch() {
        let prober = ScriptedProber::default()
            .with("http://a", &[Step::Ok(10), Step::Ok(11)])
            .with("http://b", &[Step::Ok(20), Step::Ok(21)]);
        let mut h = harness(RunMode::Single, prober, &["http://a", "http://b"]);

        h.monitor.run_batch().await;
        assert_eq!(read(h.recorder.metrics_path()), "http___a 10\nhttp___b 20\n");

        h.monitor.run_batch().await;
        assert_eq!(read(h.recorder.metrics_path()), "http___a 11\nhttp___b 21\n");
    }

    #[tokio::test]
    async fn test_alerts_are_written_to_event_log() {
        let prober = ScriptedProber::default().with("http://down", &[Step::Fail(1)]);
        let mut h = harness(RunMode::Single, prober, &["http://down"]);

        h.monitor.run_batch().await;
        h.monitor.run_batch().await;

        let log = read(h.recorder.log_path());
        assert_eq!(log.lines().filter(|l| l.contains(" ALERT ")).count(), 1);
        assert_eq!(log.lines().filter(|l| l.contains(" LATENCY http://down")).count(), 2);
    }

    #[tokio::test]
    async fn test_continuous_mode_sleeps_between_cycles() {
        let prober = ScriptedProber::default().with("http://a", &[Step::Ok(5)]);
        let mut h = harness(RunMode::Continuous, prober, &["http://a"]);

        let run = tokio::time::timeout(Duration::from_millis(200), h.monitor.run()).await;

        assert!(run.is_err(), "continuous mode must not return");
        assert!(h.monitor.state().run_count >= 3);
        let sleeps = h.sleeper.sleeps.lock().unwrap().clone();
        assert!(sleeps.len() >= 3);
        assert_eq!(
            sleeps[..3],
            [Duration::from_secs(60), Duration::from_secs(60), Duration::from_secs(120)]
        );
    }

    #[tokio::test]
    async fn test_empty_endpoint_list_still_counts_runs() {
        let mut h = harness(RunMode::Single, ScriptedProber::default(), &[]);
        h.monitor.run().await;
        assert_eq!(h.monitor.state().run_count, 3);
        assert!(h.prober.calls().is_empty());
    }
}
