//! Flat-file records of monitor activity.
//!
//! Every write opens the file, writes whole lines with a single call and
//! closes it again, so readers (the exposition server) never see a file
//! handle held across the loop.

use chrono::Local;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::models::ProbeOutcome;
use crate::utils::sanitize_endpoint;

pub const DEFAULT_LOG_FILE: &str = "pulsewatch.log";
pub const DEFAULT_METRICS_FILE: &str = "pulsewatch_metrics.log";

#[derive(Debug, Clone)]
pub struct Recorder {
    log_path: PathBuf,
    metrics_path: PathBuf,
}

impl Recorder {
    pub fn new(log_path: impl Into<PathBuf>, metrics_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            metrics_path: metrics_path.into(),
        }
    }

    /// Like [`Recorder::new`], but fails if the event log cannot be opened
    /// for appending.
    pub async fn open(
        log_path: impl Into<PathBuf>,
        metrics_path: impl Into<PathBuf>,
    ) -> io::Result<Self> {
        let recorder = Self::new(log_path, metrics_path);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&recorder.log_path)
            .await?;
        Ok(recorder)
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn metrics_path(&self) -> &Path {
        &self.metrics_path
    }

    /// Appends `<time> <tag> <line>` for every line of `message`.
    pub async fn log_event(&self, tag: &str, message: &str) -> io::Result<()> {
        let stamp = Local::now().format("%Y/%m/%d %H:%M:%S");
        let mut buf = String::new();
        for line in message.split('\n') {
            buf.push_str(&format!("{} {} {}\n", stamp, tag, line));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await?;
        file.write_all(buf.as_bytes()).await?;
        file.flush().await
    }

    /// Writes one metrics line. `first_in_batch` truncates the file first.
    pub async fn record_metric(
        &self,
        outcome: &ProbeOutcome,
        first_in_batch: bool,
    ) -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.create(true);
        if first_in_batch {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }

        let mut file = options.open(&self.metrics_path).await?;
        file.write_all(metric_line(outcome).as_bytes()).await?;
        file.flush().await
    }
}

pub fn metric_line(outcome: &ProbeOutcome) -> String {
    format!("{} {}\n", sanitize_endpoint(&outcome.endpoint), outcome.latency_ms())
}

/// Returns at most `limit` trailing lines of the file at `path`.
/// The file is streamed, so memory stays bounded by `limit` lines; bytes
/// that are not valid UTF-8 are replaced rather than failing the read.
pub async fn tail_lines(path: &Path, limit: usize) -> io::Result<Vec<String>> {
    let file = tokio::fs::File::open(path).await?;
    let mut segments = BufReader::new(file).split(b'\n');
    let mut tail = VecDeque::with_capacity(limit);

    while let Some(mut line) = segments.next_segment().await? {
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if limit == 0 {
            continue;
        }
        if tail.len() == limit {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    Ok(tail
        .into_iter()
        .map(|line| String::from_utf8_lossy(&line).into_owned())
        .collect())
}
