//! Per-turn usage metadata.
//!
//! A [`UsageRecord`] carries only the session id, duration, model name and a
//! timestamp. Recording never blocks and never fails the caller: the in-memory
//! log is bounded and the optional JSON-lines file is written by a background
//! task that logs and drops write errors.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// `YYYY-MM-DD HH:MM:SS`, UTC
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Records queued for the file writer before new ones are dropped
const FILE_QUEUE_SIZE: usize = 1024;

/// Default number of records kept in memory
pub const DEFAULT_USAGE_LOG_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub session_id: String,
    /// Seconds, rounded to two decimals
    pub duration_seconds: f64,
    pub model: String,
    pub timestamp: String,
}

impl UsageRecord {
    /// Build a record stamped with the current UTC time.
    pub fn new(session_id: impl Into<String>, duration: Duration, model: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            duration_seconds: round_to_hundredths(duration.as_secs_f64()),
            model: model.into(),
            timestamp: format_timestamp(OffsetDateTime::now_utc()),
        }
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).unwrap_or_default()
}

/// Sink for completed-turn usage records.
///
/// `record` must return promptly and must not panic; failures are the
/// recorder's problem, never the caller's.
pub trait UsageRecorder: Send + Sync {
    fn record(&self, record: UsageRecord);
}

/// Bounded in-memory usage log with an optional JSON-lines mirror.
pub struct UsageLog {
    records: Mutex<VecDeque<UsageRecord>>,
    capacity: usize,
    file_tx: Option<mpsc::Sender<UsageRecord>>,
}

impl UsageLog {
    /// In-memory only.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
            file_tx: None,
        }
    }

    /// In-memory plus a JSON-lines file appended from a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_file(capacity: usize, path: PathBuf) -> Self {
        let (tx, rx) = mpsc::channel(FILE_QUEUE_SIZE);
        tokio::spawn(run_file_writer(path, rx));

        Self {
            file_tx: Some(tx),
            ..Self::new(capacity)
        }
    }

    /// Copy of the retained records, oldest first.
    pub fn snapshot(&self) -> Vec<UsageRecord> {
        self.records.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl UsageRecorder for UsageLog {
    fn record(&self, record: UsageRecord) {
        if let Some(tx) = &self.file_tx
            && let Err(e) = tx.try_send(record.clone())
        {
            warn!(error = %e, "Usage file writer unavailable, record kept in memory only");
        }

        let mut records = self.records.lock();
        if records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }
}

async fn run_file_writer(path: PathBuf, mut rx: mpsc::Receiver<UsageRecord>) {
    let mut file = match tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
    {
        Ok(file) => file,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to open usage log file");
            // Drain so recording stays quiet after the open failure
            while rx.recv().await.is_some() {}
            return;
        }
    };

    debug!(path = %path.display(), "Usage log file opened");

    while let Some(record) = rx.recv().await {
        let mut line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to serialize usage record");
                continue;
            }
        };
        line.push('\n');

        if let Err(e) = file.write_all(line.as_bytes()).await {
            warn!(path = %path.display(), error = %e, "Failed to append usage record");
            continue;
        }
        if let Err(e) = file.flush().await {
            warn!(path = %path.display(), error = %e, "Failed to flush usage log file");
        }
    }
}
