
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

pub const LOG_HEADERS: [&str; 6] = [
    "timestamp",
    "query",
    "predicted_intent",
    "confidence",
    "resolved",
    "user_feedback",
];

/// One interaction episode, as persisted in the query log. Append-only;
/// nothing ever deletes from this file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub predicted_intent: String,
    pub confidence: f32,
    pub resolved: bool,
    pub user_feedback: Option<String>,
}

/// Durable query log backed by a flat CSV file. The header row is written
/// idempotently on first use; concurrent appends are serialized so rows
/// never interleave. Reads take a point-in-time snapshot and do not block
/// appends.
#[derive(Debug)]
pub struct InteractionLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl InteractionLog {
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn record(
        &self,
        query: &str,
        predicted_intent: &str,
        confidence: f32,
        resolved: bool,
        user_feedback: Option<&str>,
    ) -> Result<()> {
        self.append(&LogRecord {
            timestamp: Utc::now(),
            query: query.to_string(),
            predicted_intent: predicted_intent.to_string(),
            confidence,
            resolved,
            user_feedback: user_feedback.map(str::to_string),
        })
    }

    #[inline]
    pub fn append(&self, record: &LogRecord) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create log directory: {}", parent.display())
            })?;
        }

        let needs_header = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata.len() == 0,
            Err(_) => true,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open log file: {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer
                .write_record(LOG_HEADERS)
                .context("Failed to write log header")?;
        }

        writer
            .serialize(record)
            .context("Failed to write log record")?;
        writer.flush().context("Failed to flush log record")?;

        debug!("Appended log record for query: {}", record.query);
        Ok(())
    }

    /// Snapshot of every record currently in the log. A missing file reads
    /// as empty rather than an error.
    #[inline]
    pub fn read_all(&self) -> Result<Vec<LogRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open log file: {}", self.path.display()))?;

        let mut records = Vec::new();
        for row in reader.deserialize() {
            let record: LogRecord = row.context("Failed to parse log record")?;
            records.push(record);
        }

        Ok(records)
    }
}
