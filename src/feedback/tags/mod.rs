
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

pub const TAG_HEADERS: [&str; 3] = ["timestamp", "query", "correct_intent"];

/// A human-reviewed correction for one logged query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualTag {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub correct_intent: String,
}

/// Append-only store for manual tags, same header-once CSV semantics as
/// the query log.
#[derive(Debug)]
pub struct ManualTagStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ManualTagStore {
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
    pub fn append(&self, tags: &[ManualTag]) -> Result<()> {
        if tags.is_empty() {
            return Ok(());
        }

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create tag directory: {}", parent.display())
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
            .with_context(|| format!("Failed to open tag file: {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer
                .write_record(TAG_HEADERS)
                .context("Failed to write tag header")?;
        }

        for tag in tags {
            writer.serialize(tag).context("Failed to write tag")?;
        }
        writer.flush().context("Failed to flush tags")?;

        debug!("Appended {} manual tags", tags.len());
        Ok(())
    }

    #[inline]
    pub fn read_all(&self) -> Result<Vec<ManualTag>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open tag file: {}", self.path.display()))?;

        let mut tags = Vec::new();
        for row in reader.deserialize() {
            let tag: ManualTag = row.context("Failed to parse manual tag")?;
            tags.push(tag);
        }

        Ok(tags)
    }
}
