
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::feedback::log::InteractionLog;
use crate::feedback::tags::ManualTagStore;

/// One labeled example for classifier training.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub query: String,
    pub intent: String,
}

/// Left-join the query log with the manual tags on query text and write
/// the result wholesale as the next training dataset. A tag wins over the
/// originally predicted intent; when a query was tagged more than once the
/// latest tag applies. The output file is fully regenerated, never
/// appended.
#[inline]
pub fn build_training_set(
    log: &InteractionLog,
    tags: &ManualTagStore,
    output_path: &Path,
) -> Result<Vec<TrainingExample>> {
    let records = log.read_all()?;
    if records.is_empty() {
        bail!(
            "Query log {} is empty; nothing to build a training set from",
            log.path().display()
        );
    }

    let mut corrections: HashMap<String, String> = HashMap::new();
    for tag in tags.read_all()? {
        // File order is append order, so later tags supersede earlier ones
        corrections.insert(tag.query, tag.correct_intent);
    }

    let examples: Vec<TrainingExample> = records
        .into_iter()
        .map(|record| {
            let intent = corrections
                .get(&record.query)
                .cloned()
                .unwrap_or(record.predicted_intent);
            TrainingExample {
                query: record.query,
                intent,
            }
        })
        .collect();

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create dataset directory: {}", parent.display())
        })?;
    }

    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("Failed to create dataset file: {}", output_path.display()))?;
    for example in &examples {
        writer
            .serialize(example)
            .context("Failed to write training example")?;
    }
    writer.flush().context("Failed to flush dataset")?;

    if examples.is_empty() {
        warn!("Training dataset {} is empty", output_path.display());
    } else {
        info!(
            "Wrote {} training examples to {}",
            examples.len(),
            output_path.display()
        );
    }

    Ok(examples)
}

/// Read a training dataset written by `build_training_set`.
#[inline]
pub fn read_training_set(path: &Path) -> Result<Vec<TrainingExample>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open dataset file: {}", path.display()))?;

    let mut examples = Vec::new();
    for row in reader.deserialize() {
        let example: TrainingExample = row.context("Failed to parse training example")?;
        examples.push(example);
    }

    Ok(examples)
}
