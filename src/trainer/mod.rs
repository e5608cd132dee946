// Classifier training module
// Turns a labeled training dataset into one atomic artifact set: the
// intent vocabulary, per-intent prototype vectors and a validation
// report, written to a fresh version directory and activated by swapping
// the CURRENT marker. A running classifier is never mutated; it picks up
// new artifacts via an explicit reload.


use anyhow::Context;
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::classifier::scorer::{DEFAULT_TEMPERATURE, PROTOTYPES_FILE, PrototypeArtifact, stable_argmax};
use crate::classifier::service::CURRENT_MARKER;
use crate::classifier::vocab::{INTENT_MAP_FILE, IntentVocabulary};
use crate::embeddings::{Embedder, cosine_similarity, normalize};
use crate::feedback::dataset::{TrainingExample, read_training_set};
use crate::{Result, SentinelError};

pub const VALIDATION_FILE: &str = "validation.json";

/// Validation report written alongside each trained artifact set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub examples: usize,
    pub label_counts: BTreeMap<String, usize>,
    /// Fraction of training examples the trained scorer classifies back to
    /// their own label.
    pub self_accuracy: f32,
}

pub struct Trainer {
    embedder: Arc<dyn Embedder>,
    temperature: f32,
    model_name: Option<String>,
}

impl Trainer {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            temperature: DEFAULT_TEMPERATURE,
            model_name: None,
        }
    }

    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Record which embedding model the artifacts were trained against.
    #[inline]
    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    /// Train from a dataset file written by `build_training_set`.
    #[inline]
    pub fn train_from_file(&self, dataset_path: &Path, models_dir: &Path) -> Result<TrainingReport> {
        let examples = read_training_set(dataset_path)?;
        self.train(&examples, models_dir)
    }

    /// Train prototypes from labeled examples and publish them as the
    /// active model version. All artifact files land in a temporary
    /// directory first; the version directory and the CURRENT marker are
    /// both activated by rename so a crash never leaves a partial swap.
    #[inline]
    pub fn train(&self, examples: &[TrainingExample], models_dir: &Path) -> Result<TrainingReport> {
        if examples.is_empty() {
            return Err(SentinelError::Model(
                "Training dataset is empty; curate and rebuild it first".to_string(),
            ));
        }

        let labels: Vec<String> = examples
            .iter()
            .map(|example| example.intent.clone())
            .unique()
            .sorted()
            .collect();
        let vocab = IntentVocabulary::from_labels(labels).map_err(SentinelError::Other)?;

        info!(
            "Training classifier on {} examples across {} intents",
            examples.len(),
            vocab.len()
        );

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(examples.len() as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let queries: Vec<String> = examples.iter().map(|e| e.query.clone()).collect();
        let mut embeddings = self
            .embedder
            .embed_batch(&queries)
            .context("Failed to embed training queries")?;
        bar.set_position(examples.len() as u64);
        bar.finish_and_clear();

        if embeddings.len() != examples.len() {
            return Err(SentinelError::Embedding(format!(
                "Embedded {} queries but the dataset has {}",
                embeddings.len(),
                examples.len()
            )));
        }

        let dimension = embeddings
            .first()
            .map(Vec::len)
            .filter(|len| *len > 0)
            .ok_or_else(|| {
                SentinelError::Embedding("Embedder returned an empty vector".to_string())
            })?;

        for embedding in &mut embeddings {
            if embedding.len() != dimension {
                return Err(SentinelError::Embedding(format!(
                    "Inconsistent embedding dimensions: {} vs {}",
                    embedding.len(),
                    dimension
                )));
            }
            normalize(embedding);
        }

        let (prototypes, label_counts) = self.build_prototypes(examples, &embeddings, &vocab, dimension)?;
        let self_accuracy = self.self_accuracy(examples, &embeddings, &prototypes, &vocab);

        let version = new_version_id();
        let report = TrainingReport {
            version: version.clone(),
            trained_at: Utc::now(),
            examples: examples.len(),
            label_counts,
            self_accuracy,
        };

        let artifact = PrototypeArtifact {
            version: version.clone(),
            embedding_model: self.embedder_model_name(),
            dimension,
            temperature: self.temperature,
            prototypes,
        };

        self.publish(models_dir, &version, &vocab, &artifact, &report)?;

        info!(
            "Published model version {} (self-accuracy {:.2})",
            version, self_accuracy
        );
        Ok(report)
    }

    fn build_prototypes(
        &self,
        examples: &[TrainingExample],
        embeddings: &[Vec<f32>],
        vocab: &IntentVocabulary,
        dimension: usize,
    ) -> Result<(Vec<Vec<f32>>, BTreeMap<String, usize>)> {
        let mut sums = vec![vec![0.0f32; dimension]; vocab.len()];
        let mut counts = vec![0usize; vocab.len()];

        for (example, embedding) in examples.iter().zip(embeddings.iter()) {
            let index = vocab.index_of(&example.intent).ok_or_else(|| {
                SentinelError::Model(format!(
                    "Example intent '{}' missing from vocabulary",
                    example.intent
                ))
            })?;
            for (slot, value) in sums[index].iter_mut().zip(embedding.iter()) {
                *slot += value;
            }
            counts[index] += 1;
        }

        let mut prototypes = Vec::with_capacity(vocab.len());
        let mut label_counts = BTreeMap::new();
        for (index, mut sum) in sums.into_iter().enumerate() {
            let count = counts[index];
            // Every vocabulary label came from at least one example
            for value in &mut sum {
                *value /= count as f32;
            }
            normalize(&mut sum);
            prototypes.push(sum);

            if let Some(label) = vocab.label_for(index) {
                label_counts.insert(label.to_string(), count);
            }
        }

        Ok((prototypes, label_counts))
    }

    fn self_accuracy(
        &self,
        examples: &[TrainingExample],
        embeddings: &[Vec<f32>],
        prototypes: &[Vec<f32>],
        vocab: &IntentVocabulary,
    ) -> f32 {
        let mut correct = 0usize;
        for (example, embedding) in examples.iter().zip(embeddings.iter()) {
            let scores: Vec<f32> = prototypes
                .iter()
                .map(|prototype| cosine_similarity(embedding, prototype))
                .collect();
            if vocab.label_for(stable_argmax(&scores)) == Some(example.intent.as_str()) {
                correct += 1;
            }
        }
        correct as f32 / examples.len() as f32
    }

    fn publish(
        &self,
        models_dir: &Path,
        version: &str,
        vocab: &IntentVocabulary,
        artifact: &PrototypeArtifact,
        report: &TrainingReport,
    ) -> Result<()> {
        std::fs::create_dir_all(models_dir).map_err(|e| {
            SentinelError::Model(format!(
                "Failed to create models directory {}: {}",
                models_dir.display(),
                e
            ))
        })?;

        let staging_dir = models_dir.join(format!(".tmp-{}", version));
        std::fs::create_dir_all(&staging_dir)
            .map_err(|e| SentinelError::Model(format!("Failed to create staging dir: {}", e)))?;

        vocab
            .save(&staging_dir.join(INTENT_MAP_FILE))
            .map_err(SentinelError::Other)?;
        artifact
            .save(&staging_dir.join(PROTOTYPES_FILE))
            .map_err(SentinelError::Other)?;

        let report_json = serde_json::to_string_pretty(report)
            .context("Failed to serialize validation report")?;
        std::fs::write(staging_dir.join(VALIDATION_FILE), report_json)
            .map_err(|e| SentinelError::Model(format!("Failed to write validation report: {}", e)))?;

        let version_dir = models_dir.join(version);
        std::fs::rename(&staging_dir, &version_dir).map_err(|e| {
            SentinelError::Model(format!(
                "Failed to activate model version {}: {}",
                version, e
            ))
        })?;

        let marker_staging: PathBuf = models_dir.join(format!("{}.tmp", CURRENT_MARKER));
        std::fs::write(&marker_staging, version)
            .map_err(|e| SentinelError::Model(format!("Failed to stage version marker: {}", e)))?;
        std::fs::rename(&marker_staging, models_dir.join(CURRENT_MARKER))
            .map_err(|e| SentinelError::Model(format!("Failed to swap version marker: {}", e)))?;

        debug!("Model artifacts published to {}", version_dir.display());
        Ok(())
    }

    fn embedder_model_name(&self) -> String {
        // The artifact records the embedding space it was trained in so a
        // mismatched embedder can be spotted during review
        self.model_name
            .clone()
            .unwrap_or_else(|| format!("dim-{}", self.embedder.dimension()))
    }
}

fn new_version_id() -> String {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(8);
    format!("{}-{}", Utc::now().format("%Y%m%d%H%M%S"), suffix)
}
