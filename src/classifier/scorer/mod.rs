
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::embeddings::{Embedder, cosine_similarity, normalize};

pub const PROTOTYPES_FILE: &str = "prototypes.json";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// The supervised classification capability: given text, one probability
/// per vocabulary label, aligned by class index.
pub trait IntentScorer: Send + Sync {
    fn score(&self, query: &str) -> Result<Vec<f32>>;
}

/// Serialized scorer artifact, written by the trainer as part of one
/// atomic artifact set alongside the intent map and validation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrototypeArtifact {
    pub version: String,
    pub embedding_model: String,
    pub dimension: usize,
    pub temperature: f32,
    /// One L2-normalized centroid per intent, in vocabulary index order.
    pub prototypes: Vec<Vec<f32>>,
}

impl PrototypeArtifact {
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prototypes: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse prototypes: {}", path.display()))
    }

    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string(self).context("Failed to serialize prototypes")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write prototypes: {}", path.display()))?;
        Ok(())
    }
}

/// Nearest-prototype scorer: the probability distribution is a softmax
/// over cosine similarities between the query embedding and the per-intent
/// centroids, scaled by a temperature.
pub struct PrototypeScorer {
    embedder: Arc<dyn Embedder>,
    prototypes: Vec<Vec<f32>>,
    temperature: f32,
}

impl PrototypeScorer {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        prototypes: Vec<Vec<f32>>,
        temperature: f32,
    ) -> Result<Self> {
        if prototypes.is_empty() {
            return Err(anyhow!("Prototype scorer requires at least one class"));
        }
        if temperature <= 0.0 || temperature.is_nan() {
            return Err(anyhow!("Softmax temperature must be positive"));
        }

        Ok(Self {
            embedder,
            prototypes,
            temperature,
        })
    }

    #[inline]
    pub fn from_artifact(artifact: PrototypeArtifact, embedder: Arc<dyn Embedder>) -> Result<Self> {
        for (index, prototype) in artifact.prototypes.iter().enumerate() {
            if prototype.len() != artifact.dimension {
                return Err(anyhow!(
                    "Prototype {} has dimension {} but the artifact declares {}",
                    index,
                    prototype.len(),
                    artifact.dimension
                ));
            }
        }
        Self::new(embedder, artifact.prototypes, artifact.temperature)
    }

    /// Score an already-normalized query embedding.
    #[inline]
    pub fn score_embedding(&self, query_vector: &[f32]) -> Vec<f32> {
        let scaled: Vec<f32> = self
            .prototypes
            .iter()
            .map(|prototype| cosine_similarity(query_vector, prototype) / self.temperature)
            .collect();
        softmax(&scaled)
    }
}

impl IntentScorer for PrototypeScorer {
    #[inline]
    fn score(&self, query: &str) -> Result<Vec<f32>> {
        let mut query_vector = self
            .embedder
            .embed(query)
            .context("Failed to embed query for scoring")?;
        normalize(&mut query_vector);
        Ok(self.score_embedding(&query_vector))
    }
}

/// Numerically stable softmax.
#[inline]
pub fn softmax(values: &[f32]) -> Vec<f32> {
    if values.is_empty() {
        return Vec::new();
    }

    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = values.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; ties break to the first occurrence so the
/// argmax is stable across the vocabulary ordering.
#[inline]
pub fn stable_argmax(values: &[f32]) -> usize {
    let mut best_index = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (index, &value) in values.iter().enumerate() {
        if value > best_value {
            best_index = index;
            best_value = value;
        }
    }
    best_index
}
