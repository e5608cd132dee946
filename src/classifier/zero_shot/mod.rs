#[cfg(test)]
mod tests;

use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use tracing::debug;

use crate::classifier::scorer::stable_argmax;
use crate::embeddings::{Embedder, cosine_similarity, normalize};

/// Zero-shot fallback: scores a query against the intent label texts
/// themselves. Label embeddings are computed once at construction; no
/// training pass is involved. This matcher applies no confidence gate of
/// its own — the top score is returned as-is.
pub struct ZeroShotMatcher {
    embedder: Arc<dyn Embedder>,
    label_embeddings: Vec<Vec<f32>>,
}

impl ZeroShotMatcher {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, labels: &[String]) -> Result<Self> {
        if labels.is_empty() {
            return Err(anyhow!("Zero-shot matcher requires at least one label"));
        }

        let mut label_embeddings = embedder
            .embed_batch(labels)
            .context("Failed to embed intent labels")?;
        for embedding in &mut label_embeddings {
            normalize(embedding);
        }

        debug!("Embedded {} intent labels for zero-shot fallback", labels.len());

        Ok(Self {
            embedder,
            label_embeddings,
        })
    }

    /// The best-matching label index and its cosine similarity, clamped to
    /// [0, 1] so it is usable as a confidence. Ties break to the lowest
    /// vocabulary index.
    #[inline]
    pub fn best_label(&self, query: &str) -> Result<(usize, f32)> {
        let mut query_vector = self
            .embedder
            .embed(query)
            .context("Failed to embed query for zero-shot matching")?;
        normalize(&mut query_vector);

        let scores: Vec<f32> = self
            .label_embeddings
            .iter()
            .map(|label| cosine_similarity(&query_vector, label))
            .collect();

        let index = stable_argmax(&scores);
        Ok((index, scores[index].clamp(0.0, 1.0)))
    }
}
