// Embedding capability
// Trait seam for text embedding plus the vector math shared by the
// matcher, zero-shot fallback and trainer.

#[cfg(test)]
mod tests;

pub mod ollama;

pub use ollama::OllamaClient;

use anyhow::Result;

/// Text embedding capability. Implementations must be deterministic for
/// identical input within one model version.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    fn dimension(&self) -> usize;
}

/// L2-normalize a vector in place. Zero vectors are left untouched.
#[inline]
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, na, nb) = a
        .iter()
        .zip(b.iter())
        .fold((0.0f32, 0.0f32, 0.0f32), |(d, aa, bb), (x, y)| {
            (d + (x * y), aa + (x * x), bb + (y * y))
        });

    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}
