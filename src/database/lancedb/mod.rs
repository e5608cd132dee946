// LanceDB vector database module
// Stores one vector per FAQ catalog entry for similarity search

pub mod vector_store;

pub use vector_store::{FaqVectorStore, ScoredId};

/// A FAQ question vector keyed by the catalog id it was derived from.
/// Vectors are L2-normalized before storage so inner product equals
/// cosine similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct FaqVector {
    pub id: i64,
    pub vector: Vec<f32>,
}
