// Intent classification module
// A supervised scorer gated by confidence, with a zero-shot fallback that
// compares the query against the intent label texts directly.

pub mod scorer;
pub mod service;
pub mod vocab;
pub mod zero_shot;

pub use scorer::{IntentScorer, PrototypeArtifact, PrototypeScorer};
pub use service::{ClassificationResult, ClassificationService, Method, ModelState};
pub use vocab::IntentVocabulary;
pub use zero_shot::ZeroShotMatcher;
