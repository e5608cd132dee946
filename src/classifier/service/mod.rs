
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info};

use crate::classifier::scorer::{IntentScorer, PROTOTYPES_FILE, PrototypeArtifact, PrototypeScorer, stable_argmax};
use crate::classifier::vocab::{INTENT_MAP_FILE, IntentVocabulary};
use crate::classifier::zero_shot::ZeroShotMatcher;
use crate::embeddings::Embedder;
use crate::feedback::log::InteractionLog;
use crate::{Result, SentinelError};

/// Marker file in the models directory naming the active artifact version.
pub const CURRENT_MARKER: &str = "CURRENT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    FineTuned,
    ZeroShot,
}

impl std::fmt::Display for Method {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Method::FineTuned => write!(f, "fine-tuned"),
            Method::ZeroShot => write!(f, "zero-shot"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub intent: String,
    pub confidence: f32,
    pub method: Method,
}

/// One immutable model snapshot: vocabulary, supervised scorer and the
/// zero-shot fallback derived from the same vocabulary. Swapped as a unit
/// on reload; never mutated in place while serving.
pub struct ModelState {
    pub version: String,
    pub vocab: IntentVocabulary,
    pub scorer: Box<dyn IntentScorer>,
    pub zero_shot: ZeroShotMatcher,
}

pub struct ClassificationService {
    state: RwLock<Arc<ModelState>>,
    embedder: Arc<dyn Embedder>,
    log: Arc<InteractionLog>,
    threshold: f32,
}

impl ClassificationService {
    #[inline]
    pub fn new(
        state: ModelState,
        embedder: Arc<dyn Embedder>,
        log: Arc<InteractionLog>,
        threshold: f32,
    ) -> Self {
        Self {
            state: RwLock::new(Arc::new(state)),
            embedder,
            log,
            threshold,
        }
    }

    /// Load the active model artifacts from the models directory. A
    /// missing or corrupt artifact set is a configuration error; the
    /// process must not serve classification without one.
    #[inline]
    pub fn load(
        models_dir: &Path,
        embedder: Arc<dyn Embedder>,
        log: Arc<InteractionLog>,
        threshold: f32,
    ) -> Result<Self> {
        let state = Self::load_state(models_dir, &embedder)?;
        info!("Loaded classifier model version {}", state.version);
        Ok(Self::new(state, embedder, log, threshold))
    }

    /// Swap in the artifacts currently marked active in the models
    /// directory. The new snapshot is validated standalone before it
    /// replaces the running one; a failed reload leaves the old model
    /// serving.
    #[inline]
    pub fn reload(&self, models_dir: &Path) -> Result<String> {
        let state = Self::load_state(models_dir, &self.embedder)?;
        let version = state.version.clone();

        let mut guard = self
            .state
            .write()
            .map_err(|_| SentinelError::Model("Model state lock poisoned".to_string()))?;
        *guard = Arc::new(state);

        info!("Swapped in classifier model version {}", version);
        Ok(version)
    }

    fn load_state(models_dir: &Path, embedder: &Arc<dyn Embedder>) -> Result<ModelState> {
        let marker_path = models_dir.join(CURRENT_MARKER);
        let version = std::fs::read_to_string(&marker_path)
            .map_err(|e| {
                SentinelError::Config(format!(
                    "No trained classifier found ({}): run `erp-sentinel train` first",
                    e
                ))
            })?
            .trim()
            .to_string();

        let version_dir = models_dir.join(&version);

        let vocab = IntentVocabulary::load(&version_dir.join(INTENT_MAP_FILE))
            .map_err(|e| SentinelError::Config(format!("{:#}", e)))?;

        let artifact = PrototypeArtifact::load(&version_dir.join(PROTOTYPES_FILE))
            .map_err(|e| SentinelError::Config(format!("{:#}", e)))?;

        if artifact.prototypes.len() != vocab.len() {
            return Err(SentinelError::Config(format!(
                "Model version {} has {} prototypes for {} vocabulary labels",
                version,
                artifact.prototypes.len(),
                vocab.len()
            )));
        }

        let scorer = PrototypeScorer::from_artifact(artifact, Arc::clone(embedder))
            .map_err(|e| SentinelError::Config(format!("{:#}", e)))?;

        let zero_shot = ZeroShotMatcher::new(Arc::clone(embedder), vocab.labels())
            .map_err(SentinelError::Other)?;

        Ok(ModelState {
            version,
            vocab,
            scorer: Box::new(scorer),
            zero_shot,
        })
    }

    #[inline]
    pub fn current_version(&self) -> Result<String> {
        let guard = self
            .state
            .read()
            .map_err(|_| SentinelError::Model("Model state lock poisoned".to_string()))?;
        Ok(guard.version.clone())
    }

    /// Two-stage classification. Stage 1 is the supervised scorer; if its
    /// top probability clears the threshold the result is returned with
    /// `method = fine-tuned`. Otherwise the zero-shot fallback's top label
    /// is returned as-is, however low its score — gating that is the
    /// orchestrator's decision. Every invocation appends exactly one log
    /// record; a logging failure is reported but never fails the call.
    #[inline]
    pub fn classify(&self, query: &str) -> Result<ClassificationResult> {
        let state = {
            let guard = self
                .state
                .read()
                .map_err(|_| SentinelError::Model("Model state lock poisoned".to_string()))?;
            Arc::clone(&*guard)
        };

        let probs = state
            .scorer
            .score(query)
            .map_err(SentinelError::Other)?;

        if probs.len() != state.vocab.len() {
            return Err(SentinelError::Model(format!(
                "Scorer returned {} probabilities for {} labels",
                probs.len(),
                state.vocab.len()
            )));
        }

        let top_index = stable_argmax(&probs);
        let top_score = probs[top_index].clamp(0.0, 1.0);

        let result = if top_score >= self.threshold {
            let intent = state
                .vocab
                .label_for(top_index)
                .unwrap_or_default()
                .to_string();
            debug!(
                "Fine-tuned classifier confident: {} ({:.3})",
                intent, top_score
            );
            ClassificationResult {
                intent,
                confidence: top_score,
                method: Method::FineTuned,
            }
        } else {
            let (fallback_index, fallback_score) = state
                .zero_shot
                .best_label(query)
                .map_err(SentinelError::Other)?;
            let intent = state
                .vocab
                .label_for(fallback_index)
                .unwrap_or_default()
                .to_string();
            debug!(
                "Zero-shot fallback selected: {} ({:.3})",
                intent, fallback_score
            );
            ClassificationResult {
                intent,
                confidence: fallback_score,
                method: Method::ZeroShot,
            }
        };

        let resolved = result.method == Method::FineTuned;
        if let Err(e) = self.log.record(
            query,
            &result.intent,
            result.confidence,
            resolved,
            None,
        ) {
            error!("Failed to append query log record: {:#}", e);
        }

        Ok(result)
    }
}
