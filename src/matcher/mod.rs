// FAQ Matching Service
// Ranks the FAQ catalog against a query by cosine similarity and buckets
// the top score into confidence tiers. This service never invokes intent
// classification; the orchestrator owns that decision.


use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::database::lancedb::FaqVectorStore;
use crate::database::sqlite::Database;
use crate::embeddings::{Embedder, normalize};
use crate::indexer::consistency;
use crate::{Result, SentinelError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub question: String,
    pub answer: String,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    HighConfidence,
    MediumConfidence,
    LowConfidence,
}

impl std::fmt::Display for MatchTier {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            MatchTier::HighConfidence => write!(f, "high_confidence"),
            MatchTier::MediumConfidence => write!(f, "medium_confidence"),
            MatchTier::LowConfidence => write!(f, "low_confidence"),
        }
    }
}

/// Ranked outcome of matching one query against the catalog. High and
/// medium tiers carry the top hit as `best_match`; the low tier keeps all
/// candidates as suggestions for downstream use.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub tier: MatchTier,
    pub best_match: Option<MatchCandidate>,
    pub suggestions: Vec<MatchCandidate>,
}

/// Both boundaries are inclusive: a top score of exactly `high_score` is
/// high confidence, exactly `threshold` is medium.
pub(crate) fn classify_tier(top_score: f32, threshold: f32, high_score: f32) -> MatchTier {
    if top_score >= high_score {
        MatchTier::HighConfidence
    } else if top_score >= threshold {
        MatchTier::MediumConfidence
    } else {
        MatchTier::LowConfidence
    }
}

pub struct FaqMatcher {
    embedder: Arc<dyn Embedder>,
    database: Database,
    store: FaqVectorStore,
    high_score: f32,
}

impl FaqMatcher {
    /// Fails fast when the catalog is empty or the metadata and vector
    /// stores disagree; the process must not serve queries in that state.
    #[inline]
    pub async fn new(
        embedder: Arc<dyn Embedder>,
        database: Database,
        store: FaqVectorStore,
        high_score: f32,
    ) -> Result<Self> {
        let count = database.count_faqs().await?;
        if count == 0 {
            return Err(SentinelError::Config(
                "FAQ catalog is empty; run `erp-sentinel index` before serving queries"
                    .to_string(),
            ));
        }

        let report = consistency::validate(&database, &store).await?;
        if !report.is_consistent {
            return Err(SentinelError::Config(format!(
                "FAQ index is inconsistent: {} metadata rows vs {} vectors; re-run `erp-sentinel index`",
                report.metadata_rows, report.vector_rows
            )));
        }

        Ok(Self {
            embedder,
            database,
            store,
            high_score,
        })
    }

    /// Rank the catalog against `query` and bucket the top score.
    #[inline]
    pub async fn match_query(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<MatchResult> {
        let candidates = self.rank(query, top_k).await?;

        let Some(best) = candidates.first() else {
            return Err(SentinelError::Database(
                "FAQ search returned no candidates for a non-empty catalog".to_string(),
            ));
        };

        let tier = classify_tier(best.score, threshold, self.high_score);
        debug!(
            "Query matched tier {} (top score {:.3})",
            tier, best.score
        );

        let result = match tier {
            MatchTier::HighConfidence | MatchTier::MediumConfidence => MatchResult {
                tier,
                best_match: Some(best.clone()),
                suggestions: candidates[1..].to_vec(),
            },
            MatchTier::LowConfidence => MatchResult {
                tier,
                best_match: None,
                suggestions: candidates,
            },
        };

        Ok(result)
    }

    /// Same ranking as `match_query`, without tiering. Used for
    /// "did you mean" lists after a low-confidence classification.
    #[inline]
    pub async fn suggest_related(&self, query: &str, top_k: usize) -> Result<Vec<MatchCandidate>> {
        self.rank(query, top_k).await
    }

    async fn rank(&self, query: &str, k: usize) -> Result<Vec<MatchCandidate>> {
        let mut query_vector = self
            .embedder
            .embed(query)
            .context("Failed to embed query")?;
        normalize(&mut query_vector);

        let hits = self.store.search(&query_vector, k).await?;

        let mut candidates = Vec::with_capacity(hits.len());
        for hit in hits {
            let faq = self
                .database
                .get_faq_by_id(hit.id)
                .await?
                .ok_or_else(|| {
                    SentinelError::Database(format!(
                        "Vector hit {} has no metadata row; index is out of sync",
                        hit.id
                    ))
                })?;
            candidates.push(MatchCandidate {
                question: faq.question,
                answer: faq.answer,
                score: hit.score,
            });
        }

        Ok(candidates)
    }
}
