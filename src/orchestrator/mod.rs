// Resolution Orchestrator
// The single sequencer of the resolution tiers: FAQ matching first,
// intent classification on a low-confidence match, action resolution once
// an intent is settled, escalation otherwise. The matcher and classifier
// never call each other; all coupling lives here.

#[cfg(test)]
mod tests;

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::actions::{ActionResolver, ActionResult};
use crate::classifier::{ClassificationResult, ClassificationService};
use crate::config::Config;
use crate::feedback::log::InteractionLog;
use crate::matcher::{FaqMatcher, MatchCandidate, MatchTier};
use crate::{Result, SentinelError};

/// Intent recorded for episodes answered straight from the FAQ catalog.
pub const FAQ_INTENT: &str = "faq";
/// Intent recorded for episodes that never produced a prediction.
pub const UNKNOWN_INTENT: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionPolicy {
    pub top_k: usize,
    pub match_threshold: f32,
    pub classify_threshold: f32,
    /// Zero-shot predictions below this score escalate instead of firing
    /// an action, even after query refinement.
    pub zero_shot_floor: f32,
}

impl Default for ResolutionPolicy {
    #[inline]
    fn default() -> Self {
        Self {
            top_k: 3,
            match_threshold: 0.5,
            classify_threshold: 0.7,
            zero_shot_floor: 0.3,
        }
    }
}

impl ResolutionPolicy {
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_k: config.matching.top_k,
            match_threshold: config.matching.threshold,
            classify_threshold: config.classifier.confidence_threshold,
            zero_shot_floor: config.classifier.zero_shot_floor,
        }
    }
}

/// Outcome of resolving one query. Every input maps to one of these;
/// per-query conditions never surface as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The FAQ catalog answered directly (high or medium tier).
    FaqAnswer {
        tier: MatchTier,
        best_match: MatchCandidate,
        suggestions: Vec<MatchCandidate>,
    },
    /// An intent was settled and the Action Resolver produced a result.
    Action {
        classification: ClassificationResult,
        action: ActionResult,
    },
    /// Confidence stayed too low to act. The caller may re-enter once with
    /// a refined query picked from the suggestions, or escalate.
    NeedsClarification {
        classification: Option<ClassificationResult>,
        suggestions: Vec<MatchCandidate>,
    },
}

pub struct Orchestrator {
    matcher: FaqMatcher,
    classifier: ClassificationService,
    actions: ActionResolver,
    log: Arc<InteractionLog>,
    policy: ResolutionPolicy,
}

impl Orchestrator {
    #[inline]
    pub fn new(
        matcher: FaqMatcher,
        classifier: ClassificationService,
        actions: ActionResolver,
        log: Arc<InteractionLog>,
        policy: ResolutionPolicy,
    ) -> Self {
        Self {
            matcher,
            classifier,
            actions,
            log,
            policy,
        }
    }

    /// Route one query through the resolution tiers. FAQ-tier episodes are
    /// logged here; classification logs its own invocations.
    #[inline]
    pub async fn resolve(&self, query: &str) -> Result<Resolution> {
        if query.trim().is_empty() {
            debug!("Empty query, requesting clarification");
            self.record_episode(query, UNKNOWN_INTENT, 0.0, false);
            return Ok(Resolution::NeedsClarification {
                classification: None,
                suggestions: Vec::new(),
            });
        }

        let matched = self
            .matcher
            .match_query(query, self.policy.top_k, self.policy.match_threshold)
            .await?;

        match matched.tier {
            MatchTier::HighConfidence | MatchTier::MediumConfidence => {
                let best_match = matched.best_match.ok_or_else(|| {
                    SentinelError::Model(
                        "Match result is missing its best match".to_string(),
                    )
                })?;

                info!(
                    "Query answered from FAQ catalog ({}, score {:.3})",
                    matched.tier, best_match.score
                );
                self.record_episode(query, FAQ_INTENT, best_match.score, true);

                Ok(Resolution::FaqAnswer {
                    tier: matched.tier,
                    best_match,
                    suggestions: matched.suggestions,
                })
            }
            MatchTier::LowConfidence => {
                debug!("FAQ match below threshold, classifying intent");
                let classification = self.classifier.classify(query)?;

                if classification.confidence >= self.policy.classify_threshold {
                    info!(
                        "Intent settled: {} ({:.3}, {})",
                        classification.intent, classification.confidence, classification.method
                    );
                    let action = self.actions.resolve(&classification.intent, Some(query));
                    Ok(Resolution::Action {
                        classification,
                        action,
                    })
                } else {
                    info!(
                        "Classification unconfident ({:.3}), offering suggestions",
                        classification.confidence
                    );
                    let suggestions = self
                        .matcher
                        .suggest_related(query, self.policy.top_k)
                        .await?;
                    Ok(Resolution::NeedsClarification {
                        classification: Some(classification),
                        suggestions,
                    })
                }
            }
        }
    }

    /// Re-enter with a refined query (typically a suggestion the user
    /// picked). The refined classification is acted on unless it stays
    /// below the zero-shot floor, in which case the query escalates rather
    /// than firing an action off noise.
    #[inline]
    pub async fn resolve_refined(&self, refined_query: &str) -> Result<Resolution> {
        let classification = self.classifier.classify(refined_query)?;

        if classification.confidence >= self.policy.zero_shot_floor {
            info!(
                "Refined intent settled: {} ({:.3}, {})",
                classification.intent, classification.confidence, classification.method
            );
            let action = self
                .actions
                .resolve(&classification.intent, Some(refined_query));
            Ok(Resolution::Action {
                classification,
                action,
            })
        } else {
            info!(
                "Refined classification still below floor ({:.3}), escalating",
                classification.confidence
            );
            Ok(Resolution::NeedsClarification {
                classification: Some(classification),
                suggestions: Vec::new(),
            })
        }
    }

    /// A logging failure must never cost the user their answer.
    fn record_episode(&self, query: &str, intent: &str, confidence: f32, resolved: bool) {
        if let Err(e) = self.log.record(query, intent, confidence, resolved, None) {
            error!("Failed to append query log record: {:#}", e);
        }
    }
}
