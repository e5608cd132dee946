use super::*;
use crate::actions::api::ActionApi;
use crate::actions::{ActionMap, ActionMapping, ActionStatus, ResponseType};
use crate::classifier::scorer::IntentScorer;
use crate::classifier::service::{Method, ModelState};
use crate::classifier::vocab::IntentVocabulary;
use crate::classifier::zero_shot::ZeroShotMatcher;
use crate::database::lancedb::{FaqVector, FaqVectorStore};
use crate::database::sqlite::{Database, NewFaq};
use crate::embeddings::Embedder;
use anyhow::Result as AnyResult;
use serde_json::json;
use std::collections::HashMap;
use tempfile::TempDir;

const DIM: usize = 4;

struct CannedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl CannedEmbedder {
    fn standard() -> Self {
        Self {
            vectors: HashMap::from([
                // Intent labels for the zero-shot fallback
                ("po_status".to_string(), vec![1.0, 0.0, 0.0, 0.0]),
                ("invoice_status".to_string(), vec![0.0, 1.0, 0.0, 0.0]),
                ("gst_filing".to_string(), vec![0.0, 0.0, 1.0, 0.0]),
                // Queries
                (
                    "I want to file GSTR-3B".to_string(),
                    vec![0.95, 0.05, 0.0, 0.0],
                ),
                (
                    "where is my purchase order".to_string(),
                    vec![0.1, 0.1, 0.2, 0.9],
                ),
                (
                    "What is GSTR-3B and how does IDMS assist in its filing?".to_string(),
                    vec![0.0, 0.0, 0.9, 0.1],
                ),
            ]),
        }
    }
}

impl Embedder for CannedEmbedder {
    fn embed(&self, text: &str) -> AnyResult<Vec<f32>> {
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0, 0.0, 0.0, 1.0]))
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

struct FixedScorer {
    probs: Vec<f32>,
}

impl IntentScorer for FixedScorer {
    fn score(&self, _query: &str) -> AnyResult<Vec<f32>> {
        Ok(self.probs.clone())
    }
}

struct FakeApi;

impl ActionApi for FakeApi {
    fn call(&self, _identifier: &str) -> AnyResult<serde_json::Value> {
        Ok(json!({ "status": "ok", "data": { "po_status": "Approved" } }))
    }
}

struct TestBed {
    orchestrator: Orchestrator,
    log: Arc<InteractionLog>,
    _temp_dir: TempDir,
}

async fn setup(probs: Vec<f32>) -> TestBed {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let embedder: Arc<dyn Embedder> = Arc::new(CannedEmbedder::standard());
    let log = Arc::new(InteractionLog::new(temp_dir.path().join("query_log.csv")));

    let database = Database::new(temp_dir.path().join("metadata.db"))
        .await
        .expect("database");
    database
        .replace_faqs(&[
            NewFaq {
                question: "What is GSTR-3B and how does IDMS assist in its filing?".to_string(),
                answer: "GSTR-3B is a monthly summary return.".to_string(),
            },
            NewFaq {
                question: "When is an E-Way Bill required?".to_string(),
                answer: "For goods worth more than ₹50,000 being transported.".to_string(),
            },
        ])
        .await
        .expect("replace faqs");

    let store = FaqVectorStore::new(&temp_dir.path().join("vectors"), DIM)
        .await
        .expect("store");
    store
        .rebuild(&[
            FaqVector {
                id: 0,
                vector: vec![1.0, 0.0, 0.0, 0.0],
            },
            FaqVector {
                id: 1,
                vector: vec![0.0, 1.0, 0.0, 0.0],
            },
        ])
        .await
        .expect("rebuild");

    let matcher = FaqMatcher::new(Arc::clone(&embedder), database, store, 0.8)
        .await
        .expect("matcher");

    let vocab = IntentVocabulary::from_labels(vec![
        "po_status".to_string(),
        "invoice_status".to_string(),
        "gst_filing".to_string(),
    ])
    .expect("vocab");
    let zero_shot =
        ZeroShotMatcher::new(Arc::clone(&embedder), vocab.labels()).expect("zero-shot");
    let classifier = ClassificationService::new(
        ModelState {
            version: "test".to_string(),
            vocab,
            scorer: Box::new(FixedScorer { probs }),
            zero_shot,
        },
        Arc::clone(&embedder),
        Arc::clone(&log),
        0.7,
    );

    let map = ActionMap::from_mappings(vec![
        ActionMapping {
            intent: "po_status".to_string(),
            response_type: ResponseType::Api,
            answer: "Fetching your purchase order status.".to_string(),
            api_call: Some("get_po_status".to_string()),
            escalate: false,
        },
        ActionMapping {
            intent: "gst_filing".to_string(),
            response_type: ResponseType::Text,
            answer: "IDMS auto-computes GST liabilities and simplifies filing.".to_string(),
            api_call: None,
            escalate: false,
        },
    ])
    .expect("map");
    let actions = ActionResolver::new(map, Arc::new(FakeApi));

    let orchestrator = Orchestrator::new(
        matcher,
        classifier,
        actions,
        Arc::clone(&log),
        ResolutionPolicy::default(),
    );

    TestBed {
        orchestrator,
        log,
        _temp_dir: temp_dir,
    }
}

#[tokio::test]
async fn high_confidence_faq_answers_directly() {
    let bed = setup(vec![0.34, 0.33, 0.33]).await;

    let resolution = bed
        .orchestrator
        .resolve("I want to file GSTR-3B")
        .await
        .expect("resolve succeeds");

    let Resolution::FaqAnswer {
        tier,
        best_match,
        suggestions,
    } = resolution
    else {
        panic!("expected FaqAnswer");
    };
    assert_eq!(tier, MatchTier::HighConfidence);
    assert_eq!(
        best_match.question,
        "What is GSTR-3B and how does IDMS assist in its filing?"
    );
    assert!(best_match.score > 0.8);
    assert_eq!(suggestions.len(), 1);

    // The episode is logged once, as resolved FAQ traffic
    let records = bed.log.read_all().expect("read log");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].predicted_intent, FAQ_INTENT);
    assert!(records[0].resolved);
}

#[tokio::test]
async fn low_match_with_confident_classifier_resolves_an_action() {
    let bed = setup(vec![0.9, 0.05, 0.05]).await;

    let resolution = bed
        .orchestrator
        .resolve("where is my purchase order")
        .await
        .expect("resolve succeeds");

    let Resolution::Action {
        classification,
        action,
    } = resolution
    else {
        panic!("expected Action");
    };
    assert_eq!(classification.intent, "po_status");
    assert_eq!(classification.method, Method::FineTuned);
    assert_eq!(action.status, ActionStatus::Success);
    let payload = action.api_response.expect("api payload");
    assert_eq!(payload["data"]["po_status"], "Approved");

    // Exactly one record, appended by the classification service
    let records = bed.log.read_all().expect("read log");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].predicted_intent, "po_status");
}

#[tokio::test]
async fn unconfident_classification_offers_suggestions() {
    let bed = setup(vec![0.4, 0.3, 0.3]).await;

    let resolution = bed
        .orchestrator
        .resolve("garbled nonsense zzzqwerty12345")
        .await
        .expect("resolve succeeds");

    let Resolution::NeedsClarification {
        classification,
        suggestions,
    } = resolution
    else {
        panic!("expected NeedsClarification");
    };
    let classification = classification.expect("classification present");
    assert_eq!(classification.method, Method::ZeroShot);
    assert!(classification.confidence < 0.3);
    assert!(!suggestions.is_empty());

    let records = bed.log.read_all().expect("read log");
    assert_eq!(records.len(), 1);
    assert!(!records[0].resolved);
}

#[tokio::test]
async fn empty_query_requests_clarification_without_fault() {
    let bed = setup(vec![0.34, 0.33, 0.33]).await;

    for query in ["", "   "] {
        let resolution = bed
            .orchestrator
            .resolve(query)
            .await
            .expect("resolve succeeds");
        let Resolution::NeedsClarification {
            classification,
            suggestions,
        } = resolution
        else {
            panic!("expected NeedsClarification");
        };
        assert!(classification.is_none());
        assert!(suggestions.is_empty());
    }

    let records = bed.log.read_all().expect("read log");
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.predicted_intent == UNKNOWN_INTENT));
    assert!(records.iter().all(|r| !r.resolved));
}

#[tokio::test]
async fn refined_query_resolves_an_action() {
    let bed = setup(vec![0.4, 0.3, 0.3]).await;

    let resolution = bed
        .orchestrator
        .resolve_refined("What is GSTR-3B and how does IDMS assist in its filing?")
        .await
        .expect("resolve succeeds");

    let Resolution::Action {
        classification,
        action,
    } = resolution
    else {
        panic!("expected Action");
    };
    assert_eq!(classification.intent, "gst_filing");
    assert_eq!(classification.method, Method::ZeroShot);
    assert_eq!(action.status, ActionStatus::Success);
    assert_eq!(
        action.message,
        "IDMS auto-computes GST liabilities and simplifies filing."
    );
}

#[tokio::test]
async fn refined_query_below_floor_escalates() {
    let bed = setup(vec![0.4, 0.3, 0.3]).await;

    let resolution = bed
        .orchestrator
        .resolve_refined("still complete nonsense")
        .await
        .expect("resolve succeeds");

    let Resolution::NeedsClarification {
        classification,
        suggestions,
    } = resolution
    else {
        panic!("expected NeedsClarification");
    };
    let classification = classification.expect("classification present");
    assert!(classification.confidence < 0.3);
    assert!(suggestions.is_empty());
}

#[tokio::test]
async fn unmapped_settled_intent_escalates_through_the_resolver() {
    // invoice_status is confidently predicted but has no action mapping
    let bed = setup(vec![0.05, 0.9, 0.05]).await;

    let resolution = bed
        .orchestrator
        .resolve("where is my purchase order")
        .await
        .expect("resolve succeeds");

    let Resolution::Action { action, .. } = resolution else {
        panic!("expected Action");
    };
    assert_eq!(action.status, ActionStatus::Fallback);
    assert!(action.escalate);
}
