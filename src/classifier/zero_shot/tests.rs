use super::*;
use anyhow::Result as AnyResult;
use std::collections::HashMap;

const DIM: usize = 4;

struct CannedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
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

fn labels() -> Vec<String> {
    vec!["po_status".to_string(), "invoice_status".to_string()]
}

#[test]
fn picks_the_most_similar_label() {
    let embedder = CannedEmbedder {
        vectors: HashMap::from([
            ("po_status".to_string(), vec![1.0, 0.0, 0.0, 0.0]),
            ("invoice_status".to_string(), vec![0.0, 1.0, 0.0, 0.0]),
            (
                "status of my purchase order".to_string(),
                vec![0.9, 0.2, 0.0, 0.0],
            ),
        ]),
    };

    let matcher = ZeroShotMatcher::new(Arc::new(embedder), &labels()).expect("matcher");
    let (index, score) = matcher
        .best_label("status of my purchase order")
        .expect("best label");

    assert_eq!(index, 0);
    assert!(score > 0.9);
    assert!((0.0..=1.0).contains(&score));
}

#[test]
fn negative_similarity_is_clamped_to_zero() {
    let embedder = CannedEmbedder {
        vectors: HashMap::from([
            ("po_status".to_string(), vec![1.0, 0.0, 0.0, 0.0]),
            ("invoice_status".to_string(), vec![0.8, 0.1, 0.0, 0.0]),
            ("opposite".to_string(), vec![-1.0, 0.0, 0.0, 0.0]),
        ]),
    };

    let matcher = ZeroShotMatcher::new(Arc::new(embedder), &labels()).expect("matcher");
    let (_, score) = matcher.best_label("opposite").expect("best label");

    assert_eq!(score, 0.0);
}

#[test]
fn ties_break_to_the_lowest_index() {
    let embedder = CannedEmbedder {
        vectors: HashMap::from([
            ("po_status".to_string(), vec![1.0, 0.0, 0.0, 0.0]),
            ("invoice_status".to_string(), vec![1.0, 0.0, 0.0, 0.0]),
            ("ambiguous".to_string(), vec![1.0, 0.0, 0.0, 0.0]),
        ]),
    };

    let matcher = ZeroShotMatcher::new(Arc::new(embedder), &labels()).expect("matcher");
    let (index, _) = matcher.best_label("ambiguous").expect("best label");

    assert_eq!(index, 0);
}

#[test]
fn empty_label_set_is_rejected() {
    let embedder = CannedEmbedder {
        vectors: HashMap::new(),
    };
    assert!(ZeroShotMatcher::new(Arc::new(embedder), &[]).is_err());
}
