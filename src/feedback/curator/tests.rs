use super::*;
use std::sync::Mutex;
use tempfile::TempDir;

/// Captures the batch it was shown and answers with a fixed intent.
struct RecordingReviewer {
    seen: Mutex<Vec<String>>,
    answer: Option<String>,
}

impl RecordingReviewer {
    fn new(answer: Option<&str>) -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            answer: answer.map(str::to_string),
        }
    }
}

impl ReviewInterface for RecordingReviewer {
    fn review(&self, batch: &[LogRecord]) -> anyhow::Result<Vec<ManualTag>> {
        let mut seen = self.seen.lock().expect("lock");
        seen.extend(batch.iter().map(|record| record.query.clone()));

        Ok(self
            .answer
            .as_ref()
            .map(|intent| {
                batch
                    .iter()
                    .map(|record| ManualTag {
                        timestamp: record.timestamp,
                        query: record.query.clone(),
                        correct_intent: intent.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn setup() -> (InteractionLog, ManualTagStore, TempDir) {
    let temp_dir = TempDir::new().expect("should create TempDir");
    let log = InteractionLog::new(temp_dir.path().join("query_log.csv"));
    let tags = ManualTagStore::new(temp_dir.path().join("manual_tags.csv"));
    (log, tags, temp_dir)
}

#[test]
fn only_records_below_threshold_are_presented() {
    let (log, tags, _temp_dir) = setup();
    log.record("q30", "po_status", 0.3, false, None).expect("record");
    log.record("q50", "po_status", 0.5, false, None).expect("record");
    log.record("q65", "invoice_status", 0.65, false, None)
        .expect("record");
    log.record("q90", "gst_filing", 0.9, true, None).expect("record");

    let reviewer = RecordingReviewer::new(Some("invoice_status"));
    let outcome = Curator::new(&log, &tags)
        .curate(0.7, &reviewer)
        .expect("curate succeeds");

    assert_eq!(outcome.reviewed, 3);
    assert_eq!(outcome.tagged, 3);
    let seen = reviewer.seen.lock().expect("lock");
    assert_eq!(*seen, vec!["q30", "q50", "q65"]);

    let stored = tags.read_all().expect("tags stored");
    assert_eq!(stored.len(), 3);
    assert!(stored.iter().all(|tag| tag.correct_intent == "invoice_status"));
}

#[test]
fn no_qualifying_records_is_an_explicit_no_op() {
    let (log, tags, _temp_dir) = setup();
    log.record("confident", "po_status", 0.95, true, None)
        .expect("record");

    let reviewer = RecordingReviewer::new(Some("po_status"));
    let outcome = Curator::new(&log, &tags)
        .curate(0.7, &reviewer)
        .expect("curate succeeds");

    assert_eq!(outcome.reviewed, 0);
    assert_eq!(outcome.tagged, 0);
    assert!(reviewer.seen.lock().expect("lock").is_empty());
    assert!(tags.read_all().expect("read").is_empty());
}

#[test]
fn reviewer_may_skip_everything() {
    let (log, tags, _temp_dir) = setup();
    log.record("unclear", "po_status", 0.2, false, None)
        .expect("record");

    let reviewer = RecordingReviewer::new(None);
    let outcome = Curator::new(&log, &tags)
        .curate(0.7, &reviewer)
        .expect("curate succeeds");

    assert_eq!(outcome.reviewed, 1);
    assert_eq!(outcome.tagged, 0);
    assert!(tags.read_all().expect("read").is_empty());
}

#[test]
fn boundary_confidence_is_not_low() {
    let (log, tags, _temp_dir) = setup();
    log.record("exactly at threshold", "po_status", 0.7, false, None)
        .expect("record");

    let reviewer = RecordingReviewer::new(Some("po_status"));
    let outcome = Curator::new(&log, &tags)
        .curate(0.7, &reviewer)
        .expect("curate succeeds");

    assert_eq!(outcome.reviewed, 0);
}
