// Index building module
// Turns the FAQ catalog file into the paired SQLite metadata table and
// LanceDB vector table that the matcher searches.


pub mod consistency;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::database::lancedb::{FaqVector, FaqVectorStore};
use crate::database::sqlite::{Database, NewFaq};
use crate::embeddings::{Embedder, normalize};
use crate::{Result, SentinelError};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    faq: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    question: String,
    answer: String,
}

/// Load the FAQ catalog from its TOML file. An empty or missing catalog is
/// a configuration error: the matcher must never start without entries.
#[inline]
pub fn load_catalog(path: &Path) -> Result<Vec<NewFaq>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SentinelError::Config(format!(
            "Failed to read FAQ catalog {}: {}",
            path.display(),
            e
        ))
    })?;

    let catalog: CatalogFile = toml::from_str(&content).map_err(|e| {
        SentinelError::Config(format!(
            "Failed to parse FAQ catalog {}: {}",
            path.display(),
            e
        ))
    })?;

    if catalog.faq.is_empty() {
        return Err(SentinelError::Config(format!(
            "FAQ catalog {} contains no entries",
            path.display()
        )));
    }

    Ok(catalog
        .faq
        .into_iter()
        .map(|entry| NewFaq {
            question: entry.question,
            answer: entry.answer,
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub entries: usize,
}

/// Builds the FAQ index: embeds every catalog question and replaces both
/// stores wholesale so ids stay aligned by position.
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    database: Database,
    store: FaqVectorStore,
}

impl Indexer {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, database: Database, store: FaqVectorStore) -> Self {
        Self {
            embedder,
            database,
            store,
        }
    }

    #[inline]
    pub async fn rebuild_from_catalog(&self, catalog_path: &Path) -> Result<IndexStats> {
        let entries = load_catalog(catalog_path)?;
        info!(
            "Rebuilding FAQ index from {} ({} entries)",
            catalog_path.display(),
            entries.len()
        );

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(entries.len() as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let questions: Vec<String> = entries.iter().map(|e| e.question.clone()).collect();
        let mut embeddings = self
            .embedder
            .embed_batch(&questions)
            .context("Failed to embed FAQ questions")?;
        bar.set_position(entries.len() as u64);
        bar.finish_and_clear();

        if embeddings.len() != entries.len() {
            return Err(SentinelError::Embedding(format!(
                "Embedded {} questions but the catalog has {}",
                embeddings.len(),
                entries.len()
            )));
        }

        let records: Vec<FaqVector> = embeddings
            .iter_mut()
            .enumerate()
            .map(|(position, vector)| {
                normalize(vector);
                FaqVector {
                    id: position as i64,
                    vector: vector.clone(),
                }
            })
            .collect();

        self.database.replace_faqs(&entries).await?;
        self.store.rebuild(&records).await?;

        let report = consistency::validate(&self.database, &self.store).await?;
        if !report.is_consistent {
            return Err(SentinelError::Database(format!(
                "Index rebuild left stores inconsistent: {} metadata rows vs {} vectors",
                report.metadata_rows, report.vector_rows
            )));
        }

        debug!("FAQ index rebuild complete");
        Ok(IndexStats {
            entries: entries.len(),
        })
    }
}
