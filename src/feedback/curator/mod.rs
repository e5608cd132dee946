#[cfg(test)]
mod tests;

use anyhow::Result;
use console::style;
use dialoguer::{Input, Select};
use tracing::info;

use crate::feedback::log::{InteractionLog, LogRecord};
use crate::feedback::tags::{ManualTag, ManualTagStore};

/// Pluggable review capability: given a batch of low-confidence records,
/// return the corrections a reviewer produced. Decoupled from any
/// particular surface so curation can be driven by a console, a UI or a
/// batch script.
pub trait ReviewInterface {
    fn review(&self, batch: &[LogRecord]) -> Result<Vec<ManualTag>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurationOutcome {
    pub reviewed: usize,
    pub tagged: usize,
}

/// Reviews low-confidence log entries and appends the corrections to the
/// manual tag store.
pub struct Curator<'a> {
    log: &'a InteractionLog,
    tags: &'a ManualTagStore,
}

impl<'a> Curator<'a> {
    #[inline]
    pub fn new(log: &'a InteractionLog, tags: &'a ManualTagStore) -> Self {
        Self { log, tags }
    }

    /// Present every record below `threshold` to the reviewer and persist
    /// the returned tags. An empty batch is an explicit no-op.
    #[inline]
    pub fn curate(
        &self,
        threshold: f32,
        reviewer: &dyn ReviewInterface,
    ) -> Result<CurationOutcome> {
        let records = self.log.read_all()?;
        let low_confidence: Vec<LogRecord> = records
            .into_iter()
            .filter(|record| record.confidence < threshold)
            .collect();

        if low_confidence.is_empty() {
            info!("No low-confidence queries to review");
            return Ok(CurationOutcome {
                reviewed: 0,
                tagged: 0,
            });
        }

        info!(
            "Reviewing {} low-confidence queries (threshold {})",
            low_confidence.len(),
            threshold
        );

        let tags = reviewer.review(&low_confidence)?;
        self.tags.append(&tags)?;

        Ok(CurationOutcome {
            reviewed: low_confidence.len(),
            tagged: tags.len(),
        })
    }
}

const OPTION_OTHER: &str = "Other…";
const OPTION_SKIP: &str = "Skip";

/// Interactive console reviewer offering the known vocabulary labels plus
/// free-form entry.
pub struct ConsoleReviewer {
    labels: Vec<String>,
}

impl ConsoleReviewer {
    #[inline]
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }
}

impl ReviewInterface for ConsoleReviewer {
    #[inline]
    fn review(&self, batch: &[LogRecord]) -> Result<Vec<ManualTag>> {
        println!("{}", style("🔍 Admin Review Required").bold().cyan());

        let mut options: Vec<&str> = self.labels.iter().map(String::as_str).collect();
        options.push(OPTION_OTHER);
        options.push(OPTION_SKIP);

        let mut tags = Vec::new();
        for record in batch {
            println!();
            println!("Query: {}", style(&record.query).cyan());
            println!(
                "Predicted Intent: {} | Confidence: {:.2}",
                style(&record.predicted_intent).yellow(),
                record.confidence
            );

            let selection = Select::new()
                .with_prompt("Correct intent")
                .items(&options)
                .default(0)
                .interact()?;

            let correct_intent = if selection == options.len() - 1 {
                continue; // skipped
            } else if selection == options.len() - 2 {
                Input::<String>::new()
                    .with_prompt("Enter correct intent")
                    .validate_with(|input: &String| -> Result<(), &str> {
                        if input.trim().is_empty() {
                            Err("Intent cannot be empty")
                        } else {
                            Ok(())
                        }
                    })
                    .interact_text()?
            } else {
                self.labels[selection].clone()
            };

            tags.push(ManualTag {
                timestamp: record.timestamp,
                query: record.query.clone(),
                correct_intent,
            });
        }

        Ok(tags)
    }
}
