use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::actions::{ActionMap, ActionResolver, ActionResult, HttpActionApi};
use crate::classifier::service::CURRENT_MARKER;
use crate::classifier::vocab::{INTENT_MAP_FILE, IntentVocabulary};
use crate::classifier::ClassificationService;
use crate::config::Config;
use crate::database::lancedb::FaqVectorStore;
use crate::database::sqlite::Database;
use crate::embeddings::{Embedder, OllamaClient};
use crate::feedback::{
    ConsoleReviewer, Curator, InteractionLog, ManualTagStore, build_training_set,
    read_training_set,
};
use crate::indexer::{Indexer, consistency};
use crate::matcher::{FaqMatcher, MatchCandidate};
use crate::orchestrator::{Orchestrator, Resolution, ResolutionPolicy};
use crate::trainer::Trainer;

fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let client = OllamaClient::new(config.ollama.clone())
        .context("Failed to create embedding client")?;
    Ok(Arc::new(client))
}

async fn open_stores(config: &Config) -> Result<(Database, FaqVectorStore)> {
    let base_dir = config.base_dir()?;
    let database = Database::initialize_from_base_dir(&base_dir)
        .await
        .context("Failed to initialize metadata database")?;
    let store = FaqVectorStore::new(
        &config.vectors_dir()?,
        config.ollama.embedding_dimension as usize,
    )
    .await?;
    Ok((database, store))
}

fn current_model_version(config: &Config) -> Option<String> {
    let marker = config.models_dir().ok()?.join(CURRENT_MARKER);
    std::fs::read_to_string(marker)
        .ok()
        .map(|v| v.trim().to_string())
}

fn current_vocab_labels(config: &Config) -> Vec<String> {
    let Some(version) = current_model_version(config) else {
        return Vec::new();
    };
    let Ok(models_dir) = config.models_dir() else {
        return Vec::new();
    };
    IntentVocabulary::load(&models_dir.join(version).join(INTENT_MAP_FILE))
        .map(|vocab| vocab.labels().to_vec())
        .unwrap_or_default()
}

/// Rebuild the FAQ index from the catalog file
#[inline]
pub async fn index_catalog(config: &Config, catalog: Option<PathBuf>) -> Result<()> {
    let catalog_path = catalog.unwrap_or_else(|| config.data.catalog_file.clone());
    info!("Rebuilding FAQ index from {}", catalog_path.display());

    let embedder = build_embedder(config)?;
    let (database, store) = open_stores(config).await?;

    let stats = Indexer::new(embedder, database, store)
        .rebuild_from_catalog(&catalog_path)
        .await?;

    println!(
        "{} Indexed {} FAQ entries from {}",
        style("✓").green(),
        stats.entries,
        catalog_path.display()
    );
    Ok(())
}

/// Resolve one query through the full pipeline
#[inline]
pub async fn ask(config: &Config, query: Option<String>) -> Result<()> {
    let embedder = build_embedder(config)?;
    let (database, store) = open_stores(config).await?;

    let matcher = FaqMatcher::new(
        Arc::clone(&embedder),
        database,
        store,
        config.matching.high_score,
    )
    .await?;

    let log = Arc::new(InteractionLog::new(config.query_log_path()?));
    let classifier = ClassificationService::load(
        &config.models_dir()?,
        Arc::clone(&embedder),
        Arc::clone(&log),
        config.classifier.confidence_threshold,
    )?;

    let action_map = ActionMap::load(&config.data.action_map_file)?;
    let api = HttpActionApi::new(
        &config.actions.endpoint,
        Duration::from_secs(config.actions.timeout_seconds),
    )?;
    let actions = ActionResolver::new(action_map, Arc::new(api));

    let orchestrator = Orchestrator::new(
        matcher,
        classifier,
        actions,
        log,
        ResolutionPolicy::from_config(config),
    );

    let query = match query {
        Some(query) => query,
        None => Input::new()
            .with_prompt("Your ERP question")
            .interact_text()?,
    };

    let resolution = orchestrator.resolve(&query).await?;
    render_resolution(&orchestrator, resolution).await
}

async fn render_resolution(orchestrator: &Orchestrator, resolution: Resolution) -> Result<()> {
    match resolution {
        Resolution::FaqAnswer {
            tier,
            best_match,
            suggestions,
        } => {
            println!(
                "{} {} (score {:.2}, {})",
                style("✓").green(),
                style(&best_match.question).bold(),
                best_match.score,
                tier
            );
            println!("{}", best_match.answer);
            print_suggestions("Related questions", &suggestions);
        }
        Resolution::Action {
            classification,
            action,
        } => {
            println!(
                "Intent: {} ({:.0}% via {})",
                style(&classification.intent).bold(),
                classification.confidence * 100.0,
                classification.method
            );
            print_action(&action);
        }
        Resolution::NeedsClarification {
            classification,
            suggestions,
        } => {
            if let Some(classification) = &classification {
                println!(
                    "Best guess: {} ({:.0}% via {})",
                    classification.intent,
                    classification.confidence * 100.0,
                    classification.method
                );
            }

            if suggestions.is_empty() || !console::user_attended() {
                print_suggestions("Did you mean", &suggestions);
                println!(
                    "{}",
                    style("🚨 Routing your question to human support.").yellow()
                );
                return Ok(());
            }

            let mut options: Vec<String> = suggestions
                .iter()
                .map(|candidate| candidate.question.clone())
                .collect();
            options.push("None of these".to_string());

            let selection = Select::new()
                .with_prompt("I'm not confident about your query. Did you mean")
                .items(&options)
                .default(0)
                .interact()?;

            if selection == options.len() - 1 {
                println!(
                    "{}",
                    style("🚨 Routing your question to human support.").yellow()
                );
                return Ok(());
            }

            let refined = orchestrator
                .resolve_refined(&suggestions[selection].question)
                .await?;
            match refined {
                Resolution::Action {
                    classification,
                    action,
                } => {
                    println!(
                        "Intent: {} ({:.0}% via {})",
                        style(&classification.intent).bold(),
                        classification.confidence * 100.0,
                        classification.method
                    );
                    print_action(&action);
                }
                _ => {
                    println!(
                        "{}",
                        style("🚨 Routing your question to human support.").yellow()
                    );
                }
            }
        }
    }
    Ok(())
}

fn print_suggestions(heading: &str, suggestions: &[MatchCandidate]) {
    if suggestions.is_empty() {
        return;
    }
    println!();
    println!("{}", style(format!("{}:", heading)).dim());
    for (index, candidate) in suggestions.iter().enumerate() {
        println!("  {}. {} ({:.2})", index + 1, candidate.question, candidate.score);
    }
}

fn print_action(action: &ActionResult) {
    println!("Action: {} [{}]", action.response_type, action.status);
    println!("{}", action.message);
    if let Some(payload) = &action.api_response {
        println!("API response: {}", payload);
    }
    if action.escalate {
        println!("{}", style("🚨 Escalation triggered.").yellow());
    }
}

/// Review low-confidence log entries and record corrected intents
#[inline]
pub fn review(config: &Config, threshold: Option<f32>) -> Result<()> {
    let threshold = threshold.unwrap_or(config.classifier.confidence_threshold);

    let log = InteractionLog::new(config.query_log_path()?);
    let tags = ManualTagStore::new(config.manual_tags_path()?);
    let reviewer = ConsoleReviewer::new(current_vocab_labels(config));

    let outcome = Curator::new(&log, &tags).curate(threshold, &reviewer)?;

    if outcome.reviewed == 0 {
        println!("{} No low-confidence queries to tag.", style("✓").green());
    } else {
        println!(
            "{} Saved {} tags from {} reviewed queries to {}",
            style("✓").green(),
            outcome.tagged,
            outcome.reviewed,
            config.manual_tags_path()?.display()
        );
    }
    Ok(())
}

/// Regenerate the weekly training dataset from the log and manual tags
#[inline]
pub fn build_dataset(config: &Config) -> Result<()> {
    let log = InteractionLog::new(config.query_log_path()?);
    let tags = ManualTagStore::new(config.manual_tags_path()?);
    let output = config.weekly_dataset_path()?;

    let examples = build_training_set(&log, &tags, &output)?;

    println!(
        "{} Generated retraining dataset with {} examples: {}",
        style("📦").cyan(),
        examples.len(),
        output.display()
    );
    Ok(())
}

/// Train a new classifier version from the weekly dataset
#[inline]
pub fn train(config: &Config, dataset: Option<PathBuf>) -> Result<()> {
    let dataset_path = match dataset {
        Some(path) => path,
        None => config.weekly_dataset_path()?,
    };

    let embedder = build_embedder(config)?;
    let report = Trainer::new(embedder)
        .with_model_name(&config.ollama.model)
        .train_from_file(&dataset_path, &config.models_dir()?)?;

    println!(
        "{} Trained model version {}",
        style("✓").green(),
        style(&report.version).bold()
    );
    println!(
        "  Examples: {} across {} intents",
        report.examples,
        report.label_counts.len()
    );
    println!("  Self-accuracy: {:.1}%", report.self_accuracy * 100.0);
    Ok(())
}

/// Show the state of the index, model artifacts and feedback files
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    println!("{}", style("📋 ERP Sentinel Status").bold().cyan());
    println!();

    let (database, store) = open_stores(config).await?;
    let faq_count = database.count_faqs().await?;
    let vector_count = store.count().await?;
    let report = consistency::validate(&database, &store).await?;

    println!("{}", style("FAQ Index:").bold().yellow());
    println!("  Catalog entries: {}", faq_count);
    println!("  Stored vectors: {}", vector_count);
    if report.is_consistent {
        println!("  Consistency: {}", style("OK").green());
    } else {
        println!(
            "  Consistency: {} ({} missing, {} orphaned)",
            style("MISMATCH").red(),
            report.missing_in_vectors.len(),
            report.orphaned_in_vectors.len()
        );
    }

    println!();
    println!("{}", style("Classifier:").bold().yellow());
    match current_model_version(config) {
        Some(version) => {
            println!("  Active version: {}", style(&version).cyan());
            let labels = current_vocab_labels(config);
            println!("  Intents: {}", labels.len());
        }
        None => println!(
            "  Active version: {} (run `erp-sentinel train`)",
            style("none").red()
        ),
    }

    println!();
    println!("{}", style("Feedback Loop:").bold().yellow());
    let log = InteractionLog::new(config.query_log_path()?);
    let log_records = log.read_all().map_or(0, |records| records.len());
    println!("  Logged queries: {}", log_records);

    let tags = ManualTagStore::new(config.manual_tags_path()?);
    let tag_records = tags.read_all().map_or(0, |tags| tags.len());
    println!("  Manual tags: {}", tag_records);

    let dataset_path = config.weekly_dataset_path()?;
    if dataset_path.exists() {
        let examples = read_training_set(&dataset_path).map_or(0, |examples| examples.len());
        println!("  Weekly dataset: {} examples", examples);
    } else {
        println!("  Weekly dataset: not generated");
    }

    Ok(())
}
