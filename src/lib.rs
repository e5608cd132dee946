use thiserror::Error;

pub type Result<T> = std::result::Result<T, SentinelError>;

#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Feedback error: {0}")]
    Feedback(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod actions;
pub mod classifier;
pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod feedback;
pub mod indexer;
pub mod matcher;
pub mod orchestrator;
pub mod trainer;
