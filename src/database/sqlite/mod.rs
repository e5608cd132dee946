use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};


pub mod models;
pub mod queries;

pub use models::{Faq, NewFaq};
pub use queries::FaqQueries;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    #[inline]
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    /// Open (creating if necessary) the metadata database under the given
    /// base directory.
    #[inline]
    pub async fn initialize_from_base_dir(base_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(base_dir).with_context(|| {
            format!("Failed to create base directory: {}", base_dir.display())
        })?;

        Self::new(base_dir.join("metadata.db")).await
    }

    #[inline]
    pub async fn list_faqs(&self) -> Result<Vec<Faq>> {
        FaqQueries::list_all(&self.pool).await
    }

    #[inline]
    pub async fn get_faq_by_id(&self, id: i64) -> Result<Option<Faq>> {
        FaqQueries::get_by_id(&self.pool, id).await
    }

    #[inline]
    pub async fn count_faqs(&self) -> Result<i64> {
        FaqQueries::count(&self.pool).await
    }

    #[inline]
    pub async fn replace_faqs(&self, entries: &[NewFaq]) -> Result<Vec<Faq>> {
        FaqQueries::replace_all(&self.pool, entries).await
    }
}
