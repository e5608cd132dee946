use super::models::{Faq, NewFaq};
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

pub struct FaqQueries;

impl FaqQueries {
    /// Replace the entire catalog in one transaction. Ids are assigned by
    /// catalog position, starting at 0, so they line up with vector table
    /// row ids.
    #[inline]
    pub async fn replace_all(pool: &SqlitePool, entries: &[NewFaq]) -> Result<Vec<Faq>> {
        let now = Utc::now().naive_utc();

        let mut tx = pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query("DELETE FROM faqs")
            .execute(&mut *tx)
            .await
            .context("Failed to clear faqs table")?;

        for (position, entry) in entries.iter().enumerate() {
            sqlx::query(
                "INSERT INTO faqs (id, question, answer, created_date) VALUES (?, ?, ?, ?)",
            )
            .bind(position as i64)
            .bind(&entry.question)
            .bind(&entry.answer)
            .bind(now)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert FAQ at position {}", position))?;
        }

        tx.commit().await.context("Failed to commit catalog")?;

        debug!("Replaced FAQ catalog with {} entries", entries.len());
        Self::list_all(pool).await
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Faq>> {
        sqlx::query_as::<_, Faq>(
            "SELECT id, question, answer, created_date FROM faqs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get FAQ by id")
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Faq>> {
        sqlx::query_as::<_, Faq>(
            "SELECT id, question, answer, created_date FROM faqs ORDER BY id",
        )
        .fetch_all(pool)
        .await
        .context("Failed to list FAQs")
    }

    #[inline]
    pub async fn list_ids(pool: &SqlitePool) -> Result<Vec<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM faqs ORDER BY id")
            .fetch_all(pool)
            .await
            .context("Failed to list FAQ ids")
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM faqs")
            .fetch_one(pool)
            .await
            .context("Failed to count FAQs")
    }
}
