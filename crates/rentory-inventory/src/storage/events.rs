use crate::domain::events::ScrapedEvent;
use crate::error::{InventoryError, Result};
use crate::storage::pool::Database;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Insert or refresh events keyed on `(source, external_id)`; returns rows written
    async fn upsert_events(&self, events: &[ScrapedEvent]) -> Result<u64>;
    /// Events that start before `until` and have not finished before `from`
    async fn list_events(&self, from: DateTime<Utc>, until: DateTime<Utc>)
        -> Result<Vec<ScrapedEvent>>;
    /// Delete events that finished before `cutoff`
    async fn prune_events(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

pub struct SqlEventRepository {
    db: Database,
}

impl SqlEventRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn event_from_row(row: &PgRow) -> ScrapedEvent {
    ScrapedEvent {
        id: row.get("id"),
        source: row.get("source"),
        external_id: row.get("external_id"),
        title: row.get("title"),
        description: row.get("description"),
        location: row.get("location"),
        url: row.get("url"),
        starts_at: row.get("starts_at"),
        ends_at: row.get("ends_at"),
        scraped_at: row.get("scraped_at"),
    }
}

#[async_trait]
impl EventRepository for SqlEventRepository {
    async fn upsert_events(&self, events: &[ScrapedEvent]) -> Result<u64> {
        let mut tx = self.db.begin().await?;
        let mut written = 0;

        for event in events {
            let result = sqlx::query(
                r#"
                INSERT INTO scraped_events (id, source, external_id, title, description, location,
                                            url, starts_at, ends_at, scraped_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (source, external_id) DO UPDATE SET
                    title = EXCLUDED.title,
                    description = EXCLUDED.description,
                    location = EXCLUDED.location,
                    url = EXCLUDED.url,
                    starts_at = EXCLUDED.starts_at,
                    ends_at = EXCLUDED.ends_at,
                    scraped_at = EXCLUDED.scraped_at
                "#,
            )
            .bind(event.id)
            .bind(&event.source)
            .bind(&event.external_id)
            .bind(&event.title)
            .bind(&event.description)
            .bind(&event.location)
            .bind(&event.url)
            .bind(event.starts_at)
            .bind(event.ends_at)
            .bind(event.scraped_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| InventoryError::database("upsert_event", e))?;

            written += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| InventoryError::database("upsert_events", e))?;
        Ok(written)
    }

    async fn list_events(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ScrapedEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, source, external_id, title, description, location, url, starts_at,
                   ends_at, scraped_at
            FROM scraped_events
            WHERE starts_at < $2 AND COALESCE(ends_at, starts_at) >= $1
            ORDER BY starts_at, title
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("list_events", e))?;

        Ok(rows.iter().map(event_from_row).collect())
    }

    async fn prune_events(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM scraped_events WHERE COALESCE(ends_at, starts_at) < $1")
                .bind(cutoff)
                .execute(self.db.pool())
                .await
                .map_err(|e| InventoryError::database("prune_events", e))?;

        Ok(result.rows_affected())
    }
}
