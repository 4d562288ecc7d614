use crate::domain::items::{Item, ItemFilter};
use crate::domain::types::{ItemId, Money, UserId};
use crate::error::{InventoryError, Result};
use crate::storage::pool::Database;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn create_item(&self, item: &Item) -> Result<()>;
    async fn get_item(&self, user_id: &UserId, id: &ItemId) -> Result<Option<Item>>;
    /// Items matching the filter, ordered by name
    async fn list_items(&self, user_id: &UserId, filter: &ItemFilter) -> Result<Vec<Item>>;
    /// Items among `ids` owned by the user; unknown ids are skipped
    async fn get_items(&self, user_id: &UserId, ids: &[ItemId]) -> Result<Vec<Item>>;
    async fn update_item(&self, item: &Item) -> Result<()>;
    /// Returns false when nothing was deleted
    async fn delete_item(&self, user_id: &UserId, id: &ItemId) -> Result<bool>;
    async fn count_items(&self, user_id: &UserId) -> Result<i64>;
}

pub struct SqlItemRepository {
    db: Database,
}

impl SqlItemRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const ITEM_COLUMNS: &str = "id, user_id, name, description, category, quantity, daily_rate, \
                            image_url, created_at, updated_at";

fn item_from_row(row: &PgRow) -> Item {
    Item {
        id: ItemId::from_uuid(row.get("id")),
        user_id: UserId::new(row.get::<String, _>("user_id")),
        name: row.get("name"),
        description: row.get("description"),
        category: row.get("category"),
        quantity: row.get("quantity"),
        daily_rate: Money::from_decimal(row.get("daily_rate")),
        image_url: row.get("image_url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl ItemRepository for SqlItemRepository {
    async fn create_item(&self, item: &Item) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO items (id, user_id, name, description, category, quantity, daily_rate,
                               image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.user_id.as_str())
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.category)
        .bind(item.quantity)
        .bind(item.daily_rate.as_decimal())
        .bind(&item.image_url)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("create_item", e))?;

        Ok(())
    }

    async fn get_item(&self, user_id: &UserId, id: &ItemId) -> Result<Option<Item>> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1 AND user_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(user_id.as_str())
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("get_item", e))?;

        Ok(row.as_ref().map(item_from_row))
    }

    async fn list_items(&self, user_id: &UserId, filter: &ItemFilter) -> Result<Vec<Item>> {
        let search = filter
            .search
            .as_deref()
            .map(|s| format!("%{}%", s.trim().to_lowercase()));

        let rows = sqlx::query(&format!(
            r#"
            SELECT {ITEM_COLUMNS} FROM items
            WHERE user_id = $1
              AND ($2::TEXT IS NULL OR category = $2)
              AND ($3::TEXT IS NULL OR LOWER(name) LIKE $3 OR LOWER(COALESCE(description, '')) LIKE $3)
            ORDER BY name, created_at
            "#
        ))
        .bind(user_id.as_str())
        .bind(&filter.category)
        .bind(search)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("list_items", e))?;

        Ok(rows.iter().map(item_from_row).collect())
    }

    async fn get_items(&self, user_id: &UserId, ids: &[ItemId]) -> Result<Vec<Item>> {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE user_id = $1 AND id = ANY($2) ORDER BY name"
        ))
        .bind(user_id.as_str())
        .bind(&ids)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("get_items", e))?;

        Ok(rows.iter().map(item_from_row).collect())
    }

    async fn update_item(&self, item: &Item) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET name = $3, description = $4, category = $5, quantity = $6, daily_rate = $7,
                image_url = $8, updated_at = $9
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.user_id.as_str())
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.category)
        .bind(item.quantity)
        .bind(item.daily_rate.as_decimal())
        .bind(&item.image_url)
        .bind(item.updated_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("update_item", e))?;

        if result.rows_affected() == 0 {
            return Err(InventoryError::ItemNotFound {
                id: item.id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete_item(&self, user_id: &UserId, id: &ItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(user_id.as_str())
            .execute(self.db.pool())
            .await
            .map_err(|e| InventoryError::database("delete_item", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_items(&self, user_id: &UserId) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items WHERE user_id = $1")
            .bind(user_id.as_str())
            .fetch_one(self.db.pool())
            .await
            .map_err(|e| InventoryError::database("count_items", e))
    }
}
