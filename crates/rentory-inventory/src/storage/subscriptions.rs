use crate::domain::subscriptions::{Plan, Subscription, SubscriptionStatus};
use crate::domain::types::UserId;
use crate::error::{InventoryError, Result};
use crate::storage::pool::Database;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn get_subscription(&self, user_id: &UserId) -> Result<Option<Subscription>>;
    async fn find_by_processor_customer(&self, customer_id: &str) -> Result<Option<Subscription>>;
    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()>;
}

pub struct SqlSubscriptionRepository {
    db: Database,
}

impl SqlSubscriptionRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const SUBSCRIPTION_COLUMNS: &str = "user_id, plan, status, processor_customer_id, \
                                    processor_subscription_id, current_period_end, updated_at";

fn subscription_from_row(row: &PgRow) -> Result<Subscription> {
    let plan: String = row.get("plan");
    let status: String = row.get("status");
    Ok(Subscription {
        user_id: UserId::new(row.get::<String, _>("user_id")),
        plan: plan.parse::<Plan>()?,
        status: status.parse::<SubscriptionStatus>()?,
        processor_customer_id: row.get("processor_customer_id"),
        processor_subscription_id: row.get("processor_subscription_id"),
        current_period_end: row.get("current_period_end"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl SubscriptionRepository for SqlSubscriptionRepository {
    async fn get_subscription(&self, user_id: &UserId) -> Result<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = $1"
        ))
        .bind(user_id.as_str())
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("get_subscription", e))?;

        row.as_ref().map(subscription_from_row).transpose()
    }

    async fn find_by_processor_customer(&self, customer_id: &str) -> Result<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE processor_customer_id = $1"
        ))
        .bind(customer_id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("find_subscription_by_customer", e))?;

        row.as_ref().map(subscription_from_row).transpose()
    }

    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (user_id, plan, status, processor_customer_id,
                                       processor_subscription_id, current_period_end, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                plan = EXCLUDED.plan,
                status = EXCLUDED.status,
                processor_customer_id = EXCLUDED.processor_customer_id,
                processor_subscription_id = EXCLUDED.processor_subscription_id,
                current_period_end = EXCLUDED.current_period_end,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(subscription.user_id.as_str())
        .bind(subscription.plan.to_string())
        .bind(subscription.status.to_string())
        .bind(&subscription.processor_customer_id)
        .bind(&subscription.processor_subscription_id)
        .bind(subscription.current_period_end)
        .bind(subscription.updated_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("upsert_subscription", e))?;

        Ok(())
    }
}
