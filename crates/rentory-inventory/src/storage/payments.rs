use crate::domain::payments::Payment;
use crate::domain::types::{Money, PaymentId, PaymentMethod, RentalId, UserId};
use crate::error::{InventoryError, Result};
use crate::storage::pool::Database;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create_payment(&self, payment: &Payment) -> Result<()>;
    async fn get_payment(&self, user_id: &UserId, id: &PaymentId) -> Result<Option<Payment>>;
    /// Payments of the given rentals, ordered by `paid_at`
    async fn list_payments_for_rentals(
        &self,
        user_id: &UserId,
        rental_ids: &[RentalId],
    ) -> Result<Vec<Payment>>;
    async fn delete_payment(&self, user_id: &UserId, id: &PaymentId) -> Result<bool>;
}

pub struct SqlPaymentRepository {
    db: Database,
}

impl SqlPaymentRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn payment_from_row(row: &PgRow) -> Result<Payment> {
    let method: String = row.get("method");
    Ok(Payment {
        id: PaymentId::from_uuid(row.get("id")),
        user_id: UserId::new(row.get::<String, _>("user_id")),
        rental_id: RentalId::from_uuid(row.get("rental_id")),
        amount: Money::from_decimal(row.get("amount")),
        method: method.parse::<PaymentMethod>()?,
        paid_at: row.get("paid_at"),
        note: row.get("note"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl PaymentRepository for SqlPaymentRepository {
    async fn create_payment(&self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, user_id, rental_id, amount, method, paid_at, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.user_id.as_str())
        .bind(payment.rental_id.as_uuid())
        .bind(payment.amount.as_decimal())
        .bind(payment.method.to_string())
        .bind(payment.paid_at)
        .bind(&payment.note)
        .bind(payment.created_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("create_payment", e))?;

        Ok(())
    }

    async fn get_payment(&self, user_id: &UserId, id: &PaymentId) -> Result<Option<Payment>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, rental_id, amount, method, paid_at, note, created_at
            FROM payments WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(user_id.as_str())
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("get_payment", e))?;

        row.as_ref().map(payment_from_row).transpose()
    }

    async fn list_payments_for_rentals(
        &self,
        user_id: &UserId,
        rental_ids: &[RentalId],
    ) -> Result<Vec<Payment>> {
        if rental_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rental_ids.iter().map(|id| id.as_uuid()).collect();

        let rows = sqlx::query(
            r#"
            SELECT id, user_id, rental_id, amount, method, paid_at, note, created_at
            FROM payments
            WHERE user_id = $1 AND rental_id = ANY($2)
            ORDER BY paid_at, created_at
            "#,
        )
        .bind(user_id.as_str())
        .bind(&ids)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("list_payments", e))?;

        rows.iter().map(payment_from_row).collect()
    }

    async fn delete_payment(&self, user_id: &UserId, id: &PaymentId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM payments WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(user_id.as_str())
            .execute(self.db.pool())
            .await
            .map_err(|e| InventoryError::database("delete_payment", e))?;

        Ok(result.rows_affected() > 0)
    }
}
