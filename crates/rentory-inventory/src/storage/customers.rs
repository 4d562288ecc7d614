use crate::domain::customers::Customer;
use crate::domain::types::{CustomerId, UserId};
use crate::error::{InventoryError, Result};
use crate::storage::pool::Database;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn create_customer(&self, customer: &Customer) -> Result<()>;
    async fn get_customer(&self, user_id: &UserId, id: &CustomerId) -> Result<Option<Customer>>;
    /// Customers ordered by name, optionally matching `search` on name, email or phone
    async fn list_customers(&self, user_id: &UserId, search: Option<&str>) -> Result<Vec<Customer>>;
    async fn update_customer(&self, customer: &Customer) -> Result<()>;
    async fn delete_customer(&self, user_id: &UserId, id: &CustomerId) -> Result<bool>;
    async fn count_customers(&self, user_id: &UserId) -> Result<i64>;
}

pub struct SqlCustomerRepository {
    db: Database,
}

impl SqlCustomerRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

const CUSTOMER_COLUMNS: &str =
    "id, user_id, name, email, phone, address, notes, created_at, updated_at";

fn customer_from_row(row: &PgRow) -> Customer {
    Customer {
        id: CustomerId::from_uuid(row.get("id")),
        user_id: UserId::new(row.get::<String, _>("user_id")),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        address: row.get("address"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn create_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, user_id, name, email, phone, address, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(customer.id.as_uuid())
        .bind(customer.user_id.as_str())
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.notes)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("create_customer", e))?;

        Ok(())
    }

    async fn get_customer(&self, user_id: &UserId, id: &CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1 AND user_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(user_id.as_str())
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("get_customer", e))?;

        Ok(row.as_ref().map(customer_from_row))
    }

    async fn list_customers(&self, user_id: &UserId, search: Option<&str>) -> Result<Vec<Customer>> {
        let pattern = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));

        let rows = sqlx::query(&format!(
            r#"
            SELECT {CUSTOMER_COLUMNS} FROM customers
            WHERE user_id = $1
              AND ($2::TEXT IS NULL
                   OR LOWER(name) LIKE $2
                   OR LOWER(COALESCE(email, '')) LIKE $2
                   OR LOWER(COALESCE(phone, '')) LIKE $2)
            ORDER BY name, created_at
            "#
        ))
        .bind(user_id.as_str())
        .bind(pattern)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("list_customers", e))?;

        Ok(rows.iter().map(customer_from_row).collect())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET name = $3, email = $4, phone = $5, address = $6, notes = $7, updated_at = $8
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(customer.id.as_uuid())
        .bind(customer.user_id.as_str())
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.notes)
        .bind(customer.updated_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("update_customer", e))?;

        if result.rows_affected() == 0 {
            return Err(InventoryError::CustomerNotFound {
                id: customer.id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete_customer(&self, user_id: &UserId, id: &CustomerId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(user_id.as_str())
            .execute(self.db.pool())
            .await
            .map_err(|e| InventoryError::database("delete_customer", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_customers(&self, user_id: &UserId) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customers WHERE user_id = $1")
            .bind(user_id.as_str())
            .fetch_one(self.db.pool())
            .await
            .map_err(|e| InventoryError::database("count_customers", e))
    }
}
