use crate::domain::bookings::Booking;
use crate::domain::rentals::{Rental, RentalFilter, RentalLine};
use crate::domain::types::{
    BookingId, CustomerId, DateRange, ItemId, Money, RentalId, RentalStatus, UserId,
};
use crate::error::{InventoryError, Result};
use crate::storage::bookings::update_booking_row;
use crate::storage::pool::Database;
use crate::storage::PgTx;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::collections::HashMap;
use uuid::Uuid;

#[async_trait]
pub trait RentalRepository: Send + Sync {
    /// Insert the rental and its lines in one transaction
    async fn create_rental(&self, rental: &Rental) -> Result<()>;
    async fn get_rental(&self, user_id: &UserId, id: &RentalId) -> Result<Option<Rental>>;
    /// Rentals matching the filter, most recent start first
    async fn list_rentals(&self, user_id: &UserId, filter: &RentalFilter) -> Result<Vec<Rental>>;
    /// Rentals of any status whose period overlaps `range`
    async fn list_rentals_overlapping(
        &self,
        user_id: &UserId,
        range: &DateRange,
    ) -> Result<Vec<Rental>>;
    /// Whether a reserved or active rental includes the item
    async fn item_has_open_rentals(&self, user_id: &UserId, item_id: &ItemId) -> Result<bool>;
    async fn count_customer_rentals(&self, user_id: &UserId, customer_id: &CustomerId)
        -> Result<i64>;
    /// Update the rental row and replace its lines
    async fn update_rental(&self, rental: &Rental) -> Result<()>;
    /// Delete the rental together with its lines and payments
    async fn delete_rental(&self, user_id: &UserId, id: &RentalId) -> Result<bool>;
    /// Insert `rental` and persist `booking` as converted, atomically
    async fn create_rental_from_booking(&self, rental: &Rental, booking: &Booking) -> Result<()>;
}

pub struct SqlRentalRepository {
    db: Database,
}

impl SqlRentalRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Attach lines to rental rows fetched without them
    async fn hydrate(&self, rows: Vec<PgRow>) -> Result<Vec<Rental>> {
        let mut rentals = rows
            .iter()
            .map(rental_from_row)
            .collect::<Result<Vec<Rental>>>()?;

        if rentals.is_empty() {
            return Ok(rentals);
        }

        let ids: Vec<Uuid> = rentals.iter().map(|r| r.id.as_uuid()).collect();
        let line_rows = sqlx::query(
            r#"
            SELECT rental_id, item_id, quantity, daily_rate
            FROM rental_lines
            WHERE rental_id = ANY($1)
            ORDER BY rental_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("load_rental_lines", e))?;

        let mut lines: HashMap<Uuid, Vec<RentalLine>> = HashMap::new();
        for row in line_rows {
            lines
                .entry(row.get("rental_id"))
                .or_default()
                .push(RentalLine {
                    item_id: ItemId::from_uuid(row.get("item_id")),
                    quantity: row.get("quantity"),
                    daily_rate: Money::from_decimal(row.get("daily_rate")),
                });
        }

        for rental in &mut rentals {
            rental.lines = lines.remove(&rental.id.as_uuid()).unwrap_or_default();
        }
        Ok(rentals)
    }
}

const RENTAL_COLUMNS: &str = "id, user_id, customer_id, start_date, end_date, total_price, \
                              advance_payment, status, notes, booking_id, created_at, updated_at";

fn rental_from_row(row: &PgRow) -> Result<Rental> {
    let status: String = row.get("status");
    let booking_id: Option<Uuid> = row.get("booking_id");
    Ok(Rental {
        id: RentalId::from_uuid(row.get("id")),
        user_id: UserId::new(row.get::<String, _>("user_id")),
        customer_id: CustomerId::from_uuid(row.get("customer_id")),
        period: DateRange::new(row.get("start_date"), row.get("end_date"))?,
        lines: Vec::new(),
        total_price: Money::from_decimal(row.get("total_price")),
        advance_payment: Money::from_decimal(row.get("advance_payment")),
        status: status.parse::<RentalStatus>()?,
        notes: row.get("notes"),
        booking_id: booking_id.map(BookingId::from_uuid),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

async fn insert_rental_row(tx: &mut PgTx<'_>, rental: &Rental) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO rentals (id, user_id, customer_id, start_date, end_date, total_price,
                             advance_payment, status, notes, booking_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(rental.id.as_uuid())
    .bind(rental.user_id.as_str())
    .bind(rental.customer_id.as_uuid())
    .bind(rental.period.start())
    .bind(rental.period.end())
    .bind(rental.total_price.as_decimal())
    .bind(rental.advance_payment.as_decimal())
    .bind(rental.status.to_string())
    .bind(&rental.notes)
    .bind(rental.booking_id.map(|id| id.as_uuid()))
    .bind(rental.created_at)
    .bind(rental.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| InventoryError::database("insert_rental", e))?;

    insert_rental_lines(tx, rental).await
}

async fn insert_rental_lines(tx: &mut PgTx<'_>, rental: &Rental) -> Result<()> {
    for (position, line) in rental.lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO rental_lines (rental_id, item_id, quantity, daily_rate, position)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(rental.id.as_uuid())
        .bind(line.item_id.as_uuid())
        .bind(line.quantity)
        .bind(line.daily_rate.as_decimal())
        .bind(position as i32)
        .execute(&mut **tx)
        .await
        .map_err(|e| InventoryError::database("insert_rental_line", e))?;
    }
    Ok(())
}

#[async_trait]
impl RentalRepository for SqlRentalRepository {
    async fn create_rental(&self, rental: &Rental) -> Result<()> {
        let mut tx = self.db.begin().await?;
        insert_rental_row(&mut tx, rental).await?;
        tx.commit()
            .await
            .map_err(|e| InventoryError::database("create_rental", e))
    }

    async fn get_rental(&self, user_id: &UserId, id: &RentalId) -> Result<Option<Rental>> {
        let row = sqlx::query(&format!(
            "SELECT {RENTAL_COLUMNS} FROM rentals WHERE id = $1 AND user_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(user_id.as_str())
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("get_rental", e))?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_rentals(&self, user_id: &UserId, filter: &RentalFilter) -> Result<Vec<Rental>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {RENTAL_COLUMNS} FROM rentals
            WHERE user_id = $1
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::UUID IS NULL OR customer_id = $3)
              AND ($4::DATE IS NULL OR (status = 'active' AND end_date < $4))
            ORDER BY start_date DESC, created_at DESC
            "#
        ))
        .bind(user_id.as_str())
        .bind(filter.status.map(|s| s.to_string()))
        .bind(filter.customer_id.map(|c| c.as_uuid()))
        .bind(filter.overdue_as_of)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("list_rentals", e))?;

        self.hydrate(rows).await
    }

    async fn list_rentals_overlapping(
        &self,
        user_id: &UserId,
        range: &DateRange,
    ) -> Result<Vec<Rental>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {RENTAL_COLUMNS} FROM rentals
            WHERE user_id = $1 AND start_date <= $3 AND $2 <= end_date
            ORDER BY start_date, created_at
            "#
        ))
        .bind(user_id.as_str())
        .bind(range.start())
        .bind(range.end())
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("list_rentals_overlapping", e))?;

        self.hydrate(rows).await
    }

    async fn item_has_open_rentals(&self, user_id: &UserId, item_id: &ItemId) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM rentals r
                JOIN rental_lines l ON l.rental_id = r.id
                WHERE r.user_id = $1 AND l.item_id = $2 AND r.status IN ('reserved', 'active')
            )
            "#,
        )
        .bind(user_id.as_str())
        .bind(item_id.as_uuid())
        .fetch_one(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("item_has_open_rentals", e))
    }

    async fn count_customer_rentals(
        &self,
        user_id: &UserId,
        customer_id: &CustomerId,
    ) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM rentals WHERE user_id = $1 AND customer_id = $2",
        )
        .bind(user_id.as_str())
        .bind(customer_id.as_uuid())
        .fetch_one(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("count_customer_rentals", e))
    }

    async fn update_rental(&self, rental: &Rental) -> Result<()> {
        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE rentals
            SET start_date = $3, end_date = $4, total_price = $5, advance_payment = $6,
                status = $7, notes = $8, updated_at = $9
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(rental.id.as_uuid())
        .bind(rental.user_id.as_str())
        .bind(rental.period.start())
        .bind(rental.period.end())
        .bind(rental.total_price.as_decimal())
        .bind(rental.advance_payment.as_decimal())
        .bind(rental.status.to_string())
        .bind(&rental.notes)
        .bind(rental.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| InventoryError::database("update_rental", e))?;

        if result.rows_affected() == 0 {
            return Err(InventoryError::RentalNotFound {
                id: rental.id.to_string(),
            });
        }

        sqlx::query("DELETE FROM rental_lines WHERE rental_id = $1")
            .bind(rental.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| InventoryError::database("replace_rental_lines", e))?;
        insert_rental_lines(&mut tx, rental).await?;

        tx.commit()
            .await
            .map_err(|e| InventoryError::database("update_rental", e))
    }

    async fn delete_rental(&self, user_id: &UserId, id: &RentalId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rentals WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(user_id.as_str())
            .execute(self.db.pool())
            .await
            .map_err(|e| InventoryError::database("delete_rental", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_rental_from_booking(&self, rental: &Rental, booking: &Booking) -> Result<()> {
        let mut tx = self.db.begin().await?;
        insert_rental_row(&mut tx, rental).await?;
        update_booking_row(&mut tx, booking).await?;
        tx.commit()
            .await
            .map_err(|e| InventoryError::database("create_rental_from_booking", e))
    }
}
