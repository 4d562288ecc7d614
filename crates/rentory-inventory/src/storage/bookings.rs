use crate::domain::bookings::{Booking, BookingFilter};
use crate::domain::types::{
    BookingId, BookingStatus, CustomerId, DateRange, ItemId, LineItem, RentalId, UserId,
};
use crate::error::{InventoryError, Result};
use crate::storage::pool::Database;
use crate::storage::PgTx;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::collections::HashMap;
use uuid::Uuid;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create_booking(&self, booking: &Booking) -> Result<()>;
    async fn get_booking(&self, user_id: &UserId, id: &BookingId) -> Result<Option<Booking>>;
    /// Bookings matching the filter, soonest start first
    async fn list_bookings(&self, user_id: &UserId, filter: &BookingFilter) -> Result<Vec<Booking>>;
    /// Bookings of any status whose period overlaps `range`
    async fn list_bookings_overlapping(
        &self,
        user_id: &UserId,
        range: &DateRange,
    ) -> Result<Vec<Booking>>;
    /// Whether a pending or confirmed booking includes the item
    async fn item_has_open_bookings(&self, user_id: &UserId, item_id: &ItemId) -> Result<bool>;
    async fn count_customer_bookings(
        &self,
        user_id: &UserId,
        customer_id: &CustomerId,
    ) -> Result<i64>;
    /// Update the booking row and replace its lines
    async fn update_booking(&self, booking: &Booking) -> Result<()>;
}

pub struct SqlBookingRepository {
    db: Database,
}

impl SqlBookingRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn hydrate(&self, rows: Vec<PgRow>) -> Result<Vec<Booking>> {
        let mut bookings = rows
            .iter()
            .map(booking_from_row)
            .collect::<Result<Vec<Booking>>>()?;

        if bookings.is_empty() {
            return Ok(bookings);
        }

        let ids: Vec<Uuid> = bookings.iter().map(|b| b.id.as_uuid()).collect();
        let line_rows = sqlx::query(
            r#"
            SELECT booking_id, item_id, quantity
            FROM booking_lines
            WHERE booking_id = ANY($1)
            ORDER BY booking_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("load_booking_lines", e))?;

        let mut lines: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
        for row in line_rows {
            lines
                .entry(row.get("booking_id"))
                .or_default()
                .push(LineItem {
                    item_id: ItemId::from_uuid(row.get("item_id")),
                    quantity: row.get("quantity"),
                });
        }

        for booking in &mut bookings {
            booking.lines = lines.remove(&booking.id.as_uuid()).unwrap_or_default();
        }
        Ok(bookings)
    }
}

const BOOKING_COLUMNS: &str = "id, user_id, customer_id, start_date, end_date, status, notes, \
                               rental_id, created_at, updated_at";

fn booking_from_row(row: &PgRow) -> Result<Booking> {
    let status: String = row.get("status");
    let rental_id: Option<Uuid> = row.get("rental_id");
    Ok(Booking {
        id: BookingId::from_uuid(row.get("id")),
        user_id: UserId::new(row.get::<String, _>("user_id")),
        customer_id: CustomerId::from_uuid(row.get("customer_id")),
        period: DateRange::new(row.get("start_date"), row.get("end_date"))?,
        lines: Vec::new(),
        status: status.parse::<BookingStatus>()?,
        notes: row.get("notes"),
        rental_id: rental_id.map(RentalId::from_uuid),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

async fn insert_booking_lines(tx: &mut PgTx<'_>, booking: &Booking) -> Result<()> {
    for (position, line) in booking.lines.iter().enumerate() {
        sqlx::query(
            "INSERT INTO booking_lines (booking_id, item_id, quantity, position) VALUES ($1, $2, $3, $4)",
        )
        .bind(booking.id.as_uuid())
        .bind(line.item_id.as_uuid())
        .bind(line.quantity)
        .bind(position as i32)
        .execute(&mut **tx)
        .await
        .map_err(|e| InventoryError::database("insert_booking_line", e))?;
    }
    Ok(())
}

/// Write the booking row and its lines inside an open transaction
pub(crate) async fn update_booking_row(tx: &mut PgTx<'_>, booking: &Booking) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE bookings
        SET start_date = $3, end_date = $4, status = $5, notes = $6, rental_id = $7, updated_at = $8
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(booking.id.as_uuid())
    .bind(booking.user_id.as_str())
    .bind(booking.period.start())
    .bind(booking.period.end())
    .bind(booking.status.to_string())
    .bind(&booking.notes)
    .bind(booking.rental_id.map(|id| id.as_uuid()))
    .bind(booking.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| InventoryError::database("update_booking", e))?;

    if result.rows_affected() == 0 {
        return Err(InventoryError::BookingNotFound {
            id: booking.id.to_string(),
        });
    }

    sqlx::query("DELETE FROM booking_lines WHERE booking_id = $1")
        .bind(booking.id.as_uuid())
        .execute(&mut **tx)
        .await
        .map_err(|e| InventoryError::database("replace_booking_lines", e))?;

    insert_booking_lines(tx, booking).await
}

#[async_trait]
impl BookingRepository for SqlBookingRepository {
    async fn create_booking(&self, booking: &Booking) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO bookings (id, user_id, customer_id, start_date, end_date, status, notes,
                                  rental_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(booking.id.as_uuid())
        .bind(booking.user_id.as_str())
        .bind(booking.customer_id.as_uuid())
        .bind(booking.period.start())
        .bind(booking.period.end())
        .bind(booking.status.to_string())
        .bind(&booking.notes)
        .bind(booking.rental_id.map(|id| id.as_uuid()))
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| InventoryError::database("create_booking", e))?;

        insert_booking_lines(&mut tx, booking).await?;

        tx.commit()
            .await
            .map_err(|e| InventoryError::database("create_booking", e))
    }

    async fn get_booking(&self, user_id: &UserId, id: &BookingId) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 AND user_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(user_id.as_str())
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("get_booking", e))?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_bookings(&self, user_id: &UserId, filter: &BookingFilter) -> Result<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE user_id = $1
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::UUID IS NULL OR customer_id = $3)
              AND ($4::DATE IS NULL OR start_date >= $4)
            ORDER BY start_date, created_at
            "#
        ))
        .bind(user_id.as_str())
        .bind(filter.status.map(|s| s.to_string()))
        .bind(filter.customer_id.map(|c| c.as_uuid()))
        .bind(filter.starts_from)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("list_bookings", e))?;

        self.hydrate(rows).await
    }

    async fn list_bookings_overlapping(
        &self,
        user_id: &UserId,
        range: &DateRange,
    ) -> Result<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE user_id = $1 AND start_date <= $3 AND $2 <= end_date
            ORDER BY start_date, created_at
            "#
        ))
        .bind(user_id.as_str())
        .bind(range.start())
        .bind(range.end())
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("list_bookings_overlapping", e))?;

        self.hydrate(rows).await
    }

    async fn item_has_open_bookings(&self, user_id: &UserId, item_id: &ItemId) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM bookings b
                JOIN booking_lines l ON l.booking_id = b.id
                WHERE b.user_id = $1 AND l.item_id = $2 AND b.status IN ('pending', 'confirmed')
            )
            "#,
        )
        .bind(user_id.as_str())
        .bind(item_id.as_uuid())
        .fetch_one(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("item_has_open_bookings", e))
    }

    async fn count_customer_bookings(
        &self,
        user_id: &UserId,
        customer_id: &CustomerId,
    ) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM bookings WHERE user_id = $1 AND customer_id = $2",
        )
        .bind(user_id.as_str())
        .bind(customer_id.as_uuid())
        .fetch_one(self.db.pool())
        .await
        .map_err(|e| InventoryError::database("count_customer_bookings", e))
    }

    async fn update_booking(&self, booking: &Booking) -> Result<()> {
        let mut tx = self.db.begin().await?;
        update_booking_row(&mut tx, booking).await?;
        tx.commit()
            .await
            .map_err(|e| InventoryError::database("update_booking", e))
    }
}
