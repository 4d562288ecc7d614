use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Item not found: {id}")]
    ItemNotFound { id: String },

    #[error("Customer not found: {id}")]
    CustomerNotFound { id: String },

    #[error("Rental not found: {id}")]
    RentalNotFound { id: String },

    #[error("Booking not found: {id}")]
    BookingNotFound { id: String },

    #[error("Payment not found: {id}")]
    PaymentNotFound { id: String },

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("Unknown timezone: {name}")]
    InvalidTimezone { name: String },

    #[error("Validation failed for '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// Stock conflict; reported to clients as a 409
    #[error("Item {item_id} is not available: requested {requested}, available {available}")]
    Unavailable {
        item_id: String,
        requested: i32,
        available: i32,
    },

    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Payment of {amount} exceeds remaining balance {remaining}")]
    Overpayment { amount: Decimal, remaining: Decimal },

    #[error("Plan limit reached: at most {limit} {resource}")]
    PlanLimitExceeded { resource: String, limit: i64 },

    #[error("Database error during {operation}: {source}")]
    DatabaseError {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl InventoryError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        InventoryError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn database(operation: &str, source: sqlx::Error) -> Self {
        InventoryError::DatabaseError {
            operation: operation.to_string(),
            source: Box::new(source),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            InventoryError::ItemNotFound { .. }
                | InventoryError::CustomerNotFound { .. }
                | InventoryError::RentalNotFound { .. }
                | InventoryError::BookingNotFound { .. }
                | InventoryError::PaymentNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, InventoryError>;
