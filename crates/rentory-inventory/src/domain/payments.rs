use crate::domain::items::normalize_text;
use crate::domain::rentals::{Rental, RentalBalance};
use crate::domain::types::{Money, PaymentId, PaymentMethod, RentalId, RentalStatus, UserId};
use crate::error::{InventoryError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Payment {
    pub id: PaymentId,
    #[serde(skip_serializing)]
    pub user_id: UserId,
    pub rental_id: RentalId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub paid_at: DateTime<Utc>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewPayment {
    pub amount: Decimal,
    #[serde(default)]
    pub method: PaymentMethod,
    /// Defaults to now
    pub paid_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl Payment {
    /// Validate `new` against the rental's current balance and build the payment
    pub fn record(rental: &Rental, balance: &RentalBalance, new: NewPayment) -> Result<Self> {
        if rental.status == RentalStatus::Cancelled {
            return Err(InventoryError::Conflict {
                reason: format!("rental {} is cancelled", rental.id),
            });
        }

        let amount = Money::bounded("amount", new.amount)?;
        if !amount.is_positive() {
            return Err(InventoryError::validation("amount", "must be positive"));
        }

        let remaining = balance.outstanding();
        if amount > remaining {
            return Err(InventoryError::Overpayment {
                amount: amount.as_decimal(),
                remaining: remaining.as_decimal(),
            });
        }

        let now = Utc::now();
        Ok(Self {
            id: PaymentId::new(),
            user_id: rental.user_id.clone(),
            rental_id: rental.id,
            amount,
            method: new.method,
            paid_at: new.paid_at.unwrap_or(now),
            note: normalize_text(new.note),
            created_at: now,
        })
    }
}
