use crate::domain::calendar::DateInput;
use crate::domain::items::normalize_text;
use crate::domain::payments::Payment;
use crate::domain::types::{
    BookingId, CustomerId, DateRange, ItemId, LineItem, Money, PaymentStatus, RentalId,
    RentalStatus, UserId,
};
use crate::error::{InventoryError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One item on a rental, priced at the rate in force when it was rented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RentalLine {
    pub item_id: ItemId,
    pub quantity: i32,
    pub daily_rate: Money,
}

impl RentalLine {
    pub fn subtotal(&self, period: &DateRange) -> Result<Money> {
        Decimal::from(self.quantity)
            .checked_mul(Decimal::from(period.days()))
            .and_then(|units| self.daily_rate.checked_multiply(units))
            .ok_or_else(quote_too_large)
    }
}

fn quote_too_large() -> InventoryError {
    InventoryError::validation(
        "total_price",
        format!(
            "quote exceeds the largest storable amount {}",
            Money::max_storable()
        ),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Rental {
    pub id: RentalId,
    #[serde(skip_serializing)]
    pub user_id: UserId,
    pub customer_id: CustomerId,
    pub period: DateRange,
    pub lines: Vec<RentalLine>,
    pub total_price: Money,
    pub advance_payment: Money,
    pub status: RentalStatus,
    pub notes: Option<String>,
    /// Booking this rental was converted from
    pub booking_id: Option<BookingId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewRental {
    pub customer_id: CustomerId,
    pub start_date: DateInput,
    pub end_date: DateInput,
    pub items: Vec<LineItem>,
    /// Defaults to the quote for the period
    pub total_price: Option<Decimal>,
    pub advance_payment: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RentalUpdate {
    pub start_date: Option<DateInput>,
    pub end_date: Option<DateInput>,
    pub items: Option<Vec<LineItem>>,
    pub total_price: Option<Decimal>,
    pub advance_payment: Option<Decimal>,
    pub notes: Option<String>,
}

impl RentalUpdate {
    /// Whether stock has to be checked again
    pub fn changes_commitments(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some() || self.items.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RentalFilter {
    pub status: Option<RentalStatus>,
    pub customer_id: Option<CustomerId>,
    /// Only active rentals whose last day is before this date
    pub overdue_as_of: Option<NaiveDate>,
}

impl RentalFilter {
    pub fn matches(&self, rental: &Rental) -> bool {
        if let Some(status) = self.status {
            if rental.status != status {
                return false;
            }
        }
        if let Some(customer_id) = self.customer_id {
            if rental.customer_id != customer_id {
                return false;
            }
        }
        if let Some(today) = self.overdue_as_of {
            if !rental.is_overdue(today) {
                return false;
            }
        }
        true
    }
}

/// Price of `lines` over `period`: quantity × daily rate × days, summed
pub fn quote(lines: &[RentalLine], period: &DateRange) -> Result<Money> {
    let mut total = Money::zero();
    for line in lines {
        total = total
            .checked_add(line.subtotal(period)?)
            .ok_or_else(quote_too_large)?;
    }
    if !total.is_storable() {
        return Err(quote_too_large());
    }
    Ok(total)
}

/// `total - (advance + Σ payments)`; negative when the customer paid too much
pub fn remaining_balance(
    total_price: Money,
    advance_payment: Money,
    payments: impl IntoIterator<Item = Money>,
) -> Money {
    let paid: Money = payments.into_iter().sum();
    total_price.sub(advance_payment.add(paid))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RentalBalance {
    pub total_price: Money,
    pub advance_payment: Money,
    /// Advance plus recorded payments
    pub paid: Money,
    pub remaining: Money,
    pub status: PaymentStatus,
}

impl RentalBalance {
    pub fn compute(rental: &Rental, payments: &[Payment]) -> Self {
        let recorded: Money = payments
            .iter()
            .filter(|p| p.rental_id == rental.id)
            .map(|p| p.amount)
            .sum();
        let paid = rental.advance_payment.add(recorded);
        let remaining = remaining_balance(rental.total_price, rental.advance_payment, [recorded]);

        let status = if !remaining.is_positive() {
            PaymentStatus::Paid
        } else if paid.is_zero() {
            PaymentStatus::Unpaid
        } else {
            PaymentStatus::Partial
        };

        Self {
            total_price: rental.total_price,
            advance_payment: rental.advance_payment,
            paid,
            remaining,
            status,
        }
    }

    /// Amount still owed, ignoring credit in the customer's favour
    pub fn outstanding(&self) -> Money {
        if self.remaining.is_positive() {
            self.remaining
        } else {
            Money::zero()
        }
    }
}

/// Rental together with its computed balance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RentalView {
    #[serde(flatten)]
    pub rental: Rental,
    pub balance: RentalBalance,
}

impl RentalView {
    pub fn new(rental: Rental, payments: &[Payment]) -> Self {
        let balance = RentalBalance::compute(&rental, payments);
        Self { rental, balance }
    }
}

impl Rental {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: UserId,
        customer_id: CustomerId,
        period: DateRange,
        lines: Vec<RentalLine>,
        total_price: Money,
        advance_payment: Money,
        notes: Option<String>,
        booking_id: Option<BookingId>,
    ) -> Result<Self> {
        validate_amounts(total_price, advance_payment)?;

        let now = Utc::now();
        Ok(Self {
            id: RentalId::new(),
            user_id,
            customer_id,
            period,
            lines,
            total_price,
            advance_payment,
            status: RentalStatus::Reserved,
            notes: normalize_text(notes),
            booking_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn quote(&self) -> Result<Money> {
        quote(&self.lines, &self.period)
    }

    pub fn is_editable(&self) -> bool {
        self.status.holds_stock()
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == RentalStatus::Active && self.period.end() < today
    }

    pub fn line_items(&self) -> Vec<LineItem> {
        self.lines
            .iter()
            .map(|l| LineItem {
                item_id: l.item_id,
                quantity: l.quantity,
            })
            .collect()
    }

    /// Replace prices; the total may not fall below what was already paid
    pub fn set_amounts(&mut self, total_price: Money, advance_payment: Money, recorded: Money) -> Result<()> {
        validate_amounts(total_price, advance_payment)?;
        if total_price < advance_payment.add(recorded) {
            return Err(InventoryError::validation(
                "total_price",
                format!(
                    "must cover the {} already paid",
                    advance_payment.add(recorded)
                ),
            ));
        }
        self.total_price = total_price;
        self.advance_payment = advance_payment;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn transition_to(&mut self, next: RentalStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(InventoryError::InvalidStateTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn validate_amounts(total_price: Money, advance_payment: Money) -> Result<()> {
    if !total_price.is_storable() {
        return Err(InventoryError::validation(
            "total_price",
            format!("must not exceed {}", Money::max_storable()),
        ));
    }
    if total_price.is_negative() {
        return Err(InventoryError::validation(
            "total_price",
            "must not be negative",
        ));
    }
    if advance_payment.is_negative() {
        return Err(InventoryError::validation(
            "advance_payment",
            "must not be negative",
        ));
    }
    if advance_payment > total_price {
        return Err(InventoryError::validation(
            "advance_payment",
            "must not exceed the total price",
        ));
    }
    Ok(())
}
