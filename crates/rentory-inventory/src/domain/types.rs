use crate::error::{InventoryError, Result};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Account owning a set of records (JWT subject)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(
    /// Inventory item identifier
    ItemId
);
uuid_id!(
    /// Customer identifier
    CustomerId
);
uuid_id!(
    /// Rental identifier
    RentalId
);
uuid_id!(
    /// Booking identifier
    BookingId
);
uuid_id!(
    /// Payment identifier
    PaymentId
);

/// Monetary amount normalised to cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub fn zero() -> Self {
        Self::from_decimal(Decimal::ZERO)
    }

    pub fn from_decimal(amount: Decimal) -> Self {
        let mut normalized = amount.round_dp(2);
        normalized.rescale(2);
        Self(normalized)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn add(&self, other: Money) -> Self {
        Self::from_decimal(self.0 + other.0)
    }

    pub fn sub(&self, other: Money) -> Self {
        Self::from_decimal(self.0 - other.0)
    }

    /// `None` when the sum does not fit in a `Decimal`
    pub fn checked_add(&self, other: Money) -> Option<Self> {
        self.0.checked_add(other.0).map(Self::from_decimal)
    }

    /// `None` when the product does not fit in a `Decimal`
    pub fn checked_multiply(&self, factor: Decimal) -> Option<Self> {
        self.0.checked_mul(factor).map(Self::from_decimal)
    }

    /// Largest amount a `NUMERIC(12, 2)` column holds
    pub fn max_storable() -> Self {
        Self(Decimal::new(999_999_999_999, 2))
    }

    pub fn is_storable(&self) -> bool {
        self.0.abs() <= Self::max_storable().0
    }

    /// Amount taken from a request, rejected when storage could not hold it
    pub fn bounded(field: &str, amount: Decimal) -> Result<Self> {
        let money = Self::from_decimal(amount);
        if !money.is_storable() {
            return Err(InventoryError::validation(
                field,
                format!("must not exceed {}", Self::max_storable()),
            ));
        }
        Ok(money)
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::from_decimal(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc.add(m))
    }
}

#[derive(Deserialize)]
struct DateRangeParts {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<DateRangeParts> for DateRange {
    type Error = InventoryError;

    fn try_from(parts: DateRangeParts) -> Result<Self> {
        DateRange::new(parts.start, parts.end)
    }
}

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(try_from = "DateRangeParts")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(InventoryError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inclusive ranges overlap when each one starts before the other ends.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Number of calendar days, counting both ends
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.days()).map(move |offset| start + Duration::days(offset))
    }

    /// Overlapping part of two ranges
    pub fn intersection(&self, other: &DateRange) -> Option<DateRange> {
        if !self.overlaps(other) {
            return None;
        }
        Some(DateRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// A quantity of one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LineItem {
    pub item_id: ItemId,
    pub quantity: i32,
}

/// Merge duplicate item lines and reject empty or non-positive requests
pub fn normalize_lines(lines: &[LineItem]) -> Result<Vec<LineItem>> {
    if lines.is_empty() {
        return Err(InventoryError::validation(
            "items",
            "at least one item is required",
        ));
    }

    let mut merged: Vec<LineItem> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity <= 0 {
            return Err(InventoryError::validation(
                "quantity",
                format!("quantity for item {} must be positive", line.item_id),
            ));
        }
        match merged.iter_mut().find(|l| l.item_id == line.item_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(line.quantity).ok_or_else(|| {
                    InventoryError::validation(
                        "quantity",
                        format!("total quantity for item {} is too large", line.item_id),
                    )
                })?;
            }
            None => merged.push(*line),
        }
    }
    Ok(merged)
}

/// Rental lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    Reserved,
    Active,
    Returned,
    Cancelled,
}

impl RentalStatus {
    /// Reserved and active rentals keep their items out of stock
    pub fn holds_stock(&self) -> bool {
        matches!(self, RentalStatus::Reserved | RentalStatus::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RentalStatus::Returned | RentalStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: RentalStatus) -> bool {
        matches!(
            (self, next),
            (RentalStatus::Reserved, RentalStatus::Active)
                | (RentalStatus::Reserved, RentalStatus::Cancelled)
                | (RentalStatus::Active, RentalStatus::Returned)
        )
    }
}

impl fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RentalStatus::Reserved => "reserved",
            RentalStatus::Active => "active",
            RentalStatus::Returned => "returned",
            RentalStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for RentalStatus {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reserved" => Ok(RentalStatus::Reserved),
            "active" => Ok(RentalStatus::Active),
            "returned" => Ok(RentalStatus::Returned),
            "cancelled" => Ok(RentalStatus::Cancelled),
            other => Err(InventoryError::validation(
                "status",
                format!("unknown rental status '{other}'"),
            )),
        }
    }
}

/// Booking lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Converted,
}

impl BookingStatus {
    pub fn holds_stock(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
                | (BookingStatus::Pending, BookingStatus::Converted)
                | (BookingStatus::Confirmed, BookingStatus::Converted)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Converted => "converted",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for BookingStatus {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "converted" => Ok(BookingStatus::Converted),
            other => Err(InventoryError::validation(
                "status",
                format!("unknown booking status '{other}'"),
            )),
        }
    }
}

/// Settlement state derived from a rental's balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    BankTransfer,
    Other,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Other => "other",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for PaymentMethod {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "other" => Ok(PaymentMethod::Other),
            other => Err(InventoryError::validation(
                "method",
                format!("unknown payment method '{other}'"),
            )),
        }
    }
}
