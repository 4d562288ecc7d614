use crate::domain::calendar::DateInput;
use crate::domain::items::normalize_text;
use crate::domain::types::{
    BookingId, BookingStatus, CustomerId, DateRange, LineItem, RentalId, UserId,
};
use crate::error::{InventoryError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Booking {
    pub id: BookingId,
    #[serde(skip_serializing)]
    pub user_id: UserId,
    pub customer_id: CustomerId,
    pub period: DateRange,
    pub lines: Vec<LineItem>,
    pub status: BookingStatus,
    pub notes: Option<String>,
    /// Rental created when the booking was converted
    pub rental_id: Option<RentalId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewBooking {
    pub customer_id: CustomerId,
    pub start_date: DateInput,
    pub end_date: DateInput,
    pub items: Vec<LineItem>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BookingUpdate {
    pub start_date: Option<DateInput>,
    pub end_date: Option<DateInput>,
    pub items: Option<Vec<LineItem>>,
    pub notes: Option<String>,
}

/// Prices for the rental a booking turns into
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ConvertBooking {
    pub total_price: Option<Decimal>,
    pub advance_payment: Option<Decimal>,
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub customer_id: Option<CustomerId>,
    /// Only bookings starting on or after this date
    pub starts_from: Option<NaiveDate>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.status.map_or(true, |s| booking.status == s)
            && self.customer_id.map_or(true, |c| booking.customer_id == c)
            && self
                .starts_from
                .map_or(true, |d| booking.period.start() >= d)
    }
}

impl Booking {
    pub fn new(
        user_id: UserId,
        customer_id: CustomerId,
        period: DateRange,
        lines: Vec<LineItem>,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: BookingId::new(),
            user_id,
            customer_id,
            period,
            lines,
            status: BookingStatus::Pending,
            notes: normalize_text(notes),
            rental_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_editable(&self) -> bool {
        self.status.holds_stock()
    }

    pub fn transition_to(&mut self, next: BookingStatus) -> Result<()> {
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

    pub fn mark_converted(&mut self, rental_id: RentalId) -> Result<()> {
        self.transition_to(BookingStatus::Converted)?;
        self.rental_id = Some(rental_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ItemId;

    fn booking() -> Booking {
        let day = NaiveDate::from_ymd_opt(2024, 9, 14).unwrap();
        Booking::new(
            UserId::new("owner"),
            CustomerId::new(),
            DateRange::single(day),
            vec![LineItem {
                item_id: ItemId::new(),
                quantity: 4,
            }],
            Some("wedding".to_string()),
        )
    }

    #[test]
    fn test_new_booking_is_pending() {
        let b = booking();
        assert_eq!(b.status, BookingStatus::Pending);
        assert!(b.is_editable());
        assert!(b.rental_id.is_none());
    }

    #[test]
    fn test_convert_links_rental() {
        let mut b = booking();
        b.transition_to(BookingStatus::Confirmed).unwrap();
        let rental_id = RentalId::new();
        b.mark_converted(rental_id).unwrap();
        assert_eq!(b.status, BookingStatus::Converted);
        assert_eq!(b.rental_id, Some(rental_id));
        assert!(!b.is_editable());
    }

    #[test]
    fn test_cancelled_booking_cannot_convert() {
        let mut b = booking();
        b.transition_to(BookingStatus::Cancelled).unwrap();
        assert!(matches!(
            b.mark_converted(RentalId::new()),
            Err(InventoryError::InvalidStateTransition { .. })
        ));
        assert!(b.rental_id.is_none());
    }

    #[test]
    fn test_filter() {
        let b = booking();
        let filter = BookingFilter {
            status: Some(BookingStatus::Pending),
            customer_id: Some(b.customer_id),
            starts_from: NaiveDate::from_ymd_opt(2024, 9, 1),
        };
        assert!(filter.matches(&b));

        let later = BookingFilter {
            starts_from: NaiveDate::from_ymd_opt(2024, 9, 15),
            ..Default::default()
        };
        assert!(!later.matches(&b));
    }
}
