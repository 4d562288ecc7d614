use crate::domain::bookings::Booking;
use crate::domain::payments::Payment;
use crate::domain::rentals::{Rental, RentalBalance};
use crate::domain::types::{Money, RentalStatus};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Bookings starting within this many days count as upcoming
pub const UPCOMING_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DashboardSummary {
    pub today: NaiveDate,
    pub items: i64,
    pub customers: i64,
    pub open_rentals: i64,
    pub overdue_rentals: i64,
    pub rentals_starting_today: i64,
    pub upcoming_bookings: i64,
    /// Sum of positive remaining balances over non-cancelled rentals
    pub outstanding_balance: Money,
}

impl DashboardSummary {
    pub fn compute(
        today: NaiveDate,
        items: i64,
        customers: i64,
        rentals: &[Rental],
        bookings: &[Booking],
        payments: &[Payment],
    ) -> Self {
        let count = |pred: &dyn Fn(&Rental) -> bool| rentals.iter().filter(|r| pred(r)).count() as i64;

        let upcoming_end = today + Duration::days(UPCOMING_WINDOW_DAYS);
        let upcoming_bookings = bookings
            .iter()
            .filter(|b| b.status.holds_stock())
            .filter(|b| b.period.start() >= today && b.period.start() <= upcoming_end)
            .count() as i64;

        let outstanding_balance = rentals
            .iter()
            .filter(|r| r.status != RentalStatus::Cancelled)
            .map(|r| RentalBalance::compute(r, payments).outstanding())
            .sum();

        Self {
            today,
            items,
            customers,
            open_rentals: count(&|r| r.status.holds_stock()),
            overdue_rentals: count(&|r| r.is_overdue(today)),
            rentals_starting_today: count(&|r| r.status.holds_stock() && r.period.start() == today),
            upcoming_bookings,
            outstanding_balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rentals::RentalLine;
    use crate::domain::types::{CustomerId, DateRange, ItemId, LineItem, PaymentId, PaymentMethod, UserId};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, d).unwrap()
    }

    fn rental(start: u32, end: u32, total: rust_decimal::Decimal) -> Rental {
        Rental::new(
            UserId::new("owner"),
            CustomerId::new(),
            DateRange::new(day(start), day(end)).unwrap(),
            vec![RentalLine {
                item_id: ItemId::new(),
                quantity: 1,
                daily_rate: Money::from_decimal(dec!(10)),
            }],
            Money::from_decimal(total),
            Money::zero(),
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_summary_counts() {
        let today = day(10);

        let starting = rental(10, 12, dec!(30));
        let mut overdue = rental(1, 5, dec!(50));
        overdue.transition_to(RentalStatus::Active).unwrap();
        let mut cancelled = rental(10, 11, dec!(99));
        cancelled.transition_to(RentalStatus::Cancelled).unwrap();

        let payments = vec![Payment {
            id: PaymentId::new(),
            user_id: UserId::new("owner"),
            rental_id: overdue.id,
            amount: Money::from_decimal(dec!(20)),
            method: PaymentMethod::Cash,
            paid_at: Utc::now(),
            note: None,
            created_at: Utc::now(),
        }];

        let soon = Booking::new(
            UserId::new("owner"),
            CustomerId::new(),
            DateRange::single(day(15)),
            vec![LineItem {
                item_id: ItemId::new(),
                quantity: 1,
            }],
            None,
        );
        let far = Booking::new(
            UserId::new("owner"),
            CustomerId::new(),
            DateRange::single(day(30)),
            soon.lines.clone(),
            None,
        );

        let summary = DashboardSummary::compute(
            today,
            4,
            2,
            &[starting, overdue, cancelled],
            &[soon, far],
            &payments,
        );

        assert_eq!(summary.open_rentals, 2);
        assert_eq!(summary.overdue_rentals, 1);
        assert_eq!(summary.rentals_starting_today, 1);
        assert_eq!(summary.upcoming_bookings, 1);
        assert_eq!(summary.outstanding_balance.to_string(), "60.00");
    }
}
