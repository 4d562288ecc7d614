use crate::domain::calendar::{build_days, range_bounds, CalendarSpan, CalendarView, EntryKind};
use crate::domain::types::{CustomerId, DateRange, UserId};
use crate::error::{InventoryError, Result};
use crate::services::InventorySettings;
use crate::storage::Repositories;
use chrono_tz::Tz;
use std::collections::HashMap;

#[derive(Clone)]
pub struct CalendarService {
    repos: Repositories,
    settings: InventorySettings,
}

impl CalendarService {
    pub fn new(repos: Repositories, settings: InventorySettings) -> Self {
        Self { repos, settings }
    }

    /// Rentals, bookings and scraped events laid out per local day of `range`
    pub async fn view(&self, user_id: &UserId, range: &DateRange, tz: Tz) -> Result<CalendarView> {
        if range.days() > self.settings.calendar_max_range_days {
            return Err(InventoryError::validation(
                "end",
                format!(
                    "calendar range is limited to {} days",
                    self.settings.calendar_max_range_days
                ),
            ));
        }

        let customers: HashMap<CustomerId, String> = self
            .repos
            .customers
            .list_customers(user_id, None)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        let customer_name = |id: &CustomerId| {
            customers
                .get(id)
                .cloned()
                .unwrap_or_else(|| "Unknown customer".to_string())
        };

        let mut spans = Vec::new();

        for rental in self.repos.rentals.list_rentals_overlapping(user_id, range).await? {
            if !rental.status.holds_stock() {
                continue;
            }
            spans.push(CalendarSpan {
                kind: EntryKind::Rental,
                id: rental.id.as_uuid(),
                title: customer_name(&rental.customer_id),
                status: rental.status.to_string(),
                period: rental.period,
            });
        }

        for booking in self
            .repos
            .bookings
            .list_bookings_overlapping(user_id, range)
            .await?
        {
            if !booking.status.holds_stock() {
                continue;
            }
            spans.push(CalendarSpan {
                kind: EntryKind::Booking,
                id: booking.id.as_uuid(),
                title: customer_name(&booking.customer_id),
                status: booking.status.to_string(),
                period: booking.period,
            });
        }

        let (from, until) = range_bounds(range, tz);
        for event in self.repos.events.list_events(from, until).await? {
            spans.push(CalendarSpan {
                kind: EntryKind::Event,
                id: event.id,
                period: event.local_period(tz),
                status: event.source,
                title: event.title,
            });
        }

        Ok(CalendarView {
            timezone: tz.name().to_string(),
            range: *range,
            days: build_days(range, &spans),
        })
    }
}
