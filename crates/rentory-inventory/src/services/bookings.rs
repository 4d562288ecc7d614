use crate::domain::availability::CommitmentSource;
use crate::domain::bookings::{Booking, BookingFilter, BookingUpdate, ConvertBooking, NewBooking};
use crate::domain::calendar::resolve_range;
use crate::domain::items::normalize_text;
use crate::domain::rentals::{quote, Rental, RentalView};
use crate::domain::types::{normalize_lines, BookingId, BookingStatus, DateRange, Money, UserId};
use crate::error::{InventoryError, Result};
use crate::services::availability::AvailabilityChecker;
use crate::services::rentals::price_lines;
use crate::services::{with_account_lock, InventorySettings};
use crate::storage::Repositories;
use chrono::Utc;
use chrono_tz::Tz;
use tracing::info;

#[derive(Clone)]
pub struct BookingService {
    repos: Repositories,
    availability: AvailabilityChecker,
}

impl BookingService {
    pub fn new(repos: Repositories, settings: InventorySettings) -> Self {
        Self {
            availability: AvailabilityChecker::new(repos.clone(), settings),
            repos,
        }
    }

    pub async fn create(&self, user_id: &UserId, new: NewBooking, tz: Tz) -> Result<Booking> {
        with_account_lock(&self.repos, user_id, || self.create_locked(user_id, new, tz)).await
    }

    async fn create_locked(&self, user_id: &UserId, new: NewBooking, tz: Tz) -> Result<Booking> {
        self.repos
            .customers
            .get_customer(user_id, &new.customer_id)
            .await?
            .ok_or_else(|| InventoryError::CustomerNotFound {
                id: new.customer_id.to_string(),
            })?;

        let period = resolve_range(&new.start_date, &new.end_date, tz)?;
        let lines = normalize_lines(&new.items)?;
        self.availability.check(user_id, &lines, &period, None).await?;

        let booking = Booking::new(user_id.clone(), new.customer_id, period, lines, new.notes);
        self.repos.bookings.create_booking(&booking).await?;

        info!(
            user_id = %user_id,
            booking_id = %booking.id,
            period = %booking.period,
            "Created booking"
        );
        Ok(booking)
    }

    pub async fn get(&self, user_id: &UserId, id: &BookingId) -> Result<Booking> {
        self.repos
            .bookings
            .get_booking(user_id, id)
            .await?
            .ok_or_else(|| InventoryError::BookingNotFound { id: id.to_string() })
    }

    pub async fn list(&self, user_id: &UserId, filter: &BookingFilter) -> Result<Vec<Booking>> {
        self.repos.bookings.list_bookings(user_id, filter).await
    }

    pub async fn update(
        &self,
        user_id: &UserId,
        id: &BookingId,
        update: BookingUpdate,
        tz: Tz,
    ) -> Result<Booking> {
        with_account_lock(&self.repos, user_id, || {
            self.update_locked(user_id, id, update, tz)
        })
        .await
    }

    async fn update_locked(
        &self,
        user_id: &UserId,
        id: &BookingId,
        update: BookingUpdate,
        tz: Tz,
    ) -> Result<Booking> {
        let mut booking = self.get(user_id, id).await?;
        if !booking.is_editable() {
            return Err(InventoryError::Conflict {
                reason: format!("booking {id} is {} and can no longer be edited", booking.status),
            });
        }

        if update.start_date.is_some() || update.end_date.is_some() || update.items.is_some() {
            let start = update
                .start_date
                .as_ref()
                .map(|d| d.to_local_date(tz))
                .unwrap_or(booking.period.start());
            let end = update
                .end_date
                .as_ref()
                .map(|d| d.to_local_date(tz))
                .unwrap_or(booking.period.end());
            let period = DateRange::new(start, end)?;
            let lines = match &update.items {
                Some(items) => normalize_lines(items)?,
                None => booking.lines.clone(),
            };

            self.availability
                .check(user_id, &lines, &period, Some(CommitmentSource::Booking(*id)))
                .await?;
            booking.period = period;
            booking.lines = lines;
        }

        if let Some(notes) = update.notes {
            booking.notes = normalize_text(Some(notes));
        }
        booking.updated_at = Utc::now();

        self.repos.bookings.update_booking(&booking).await?;
        info!(user_id = %user_id, booking_id = %id, "Updated booking");
        Ok(booking)
    }

    async fn transition(
        &self,
        user_id: &UserId,
        id: &BookingId,
        status: BookingStatus,
    ) -> Result<Booking> {
        let mut booking = self.get(user_id, id).await?;
        booking.transition_to(status)?;
        self.repos.bookings.update_booking(&booking).await?;
        info!(user_id = %user_id, booking_id = %id, "Booking is now {}", status);
        Ok(booking)
    }

    pub async fn confirm(&self, user_id: &UserId, id: &BookingId) -> Result<Booking> {
        self.transition(user_id, id, BookingStatus::Confirmed).await
    }

    pub async fn cancel(&self, user_id: &UserId, id: &BookingId) -> Result<Booking> {
        self.transition(user_id, id, BookingStatus::Cancelled).await
    }

    /// Turn a pending or confirmed booking into a reserved rental
    pub async fn convert(
        &self,
        user_id: &UserId,
        id: &BookingId,
        request: ConvertBooking,
    ) -> Result<RentalView> {
        with_account_lock(&self.repos, user_id, || {
            self.convert_locked(user_id, id, request)
        })
        .await
    }

    async fn convert_locked(
        &self,
        user_id: &UserId,
        id: &BookingId,
        request: ConvertBooking,
    ) -> Result<RentalView> {
        let mut booking = self.get(user_id, id).await?;
        if !booking.status.can_transition_to(BookingStatus::Converted) {
            return Err(InventoryError::InvalidStateTransition {
                from: booking.status.to_string(),
                to: BookingStatus::Converted.to_string(),
            });
        }

        let items = self
            .availability
            .check(
                user_id,
                &booking.lines,
                &booking.period,
                Some(CommitmentSource::Booking(*id)),
            )
            .await?;
        let lines = price_lines(&booking.lines, &items, &[])?;

        let total_price = match request.total_price {
            Some(total) => Money::bounded("total_price", total)?,
            None => quote(&lines, &booking.period)?,
        };
        let advance_payment = request
            .advance_payment
            .map(|advance| Money::bounded("advance_payment", advance))
            .transpose()?
            .unwrap_or_default();

        let rental = Rental::new(
            user_id.clone(),
            booking.customer_id,
            booking.period,
            lines,
            total_price,
            advance_payment,
            booking.notes.clone(),
            Some(booking.id),
        )?;
        booking.mark_converted(rental.id)?;

        self.repos
            .rentals
            .create_rental_from_booking(&rental, &booking)
            .await?;

        info!(
            user_id = %user_id,
            booking_id = %id,
            rental_id = %rental.id,
            "Converted booking into rental"
        );
        Ok(RentalView::new(rental, &[]))
    }
}
