use crate::domain::availability::CommitmentSource;
use crate::domain::calendar::resolve_range;
use crate::domain::items::{normalize_text, Item};
use crate::domain::payments::{NewPayment, Payment};
use crate::domain::rentals::{
    quote, NewRental, Rental, RentalBalance, RentalFilter, RentalLine, RentalUpdate, RentalView,
};
use crate::domain::types::{
    normalize_lines, DateRange, LineItem, Money, PaymentId, RentalId, RentalStatus, UserId,
};
use crate::error::{InventoryError, Result};
use crate::services::availability::AvailabilityChecker;
use crate::services::{with_account_lock, InventorySettings};
use crate::storage::Repositories;
use chrono::Utc;
use chrono_tz::Tz;
use tracing::info;

#[derive(Clone)]
pub struct RentalService {
    repos: Repositories,
    availability: AvailabilityChecker,
}

/// Pair each line with a daily rate, keeping rates already captured in `existing`
pub(crate) fn price_lines(
    lines: &[LineItem],
    items: &[Item],
    existing: &[RentalLine],
) -> Result<Vec<RentalLine>> {
    lines
        .iter()
        .map(|line| {
            let daily_rate = match existing.iter().find(|l| l.item_id == line.item_id) {
                Some(previous) => previous.daily_rate,
                None => {
                    items
                        .iter()
                        .find(|i| i.id == line.item_id)
                        .ok_or_else(|| InventoryError::ItemNotFound {
                            id: line.item_id.to_string(),
                        })?
                        .daily_rate
                }
            };
            Ok(RentalLine {
                item_id: line.item_id,
                quantity: line.quantity,
                daily_rate,
            })
        })
        .collect()
}

/// Wrap rentals with balances computed from their recorded payments
pub(crate) async fn attach_balances(
    repos: &Repositories,
    user_id: &UserId,
    rentals: Vec<Rental>,
) -> Result<Vec<RentalView>> {
    let ids: Vec<RentalId> = rentals.iter().map(|r| r.id).collect();
    let payments = repos.payments.list_payments_for_rentals(user_id, &ids).await?;
    Ok(rentals
        .into_iter()
        .map(|rental| RentalView::new(rental, &payments))
        .collect())
}

impl RentalService {
    pub fn new(repos: Repositories, settings: InventorySettings) -> Self {
        Self {
            availability: AvailabilityChecker::new(repos.clone(), settings),
            repos,
        }
    }

    async fn find(&self, user_id: &UserId, id: &RentalId) -> Result<Rental> {
        self.repos
            .rentals
            .get_rental(user_id, id)
            .await?
            .ok_or_else(|| InventoryError::RentalNotFound { id: id.to_string() })
    }

    async fn payments_of(&self, user_id: &UserId, id: &RentalId) -> Result<Vec<Payment>> {
        self.repos
            .payments
            .list_payments_for_rentals(user_id, std::slice::from_ref(id))
            .await
    }

    pub async fn create(&self, user_id: &UserId, new: NewRental, tz: Tz) -> Result<RentalView> {
        with_account_lock(&self.repos, user_id, || self.create_locked(user_id, new, tz)).await
    }

    async fn create_locked(&self, user_id: &UserId, new: NewRental, tz: Tz) -> Result<RentalView> {
        self.repos
            .customers
            .get_customer(user_id, &new.customer_id)
            .await?
            .ok_or_else(|| InventoryError::CustomerNotFound {
                id: new.customer_id.to_string(),
            })?;

        let period = resolve_range(&new.start_date, &new.end_date, tz)?;
        let lines = normalize_lines(&new.items)?;
        let items = self.availability.check(user_id, &lines, &period, None).await?;
        let rental_lines = price_lines(&lines, &items, &[])?;

        let total_price = match new.total_price {
            Some(total) => Money::bounded("total_price", total)?,
            None => quote(&rental_lines, &period)?,
        };
        let advance_payment = new
            .advance_payment
            .map(|advance| Money::bounded("advance_payment", advance))
            .transpose()?
            .unwrap_or_default();

        let rental = Rental::new(
            user_id.clone(),
            new.customer_id,
            period,
            rental_lines,
            total_price,
            advance_payment,
            new.notes,
            None,
        )?;
        self.repos.rentals.create_rental(&rental).await?;

        info!(
            user_id = %user_id,
            rental_id = %rental.id,
            period = %rental.period,
            total = %rental.total_price,
            "Created rental"
        );
        Ok(RentalView::new(rental, &[]))
    }

    pub async fn get(&self, user_id: &UserId, id: &RentalId) -> Result<RentalView> {
        let rental = self.find(user_id, id).await?;
        let payments = self.payments_of(user_id, id).await?;
        Ok(RentalView::new(rental, &payments))
    }

    pub async fn list(&self, user_id: &UserId, filter: &RentalFilter) -> Result<Vec<RentalView>> {
        let rentals = self.repos.rentals.list_rentals(user_id, filter).await?;
        attach_balances(&self.repos, user_id, rentals).await
    }

    pub async fn update(
        &self,
        user_id: &UserId,
        id: &RentalId,
        update: RentalUpdate,
        tz: Tz,
    ) -> Result<RentalView> {
        with_account_lock(&self.repos, user_id, || {
            self.update_locked(user_id, id, update, tz)
        })
        .await
    }

    async fn update_locked(
        &self,
        user_id: &UserId,
        id: &RentalId,
        update: RentalUpdate,
        tz: Tz,
    ) -> Result<RentalView> {
        let mut rental = self.find(user_id, id).await?;
        if !rental.is_editable() {
            return Err(InventoryError::Conflict {
                reason: format!("rental {id} is {} and can no longer be edited", rental.status),
            });
        }

        let payments = self.payments_of(user_id, id).await?;
        let recorded: Money = payments.iter().map(|p| p.amount).sum();

        let requotes = update.changes_commitments();
        if requotes {
            let start = update
                .start_date
                .as_ref()
                .map(|d| d.to_local_date(tz))
                .unwrap_or(rental.period.start());
            let end = update
                .end_date
                .as_ref()
                .map(|d| d.to_local_date(tz))
                .unwrap_or(rental.period.end());
            let period = DateRange::new(start, end)?;
            let lines = match &update.items {
                Some(items) => normalize_lines(items)?,
                None => rental.line_items(),
            };

            let items = self
                .availability
                .check(user_id, &lines, &period, Some(CommitmentSource::Rental(*id)))
                .await?;
            rental.lines = price_lines(&lines, &items, &rental.lines)?;
            rental.period = period;
        }

        let total_price = match update.total_price {
            Some(total) => Money::bounded("total_price", total)?,
            None if requotes => rental.quote()?,
            None => rental.total_price,
        };
        let advance_payment = match update.advance_payment {
            Some(advance) => Money::bounded("advance_payment", advance)?,
            None => rental.advance_payment,
        };
        rental.set_amounts(total_price, advance_payment, recorded)?;

        if let Some(notes) = update.notes {
            rental.notes = normalize_text(Some(notes));
        }
        rental.updated_at = Utc::now();

        self.repos.rentals.update_rental(&rental).await?;
        info!(user_id = %user_id, rental_id = %id, "Updated rental");
        Ok(RentalView::new(rental, &payments))
    }

    pub async fn set_status(
        &self,
        user_id: &UserId,
        id: &RentalId,
        status: RentalStatus,
    ) -> Result<RentalView> {
        let mut rental = self.find(user_id, id).await?;
        let previous = rental.status;
        rental.transition_to(status)?;
        self.repos.rentals.update_rental(&rental).await?;

        info!(
            user_id = %user_id,
            rental_id = %id,
            "Rental status changed from {} to {}",
            previous,
            status
        );
        let payments = self.payments_of(user_id, id).await?;
        Ok(RentalView::new(rental, &payments))
    }

    pub async fn delete(&self, user_id: &UserId, id: &RentalId) -> Result<()> {
        if !self.repos.rentals.delete_rental(user_id, id).await? {
            return Err(InventoryError::RentalNotFound { id: id.to_string() });
        }
        info!(user_id = %user_id, rental_id = %id, "Deleted rental");
        Ok(())
    }

    pub async fn balance(&self, user_id: &UserId, id: &RentalId) -> Result<RentalBalance> {
        Ok(self.get(user_id, id).await?.balance)
    }

    /// Record a payment; the balance check and the insert run under the account lock
    pub async fn record_payment(
        &self,
        user_id: &UserId,
        rental_id: &RentalId,
        new: NewPayment,
    ) -> Result<Payment> {
        with_account_lock(&self.repos, user_id, || {
            self.record_payment_locked(user_id, rental_id, new)
        })
        .await
    }

    async fn record_payment_locked(
        &self,
        user_id: &UserId,
        rental_id: &RentalId,
        new: NewPayment,
    ) -> Result<Payment> {
        let rental = self.find(user_id, rental_id).await?;
        let payments = self.payments_of(user_id, rental_id).await?;
        let balance = RentalBalance::compute(&rental, &payments);

        let payment = Payment::record(&rental, &balance, new)?;
        self.repos.payments.create_payment(&payment).await?;

        info!(
            user_id = %user_id,
            rental_id = %rental_id,
            payment_id = %payment.id,
            amount = %payment.amount,
            "Recorded payment"
        );
        Ok(payment)
    }

    pub async fn list_payments(&self, user_id: &UserId, rental_id: &RentalId) -> Result<Vec<Payment>> {
        self.find(user_id, rental_id).await?;
        self.payments_of(user_id, rental_id).await
    }

    pub async fn delete_payment(
        &self,
        user_id: &UserId,
        rental_id: &RentalId,
        payment_id: &PaymentId,
    ) -> Result<()> {
        let payment = self
            .repos
            .payments
            .get_payment(user_id, payment_id)
            .await?
            .filter(|p| &p.rental_id == rental_id)
            .ok_or_else(|| InventoryError::PaymentNotFound {
                id: payment_id.to_string(),
            })?;

        self.repos.payments.delete_payment(user_id, &payment.id).await?;
        info!(user_id = %user_id, rental_id = %rental_id, payment_id = %payment_id, "Deleted payment");
        Ok(())
    }
}
