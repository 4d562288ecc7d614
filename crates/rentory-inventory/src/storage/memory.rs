//! In-process store implementing every repository trait, used by tests and local runs

use crate::domain::bookings::{Booking, BookingFilter};
use crate::domain::customers::Customer;
use crate::domain::events::ScrapedEvent;
use crate::domain::items::{Item, ItemFilter};
use crate::domain::payments::Payment;
use crate::domain::rentals::{Rental, RentalFilter};
use crate::domain::subscriptions::Subscription;
use crate::domain::types::{
    BookingId, CustomerId, DateRange, ItemId, PaymentId, RentalId, UserId,
};
use crate::error::{InventoryError, Result};
use crate::storage::{
    BookingRepository, CustomerRepository, EventRepository, ItemRepository, PaymentRepository,
    RentalRepository, SubscriptionRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    items: HashMap<ItemId, Item>,
    customers: HashMap<CustomerId, Customer>,
    rentals: HashMap<RentalId, Rental>,
    bookings: HashMap<BookingId, Booking>,
    payments: HashMap<PaymentId, Payment>,
    subscriptions: HashMap<UserId, Subscription>,
    events: HashMap<(String, String), ScrapedEvent>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn owned_by<'a, T>(
    records: impl Iterator<Item = &'a T>,
    user_id: &UserId,
    owner: impl Fn(&T) -> &UserId,
) -> Vec<T>
where
    T: Clone + 'a,
{
    records.filter(|r| owner(r) == user_id).cloned().collect()
}

#[async_trait]
impl ItemRepository for MemoryStore {
    async fn create_item(&self, item: &Item) -> Result<()> {
        self.state.write().await.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn get_item(&self, user_id: &UserId, id: &ItemId) -> Result<Option<Item>> {
        let state = self.state.read().await;
        Ok(state.items.get(id).filter(|i| &i.user_id == user_id).cloned())
    }

    async fn list_items(&self, user_id: &UserId, filter: &ItemFilter) -> Result<Vec<Item>> {
        let state = self.state.read().await;
        let mut items: Vec<Item> = owned_by(state.items.values(), user_id, |i| &i.user_id)
            .into_iter()
            .filter(|i| filter.matches(i))
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));
        Ok(items)
    }

    async fn get_items(&self, user_id: &UserId, ids: &[ItemId]) -> Result<Vec<Item>> {
        let state = self.state.read().await;
        let mut items: Vec<Item> = ids
            .iter()
            .filter_map(|id| state.items.get(id))
            .filter(|i| &i.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        items.dedup_by_key(|i| i.id);
        Ok(items)
    }

    async fn update_item(&self, item: &Item) -> Result<()> {
        let mut state = self.state.write().await;
        match state.items.get_mut(&item.id) {
            Some(existing) if existing.user_id == item.user_id => {
                *existing = item.clone();
                Ok(())
            }
            _ => Err(InventoryError::ItemNotFound {
                id: item.id.to_string(),
            }),
        }
    }

    async fn delete_item(&self, user_id: &UserId, id: &ItemId) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.items.get(id).is_some_and(|i| &i.user_id == user_id) {
            state.items.remove(id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn count_items(&self, user_id: &UserId) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state.items.values().filter(|i| &i.user_id == user_id).count() as i64)
    }
}

#[async_trait]
impl CustomerRepository for MemoryStore {
    async fn create_customer(&self, customer: &Customer) -> Result<()> {
        self.state
            .write()
            .await
            .customers
            .insert(customer.id, customer.clone());
        Ok(())
    }

    async fn get_customer(&self, user_id: &UserId, id: &CustomerId) -> Result<Option<Customer>> {
        let state = self.state.read().await;
        Ok(state
            .customers
            .get(id)
            .filter(|c| &c.user_id == user_id)
            .cloned())
    }

    async fn list_customers(&self, user_id: &UserId, search: Option<&str>) -> Result<Vec<Customer>> {
        let state = self.state.read().await;
        let mut customers: Vec<Customer> =
            owned_by(state.customers.values(), user_id, |c| &c.user_id)
                .into_iter()
                .filter(|c| search.map_or(true, |s| c.matches(s)))
                .collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));
        Ok(customers)
    }

    async fn update_customer(&self, customer: &Customer) -> Result<()> {
        let mut state = self.state.write().await;
        match state.customers.get_mut(&customer.id) {
            Some(existing) if existing.user_id == customer.user_id => {
                *existing = customer.clone();
                Ok(())
            }
            _ => Err(InventoryError::CustomerNotFound {
                id: customer.id.to_string(),
            }),
        }
    }

    async fn delete_customer(&self, user_id: &UserId, id: &CustomerId) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.customers.get(id).is_some_and(|c| &c.user_id == user_id) {
            state.customers.remove(id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn count_customers(&self, user_id: &UserId) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .customers
            .values()
            .filter(|c| &c.user_id == user_id)
            .count() as i64)
    }
}

#[async_trait]
impl RentalRepository for MemoryStore {
    async fn create_rental(&self, rental: &Rental) -> Result<()> {
        self.state
            .write()
            .await
            .rentals
            .insert(rental.id, rental.clone());
        Ok(())
    }

    async fn get_rental(&self, user_id: &UserId, id: &RentalId) -> Result<Option<Rental>> {
        let state = self.state.read().await;
        Ok(state
            .rentals
            .get(id)
            .filter(|r| &r.user_id == user_id)
            .cloned())
    }

    async fn list_rentals(&self, user_id: &UserId, filter: &RentalFilter) -> Result<Vec<Rental>> {
        let state = self.state.read().await;
        let mut rentals: Vec<Rental> = owned_by(state.rentals.values(), user_id, |r| &r.user_id)
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        rentals.sort_by(|a, b| {
            b.period
                .start()
                .cmp(&a.period.start())
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(rentals)
    }

    async fn list_rentals_overlapping(
        &self,
        user_id: &UserId,
        range: &DateRange,
    ) -> Result<Vec<Rental>> {
        let state = self.state.read().await;
        let mut rentals: Vec<Rental> = owned_by(state.rentals.values(), user_id, |r| &r.user_id)
            .into_iter()
            .filter(|r| r.period.overlaps(range))
            .collect();
        rentals.sort_by(|a, b| {
            a.period
                .start()
                .cmp(&b.period.start())
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(rentals)
    }

    async fn item_has_open_rentals(&self, user_id: &UserId, item_id: &ItemId) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.rentals.values().any(|r| {
            &r.user_id == user_id
                && r.status.holds_stock()
                && r.lines.iter().any(|l| &l.item_id == item_id)
        }))
    }

    async fn count_customer_rentals(
        &self,
        user_id: &UserId,
        customer_id: &CustomerId,
    ) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .rentals
            .values()
            .filter(|r| &r.user_id == user_id && &r.customer_id == customer_id)
            .count() as i64)
    }

    async fn update_rental(&self, rental: &Rental) -> Result<()> {
        let mut state = self.state.write().await;
        match state.rentals.get_mut(&rental.id) {
            Some(existing) if existing.user_id == rental.user_id => {
                *existing = rental.clone();
                Ok(())
            }
            _ => Err(InventoryError::RentalNotFound {
                id: rental.id.to_string(),
            }),
        }
    }

    async fn delete_rental(&self, user_id: &UserId, id: &RentalId) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.rentals.get(id).is_some_and(|r| &r.user_id == user_id) {
            return Ok(false);
        }
        state.rentals.remove(id);
        state.payments.retain(|_, p| &p.rental_id != id);
        for booking in state.bookings.values_mut() {
            if booking.rental_id.as_ref() == Some(id) {
                booking.rental_id = None;
            }
        }
        Ok(true)
    }

    async fn create_rental_from_booking(&self, rental: &Rental, booking: &Booking) -> Result<()> {
        let mut state = self.state.write().await;
        if !state
            .bookings
            .get(&booking.id)
            .is_some_and(|b| b.user_id == booking.user_id)
        {
            return Err(InventoryError::BookingNotFound {
                id: booking.id.to_string(),
            });
        }
        state.rentals.insert(rental.id, rental.clone());
        state.bookings.insert(booking.id, booking.clone());
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create_booking(&self, booking: &Booking) -> Result<()> {
        self.state
            .write()
            .await
            .bookings
            .insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&self, user_id: &UserId, id: &BookingId) -> Result<Option<Booking>> {
        let state = self.state.read().await;
        Ok(state
            .bookings
            .get(id)
            .filter(|b| &b.user_id == user_id)
            .cloned())
    }

    async fn list_bookings(&self, user_id: &UserId, filter: &BookingFilter) -> Result<Vec<Booking>> {
        let state = self.state.read().await;
        let mut bookings: Vec<Booking> =
            owned_by(state.bookings.values(), user_id, |b| &b.user_id)
                .into_iter()
                .filter(|b| filter.matches(b))
                .collect();
        bookings.sort_by(|a, b| {
            a.period
                .start()
                .cmp(&b.period.start())
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(bookings)
    }

    async fn list_bookings_overlapping(
        &self,
        user_id: &UserId,
        range: &DateRange,
    ) -> Result<Vec<Booking>> {
        let filter = BookingFilter::default();
        Ok(self
            .list_bookings(user_id, &filter)
            .await?
            .into_iter()
            .filter(|b| b.period.overlaps(range))
            .collect())
    }

    async fn item_has_open_bookings(&self, user_id: &UserId, item_id: &ItemId) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.bookings.values().any(|b| {
            &b.user_id == user_id
                && b.status.holds_stock()
                && b.lines.iter().any(|l| &l.item_id == item_id)
        }))
    }

    async fn count_customer_bookings(
        &self,
        user_id: &UserId,
        customer_id: &CustomerId,
    ) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .bookings
            .values()
            .filter(|b| &b.user_id == user_id && &b.customer_id == customer_id)
            .count() as i64)
    }

    async fn update_booking(&self, booking: &Booking) -> Result<()> {
        let mut state = self.state.write().await;
        match state.bookings.get_mut(&booking.id) {
            Some(existing) if existing.user_id == booking.user_id => {
                *existing = booking.clone();
                Ok(())
            }
            _ => Err(InventoryError::BookingNotFound {
                id: booking.id.to_string(),
            }),
        }
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn create_payment(&self, payment: &Payment) -> Result<()> {
        self.state
            .write()
            .await
            .payments
            .insert(payment.id, payment.clone());
        Ok(())
    }

    async fn get_payment(&self, user_id: &UserId, id: &PaymentId) -> Result<Option<Payment>> {
        let state = self.state.read().await;
        Ok(state
            .payments
            .get(id)
            .filter(|p| &p.user_id == user_id)
            .cloned())
    }

    async fn list_payments_for_rentals(
        &self,
        user_id: &UserId,
        rental_ids: &[RentalId],
    ) -> Result<Vec<Payment>> {
        let state = self.state.read().await;
        let mut payments: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| &p.user_id == user_id && rental_ids.contains(&p.rental_id))
            .cloned()
            .collect();
        payments.sort_by(|a, b| a.paid_at.cmp(&b.paid_at).then(a.created_at.cmp(&b.created_at)));
        Ok(payments)
    }

    async fn delete_payment(&self, user_id: &UserId, id: &PaymentId) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.payments.get(id).is_some_and(|p| &p.user_id == user_id) {
            state.payments.remove(id);
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl SubscriptionRepository for MemoryStore {
    async fn get_subscription(&self, user_id: &UserId) -> Result<Option<Subscription>> {
        Ok(self.state.read().await.subscriptions.get(user_id).cloned())
    }

    async fn find_by_processor_customer(&self, customer_id: &str) -> Result<Option<Subscription>> {
        let state = self.state.read().await;
        Ok(state
            .subscriptions
            .values()
            .find(|s| s.processor_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()> {
        self.state
            .write()
            .await
            .subscriptions
            .insert(subscription.user_id.clone(), subscription.clone());
        Ok(())
    }
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn upsert_events(&self, events: &[ScrapedEvent]) -> Result<u64> {
        let mut state = self.state.write().await;
        for event in events {
            let key = (event.source.clone(), event.external_id.clone());
            let mut stored = event.clone();
            if let Some(existing) = state.events.get(&key) {
                stored.id = existing.id;
            }
            state.events.insert(key, stored);
        }
        Ok(events.len() as u64)
    }

    async fn list_events(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ScrapedEvent>> {
        let state = self.state.read().await;
        let mut events: Vec<ScrapedEvent> = state
            .events
            .values()
            .filter(|e| e.starts_at < until && e.finishes_at() >= from)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then(a.title.cmp(&b.title)));
        Ok(events)
    }

    async fn prune_events(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.write().await;
        let before = state.events.len();
        state.events.retain(|_, e| e.finishes_at() >= cutoff);
        Ok((before - state.events.len()) as u64)
    }
}
