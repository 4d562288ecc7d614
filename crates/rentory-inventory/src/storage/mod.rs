use sqlx::{Postgres, Transaction};
use std::sync::Arc;

pub mod bookings;
pub mod customers;
pub mod events;
pub mod items;
pub mod locks;
pub mod memory;
pub mod payments;
pub mod pool;
pub mod rentals;
pub mod subscriptions;

pub type PgTx<'a> = Transaction<'a, Postgres>;

pub use bookings::{BookingRepository, SqlBookingRepository};
pub use customers::{CustomerRepository, SqlCustomerRepository};
pub use events::{EventRepository, SqlEventRepository};
pub use items::{ItemRepository, SqlItemRepository};
pub use locks::{AccountGuard, AccountLock, LocalAccountLock, PgAccountLock};
pub use memory::MemoryStore;
pub use payments::{PaymentRepository, SqlPaymentRepository};
pub use pool::{Database, DatabaseConfig};
pub use rentals::{RentalRepository, SqlRentalRepository};
pub use subscriptions::{SqlSubscriptionRepository, SubscriptionRepository};

/// One handle per repository, shared by the services
#[derive(Clone)]
pub struct Repositories {
    pub items: Arc<dyn ItemRepository>,
    pub customers: Arc<dyn CustomerRepository>,
    pub rentals: Arc<dyn RentalRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub events: Arc<dyn EventRepository>,
    /// Serialises check-then-write sequences per account
    pub accounts: Arc<dyn AccountLock>,
}

impl Repositories {
    pub fn postgres(db: &Database) -> Self {
        Self {
            items: Arc::new(SqlItemRepository::new(db.clone())),
            customers: Arc::new(SqlCustomerRepository::new(db.clone())),
            rentals: Arc::new(SqlRentalRepository::new(db.clone())),
            bookings: Arc::new(SqlBookingRepository::new(db.clone())),
            payments: Arc::new(SqlPaymentRepository::new(db.clone())),
            subscriptions: Arc::new(SqlSubscriptionRepository::new(db.clone())),
            events: Arc::new(SqlEventRepository::new(db.clone())),
            accounts: Arc::new(PgAccountLock::new(db.clone())),
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            items: store.clone(),
            customers: store.clone(),
            rentals: store.clone(),
            bookings: store.clone(),
            payments: store.clone(),
            subscriptions: store.clone(),
            events: store,
            accounts: Arc::new(LocalAccountLock::new()),
        }
    }
}
