pub mod availability;
pub mod bookings;
pub mod calendar;
pub mod customers;
pub mod dashboard;
pub mod events;
pub mod items;
pub mod rentals;
pub mod subscriptions;

pub use availability::AvailabilityChecker;
pub use bookings::BookingService;
pub use calendar::CalendarService;
pub use customers::CustomerService;
pub use dashboard::DashboardService;
pub use events::EventService;
pub use items::ItemService;
pub use rentals::RentalService;
pub use subscriptions::{SubscriptionOverview, SubscriptionService};

use crate::domain::types::UserId;
use crate::error::Result;
use crate::storage::Repositories;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::warn;

/// Run `op` while holding the account's write lock
pub(crate) async fn with_account_lock<T, F, Fut>(
    repos: &Repositories,
    user_id: &UserId,
    op: F,
) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let guard = repos.accounts.lock_account(user_id).await?;
    let result = op().await;
    if let Err(e) = guard.release().await {
        warn!(user_id = %user_id, "Failed to release account lock: {}", e);
    }
    result
}

/// Tunables shared by the services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySettings {
    /// Longest rental or booking period, in days
    pub max_period_days: i64,
    /// Items a user on the free plan may own
    pub free_item_limit: i64,
    /// Longest calendar window, in days
    pub calendar_max_range_days: i64,
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            max_period_days: 366,
            free_item_limit: 25,
            calendar_max_range_days: 93,
        }
    }
}

/// Every service wired to the same repositories
#[derive(Clone)]
pub struct Services {
    pub items: ItemService,
    pub customers: CustomerService,
    pub rentals: RentalService,
    pub bookings: BookingService,
    pub calendar: CalendarService,
    pub dashboard: DashboardService,
    pub subscriptions: SubscriptionService,
    pub events: EventService,
}

impl Services {
    pub fn new(repos: Repositories, settings: InventorySettings) -> Self {
        let subscriptions = SubscriptionService::new(repos.clone(), settings);
        Self {
            items: ItemService::new(repos.clone(), settings, subscriptions.clone()),
            customers: CustomerService::new(repos.clone()),
            rentals: RentalService::new(repos.clone(), settings),
            bookings: BookingService::new(repos.clone(), settings),
            calendar: CalendarService::new(repos.clone(), settings),
            dashboard: DashboardService::new(repos.clone()),
            events: EventService::new(repos),
            subscriptions,
        }
    }
}
