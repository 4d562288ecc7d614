use crate::domain::availability::ItemAvailability;
use crate::domain::items::{Item, ItemFilter, ItemUpdate, NewItem};
use crate::domain::types::{DateRange, ItemId, UserId};
use crate::error::{InventoryError, Result};
use crate::services::availability::AvailabilityChecker;
use crate::services::subscriptions::SubscriptionService;
use crate::services::InventorySettings;
use crate::storage::Repositories;
use tracing::info;

#[derive(Clone)]
pub struct ItemService {
    repos: Repositories,
    availability: AvailabilityChecker,
    subscriptions: SubscriptionService,
}

impl ItemService {
    pub fn new(
        repos: Repositories,
        settings: InventorySettings,
        subscriptions: SubscriptionService,
    ) -> Self {
        Self {
            availability: AvailabilityChecker::new(repos.clone(), settings),
            repos,
            subscriptions,
        }
    }

    pub async fn create(&self, user_id: &UserId, new: NewItem) -> Result<Item> {
        let limits = self.subscriptions.limits(user_id).await?;
        let owned = self.repos.items.count_items(user_id).await?;
        limits.check_items(owned)?;

        let item = Item::create(user_id.clone(), new)?;
        self.repos.items.create_item(&item).await?;

        info!(user_id = %user_id, item_id = %item.id, "Created item {}", item.name);
        Ok(item)
    }

    pub async fn get(&self, user_id: &UserId, id: &ItemId) -> Result<Item> {
        self.repos
            .items
            .get_item(user_id, id)
            .await?
            .ok_or_else(|| InventoryError::ItemNotFound { id: id.to_string() })
    }

    pub async fn list(&self, user_id: &UserId, filter: &ItemFilter) -> Result<Vec<Item>> {
        self.repos.items.list_items(user_id, filter).await
    }

    /// Lowering stock below what is already committed is allowed; later checks see the shortfall
    pub async fn update(&self, user_id: &UserId, id: &ItemId, update: ItemUpdate) -> Result<Item> {
        let mut item = self.get(user_id, id).await?;
        item.apply(update)?;
        self.repos.items.update_item(&item).await?;
        Ok(item)
    }

    pub async fn delete(&self, user_id: &UserId, id: &ItemId) -> Result<()> {
        self.get(user_id, id).await?;

        if self.repos.rentals.item_has_open_rentals(user_id, id).await?
            || self.repos.bookings.item_has_open_bookings(user_id, id).await?
        {
            return Err(InventoryError::Conflict {
                reason: format!("item {id} is part of an open rental or booking"),
            });
        }

        if !self.repos.items.delete_item(user_id, id).await? {
            return Err(InventoryError::ItemNotFound { id: id.to_string() });
        }
        info!(user_id = %user_id, item_id = %id, "Deleted item");
        Ok(())
    }

    pub async fn availability(
        &self,
        user_id: &UserId,
        id: &ItemId,
        range: &DateRange,
    ) -> Result<ItemAvailability> {
        self.availability.item_availability(user_id, id, range).await
    }

    pub async fn availability_all(
        &self,
        user_id: &UserId,
        range: &DateRange,
    ) -> Result<Vec<ItemAvailability>> {
        self.availability.all_availability(user_id, range).await
    }
}
