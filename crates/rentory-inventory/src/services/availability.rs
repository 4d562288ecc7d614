use crate::domain::availability::{
    availability_for, collect_commitments, ensure_available, Commitment, CommitmentSource,
    ItemAvailability,
};
use crate::domain::items::{Item, ItemFilter};
use crate::domain::types::{DateRange, ItemId, LineItem, UserId};
use crate::error::{InventoryError, Result};
use crate::services::InventorySettings;
use crate::storage::Repositories;
use tracing::debug;

/// Stock checks against the rentals and bookings already on record
#[derive(Clone)]
pub struct AvailabilityChecker {
    repos: Repositories,
    settings: InventorySettings,
}

impl AvailabilityChecker {
    pub fn new(repos: Repositories, settings: InventorySettings) -> Self {
        Self { repos, settings }
    }

    pub fn validate_period(&self, period: &DateRange) -> Result<()> {
        if period.days() > self.settings.max_period_days {
            return Err(InventoryError::validation(
                "end_date",
                format!(
                    "period of {} days exceeds the maximum of {} days",
                    period.days(),
                    self.settings.max_period_days
                ),
            ));
        }
        Ok(())
    }

    pub async fn commitments(
        &self,
        user_id: &UserId,
        range: &DateRange,
        exclude: Option<CommitmentSource>,
    ) -> Result<Vec<Commitment>> {
        let rentals = self.repos.rentals.list_rentals_overlapping(user_id, range).await?;
        let bookings = self
            .repos
            .bookings
            .list_bookings_overlapping(user_id, range)
            .await?;
        Ok(collect_commitments(&rentals, &bookings, exclude))
    }

    /// Verify `lines` fit in stock over `period` and return the items they name.
    ///
    /// `lines` must already be merged with `normalize_lines`.
    pub async fn check(
        &self,
        user_id: &UserId,
        lines: &[LineItem],
        period: &DateRange,
        exclude: Option<CommitmentSource>,
    ) -> Result<Vec<Item>> {
        self.validate_period(period)?;

        let ids: Vec<ItemId> = lines.iter().map(|l| l.item_id).collect();
        let items = self.repos.items.get_items(user_id, &ids).await?;
        if let Some(missing) = ids.iter().find(|id| !items.iter().any(|i| &i.id == *id)) {
            return Err(InventoryError::ItemNotFound {
                id: missing.to_string(),
            });
        }

        let commitments = self.commitments(user_id, period, exclude).await?;
        ensure_available(&items, lines, period, &commitments)?;

        debug!(
            user_id = %user_id,
            period = %period,
            lines = lines.len(),
            "Availability check passed"
        );
        Ok(items)
    }

    pub async fn item_availability(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        range: &DateRange,
    ) -> Result<ItemAvailability> {
        self.validate_period(range)?;
        let item = self
            .repos
            .items
            .get_item(user_id, item_id)
            .await?
            .ok_or_else(|| InventoryError::ItemNotFound {
                id: item_id.to_string(),
            })?;
        let commitments = self.commitments(user_id, range, None).await?;
        Ok(availability_for(&item, range, &commitments))
    }

    pub async fn all_availability(
        &self,
        user_id: &UserId,
        range: &DateRange,
    ) -> Result<Vec<ItemAvailability>> {
        self.validate_period(range)?;
        let items = self
            .repos
            .items
            .list_items(user_id, &ItemFilter::default())
            .await?;
        let commitments = self.commitments(user_id, range, None).await?;
        Ok(items
            .iter()
            .map(|item| availability_for(item, range, &commitments))
            .collect())
    }
}
