use crate::domain::subscriptions::{Plan, PlanLimits, Subscription, SubscriptionStatus};
use crate::domain::types::UserId;
use crate::error::Result;
use crate::services::InventorySettings;
use crate::storage::Repositories;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PlanUsage {
    pub items: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SubscriptionOverview {
    pub subscription: Subscription,
    pub effective_plan: Plan,
    pub limits: PlanLimits,
    pub usage: PlanUsage,
}

#[derive(Clone)]
pub struct SubscriptionService {
    repos: Repositories,
    settings: InventorySettings,
}

impl SubscriptionService {
    pub fn new(repos: Repositories, settings: InventorySettings) -> Self {
        Self { repos, settings }
    }

    /// Stored subscription, or the implicit free one
    pub async fn current(&self, user_id: &UserId) -> Result<Subscription> {
        Ok(self
            .repos
            .subscriptions
            .get_subscription(user_id)
            .await?
            .unwrap_or_else(|| Subscription::free(user_id.clone())))
    }

    pub async fn limits(&self, user_id: &UserId) -> Result<PlanLimits> {
        let plan = self.current(user_id).await?.effective_plan(Utc::now());
        Ok(PlanLimits::for_plan(plan, self.settings.free_item_limit))
    }

    pub async fn overview(&self, user_id: &UserId) -> Result<SubscriptionOverview> {
        let subscription = self.current(user_id).await?;
        let effective_plan = subscription.effective_plan(Utc::now());
        let items = self.repos.items.count_items(user_id).await?;
        Ok(SubscriptionOverview {
            limits: PlanLimits::for_plan(effective_plan, self.settings.free_item_limit),
            effective_plan,
            subscription,
            usage: PlanUsage { items },
        })
    }

    /// Processor customer id used to open the billing portal
    pub async fn processor_customer(&self, user_id: &UserId) -> Result<Option<String>> {
        Ok(self.current(user_id).await?.processor_customer_id)
    }

    /// A checkout finished: the user now has a processor customer and a pro plan
    pub async fn complete_checkout(
        &self,
        user_id: &UserId,
        customer_id: &str,
        subscription_id: Option<String>,
    ) -> Result<Subscription> {
        let mut subscription = self.current(user_id).await?;
        subscription.activate(customer_id, subscription_id);
        self.repos
            .subscriptions
            .upsert_subscription(&subscription)
            .await?;

        info!(user_id = %user_id, customer_id, "Subscription activated from checkout");
        Ok(subscription)
    }

    /// Apply a processor subscription update; unknown customers are ignored
    pub async fn sync_from_processor(
        &self,
        customer_id: &str,
        subscription_id: &str,
        status: SubscriptionStatus,
        current_period_end: Option<DateTime<Utc>>,
    ) -> Result<Option<Subscription>> {
        let Some(mut subscription) = self
            .repos
            .subscriptions
            .find_by_processor_customer(customer_id)
            .await?
        else {
            warn!(customer_id, "Subscription update for unknown processor customer");
            return Ok(None);
        };

        subscription.sync(subscription_id, status, current_period_end);
        self.repos
            .subscriptions
            .upsert_subscription(&subscription)
            .await?;

        info!(
            user_id = %subscription.user_id,
            status = %status,
            "Subscription synced from processor"
        );
        Ok(Some(subscription))
    }

    pub async fn cancel_from_processor(&self, customer_id: &str) -> Result<Option<Subscription>> {
        let Some(mut subscription) = self
            .repos
            .subscriptions
            .find_by_processor_customer(customer_id)
            .await?
        else {
            warn!(customer_id, "Cancellation for unknown processor customer");
            return Ok(None);
        };

        subscription.cancel();
        self.repos
            .subscriptions
            .upsert_subscription(&subscription)
            .await?;

        info!(user_id = %subscription.user_id, "Subscription cancelled");
        Ok(Some(subscription))
    }
}
