use crate::domain::types::UserId;
use crate::error::{InventoryError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::Free => write!(f, "free"),
            Plan::Pro => write!(f, "pro"),
        }
    }
}

impl FromStr for Plan {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "free" => Ok(Plan::Free),
            "pro" => Ok(Plan::Pro),
            other => Err(InventoryError::validation(
                "plan",
                format!("unknown plan '{other}'"),
            )),
        }
    }
}

/// Subscription state as reported by the payment processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Trialing,
    PastDue,
    Canceled,
    Incomplete,
}

impl SubscriptionStatus {
    /// Map a processor status string; unknown values count as incomplete
    pub fn from_processor(status: &str) -> Self {
        match status {
            "active" => SubscriptionStatus::Active,
            "trialing" => SubscriptionStatus::Trialing,
            "past_due" | "unpaid" => SubscriptionStatus::PastDue,
            "canceled" | "incomplete_expired" => SubscriptionStatus::Canceled,
            _ => SubscriptionStatus::Incomplete,
        }
    }

    pub fn grants_access(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing
        )
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Incomplete => "incomplete",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for SubscriptionStatus {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "trialing" => Ok(SubscriptionStatus::Trialing),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            "incomplete" => Ok(SubscriptionStatus::Incomplete),
            other => Err(InventoryError::validation(
                "status",
                format!("unknown subscription status '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Subscription {
    pub user_id: UserId,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub processor_customer_id: Option<String>,
    pub processor_subscription_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Record used when the user never subscribed
    pub fn free(user_id: UserId) -> Self {
        Self {
            user_id,
            plan: Plan::Free,
            status: SubscriptionStatus::Active,
            processor_customer_id: None,
            processor_subscription_id: None,
            current_period_end: None,
            updated_at: Utc::now(),
        }
    }

    pub fn effective_plan(&self, now: DateTime<Utc>) -> Plan {
        if self.plan != Plan::Pro || !self.status.grants_access() {
            return Plan::Free;
        }
        match self.current_period_end {
            Some(end) if end <= now => Plan::Free,
            _ => Plan::Pro,
        }
    }

    pub fn activate(
        &mut self,
        customer_id: impl Into<String>,
        subscription_id: Option<String>,
    ) {
        self.plan = Plan::Pro;
        self.status = SubscriptionStatus::Active;
        self.processor_customer_id = Some(customer_id.into());
        if subscription_id.is_some() {
            self.processor_subscription_id = subscription_id;
        }
        self.updated_at = Utc::now();
    }

    pub fn sync(
        &mut self,
        subscription_id: impl Into<String>,
        status: SubscriptionStatus,
        current_period_end: Option<DateTime<Utc>>,
    ) {
        self.plan = Plan::Pro;
        self.processor_subscription_id = Some(subscription_id.into());
        self.status = status;
        self.current_period_end = current_period_end;
        self.updated_at = Utc::now();
    }

    pub fn cancel(&mut self) {
        self.plan = Plan::Free;
        self.status = SubscriptionStatus::Canceled;
        self.updated_at = Utc::now();
    }
}

/// Caps applied to a plan; `None` means unlimited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PlanLimits {
    pub max_items: Option<i64>,
}

impl PlanLimits {
    pub fn for_plan(plan: Plan, free_item_limit: i64) -> Self {
        match plan {
            Plan::Free => Self {
                max_items: Some(free_item_limit),
            },
            Plan::Pro => Self { max_items: None },
        }
    }

    pub fn check_items(&self, current: i64) -> Result<()> {
        match self.max_items {
            Some(limit) if current >= limit => Err(InventoryError::PlanLimitExceeded {
                resource: "items".to_string(),
                limit,
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_missing_subscription_is_free() {
        let sub = Subscription::free(UserId::new("u"));
        assert_eq!(sub.effective_plan(Utc::now()), Plan::Free);
    }

    #[test]
    fn test_effective_plan_requires_access_and_open_period() {
        let now = Utc::now();
        let mut sub = Subscription::free(UserId::new("u"));
        sub.activate("cus_123", Some("sub_123".to_string()));
        assert_eq!(sub.effective_plan(now), Plan::Pro);

        sub.sync("sub_123", SubscriptionStatus::PastDue, Some(now + Duration::days(3)));
        assert_eq!(sub.effective_plan(now), Plan::Free);

        sub.sync("sub_123", SubscriptionStatus::Trialing, Some(now + Duration::days(3)));
        assert_eq!(sub.effective_plan(now), Plan::Pro);

        sub.sync("sub_123", SubscriptionStatus::Active, Some(now - Duration::seconds(1)));
        assert_eq!(sub.effective_plan(now), Plan::Free);

        sub.cancel();
        assert_eq!(sub.effective_plan(now), Plan::Free);
        assert_eq!(sub.processor_customer_id.as_deref(), Some("cus_123"));
    }

    #[test]
    fn test_processor_status_mapping() {
        assert_eq!(
            SubscriptionStatus::from_processor("past_due"),
            SubscriptionStatus::PastDue
        );
        assert_eq!(
            SubscriptionStatus::from_processor("incomplete_expired"),
            SubscriptionStatus::Canceled
        );
        assert_eq!(
            SubscriptionStatus::from_processor("paused"),
            SubscriptionStatus::Incomplete
        );
    }

    #[test]
    fn test_item_limit() {
        let free = PlanLimits::for_plan(Plan::Free, 2);
        assert!(free.check_items(1).is_ok());
        assert!(matches!(
            free.check_items(2),
            Err(InventoryError::PlanLimitExceeded { limit: 2, .. })
        ));
        assert!(PlanLimits::for_plan(Plan::Pro, 2).check_items(10_000).is_ok());
    }
}
