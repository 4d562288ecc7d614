//! Payment processor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Checkout, portal and webhooks are only served when enabled
    pub enabled: bool,

    /// Base URL of the processor REST API
    pub api_base: String,

    pub secret_key: String,

    /// Price of the pro plan at the processor
    pub price_id: String,

    pub success_url: String,

    pub cancel_url: String,

    pub portal_return_url: String,

    /// Secret used to sign webhook payloads
    pub webhook_secret: String,

    /// Maximum age of a signed webhook, in seconds
    pub webhook_tolerance_secs: u64,

    /// Items a free-plan user may own
    pub free_item_limit: i64,

    /// Timeout for processor API calls, in seconds
    pub request_timeout_secs: u64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: "https://api.stripe.com".to_string(),
            secret_key: String::new(),
            price_id: String::new(),
            success_url: "http://localhost:3000/billing?status=success".to_string(),
            cancel_url: "http://localhost:3000/billing?status=cancelled".to_string(),
            portal_return_url: "http://localhost:3000/billing".to_string(),
            webhook_secret: String::new(),
            webhook_tolerance_secs: 300,
            free_item_limit: 25,
            request_timeout_secs: 15,
        }
    }
}

impl BillingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
