//! Client for a Stripe-compatible payment processor
//!
//! Checkout and billing-portal sessions are created through the processor's
//! form-encoded REST API. Webhooks arrive signed with
//! `Stripe-Signature: t=<unix>,v1=<hex hmac-sha256 of "t.body">` and are
//! verified before being turned into [`ProcessorEvent`]s.

use crate::config::BillingConfig;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use rentory_inventory::domain::{SubscriptionStatus, UserId};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Processor returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid webhook signature: {reason}")]
    InvalidSignature { reason: String },

    #[error("Invalid webhook payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Malformed webhook event: {reason}")]
    MalformedEvent { reason: String },
}

impl ProcessorError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ProcessorError::Http(_) => true,
            ProcessorError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    fn signature(reason: impl Into<String>) -> Self {
        ProcessorError::InvalidSignature {
            reason: reason.into(),
        }
    }

    fn malformed(reason: impl Into<String>) -> Self {
        ProcessorError::MalformedEvent {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProcessorError>;

/// Hosted page the client is redirected to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SessionUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Outbound calls to the processor
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Subscription checkout for the pro plan
    async fn create_checkout_session(
        &self,
        user_id: &UserId,
        customer_id: Option<&str>,
    ) -> Result<SessionUrl>;

    /// Self-service portal for an existing processor customer
    async fn create_portal_session(&self, customer_id: &str) -> Result<SessionUrl>;
}

pub struct HttpPaymentProcessor {
    http: reqwest::Client,
    config: BillingConfig,
}

impl HttpPaymentProcessor {
    pub fn new(config: BillingConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn post_form(&self, path: &str, form: &[(&str, String)]) -> Result<SessionResponse> {
        let url = self.endpoint(path);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            warn!("Payment processor rejected {}: {} {}", path, status, message);
            return Err(ProcessorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl PaymentProcessor for HttpPaymentProcessor {
    async fn create_checkout_session(
        &self,
        user_id: &UserId,
        customer_id: Option<&str>,
    ) -> Result<SessionUrl> {
        let mut form = vec![
            ("mode", "subscription".to_string()),
            ("line_items[0][price]", self.config.price_id.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", self.config.success_url.clone()),
            ("cancel_url", self.config.cancel_url.clone()),
            ("client_reference_id", user_id.to_string()),
        ];
        if let Some(customer) = customer_id {
            form.push(("customer", customer.to_string()));
        }

        let session = self.post_form("/v1/checkout/sessions", &form).await?;
        let url = session
            .url
            .ok_or_else(|| ProcessorError::malformed("checkout session has no url"))?;

        info!(user_id = %user_id, session_id = %session.id, "Created checkout session");
        Ok(SessionUrl { url })
    }

    async fn create_portal_session(&self, customer_id: &str) -> Result<SessionUrl> {
        let form = [
            ("customer", customer_id.to_string()),
            ("return_url", self.config.portal_return_url.clone()),
        ];

        let session = self
            .post_form("/v1/billing_portal/sessions", &form)
            .await?;
        let url = session
            .url
            .ok_or_else(|| ProcessorError::malformed("portal session has no url"))?;

        info!(customer_id, session_id = %session.id, "Created billing portal session");
        Ok(SessionUrl { url })
    }
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String> {
    let mac = signing_mac(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn signing_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ProcessorError::signature(format!("unusable secret: {e}")))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Check a signature header against the payload.
///
/// The header may carry several `v1` signatures (secret rotation); any match
/// is accepted. Timestamps further than `tolerance` from `now` are rejected.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut timestamp: Option<i64> = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse()
                        .map_err(|_| ProcessorError::signature("timestamp is not a number"))?,
                )
            }
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| ProcessorError::signature("missing timestamp"))?;
    if signatures.is_empty() {
        return Err(ProcessorError::signature("no v1 signature"));
    }

    let skew = now.timestamp().abs_diff(timestamp);
    if skew > tolerance.as_secs() {
        return Err(ProcessorError::signature(format!(
            "timestamp outside tolerance ({skew}s)"
        )));
    }

    let mac = signing_mac(secret, timestamp, payload)?;
    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(ProcessorError::signature("signature mismatch"))
    }
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    client_reference_id: Option<String>,
    customer: Option<String>,
    subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionObject {
    id: String,
    customer: String,
    status: String,
    current_period_end: Option<i64>,
}

/// Webhook events the service acts on
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessorEvent {
    CheckoutCompleted {
        user_id: UserId,
        customer_id: String,
        subscription_id: Option<String>,
    },
    /// `customer.subscription.created` or `customer.subscription.updated`
    SubscriptionChanged {
        event_type: String,
        customer_id: String,
        subscription_id: String,
        status: SubscriptionStatus,
        current_period_end: Option<DateTime<Utc>>,
    },
    SubscriptionDeleted {
        customer_id: String,
    },
    Ignored {
        event_type: String,
    },
}

impl ProcessorEvent {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let envelope: WebhookEnvelope = serde_json::from_slice(payload)?;

        match envelope.event_type.as_str() {
            "checkout.session.completed" => {
                let session: CheckoutSessionObject = serde_json::from_value(envelope.data.object)?;
                let user_id = session
                    .client_reference_id
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| ProcessorError::malformed("checkout without client_reference_id"))?;
                let customer_id = session
                    .customer
                    .ok_or_else(|| ProcessorError::malformed("checkout without customer"))?;
                Ok(ProcessorEvent::CheckoutCompleted {
                    user_id: UserId::new(user_id),
                    customer_id,
                    subscription_id: session.subscription,
                })
            }
            "customer.subscription.created" | "customer.subscription.updated" => {
                let sub: SubscriptionObject = serde_json::from_value(envelope.data.object)?;
                let current_period_end = match sub.current_period_end {
                    Some(secs) => Some(Utc.timestamp_opt(secs, 0).single().ok_or_else(|| {
                        ProcessorError::malformed("current_period_end out of range")
                    })?),
                    None => None,
                };
                Ok(ProcessorEvent::SubscriptionChanged {
                    event_type: envelope.event_type.clone(),
                    customer_id: sub.customer,
                    subscription_id: sub.id,
                    status: SubscriptionStatus::from_processor(&sub.status),
                    current_period_end,
                })
            }
            "customer.subscription.deleted" => {
                let sub: SubscriptionObject = serde_json::from_value(envelope.data.object)?;
                Ok(ProcessorEvent::SubscriptionDeleted {
                    customer_id: sub.customer,
                })
            }
            other => Ok(ProcessorEvent::Ignored {
                event_type: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "whsec_test";

    fn header_for(payload: &[u8], timestamp: i64) -> String {
        format!(
            "t={},v1={}",
            timestamp,
            compute_signature(SECRET, timestamp, payload).unwrap()
        )
    }

    #[test]
    fn test_valid_signature_accepted() {
        let payload = br#"{"type":"ping"}"#;
        let now = Utc::now();
        let header = header_for(payload, now.timestamp());
        assert!(verify_signature(payload, &header, SECRET, Duration::from_secs(300), now).is_ok());
    }

    #[test]
    fn test_any_rotated_signature_matches() {
        let payload = br#"{"type":"ping"}"#;
        let now = Utc::now();
        let good = compute_signature(SECRET, now.timestamp(), payload).unwrap();
        let header = format!("t={},v1=deadbeef,v1={}", now.timestamp(), good);
        assert!(verify_signature(payload, &header, SECRET, Duration::from_secs(300), now).is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let now = Utc::now();
        let header = header_for(br#"{"amount":1}"#, now.timestamp());
        let result = verify_signature(
            br#"{"amount":2}"#,
            &header,
            SECRET,
            Duration::from_secs(300),
            now,
        );
        assert!(matches!(result, Err(ProcessorError::InvalidSignature { .. })));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = b"{}";
        let now = Utc::now();
        let header = header_for(payload, now.timestamp() - 301);
        let result = verify_signature(payload, &header, SECRET, Duration::from_secs(300), now);
        assert!(matches!(result, Err(ProcessorError::InvalidSignature { .. })));
    }

    #[test]
    fn test_header_without_signature_rejected() {
        let now = Utc::now();
        let header = format!("t={}", now.timestamp());
        assert!(verify_signature(b"{}", &header, SECRET, Duration::from_secs(300), now).is_err());
        assert!(verify_signature(b"{}", "v1=abc", SECRET, Duration::from_secs(300), now).is_err());
    }

    #[test]
    fn test_parse_checkout_completed() {
        let payload = json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "client_reference_id": "user-42",
                "customer": "cus_1",
                "subscription": "sub_1"
            }}
        })
        .to_string();

        let event = ProcessorEvent::parse(payload.as_bytes()).unwrap();
        assert_eq!(
            event,
            ProcessorEvent::CheckoutCompleted {
                user_id: UserId::new("user-42"),
                customer_id: "cus_1".to_string(),
                subscription_id: Some("sub_1".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_subscription_updated() {
        let payload = json!({
            "type": "customer.subscription.updated",
            "data": { "object": {
                "id": "sub_1",
                "customer": "cus_1",
                "status": "past_due",
                "current_period_end": 1_735_689_600
            }}
        })
        .to_string();

        match ProcessorEvent::parse(payload.as_bytes()).unwrap() {
            ProcessorEvent::SubscriptionChanged {
                status,
                current_period_end,
                ..
            } => {
                assert_eq!(status, SubscriptionStatus::PastDue);
                assert_eq!(
                    current_period_end.unwrap().to_rfc3339(),
                    "2025-01-01T00:00:00+00:00"
                );
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_subscription_created_keeps_its_type() {
        let payload = json!({
            "type": "customer.subscription.created",
            "data": { "object": {
                "id": "sub_2",
                "customer": "cus_2",
                "status": "trialing"
            }}
        })
        .to_string();

        assert_eq!(
            ProcessorEvent::parse(payload.as_bytes()).unwrap(),
            ProcessorEvent::SubscriptionChanged {
                event_type: "customer.subscription.created".to_string(),
                customer_id: "cus_2".to_string(),
                subscription_id: "sub_2".to_string(),
                status: SubscriptionStatus::Trialing,
                current_period_end: None,
            }
        );
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        let payload = json!({"type": "invoice.paid", "data": {"object": {}}}).to_string();
        assert_eq!(
            ProcessorEvent::parse(payload.as_bytes()).unwrap(),
            ProcessorEvent::Ignored {
                event_type: "invoice.paid".to_string()
            }
        );
    }

    #[test]
    fn test_checkout_without_user_is_malformed() {
        let payload = json!({
            "type": "checkout.session.completed",
            "data": { "object": { "customer": "cus_1" } }
        })
        .to_string();
        assert!(matches!(
            ProcessorEvent::parse(payload.as_bytes()),
            Err(ProcessorError::MalformedEvent { .. })
        ));
    }
}
