//! Subscription, checkout, portal and processor webhook handlers

use crate::{
    api::{middleware::AuthContext, types::WebhookAck},
    error::{ApiError, Result},
    server::AppState,
    services::payment_processor::{
        verify_signature, PaymentProcessor, ProcessorEvent, SessionUrl, SIGNATURE_HEADER,
    },
};
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use rentory_inventory::services::SubscriptionOverview;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

fn processor(state: &AppState) -> Result<Arc<dyn PaymentProcessor>> {
    state
        .processor
        .clone()
        .ok_or_else(|| ApiError::ServiceUnavailable {
            message: "billing is disabled".to_string(),
        })
}

#[utoipa::path(
    get,
    path = "/api/v1/billing/subscription",
    responses((status = 200, description = "Plan, limits and usage", body = SubscriptionOverview)),
    security(("bearer_auth" = [])),
    tag = "billing",
)]
pub async fn get_subscription(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<SubscriptionOverview>> {
    Ok(Json(
        state
            .services
            .subscriptions
            .overview(&auth.user_id)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/billing/checkout",
    responses(
        (status = 200, description = "Hosted checkout page", body = SessionUrl),
        (status = 503, description = "Billing disabled", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "billing",
)]
pub async fn create_checkout(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<SessionUrl>> {
    let processor = processor(&state)?;
    let customer = state
        .services
        .subscriptions
        .processor_customer(&auth.user_id)
        .await?;
    let session = processor
        .create_checkout_session(&auth.user_id, customer.as_deref())
        .await?;
    Ok(Json(session))
}

#[utoipa::path(
    post,
    path = "/api/v1/billing/portal",
    responses(
        (status = 200, description = "Hosted billing portal", body = SessionUrl),
        (status = 404, description = "No processor customer yet", body = crate::error::ErrorResponse),
        (status = 503, description = "Billing disabled", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "billing",
)]
pub async fn create_portal(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<SessionUrl>> {
    let processor = processor(&state)?;
    let customer = state
        .services
        .subscriptions
        .processor_customer(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "billing customer".to_string(),
        })?;
    Ok(Json(processor.create_portal_session(&customer).await?))
}

/// Signed notifications from the payment processor
#[utoipa::path(
    post,
    path = "/api/v1/billing/webhook",
    request_body(content = String, description = "Raw processor event", content_type = "application/json"),
    responses(
        (status = 200, body = WebhookAck),
        (status = 400, description = "Bad signature or payload", body = crate::error::ErrorResponse),
    ),
    tag = "billing",
)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let billing = &state.config.billing;
    if !billing.enabled {
        return Err(ApiError::ServiceUnavailable {
            message: "billing is disabled".to_string(),
        });
    }

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest {
            message: format!("missing {SIGNATURE_HEADER} header"),
        })?;

    verify_signature(
        &body,
        signature,
        &billing.webhook_secret,
        Duration::from_secs(billing.webhook_tolerance_secs),
        chrono::Utc::now(),
    )?;

    let event = ProcessorEvent::parse(&body)?;
    let subscriptions = &state.services.subscriptions;

    let event_type = match event {
        ProcessorEvent::CheckoutCompleted {
            user_id,
            customer_id,
            subscription_id,
        } => {
            subscriptions
                .complete_checkout(&user_id, &customer_id, subscription_id)
                .await?;
            "checkout.session.completed".to_string()
        }
        ProcessorEvent::SubscriptionChanged {
            event_type,
            customer_id,
            subscription_id,
            status,
            current_period_end,
        } => {
            subscriptions
                .sync_from_processor(&customer_id, &subscription_id, status, current_period_end)
                .await?;
            event_type
        }
        ProcessorEvent::SubscriptionDeleted { customer_id } => {
            subscriptions.cancel_from_processor(&customer_id).await?;
            "customer.subscription.deleted".to_string()
        }
        ProcessorEvent::Ignored { event_type } => {
            debug!("Ignoring processor event {}", event_type);
            event_type
        }
    };

    info!("Processed processor webhook {}", event_type);
    Ok(Json(WebhookAck {
        received: true,
        event_type,
    }))
}
