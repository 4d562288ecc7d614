//! Rental, balance and payment handlers

use crate::{
    api::{
        extractors::RequestTimezone,
        middleware::AuthContext,
        types::{RentalListQuery, StatusChange},
    },
    error::Result,
    server::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rentory_inventory::domain::{
    calendar::today, NewPayment, NewRental, Payment, PaymentId, RentalBalance, RentalId,
    RentalUpdate, RentalView,
};
use tracing::debug;

#[utoipa::path(
    get,
    path = "/api/v1/rentals",
    params(RentalListQuery),
    responses((status = 200, description = "Rentals with balances", body = [RentalView])),
    security(("bearer_auth" = [])),
    tag = "rentals",
)]
pub async fn list_rentals(
    State(state): State<AppState>,
    auth: AuthContext,
    RequestTimezone(tz): RequestTimezone,
    Query(query): Query<RentalListQuery>,
) -> Result<Json<Vec<RentalView>>> {
    let filter = query.to_filter(today(tz))?;
    debug!("Listing rentals with {:?}", filter);
    Ok(Json(
        state.services.rentals.list(&auth.user_id, &filter).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/rentals",
    request_body = NewRental,
    responses(
        (status = 201, body = RentalView),
        (status = 400, description = "Invalid dates or lines", body = crate::error::ErrorResponse),
        (status = 409, description = "Not enough stock for the period", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "rentals",
)]
pub async fn create_rental(
    State(state): State<AppState>,
    auth: AuthContext,
    RequestTimezone(tz): RequestTimezone,
    Json(new): Json<NewRental>,
) -> Result<(StatusCode, Json<RentalView>)> {
    let view = state
        .services
        .rentals
        .create(&auth.user_id, new, tz)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/api/v1/rentals/{id}",
    params(("id" = uuid::Uuid, Path, description = "Rental id")),
    responses(
        (status = 200, body = RentalView),
        (status = 404, body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "rentals",
)]
pub async fn get_rental(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<RentalId>,
) -> Result<Json<RentalView>> {
    Ok(Json(state.services.rentals.get(&auth.user_id, &id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/rentals/{id}",
    params(("id" = uuid::Uuid, Path, description = "Rental id")),
    request_body = RentalUpdate,
    responses(
        (status = 200, body = RentalView),
        (status = 409, body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "rentals",
)]
pub async fn update_rental(
    State(state): State<AppState>,
    auth: AuthContext,
    RequestTimezone(tz): RequestTimezone,
    Path(id): Path<RentalId>,
    Json(update): Json<RentalUpdate>,
) -> Result<Json<RentalView>> {
    Ok(Json(
        state
            .services
            .rentals
            .update(&auth.user_id, &id, update, tz)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/rentals/{id}",
    params(("id" = uuid::Uuid, Path, description = "Rental id")),
    responses((status = 204, description = "Rental and its payments deleted")),
    security(("bearer_auth" = [])),
    tag = "rentals",
)]
pub async fn delete_rental(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<RentalId>,
) -> Result<StatusCode> {
    state.services.rentals.delete(&auth.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/rentals/{id}/status",
    params(("id" = uuid::Uuid, Path, description = "Rental id")),
    request_body = StatusChange,
    responses(
        (status = 200, body = RentalView),
        (status = 409, description = "Transition not allowed", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "rentals",
)]
pub async fn change_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<RentalId>,
    Json(change): Json<StatusChange>,
) -> Result<Json<RentalView>> {
    Ok(Json(
        state
            .services
            .rentals
            .set_status(&auth.user_id, &id, change.status)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/rentals/{id}/balance",
    params(("id" = uuid::Uuid, Path, description = "Rental id")),
    responses((status = 200, body = RentalBalance)),
    security(("bearer_auth" = [])),
    tag = "rentals",
)]
pub async fn get_balance(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<RentalId>,
) -> Result<Json<RentalBalance>> {
    Ok(Json(
        state.services.rentals.balance(&auth.user_id, &id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/rentals/{id}/payments",
    params(("id" = uuid::Uuid, Path, description = "Rental id")),
    responses((status = 200, description = "Payments ordered by paid_at", body = [Payment])),
    security(("bearer_auth" = [])),
    tag = "payments",
)]
pub async fn list_payments(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<RentalId>,
) -> Result<Json<Vec<Payment>>> {
    Ok(Json(
        state
            .services
            .rentals
            .list_payments(&auth.user_id, &id)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/rentals/{id}/payments",
    params(("id" = uuid::Uuid, Path, description = "Rental id")),
    request_body = NewPayment,
    responses(
        (status = 201, body = Payment),
        (status = 409, description = "Rental is cancelled", body = crate::error::ErrorResponse),
        (status = 422, description = "Amount exceeds the remaining balance", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "payments",
)]
pub async fn record_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<RentalId>,
    Json(new): Json<NewPayment>,
) -> Result<(StatusCode, Json<Payment>)> {
    let payment = state
        .services
        .rentals
        .record_payment(&auth.user_id, &id, new)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/rentals/{id}/payments/{payment_id}",
    params(
        ("id" = uuid::Uuid, Path, description = "Rental id"),
        ("payment_id" = uuid::Uuid, Path, description = "Payment id"),
    ),
    responses((status = 204, description = "Payment deleted")),
    security(("bearer_auth" = [])),
    tag = "payments",
)]
pub async fn delete_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, payment_id)): Path<(RentalId, PaymentId)>,
) -> Result<StatusCode> {
    state
        .services
        .rentals
        .delete_payment(&auth.user_id, &id, &payment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
