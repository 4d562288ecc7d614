use crate::{
    api::{extractors::RequestTimezone, middleware::AuthContext, types::BookingListQuery},
    error::Result,
    server::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rentory_inventory::domain::{
    Booking, BookingId, BookingUpdate, ConvertBooking, NewBooking, RentalView,
};

#[utoipa::path(
    get,
    path = "/api/v1/bookings",
    params(BookingListQuery),
    responses((status = 200, body = [Booking])),
    security(("bearer_auth" = [])),
    tag = "bookings",
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    auth: AuthContext,
    RequestTimezone(tz): RequestTimezone,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Vec<Booking>>> {
    let filter = query.to_filter(tz)?;
    Ok(Json(
        state.services.bookings.list(&auth.user_id, &filter).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    request_body = NewBooking,
    responses(
        (status = 201, body = Booking),
        (status = 409, description = "Not enough stock for the period", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "bookings",
)]
pub async fn create_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    RequestTimezone(tz): RequestTimezone,
    Json(new): Json<NewBooking>,
) -> Result<(StatusCode, Json<Booking>)> {
    let booking = state
        .services
        .bookings
        .create(&auth.user_id, new, tz)
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{id}",
    params(("id" = uuid::Uuid, Path, description = "Booking id")),
    responses(
        (status = 200, body = Booking),
        (status = 404, body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "bookings",
)]
pub async fn get_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<BookingId>,
) -> Result<Json<Booking>> {
    Ok(Json(state.services.bookings.get(&auth.user_id, &id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/bookings/{id}",
    params(("id" = uuid::Uuid, Path, description = "Booking id")),
    request_body = BookingUpdate,
    responses((status = 200, body = Booking)),
    security(("bearer_auth" = [])),
    tag = "bookings",
)]
pub async fn update_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    RequestTimezone(tz): RequestTimezone,
    Path(id): Path<BookingId>,
    Json(update): Json<BookingUpdate>,
) -> Result<Json<Booking>> {
    Ok(Json(
        state
            .services
            .bookings
            .update(&auth.user_id, &id, update, tz)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/confirm",
    params(("id" = uuid::Uuid, Path, description = "Booking id")),
    responses((status = 200, body = Booking)),
    security(("bearer_auth" = [])),
    tag = "bookings",
)]
pub async fn confirm_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<BookingId>,
) -> Result<Json<Booking>> {
    Ok(Json(
        state.services.bookings.confirm(&auth.user_id, &id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/cancel",
    params(("id" = uuid::Uuid, Path, description = "Booking id")),
    responses((status = 200, body = Booking)),
    security(("bearer_auth" = [])),
    tag = "bookings",
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<BookingId>,
) -> Result<Json<Booking>> {
    Ok(Json(
        state.services.bookings.cancel(&auth.user_id, &id).await?,
    ))
}

/// Turn the booking into a reserved rental
#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/convert",
    params(("id" = uuid::Uuid, Path, description = "Booking id")),
    request_body = ConvertBooking,
    responses(
        (status = 201, body = RentalView),
        (status = 409, body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "bookings",
)]
pub async fn convert_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<BookingId>,
    body: Option<Json<ConvertBooking>>,
) -> Result<(StatusCode, Json<RentalView>)> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let rental = state
        .services
        .bookings
        .convert(&auth.user_id, &id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(rental)))
}
