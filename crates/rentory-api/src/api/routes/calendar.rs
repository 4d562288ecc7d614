use crate::{
    api::{extractors::RequestTimezone, middleware::AuthContext, types::CalendarQuery},
    error::Result,
    server::AppState,
};
use axum::{
    extract::{Query, State},
    Json,
};
use rentory_inventory::domain::CalendarView;

/// Rentals, bookings and events laid out per local day
#[utoipa::path(
    get,
    path = "/api/v1/calendar",
    params(CalendarQuery, ("tz" = Option<String>, Query, description = "IANA timezone")),
    responses(
        (status = 200, body = CalendarView),
        (status = 400, description = "Bad range or timezone", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "calendar",
)]
pub async fn get_calendar(
    State(state): State<AppState>,
    auth: AuthContext,
    RequestTimezone(tz): RequestTimezone,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarView>> {
    let range = query.resolve(tz)?;
    Ok(Json(
        state
            .services
            .calendar
            .view(&auth.user_id, &range, tz)
            .await?,
    ))
}
