use crate::{
    api::{extractors::RequestTimezone, middleware::AuthContext, types::RangeQuery},
    error::Result,
    server::AppState,
    services::event_scraper::ScrapeReport,
};
use axum::{
    extract::{Query, State},
    Json,
};
use rentory_inventory::domain::ScrapedEvent;
use tracing::info;

#[utoipa::path(
    get,
    path = "/api/v1/events",
    params(RangeQuery),
    responses((status = 200, description = "Events touching the local range", body = [ScrapedEvent])),
    security(("bearer_auth" = [])),
    tag = "events",
)]
pub async fn list_events(
    State(state): State<AppState>,
    _auth: AuthContext,
    RequestTimezone(tz): RequestTimezone,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<ScrapedEvent>>> {
    let range = query.resolve(tz)?;
    Ok(Json(state.services.events.list(&range, tz).await?))
}

/// Run every configured source now
#[utoipa::path(
    post,
    path = "/api/v1/events/scrape",
    responses(
        (status = 200, body = ScrapeReport),
        (status = 409, description = "A run is already in progress", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "events",
)]
pub async fn trigger_scrape(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ScrapeReport>> {
    info!(user_id = %auth.user_id, "Manual event scrape requested");
    Ok(Json(state.scraper.run_once().await?))
}
