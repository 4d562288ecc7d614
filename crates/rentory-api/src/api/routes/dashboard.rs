use crate::{
    api::{extractors::RequestTimezone, middleware::AuthContext},
    error::Result,
    server::AppState,
};
use axum::{extract::State, Json};
use rentory_inventory::domain::{calendar::today, DashboardSummary};

#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses((status = 200, body = DashboardSummary)),
    security(("bearer_auth" = [])),
    tag = "dashboard",
)]
pub async fn get_dashboard(
    State(state): State<AppState>,
    auth: AuthContext,
    RequestTimezone(tz): RequestTimezone,
) -> Result<Json<DashboardSummary>> {
    Ok(Json(
        state
            .services
            .dashboard
            .summary(&auth.user_id, today(tz))
            .await?,
    ))
}
