//! Item catalogue and availability handlers

use crate::{
    api::{
        extractors::RequestTimezone,
        middleware::AuthContext,
        types::{ItemListQuery, RangeQuery},
    },
    error::Result,
    server::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rentory_inventory::domain::{Item, ItemAvailability, ItemId, ItemUpdate, NewItem};

#[utoipa::path(
    get,
    path = "/api/v1/items",
    params(ItemListQuery),
    responses((status = 200, description = "Items ordered by name", body = [Item])),
    security(("bearer_auth" = [])),
    tag = "items",
)]
pub async fn list_items(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ItemListQuery>,
) -> Result<Json<Vec<Item>>> {
    let items = state
        .services
        .items
        .list(&auth.user_id, &query.into())
        .await?;
    Ok(Json(items))
}

#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = NewItem,
    responses(
        (status = 201, description = "Item created", body = Item),
        (status = 400, description = "Invalid item", body = crate::error::ErrorResponse),
        (status = 402, description = "Plan item limit reached", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "items",
)]
pub async fn create_item(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(new): Json<NewItem>,
) -> Result<(StatusCode, Json<Item>)> {
    let item = state.services.items.create(&auth.user_id, new).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    params(("id" = uuid::Uuid, Path, description = "Item id")),
    responses(
        (status = 200, body = Item),
        (status = 404, body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "items",
)]
pub async fn get_item(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<ItemId>,
) -> Result<Json<Item>> {
    Ok(Json(state.services.items.get(&auth.user_id, &id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/items/{id}",
    params(("id" = uuid::Uuid, Path, description = "Item id")),
    request_body = ItemUpdate,
    responses(
        (status = 200, body = Item),
        (status = 404, body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "items",
)]
pub async fn update_item(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<ItemId>,
    Json(update): Json<ItemUpdate>,
) -> Result<Json<Item>> {
    Ok(Json(
        state
            .services
            .items
            .update(&auth.user_id, &id, update)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/items/{id}",
    params(("id" = uuid::Uuid, Path, description = "Item id")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 409, description = "Item is part of an open rental or booking", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "items",
)]
pub async fn delete_item(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<ItemId>,
) -> Result<StatusCode> {
    state.services.items.delete(&auth.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/items/{id}/availability",
    params(("id" = uuid::Uuid, Path, description = "Item id"), RangeQuery),
    responses((status = 200, body = ItemAvailability)),
    security(("bearer_auth" = [])),
    tag = "items",
)]
pub async fn item_availability(
    State(state): State<AppState>,
    auth: AuthContext,
    RequestTimezone(tz): RequestTimezone,
    Path(id): Path<ItemId>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<ItemAvailability>> {
    let range = query.resolve(tz)?;
    Ok(Json(
        state
            .services
            .items
            .availability(&auth.user_id, &id, &range)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/items/availability",
    params(RangeQuery),
    responses((status = 200, body = [ItemAvailability])),
    security(("bearer_auth" = [])),
    tag = "items",
)]
pub async fn all_availability(
    State(state): State<AppState>,
    auth: AuthContext,
    RequestTimezone(tz): RequestTimezone,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<ItemAvailability>>> {
    let range = query.resolve(tz)?;
    Ok(Json(
        state
            .services
            .items
            .availability_all(&auth.user_id, &range)
            .await?,
    ))
}
