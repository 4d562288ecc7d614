use crate::{
    api::{middleware::AuthContext, types::CustomerListQuery},
    error::Result,
    server::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rentory_inventory::domain::{Customer, CustomerId, CustomerUpdate, NewCustomer, RentalView};

#[utoipa::path(
    get,
    path = "/api/v1/customers",
    params(CustomerListQuery),
    responses((status = 200, body = [Customer])),
    security(("bearer_auth" = [])),
    tag = "customers",
)]
pub async fn list_customers(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<CustomerListQuery>,
) -> Result<Json<Vec<Customer>>> {
    Ok(Json(
        state
            .services
            .customers
            .list(&auth.user_id, query.search.as_deref())
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/customers",
    request_body = NewCustomer,
    responses(
        (status = 201, body = Customer),
        (status = 400, body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "customers",
)]
pub async fn create_customer(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(new): Json<NewCustomer>,
) -> Result<(StatusCode, Json<Customer>)> {
    let customer = state.services.customers.create(&auth.user_id, new).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    params(("id" = uuid::Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, body = Customer),
        (status = 404, body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "customers",
)]
pub async fn get_customer(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<CustomerId>,
) -> Result<Json<Customer>> {
    Ok(Json(state.services.customers.get(&auth.user_id, &id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/customers/{id}",
    params(("id" = uuid::Uuid, Path, description = "Customer id")),
    request_body = CustomerUpdate,
    responses((status = 200, body = Customer)),
    security(("bearer_auth" = [])),
    tag = "customers",
)]
pub async fn update_customer(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<CustomerId>,
    Json(update): Json<CustomerUpdate>,
) -> Result<Json<Customer>> {
    Ok(Json(
        state
            .services
            .customers
            .update(&auth.user_id, &id, update)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/customers/{id}",
    params(("id" = uuid::Uuid, Path, description = "Customer id")),
    responses(
        (status = 204, description = "Customer deleted"),
        (status = 409, description = "Customer still has rentals or bookings", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "customers",
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<CustomerId>,
) -> Result<StatusCode> {
    state.services.customers.delete(&auth.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// A customer's rentals with their balances
#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}/rentals",
    params(("id" = uuid::Uuid, Path, description = "Customer id")),
    responses((status = 200, body = [RentalView])),
    security(("bearer_auth" = [])),
    tag = "customers",
)]
pub async fn customer_rentals(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<CustomerId>,
) -> Result<Json<Vec<RentalView>>> {
    Ok(Json(
        state
            .services
            .customers
            .rentals(&auth.user_id, &id)
            .await?,
    ))
}
