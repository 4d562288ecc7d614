//! API module for the Rentory service

pub mod auth;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod types;

use crate::server::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

/// Create all API routes
pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        // Items
        .route(
            "/items",
            get(routes::items::list_items).post(routes::items::create_item),
        )
        .route(
            "/items/availability",
            get(routes::items::all_availability),
        )
        .route(
            "/items/:id",
            get(routes::items::get_item)
                .patch(routes::items::update_item)
                .delete(routes::items::delete_item),
        )
        .route(
            "/items/:id/availability",
            get(routes::items::item_availability),
        )
        // Customers
        .route(
            "/customers",
            get(routes::customers::list_customers).post(routes::customers::create_customer),
        )
        .route(
            "/customers/:id",
            get(routes::customers::get_customer)
                .patch(routes::customers::update_customer)
                .delete(routes::customers::delete_customer),
        )
        .route(
            "/customers/:id/rentals",
            get(routes::customers::customer_rentals),
        )
        // Rentals and payments
        .route(
            "/rentals",
            get(routes::rentals::list_rentals).post(routes::rentals::create_rental),
        )
        .route(
            "/rentals/:id",
            get(routes::rentals::get_rental)
                .patch(routes::rentals::update_rental)
                .delete(routes::rentals::delete_rental),
        )
        .route("/rentals/:id/status", post(routes::rentals::change_status))
        .route("/rentals/:id/balance", get(routes::rentals::get_balance))
        .route(
            "/rentals/:id/payments",
            get(routes::rentals::list_payments).post(routes::rentals::record_payment),
        )
        .route(
            "/rentals/:id/payments/:payment_id",
            delete(routes::rentals::delete_payment),
        )
        // Bookings
        .route(
            "/bookings",
            get(routes::bookings::list_bookings).post(routes::bookings::create_booking),
        )
        .route(
            "/bookings/:id",
            get(routes::bookings::get_booking).patch(routes::bookings::update_booking),
        )
        .route(
            "/bookings/:id/confirm",
            post(routes::bookings::confirm_booking),
        )
        .route("/bookings/:id/cancel", post(routes::bookings::cancel_booking))
        .route(
            "/bookings/:id/convert",
            post(routes::bookings::convert_booking),
        )
        // Calendar and dashboard
        .route("/calendar", get(routes::calendar::get_calendar))
        .route("/dashboard", get(routes::dashboard::get_dashboard))
        // Billing
        .route(
            "/billing/subscription",
            get(routes::billing::get_subscription),
        )
        .route("/billing/checkout", post(routes::billing::create_checkout))
        .route("/billing/portal", post(routes::billing::create_portal))
        // Events
        .route("/events", get(routes::events::list_events))
        .route("/events/scrape", post(routes::events::trigger_scrape))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let public = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/billing/webhook", post(routes::billing::webhook));

    let router = public.merge(protected);

    middleware::apply_middleware(router, &state)
}

/// Create OpenAPI documentation routes
pub fn docs_routes() -> Router<AppState> {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health_check,

        routes::items::list_items,
        routes::items::create_item,
        routes::items::get_item,
        routes::items::update_item,
        routes::items::delete_item,
        routes::items::item_availability,
        routes::items::all_availability,

        routes::customers::list_customers,
        routes::customers::create_customer,
        routes::customers::get_customer,
        routes::customers::update_customer,
        routes::customers::delete_customer,
        routes::customers::customer_rentals,

        routes::rentals::list_rentals,
        routes::rentals::create_rental,
        routes::rentals::get_rental,
        routes::rentals::update_rental,
        routes::rentals::delete_rental,
        routes::rentals::change_status,
        routes::rentals::get_balance,
        routes::rentals::list_payments,
        routes::rentals::record_payment,
        routes::rentals::delete_payment,

        routes::bookings::list_bookings,
        routes::bookings::create_booking,
        routes::bookings::get_booking,
        routes::bookings::update_booking,
        routes::bookings::confirm_booking,
        routes::bookings::cancel_booking,
        routes::bookings::convert_booking,

        routes::calendar::get_calendar,
        routes::dashboard::get_dashboard,

        routes::billing::get_subscription,
        routes::billing::create_checkout,
        routes::billing::create_portal,
        routes::billing::webhook,

        routes::events::list_events,
        routes::events::trigger_scrape,
    ),
    components(schemas(
        rentory_inventory::domain::Item,
        rentory_inventory::domain::NewItem,
        rentory_inventory::domain::ItemUpdate,
        rentory_inventory::domain::ItemAvailability,
        rentory_inventory::domain::Customer,
        rentory_inventory::domain::NewCustomer,
        rentory_inventory::domain::CustomerUpdate,
        rentory_inventory::domain::Rental,
        rentory_inventory::domain::RentalLine,
        rentory_inventory::domain::RentalView,
        rentory_inventory::domain::RentalBalance,
        rentory_inventory::domain::NewRental,
        rentory_inventory::domain::RentalUpdate,
        rentory_inventory::domain::RentalStatus,
        rentory_inventory::domain::Payment,
        rentory_inventory::domain::NewPayment,
        rentory_inventory::domain::PaymentMethod,
        rentory_inventory::domain::PaymentStatus,
        rentory_inventory::domain::Booking,
        rentory_inventory::domain::NewBooking,
        rentory_inventory::domain::BookingUpdate,
        rentory_inventory::domain::BookingStatus,
        rentory_inventory::domain::ConvertBooking,
        rentory_inventory::domain::LineItem,
        rentory_inventory::domain::DateRange,
        rentory_inventory::domain::DateInput,
        rentory_inventory::domain::Money,
        rentory_inventory::domain::ItemId,
        rentory_inventory::domain::CustomerId,
        rentory_inventory::domain::RentalId,
        rentory_inventory::domain::BookingId,
        rentory_inventory::domain::PaymentId,
        rentory_inventory::domain::CalendarView,
        rentory_inventory::domain::CalendarDay,
        rentory_inventory::domain::CalendarEntry,
        rentory_inventory::domain::EntryKind,
        rentory_inventory::domain::DashboardSummary,
        rentory_inventory::domain::ScrapedEvent,
        rentory_inventory::domain::Subscription,
        rentory_inventory::domain::SubscriptionStatus,
        rentory_inventory::domain::Plan,
        rentory_inventory::domain::PlanLimits,
        rentory_inventory::services::SubscriptionOverview,
        rentory_inventory::services::subscriptions::PlanUsage,
        crate::services::payment_processor::SessionUrl,
        crate::services::event_scraper::ScrapeReport,
        crate::services::event_scraper::SourceReport,
        types::StatusChange,
        types::HealthResponse,
        types::WebhookAck,
        crate::error::ErrorResponse,
        crate::error::ErrorDetails,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "items", description = "Rentable item catalogue and availability"),
        (name = "customers", description = "Customer records"),
        (name = "rentals", description = "Rentals and balances"),
        (name = "payments", description = "Payments against rentals"),
        (name = "bookings", description = "Reservations that can become rentals"),
        (name = "calendar", description = "Per-day calendar layout"),
        (name = "dashboard", description = "Overview counts"),
        (name = "billing", description = "Subscription plan and payment processor"),
        (name = "events", description = "Scraped external events"),
        (name = "health", description = "Health and monitoring"),
    ),
    info(
        title = "Rentory API",
        version = "1.0.0",
        description = "Rental inventory management service",
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development"),
    ),
)]
pub struct ApiDoc;
