//! API middleware stack

mod auth;

pub use auth::{auth_middleware, extract_bearer_token, AuthContext};

use crate::server::AppState;
use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

/// Apply the shared layers to a router
pub fn apply_middleware(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}
