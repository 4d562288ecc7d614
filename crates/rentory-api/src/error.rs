//! Error types for the Rentory API

use crate::services::event_scraper::ScraperError;
use crate::services::payment_processor::ProcessorError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rentory_inventory::InventoryError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Main error type for the Rentory API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] rentory_common::ConfigurationError),

    /// Missing authentication (no token provided)
    #[error("Authentication required: {message}")]
    MissingAuthentication { message: String },

    /// Authentication error (expired/invalid token)
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Request clashes with stock, state or references
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Well-formed but refused, e.g. paying more than is owed
    #[error("Unprocessable request: {message}")]
    Unprocessable { message: String },

    /// The current plan does not allow this
    #[error("Plan limit: {message}")]
    PaymentRequired { message: String },

    #[error("Payment processor error: {0}")]
    Processor(#[from] ProcessorError),

    #[error("Event scraping error: {0}")]
    Scraper(#[from] ScraperError),

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Service temporarily unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        let message = err.to_string();
        match err {
            e if e.is_not_found() => ApiError::NotFound { resource: message },
            InventoryError::InvalidDateRange { .. }
            | InventoryError::InvalidTimezone { .. }
            | InventoryError::Validation { .. } => ApiError::BadRequest { message },
            InventoryError::Unavailable { .. }
            | InventoryError::Conflict { .. }
            | InventoryError::InvalidStateTransition { .. } => ApiError::Conflict { message },
            InventoryError::Overpayment { .. } => ApiError::Unprocessable { message },
            InventoryError::PlanLimitExceeded { .. } => ApiError::PaymentRequired { message },
            InventoryError::DatabaseError { .. } => {
                error!("{}", message);
                ApiError::Database {
                    message: "storage is unavailable".to_string(),
                }
            }
            _ => {
                error!("{}", message);
                ApiError::Internal { message }
            }
        }
    }
}

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Config(_) => "RENTORY_API_CONFIG_ERROR",
            ApiError::MissingAuthentication { .. } => "RENTORY_API_AUTH_MISSING",
            ApiError::Authentication { .. } => "RENTORY_API_AUTH_ERROR",
            ApiError::NotFound { .. } => "RENTORY_API_NOT_FOUND",
            ApiError::BadRequest { .. } => "RENTORY_API_BAD_REQUEST",
            ApiError::Conflict { .. } => "RENTORY_API_CONFLICT",
            ApiError::Unprocessable { .. } => "RENTORY_API_UNPROCESSABLE",
            ApiError::PaymentRequired { .. } => "RENTORY_API_PLAN_LIMIT",
            ApiError::Processor(_) => "RENTORY_API_PROCESSOR_ERROR",
            ApiError::Scraper(_) => "RENTORY_API_SCRAPER_ERROR",
            ApiError::Database { .. } => "RENTORY_API_DATABASE_ERROR",
            ApiError::ServiceUnavailable { .. } => "RENTORY_API_SERVICE_UNAVAILABLE",
            ApiError::Internal { .. } => "RENTORY_API_INTERNAL_ERROR",
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Database { .. } | ApiError::ServiceUnavailable { .. } => true,
            ApiError::Processor(e) => e.is_retryable(),
            ApiError::Scraper(_) => true,
            _ => false,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Config(_) | ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MissingAuthentication { .. } | ApiError::Authentication { .. } => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::PaymentRequired { .. } => StatusCode::PAYMENT_REQUIRED,
            ApiError::Processor(ProcessorError::InvalidSignature { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Processor(ProcessorError::Payload(_)) => StatusCode::BAD_REQUEST,
            ApiError::Scraper(ScraperError::AlreadyRunning) => StatusCode::CONFLICT,
            ApiError::Processor(_) | ApiError::Scraper(_) => StatusCode::BAD_GATEWAY,
            ApiError::Database { .. } | ApiError::ServiceUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "timestamp": chrono::Utc::now(),
                "retryable": self.is_retryable(),
            }
        }));

        (status, body).into_response()
    }
}

/// Error response structure for API documentation
#[derive(Debug, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorDetails {
    /// Stable `RENTORY_API_*` code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    pub timestamp: chrono::DateTime<chrono::Utc>,

    pub retryable: bool,
}
