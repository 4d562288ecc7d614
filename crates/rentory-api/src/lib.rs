//! # Rentory API
//!
//! HTTP service for managing a rental inventory.
//!
//! ## Features
//!
//! - **Inventory**: Items, customers, rentals, bookings and payments
//! - **Availability**: Stock checks over inclusive day ranges
//! - **Calendar**: Per-day layout of rentals, bookings and events in any timezone
//! - **Billing**: Free and pro plans backed by a hosted payment processor
//! - **Events**: Periodic scraping of external event feeds
//! - **Authentication**: Bearer JWTs, one tenant per subject
//! - **OpenAPI Documentation**: Auto-generated API documentation

pub mod api;
pub mod config;
pub mod error;
pub mod server;
pub mod services;

pub use config::Config;
pub use error::{ApiError, Result};
pub use server::{build_router, AppState, Server};

/// Version of the rentory-api crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol version for API compatibility
pub const API_VERSION: &str = "v1";
