//! Main server implementation for the Rentory API

use crate::{
    api::{self, auth::JwtValidator},
    config::Config,
    error::{ApiError, Result},
    services::{EventScraper, HttpPaymentProcessor, PaymentProcessor},
};
use axum::Router;
use chrono_tz::Tz;
use rentory_inventory::{services::Services, Database, Repositories};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Main server structure
pub struct Server {
    config: Arc<Config>,
    app: Router,
    scraper: Arc<EventScraper>,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,

    /// Inventory services over the configured storage
    pub services: Services,

    /// Zone used when a request names none
    pub default_tz: Tz,

    pub jwt: Arc<JwtValidator>,

    /// Present only when billing is enabled
    pub processor: Option<Arc<dyn PaymentProcessor>>,

    pub scraper: Arc<EventScraper>,
}

impl AppState {
    /// Wire services and integrations over the given repositories
    pub fn new(config: Config, repos: Repositories) -> Result<Self> {
        let default_tz = config.default_timezone()?;
        let services = Services::new(repos, config.inventory_settings());
        let jwt = Arc::new(JwtValidator::new(&config.auth));

        let processor: Option<Arc<dyn PaymentProcessor>> = if config.billing.enabled {
            info!("Billing enabled, using processor at {}", config.billing.api_base);
            Some(Arc::new(HttpPaymentProcessor::new(config.billing.clone())?))
        } else {
            None
        };

        let scraper = Arc::new(EventScraper::from_config(
            &config.scraper,
            services.events.clone(),
        )?);

        Ok(Self {
            config: Arc::new(config),
            services,
            default_tz,
            jwt,
            processor,
            scraper,
        })
    }
}

impl Server {
    /// Create a new server instance backed by PostgreSQL
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing Rentory API server");

        let database = Database::connect(&config.database).await?;
        if config.database.run_migrations {
            database.run_migrations().await?;
        }

        Self::with_repositories(config, Repositories::postgres(&database))
    }

    /// Create a server over already-built repositories
    pub fn with_repositories(config: Config, repos: Repositories) -> Result<Self> {
        let state = AppState::new(config, repos)?;
        let config = state.config.clone();
        let scraper = state.scraper.clone();
        let app = build_router(state);

        Ok(Self {
            config,
            app,
            scraper,
        })
    }

    /// Run the server until shutdown signal
    pub async fn run(self) -> Result<()> {
        let addr = self.config.server.bind_address;

        let scrape_task = if self.config.scraper.enabled {
            info!(
                "Starting event scraper for {} sources every {}s",
                self.scraper.source_names().len(),
                self.config.scraper.interval_seconds
            );
            Some(self.scraper.clone().run(self.config.scraper.interval()))
        } else {
            None
        };

        info!("Starting HTTP server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ApiError::Internal {
                message: format!("Failed to bind to address {addr}: {e}"),
            })?;

        info!("Rentory API listening on {}", addr);

        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ApiError::Internal {
                message: format!("Server error: {e}"),
            });

        if let Some(task) = scrape_task {
            task.abort();
        }

        served
    }
}

/// Build the application router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest(&api_prefix(), api::routes(state.clone()))
        .merge(api::docs_routes())
        .with_state(state)
}

/// Path every versioned route is mounted under
pub fn api_prefix() -> String {
    format!("/api/{}", crate::API_VERSION)
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            warn!("Received terminate signal, shutting down");
        },
    }
}
