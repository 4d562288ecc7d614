pub mod domain;
pub mod error;
pub mod services;
pub mod storage;

pub use error::{InventoryError, Result};
pub use storage::{Database, DatabaseConfig, Repositories};

/// Migrations embedded from `migrations/`
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
