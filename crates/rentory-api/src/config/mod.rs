//! Configuration module for the Rentory API

mod auth;
mod billing;
mod scraper;
mod server;

pub use auth::AuthConfig;
pub use billing::BillingConfig;
pub use scraper::{FeedSourceConfig, ScraperConfig};
pub use server::ServerConfig;

use chrono_tz::Tz;
use rentory_common::config::ConfigLoader;
use rentory_common::ConfigurationError as ConfigError;
use rentory_inventory::domain::calendar::parse_timezone;
use rentory_inventory::services::InventorySettings;
use rentory_inventory::DatabaseConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Calendar rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// IANA zone used when a request names none
    pub default_timezone: String,

    /// Longest range a single calendar request may cover, in days
    pub max_range_days: i64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            default_timezone: "UTC".to_string(),
            max_range_days: 93,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RentalsConfig {
    /// Longest rental or booking period, in days
    pub max_period_days: i64,
}

impl Default for RentalsConfig {
    fn default() -> Self {
        Self {
            max_period_days: 366,
        }
    }
}

/// Main configuration structure for the Rentory API
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    pub auth: AuthConfig,

    pub calendar: CalendarConfig,

    pub rentals: RentalsConfig,

    pub billing: BillingConfig,

    pub scraper: ScraperConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        <Config as ConfigLoader>::load(config_path)
    }

    /// Generate example configuration file
    pub fn generate_example() -> Result<String, ConfigError> {
        <Config as ConfigLoader>::generate_example()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout)
    }

    pub fn default_timezone(&self) -> Result<Tz, ConfigError> {
        parse_timezone(&self.calendar.default_timezone).map_err(|e| ConfigError::InvalidValue {
            key: "calendar.default_timezone".to_string(),
            reason: e.to_string(),
        })
    }

    pub fn inventory_settings(&self) -> InventorySettings {
        InventorySettings {
            max_period_days: self.rentals.max_period_days,
            free_item_limit: self.billing.free_item_limit,
            calendar_max_range_days: self.calendar.max_range_days,
        }
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

impl ConfigLoader for Config {
    const ENV_PREFIX: &'static str = "RENTORY_API_";
    const DEFAULT_FILE: &'static str = "rentory-api.toml";

    fn validate(&self) -> Result<(), ConfigError> {
        self.default_timezone()?;

        if self.auth.jwt_secret.is_empty() {
            return Err(invalid("auth.jwt_secret", "must not be empty"));
        }
        if self.server.request_timeout == 0 {
            return Err(invalid("server.request_timeout", "must be positive"));
        }
        if self.rentals.max_period_days < 1 {
            return Err(invalid("rentals.max_period_days", "must be at least 1"));
        }
        if self.calendar.max_range_days < 1 {
            return Err(invalid("calendar.max_range_days", "must be at least 1"));
        }
        if self.billing.free_item_limit < 0 {
            return Err(invalid("billing.free_item_limit", "must not be negative"));
        }

        if self.billing.enabled {
            if self.billing.secret_key.is_empty() {
                return Err(invalid("billing.secret_key", "required when billing is enabled"));
            }
            if self.billing.price_id.is_empty() {
                return Err(invalid("billing.price_id", "required when billing is enabled"));
            }
            if self.billing.webhook_secret.is_empty() {
                return Err(invalid(
                    "billing.webhook_secret",
                    "required when billing is enabled",
                ));
            }
            url::Url::parse(&self.billing.api_base)
                .map_err(|e| invalid("billing.api_base", &e.to_string()))?;
        }

        if self.scraper.enabled && self.scraper.interval_seconds == 0 {
            return Err(invalid("scraper.interval_seconds", "must be positive"));
        }
        for source in &self.scraper.sources {
            url::Url::parse(&source.url)
                .map_err(|e| invalid(&format!("scraper.sources.{}", source.name), &e.to_string()))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind_address.port(), 8000);
        assert_eq!(config.calendar.default_timezone, "UTC");
        assert_eq!(config.billing.webhook_tolerance_secs, 300);
        assert!(!config.billing.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.server.bind_address, deserialized.server.bind_address);
        assert_eq!(
            config.rentals.max_period_days,
            deserialized.rentals.max_period_days
        );
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[calendar]
default_timezone = "Europe/Berlin"

[[scraper.sources]]
name = "city"
url = "https://events.example.com/feed.json"
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.default_timezone().unwrap(), chrono_tz::Europe::Berlin);
        assert_eq!(config.scraper.sources.len(), 1);
        assert_eq!(config.rentals.max_period_days, 366);
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let mut config = Config::default();
        config.calendar.default_timezone = "Mars/Olympus".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_enabled_billing_needs_credentials() {
        let mut config = Config::default();
        config.billing.enabled = true;
        assert!(config.validate().is_err());

        config.billing.secret_key = "sk_test".to_string();
        config.billing.price_id = "price_pro".to_string();
        config.billing.webhook_secret = "whsec_test".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inventory_settings_follow_config() {
        let mut config = Config::default();
        config.rentals.max_period_days = 30;
        config.billing.free_item_limit = 5;
        let settings = config.inventory_settings();
        assert_eq!(settings.max_period_days, 30);
        assert_eq!(settings.free_item_limit, 5);
        assert_eq!(settings.calendar_max_range_days, 93);
    }
}
