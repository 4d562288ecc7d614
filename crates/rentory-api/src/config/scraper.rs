//! Event scraper configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A JSON feed of events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSourceConfig {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Run the periodic scrape task
    pub enabled: bool,

    pub interval_seconds: u64,

    /// Events that ended longer ago than this are pruned
    pub retention_days: i64,

    /// Timeout for each feed request, in seconds
    pub request_timeout_secs: u64,

    pub sources: Vec<FeedSourceConfig>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_seconds: 3600,
            retention_days: 30,
            request_timeout_secs: 20,
            sources: Vec::new(),
        }
    }
}

impl ScraperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
