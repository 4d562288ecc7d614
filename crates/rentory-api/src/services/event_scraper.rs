//! Periodic ingestion of external event listings

use crate::config::{FeedSourceConfig, ScraperConfig};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use rentory_inventory::domain::ScrapedEvent;
use rentory_inventory::services::EventService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error from {source_name}: {message}")]
    Http { source_name: String, message: String },

    #[error("Source {source_name} returned status {status}")]
    Status { source_name: String, status: u16 },

    #[error("Failed to parse feed from {source_name}: {message}")]
    Parse { source_name: String, message: String },

    #[error("Invalid feed url for {source_name}: {message}")]
    InvalidUrl { source_name: String, message: String },

    #[error("A scrape run is already in progress")]
    AlreadyRunning,

    #[error("Failed to store events: {0}")]
    Storage(#[from] rentory_inventory::InventoryError),
}

pub type Result<T> = std::result::Result<T, ScraperError>;

/// Somewhere events can be fetched from
#[async_trait]
pub trait EventSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<ScrapedEvent>>;
}

/// One entry of a JSON feed
#[derive(Debug, Clone, Deserialize)]
struct FeedEntry {
    id: String,
    title: String,
    description: Option<String>,
    location: Option<String>,
    url: Option<String>,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
}

/// Source serving a JSON array of events over HTTP
pub struct JsonFeedSource {
    name: String,
    url: Url,
    http: reqwest::Client,
}

impl JsonFeedSource {
    pub fn new(config: &FeedSourceConfig, http: reqwest::Client) -> Result<Self> {
        let url = Url::parse(&config.url).map_err(|e| ScraperError::InvalidUrl {
            source_name: config.name.clone(),
            message: e.to_string(),
        })?;
        Ok(Self {
            name: config.name.clone(),
            url,
            http,
        })
    }
}

#[async_trait]
impl EventSource for JsonFeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<ScrapedEvent>> {
        debug!("Fetching events from {} ({})", self.name, self.url);

        let response = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| ScraperError::Http {
                source_name: self.name.clone(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ScraperError::Status {
                source_name: self.name.clone(),
                status: response.status().as_u16(),
            });
        }

        let entries: Vec<FeedEntry> = response.json().await.map_err(|e| ScraperError::Parse {
            source_name: self.name.clone(),
            message: e.to_string(),
        })?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let mut event = ScrapedEvent::new(
                    self.name.clone(),
                    entry.id,
                    entry.title,
                    entry.starts_at,
                    entry.ends_at,
                );
                event.description = entry.description;
                event.location = entry.location;
                event.url = entry.url;
                event
            })
            .collect())
    }
}

/// Outcome for one source in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SourceReport {
    pub source: String,
    pub fetched: usize,
    pub stored: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ScrapeReport {
    pub started_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
    /// Events removed for being past retention
    pub pruned: u64,
}

impl ScrapeReport {
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_some()).count()
    }
}

pub struct EventScraper {
    sources: Vec<Arc<dyn EventSource>>,
    events: EventService,
    retention_days: i64,
    running: Mutex<()>,
}

impl EventScraper {
    pub fn new(sources: Vec<Arc<dyn EventSource>>, events: EventService, retention_days: i64) -> Self {
        Self {
            sources,
            events,
            retention_days,
            running: Mutex::new(()),
        }
    }

    /// JSON feed sources built from configuration
    pub fn from_config(config: &ScraperConfig, events: EventService) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("rentory-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ScraperError::Http {
                source_name: "client".to_string(),
                message: e.to_string(),
            })?;

        let sources = config
            .sources
            .iter()
            .map(|source| {
                JsonFeedSource::new(source, http.clone()).map(|s| Arc::new(s) as Arc<dyn EventSource>)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(sources, events, config.retention_days))
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Fetch every source once, store what came back and prune old events.
    ///
    /// Sources are fetched concurrently. A failing source is reported and does
    /// not stop the others. Overlapping runs are refused.
    pub async fn run_once(&self) -> Result<ScrapeReport> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| ScraperError::AlreadyRunning)?;

        let started_at = Utc::now();
        let fetched = join_all(self.sources.iter().map(|source| source.fetch())).await;

        let mut reports = Vec::with_capacity(self.sources.len());
        for (source, result) in self.sources.iter().zip(fetched) {
            let name = source.name().to_string();
            let report = match result {
                Ok(events) => {
                    let fetched = events.len();
                    match self.events.store(events).await {
                        Ok(stored) => SourceReport {
                            source: name,
                            fetched,
                            stored,
                            error: None,
                        },
                        Err(e) => {
                            error!("Storing events from {} failed: {}", name, e);
                            SourceReport {
                                source: name,
                                fetched,
                                stored: 0,
                                error: Some(e.to_string()),
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("Event source {} failed: {}", name, e);
                    SourceReport {
                        source: name,
                        fetched: 0,
                        stored: 0,
                        error: Some(e.to_string()),
                    }
                }
            };
            reports.push(report);
        }

        let pruned = self.events.prune(self.retention_days).await?;

        let report = ScrapeReport {
            started_at,
            sources: reports,
            pruned,
        };
        info!(
            sources = report.sources.len(),
            failed = report.failed_sources(),
            pruned = report.pruned,
            "Event scrape finished"
        );
        Ok(report)
    }

    /// Start the background scrape task
    pub fn run(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let scraper = Arc::clone(&self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                if let Err(e) = scraper.run_once().await {
                    error!("Background event scrape failed: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use rentory_inventory::domain::DateRange;
    use rentory_inventory::storage::Repositories;

    struct StaticSource {
        name: String,
        events: Vec<ScrapedEvent>,
    }

    #[async_trait]
    impl EventSource for StaticSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn fetch(&self) -> Result<Vec<ScrapedEvent>> {
            Ok(self.events.clone())
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl EventSource for BrokenSource {
        fn name(&self) -> &str {
            "broken"
        }

        async fn fetch(&self) -> Result<Vec<ScrapedEvent>> {
            Err(ScraperError::Status {
                source_name: "broken".to_string(),
                status: 503,
            })
        }
    }

    #[tokio::test]
    async fn test_failing_source_does_not_abort_run() {
        let events = EventService::new(Repositories::in_memory());
        let start = Utc::now() + ChronoDuration::days(2);
        let good = StaticSource {
            name: "city".to_string(),
            events: vec![
                ScrapedEvent::new("city", "a", "Market", start, None),
                // ends before it starts
                ScrapedEvent::new(
                    "city",
                    "b",
                    "Backwards",
                    start,
                    Some(start - ChronoDuration::hours(1)),
                ),
            ],
        };

        let scraper = EventScraper::new(
            vec![Arc::new(BrokenSource), Arc::new(good)],
            events.clone(),
            30,
        );
        let report = scraper.run_once().await.unwrap();

        assert_eq!(report.sources.len(), 2);
        assert_eq!(report.failed_sources(), 1);
        assert_eq!(report.sources[1].fetched, 2);
        assert_eq!(report.sources[1].stored, 1);

        let day = start.date_naive();
        let listed = events
            .list(&DateRange::single(day), chrono_tz::UTC)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Market");
    }
}
