use crate::domain::calendar::range_bounds;
use crate::domain::events::ScrapedEvent;
use crate::domain::types::DateRange;
use crate::error::Result;
use crate::storage::Repositories;
use chrono::{Duration, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};

/// Storage side of event scraping
#[derive(Clone)]
pub struct EventService {
    repos: Repositories,
}

impl EventService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Events touching any local day of `range`
    pub async fn list(&self, range: &DateRange, tz: Tz) -> Result<Vec<ScrapedEvent>> {
        let (from, until) = range_bounds(range, tz);
        self.repos.events.list_events(from, until).await
    }

    /// Upsert well-formed events; returns how many were kept
    pub async fn store(&self, events: Vec<ScrapedEvent>) -> Result<usize> {
        let total = events.len();
        let valid: Vec<ScrapedEvent> = events.into_iter().filter(|e| e.is_well_formed()).collect();
        if valid.len() < total {
            debug!("Dropped {} malformed events", total - valid.len());
        }
        if !valid.is_empty() {
            self.repos.events.upsert_events(&valid).await?;
        }
        Ok(valid.len())
    }

    /// Remove events that finished more than `retention_days` ago
    pub async fn prune(&self, retention_days: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(retention_days);
        let removed = self.repos.events.prune_events(cutoff).await?;
        if removed > 0 {
            info!("Pruned {} events that ended before {}", removed, cutoff);
        }
        Ok(removed)
    }
}
