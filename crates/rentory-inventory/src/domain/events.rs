use crate::domain::calendar::event_period;
use crate::domain::types::DateRange;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Listing ingested from an external event source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ScrapedEvent {
    pub id: Uuid,
    pub source: String,
    /// Identifier assigned by the source; unique together with `source`
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
}

impl ScrapedEvent {
    pub fn new(
        source: impl Into<String>,
        external_id: impl Into<String>,
        title: impl Into<String>,
        starts_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            external_id: external_id.into(),
            title: title.into(),
            description: None,
            location: None,
            url: None,
            starts_at,
            ends_at,
            scraped_at: Utc::now(),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        !self.title.trim().is_empty() && self.ends_at.map_or(true, |end| end >= self.starts_at)
    }

    /// Last instant the event occupies
    pub fn finishes_at(&self) -> DateTime<Utc> {
        self.ends_at.unwrap_or(self.starts_at)
    }

    pub fn local_period(&self, tz: Tz) -> DateRange {
        event_period(self.starts_at, self.ends_at, tz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};

    #[test]
    fn test_local_period_uses_timezone() {
        // 02:00 UTC on the 5th is still the 4th in Los Angeles
        let starts = Utc.with_ymd_and_hms(2024, 6, 5, 2, 0, 0).unwrap();
        let event = ScrapedEvent::new("feed", "1", "Night market", starts, Some(starts + Duration::hours(3)));

        let period = event.local_period(chrono_tz::America::Los_Angeles);
        assert_eq!(period.start(), NaiveDate::from_ymd_opt(2024, 6, 4).unwrap());
        assert_eq!(period.end(), NaiveDate::from_ymd_opt(2024, 6, 4).unwrap());

        let utc = event.local_period(chrono_tz::UTC);
        assert_eq!(utc.start(), NaiveDate::from_ymd_opt(2024, 6, 5).unwrap());
    }

    #[test]
    fn test_well_formed() {
        let starts = Utc.with_ymd_and_hms(2024, 6, 5, 12, 0, 0).unwrap();
        assert!(ScrapedEvent::new("feed", "1", "Fair", starts, None).is_well_formed());
        assert!(!ScrapedEvent::new("feed", "2", "Fair", starts, Some(starts - Duration::hours(1)))
            .is_well_formed());
        assert!(!ScrapedEvent::new("feed", "3", "  ", starts, None).is_well_formed());
    }
}
