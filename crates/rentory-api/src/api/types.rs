//! Query parameters and small response bodies of the HTTP API

use crate::error::{ApiError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use rentory_inventory::domain::calendar::{parse_month, resolve_range};
use rentory_inventory::domain::{
    BookingFilter, BookingStatus, CustomerId, DateInput, DateRange, ItemFilter, RentalFilter,
    RentalStatus,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

/// `YYYY-MM-DD` or an RFC 3339 timestamp
pub fn parse_date_input(field: &str, value: &str) -> Result<DateInput> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(DateInput::Date(date));
    }
    DateTime::parse_from_rfc3339(value)
        .map(DateInput::Timestamp)
        .map_err(|_| ApiError::BadRequest {
            message: format!("{field} must be YYYY-MM-DD or an RFC 3339 timestamp"),
        })
}

fn parse_id(field: &str, value: &str) -> Result<CustomerId> {
    CustomerId::from_str(value).map_err(|_| ApiError::BadRequest {
        message: format!("{field} is not a valid id"),
    })
}

/// Inclusive date range in the request timezone
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RangeQuery {
    /// First day, `YYYY-MM-DD` or RFC 3339
    pub start: String,
    /// Last day, inclusive
    pub end: String,
}

impl RangeQuery {
    pub fn resolve(&self, tz: Tz) -> Result<DateRange> {
        let start = parse_date_input("start", &self.start)?;
        let end = parse_date_input("end", &self.end)?;
        Ok(resolve_range(&start, &end, tz)?)
    }
}

/// Either `start` and `end`, or `month=YYYY-MM`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CalendarQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub month: Option<String>,
}

impl CalendarQuery {
    pub fn resolve(&self, tz: Tz) -> Result<DateRange> {
        match (&self.month, &self.start, &self.end) {
            (Some(month), None, None) => Ok(parse_month(month)?),
            (None, Some(start), Some(end)) => RangeQuery {
                start: start.clone(),
                end: end.clone(),
            }
            .resolve(tz),
            _ => Err(ApiError::BadRequest {
                message: "pass either month, or both start and end".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ItemListQuery {
    pub category: Option<String>,
    /// Matches name and description
    pub search: Option<String>,
}

impl From<ItemListQuery> for ItemFilter {
    fn from(query: ItemListQuery) -> Self {
        ItemFilter {
            category: query.category,
            search: query.search,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CustomerListQuery {
    /// Matches name, email and phone
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RentalListQuery {
    pub status: Option<String>,
    pub customer_id: Option<String>,
    /// Only active rentals past their last day
    pub overdue: Option<bool>,
}

impl RentalListQuery {
    pub fn to_filter(&self, today: NaiveDate) -> Result<RentalFilter> {
        Ok(RentalFilter {
            status: self
                .status
                .as_deref()
                .map(RentalStatus::from_str)
                .transpose()?,
            customer_id: self
                .customer_id
                .as_deref()
                .map(|id| parse_id("customer_id", id))
                .transpose()?,
            overdue_as_of: self.overdue.unwrap_or(false).then_some(today),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookingListQuery {
    pub status: Option<String>,
    pub customer_id: Option<String>,
    /// Only bookings starting on or after this day
    pub from: Option<String>,
}

impl BookingListQuery {
    pub fn to_filter(&self, tz: Tz) -> Result<BookingFilter> {
        Ok(BookingFilter {
            status: self
                .status
                .as_deref()
                .map(BookingStatus::from_str)
                .transpose()?,
            customer_id: self
                .customer_id
                .as_deref()
                .map(|id| parse_id("customer_id", id))
                .transpose()?,
            starts_from: self
                .from
                .as_deref()
                .map(|v| parse_date_input("from", v).map(|d| d.to_local_date(tz)))
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StatusChange {
    pub status: RentalStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    pub event_type: String,
}
