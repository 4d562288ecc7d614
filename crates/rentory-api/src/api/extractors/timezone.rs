//! Request timezone: `tz` query parameter, then `X-Timezone`, then the default

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono_tz::Tz;
use rentory_inventory::domain::calendar::parse_timezone;

use crate::{error::ApiError, server::AppState};

pub const TIMEZONE_HEADER: &str = "X-Timezone";

/// Zone dates in this request are interpreted in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestTimezone(pub Tz);

fn from_query(parts: &Parts) -> Option<String> {
    let query = parts.uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "tz")
        .map(|(_, value)| value.into_owned())
}

fn from_header(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(TIMEZONE_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl FromRequestParts<AppState> for RequestTimezone {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match from_query(parts).or_else(|| from_header(parts)) {
            Some(name) => Ok(RequestTimezone(parse_timezone(&name)?)),
            None => Ok(RequestTimezone(state.default_tz)),
        }
    }
}
