//! HTTP tile fetching
//!
//! [`ReqwestFetcher`] is the production [`TileFetcher`]: one GET per call,
//! no retries, with the server's caching headers turned into an absolute
//! expiry.
//!
//! # Expiry headers
//!
//! `Cache-Control: max-age=N` wins over `Expires`. A missing or unparsable
//! header leaves the expiry unset, and the cache applies its one-week
//! default.

use std::time::Duration;

use chrono::DateTime;
use reqwest::header::{CACHE_CONTROL, EXPIRES};

use super::types::{FetchError, FetchedTile, TileFetcher};
use crate::time::unix_now;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent sent with every tile request.
///
/// Public tile servers reject anonymous clients.
pub const USER_AGENT: &str = concat!("mapcanvas/", env!("CARGO_PKG_VERSION"));

/// Tile fetcher backed by an async reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Creates a fetcher with the default 30 second timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a fetcher with a custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl TileFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedTile, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Http(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let headers = response.headers();
        let expires = parse_expiry(
            headers.get(CACHE_CONTROL).and_then(|v| v.to_str().ok()),
            headers.get(EXPIRES).and_then(|v| v.to_str().ok()),
            unix_now(),
        );

        let data = response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;
        if data.is_empty() {
            return Err(FetchError::EmptyBody(url.to_string()));
        }

        Ok(FetchedTile::new(data.to_vec(), expires))
    }
}

/// Derives an absolute expiry from response caching headers.
///
/// # Arguments
///
/// * `cache_control` - Raw `Cache-Control` header value
/// * `expires` - Raw `Expires` header value (RFC 2822 / HTTP-date)
/// * `now` - Current time in seconds since epoch
///
/// # Returns
///
/// Seconds since epoch, or `None` when neither header yields a time.
pub fn parse_expiry(cache_control: Option<&str>, expires: Option<&str>, now: i64) -> Option<i64> {
    if let Some(max_age) = cache_control.and_then(parse_max_age) {
        return Some(now.saturating_add(max_age));
    }

    expires
        .and_then(|value| DateTime::parse_from_rfc2822(value.trim()).ok())
        .map(|date| date.timestamp())
}

fn parse_max_age(cache_control: &str) -> Option<i64> {
    cache_control.split(',').find_map(|directive| {
        let (name, value) = directive.trim().split_once('=')?;
        if name.trim().eq_ignore_ascii_case("max-age") {
            value.trim().trim_matches('"').parse::<i64>().ok()
        } else {
            None
        }
    })
}
