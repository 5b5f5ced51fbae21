//! Wall-clock helpers.
//!
//! Cache expiry is stored as integer seconds since the Unix epoch.

use chrono::Utc;

/// Seconds in one week, the default lifetime of a fetched tile.
pub const ONE_WEEK_SECS: i64 = 7 * 24 * 60 * 60;

/// Returns the current time as seconds since the Unix epoch.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Resolves the expiry to store for a freshly fetched tile.
///
/// A server-provided expiry is honored only when it lies in the future;
/// otherwise the tile lives for one week from `now`.
pub fn resolve_expiry(server_expiry: Option<i64>, now: i64) -> i64 {
    match server_expiry {
        Some(expiry) if expiry > now => expiry,
        _ => now + ONE_WEEK_SECS,
    }
}
