//! Timestamp type used throughout the service.
//!
//! Timestamps are Unix epoch seconds (UTC). Calendar dates (visit days) are
//! plain `chrono::NaiveDate` values interpreted in the building's local time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Current system time. A clock set before 1970 reads as the epoch.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Whether an expiry at `self` has been reached at `now` (inclusive).
    pub fn is_reached_at(&self, now: Timestamp) -> bool {
        now.0 >= self.0
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.0 as i64, 0).unwrap_or_default()
    }

    /// Build a timestamp from a UTC instant; instants before the epoch clamp to zero.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp().max(0) as u64)
    }

    pub fn to_rfc3339(&self) -> String {
        self.to_datetime().to_rfc3339()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}
