//! Building-local calendar arithmetic.
//!
//! Visit dates are calendar days in the building's local time. The building
//! runs on a fixed UTC offset taken from configuration.

use chrono::{FixedOffset, NaiveDate, Offset, TimeZone, Utc};

use crate::{Timestamp, TypesError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildingCalendar {
    offset: FixedOffset,
}

impl BuildingCalendar {
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    /// Offset east of UTC in minutes (e.g. `-420` for UTC-07:00).
    pub fn from_offset_minutes(minutes: i32) -> Result<Self, TypesError> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(|offset| Self { offset })
            .ok_or_else(|| TypesError::InvalidOffset(minutes))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The local calendar date at instant `now`.
    pub fn today(&self, now: Timestamp) -> NaiveDate {
        now.to_datetime().with_timezone(&self.offset).date_naive()
    }

    /// The last second (23:59:59 local) of `date`.
    pub fn end_of_day(&self, date: NaiveDate) -> Timestamp {
        date.and_hms_opt(23, 59, 59)
            .and_then(|local| self.offset.from_local_datetime(&local).single())
            .map(|dt| Timestamp::from_datetime(dt.with_timezone(&Utc)))
            .unwrap_or(Timestamp::EPOCH)
    }
}

impl Default for BuildingCalendar {
    fn default() -> Self {
        Self::utc()
    }
}
