//! Front-desk dashboard: headline counts and a recent-activity feed.
//!
//! Both are read-only summaries over the pass table, for staff and admins.
//! "Today" is the building-local day.

use std::collections::HashMap;

use serde::Serialize;

use guestpass_types::{Pass, PassStatus, ResidentId, Timestamp};

use crate::guards::check_staff;
use crate::{PassEngine, PassError, Session};

/// Passes the activity feed is built from, newest first.
const ACTIVITY_WINDOW: usize = 50;
/// Events returned in the feed.
const ACTIVITY_LIMIT: usize = 10;
const UNKNOWN_HOST: &str = "Unknown Host";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    /// Checked in today and not yet checked out.
    pub in_building: u64,
    pub checked_in_today: u64,
    /// Approved or scheduled passes visiting today.
    pub scheduled_today: u64,
    pub total_passes: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Created,
    CheckIn,
    CheckOut,
}

impl ActivityKind {
    fn message(self) -> &'static str {
        match self {
            Self::Created => "New pass created",
            Self::CheckIn => "Guest checked in",
            Self::CheckOut => "Guest checked out",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::CheckIn => "checkin",
            Self::CheckOut => "checkout",
        }
    }

    /// Feed badge: `created`, `active` while inside, `completed` after.
    fn badge(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::CheckIn => "active",
            Self::CheckOut => "completed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub message: &'static str,
    pub guest_name: String,
    pub host_name: String,
    pub timestamp: String,
    pub status: &'static str,
    #[serde(skip)]
    at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecentActivity {
    pub activities: Vec<ActivityEvent>,
    /// Events found before truncation.
    pub total: usize,
}

impl PassEngine {
    pub fn metrics(&self, session: &Session) -> Result<DashboardMetrics, PassError> {
        check_staff(session)?;
        let today = self.today_at(self.now());
        let calendar = self.config.calendar;
        let checked_in_on_today =
            |pass: &Pass| pass.checked_in_at.is_some_and(|at| calendar.today(at) == today);

        let passes = self.deps.store.list_passes()?;
        let mut metrics = DashboardMetrics {
            total_passes: passes.len() as u64,
            ..DashboardMetrics::default()
        };
        for pass in &passes {
            if checked_in_on_today(pass) {
                metrics.checked_in_today += 1;
                if pass.status == PassStatus::CheckedIn && pass.checked_out_at.is_none() {
                    metrics.in_building += 1;
                }
            }
            if pass.visit_date == today
                && matches!(pass.status, PassStatus::Approved | PassStatus::Scheduled)
            {
                metrics.scheduled_today += 1;
            }
        }
        Ok(metrics)
    }

    /// Creation, check-in and check-out events of the newest passes, most
    /// recent first.
    pub fn recent_activity(&self, session: &Session) -> Result<RecentActivity, PassError> {
        check_staff(session)?;
        let mut passes = self.deps.store.list_passes()?;
        passes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        passes.truncate(ACTIVITY_WINDOW);

        let mut hosts: HashMap<ResidentId, String> = HashMap::new();
        let mut activities = Vec::with_capacity(passes.len() * 3);
        for pass in &passes {
            let host_name = hosts
                .entry(pass.resident_id.clone())
                .or_insert_with(|| {
                    self.deps
                        .store
                        .get_resident(&pass.resident_id)
                        .map(|r| r.name)
                        .unwrap_or_else(|_| UNKNOWN_HOST.to_string())
                })
                .clone();
            let events = [
                (ActivityKind::CheckOut, pass.checked_out_at),
                (ActivityKind::CheckIn, pass.checked_in_at),
                (ActivityKind::Created, Some(pass.created_at)),
            ];
            for (kind, at) in events {
                let Some(at) = at else { continue };
                activities.push(ActivityEvent {
                    id: format!("{}_{}", pass.id, kind.suffix()),
                    kind,
                    message: kind.message(),
                    guest_name: pass.guest.name.clone(),
                    host_name: host_name.clone(),
                    timestamp: at.to_rfc3339(),
                    status: kind.badge(),
                    at,
                });
            }
        }

        let total = activities.len();
        activities.sort_by(|a, b| b.at.cmp(&a.at));
        activities.truncate(ACTIVITY_LIMIT);
        Ok(RecentActivity { activities, total })
    }
}
