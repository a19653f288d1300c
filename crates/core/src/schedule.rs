//! Due-time checks for the periodic sweep.
//!
//! The sweep runs on a coarse hourly tick; every check here compares against
//! the current UTC hour (and weekday, for weekly reports). There is no
//! per-day de-duplication: the hourly interval means each configured hour is
//! encountered once per calendar day, and a tick that fails is simply
//! re-attempted while the hour still matches.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use std::collections::HashSet;

use crate::settings::TeamSettings;

/// Which digest a team is due for at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Daily,
    Weekly,
}

impl ReportKind {
    /// Entry lookback window for the digest.
    pub fn lookback(&self) -> Duration {
        match self {
            Self::Daily => Duration::hours(24),
            Self::Weekly => Duration::days(7),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
}

/// True when the team's reminder hour matches the current UTC hour.
pub fn reminder_due(settings: &TeamSettings, now: DateTime<Utc>) -> bool {
    settings.reminder_hour == Some(now.hour() as u8)
}

/// Whether a report is due now, and of which kind.
///
/// A configured `weekly_report_day` switches the team's report to weekly:
/// it fires only when both the day and the hour match. Without it the
/// report is daily, firing whenever the hour matches.
pub fn report_due(settings: &TeamSettings, now: DateTime<Utc>) -> Option<ReportKind> {
    if settings.report_hour != Some(now.hour() as u8) {
        return None;
    }
    match settings.weekly_report_day {
        Some(day) if day.matches(now.weekday()) => Some(ReportKind::Weekly),
        Some(_) => None,
        None => Some(ReportKind::Daily),
    }
}

/// Midnight UTC of the current day, the cutoff for "submitted today".
pub fn midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Members who still owe an update: the membership set minus the user ids
/// that already submitted. Preserves membership order.
pub fn due_members(members: &[String], submitted: &HashSet<String>) -> Vec<String> {
    members
        .iter()
        .filter(|m| !submitted.contains(*m))
        .cloned()
        .collect()
}
