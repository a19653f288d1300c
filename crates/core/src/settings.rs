//! Typed per-team settings with explicit merge-patch semantics.
//!
//! Settings are stored as a JSON TEXT column on the team row and patched
//! through `PUT /api/teams/{id}/settings`. A patch is a JSON object where an
//! absent key keeps the current value, `null` clears it, and a present value
//! replaces it after validation. Unknown keys are rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-team schedule configuration. All hours are UTC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSettings {
    /// Hour of day to remind members who have not submitted yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_hour: Option<u8>,
    /// Hour of day to email the digest report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_hour: Option<u8>,
    /// When set, the report is weekly and only sent on this day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_report_day: Option<ReportDay>,
}

/// Day of week for weekly reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportDay {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl ReportDay {
    pub fn matches(&self, day: chrono::Weekday) -> bool {
        use chrono::Weekday;
        matches!(
            (self, day),
            (Self::Mon, Weekday::Mon)
                | (Self::Tue, Weekday::Tue)
                | (Self::Wed, Weekday::Wed)
                | (Self::Thu, Weekday::Thu)
                | (Self::Fri, Weekday::Fri)
                | (Self::Sat, Weekday::Sat)
                | (Self::Sun, Weekday::Sun)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("settings patch must be a JSON object")]
    NotAnObject,
    #[error("unknown settings key: {0}")]
    UnknownKey(String),
    #[error("{0} must be an integer hour between 0 and 23")]
    InvalidHour(&'static str),
    #[error("weekly_report_day must be one of mon..sun")]
    InvalidDay,
}

impl TeamSettings {
    /// Parse the stored JSON column. Rows written before a field existed
    /// deserialize with that field unset.
    pub fn from_json(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".into())
    }

    /// Apply a merge-patch object on top of `self`, returning the merged
    /// settings or the first validation error.
    pub fn merge_patch(&self, patch: &Value) -> Result<TeamSettings, SettingsError> {
        let obj = patch.as_object().ok_or(SettingsError::NotAnObject)?;
        let mut next = self.clone();
        for (key, value) in obj {
            match key.as_str() {
                "reminder_hour" => next.reminder_hour = patch_hour(value, "reminder_hour")?,
                "report_hour" => next.report_hour = patch_hour(value, "report_hour")?,
                "weekly_report_day" => next.weekly_report_day = patch_day(value)?,
                other => return Err(SettingsError::UnknownKey(other.to_string())),
            }
        }
        Ok(next)
    }
}

fn patch_hour(value: &Value, field: &'static str) -> Result<Option<u8>, SettingsError> {
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_u64()
        .filter(|h| *h <= 23)
        .map(|h| Some(h as u8))
        .ok_or(SettingsError::InvalidHour(field))
}

fn patch_day(value: &Value) -> Result<Option<ReportDay>, SettingsError> {
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value.clone())
        .map(Some)
        .map_err(|_| SettingsError::InvalidDay)
}
