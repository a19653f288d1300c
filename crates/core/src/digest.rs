//! Reminder and digest email composition.

use chrono::NaiveDate;

use crate::schedule::ReportKind;

/// One member's contribution to a digest.
#[derive(Debug, Clone)]
pub struct DigestEntry {
    pub author: String,
    pub summary: String,
}

/// Subject line for a digest report.
pub fn report_subject(kind: ReportKind, date: NaiveDate) -> String {
    match kind {
        ReportKind::Daily => format!("Daily Standup Report {date}"),
        ReportKind::Weekly => format!("Weekly Standup Report {date}"),
    }
}

/// HTML body for a digest report. `None` means there is nothing to report
/// and no email should be sent.
pub fn report_html(team_name: &str, entries: &[DigestEntry]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }
    let body = entries
        .iter()
        .map(|e| format!("{}:\n{}", e.author, e.summary))
        .collect::<Vec<_>>()
        .join("\n\n");
    Some(format!("<p>Standup updates for {team_name}:</p><p>{}</p>", body.replace('\n', "<br>")))
}

pub fn reminder_subject() -> &'static str {
    "Time for your daily standup!"
}

/// Reminder body: the member can reply directly to the email to submit.
pub fn reminder_html(team_name: &str) -> String {
    format!("<p>Hey! Just reply to this email with your update for {team_name} today.</p>")
}

pub fn invite_subject(team_name: &str) -> String {
    format!("You've been invited to join {team_name} on RemoteSync")
}

pub fn invite_html(team_name: &str, join_url: &str) -> String {
    format!(
        "<p>You've been invited to join <b>{team_name}</b>.</p>\
         <p><a href=\"{join_url}\">Accept the invite</a> to start sharing standups.</p>"
    )
}
