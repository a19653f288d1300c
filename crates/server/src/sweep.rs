//! Periodic reminder/report sweep.
//!
//! One interval task per process. Each tick drains the inbound mailbox
//! (when configured), then scans every team and compares its configured
//! hours against the current UTC time. There is no de-duplication beyond
//! the hour match and no retry machinery: a team whose pass fails is
//! logged and re-attempted on the next tick that still matches.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

use remotesync_core::schedule::ReportKind;
use remotesync_core::{TeamSettings, digest, inbound, schedule};

use crate::AppState;
use crate::clients::{InboundMailbox, OutboundEmail};
use crate::routes::entries::summarize_or_placeholder;

/// Run the sweep loop until shutdown is signalled.
pub async fn run_sweep(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut tick = tokio::time::interval(Duration::from_secs(state.config.sweep_interval_secs));

    loop {
        tokio::select! {
            _ = tick.tick() => {
                if let Err(e) = sweep_once(&state, Utc::now()).await {
                    tracing::error!("sweep failed: {e:#}");
                }
            }

            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    tracing::info!("sweep shutting down");
                    break;
                }
            }
        }
    }
}

struct SweepTeam {
    id: String,
    name: String,
    settings: TeamSettings,
    recipients: Vec<String>,
}

/// One pass over every team. Failures are per-team: one broken team does
/// not stop the rest of the sweep.
pub async fn sweep_once(state: &AppState, now: DateTime<Utc>) -> Result<()> {
    if let Some(inbox) = state.adapters.inbox.clone() {
        if let Err(e) = drain_inbox(state, inbox.as_ref()).await {
            tracing::warn!("inbound drain failed: {e:#}");
        }
    }

    let teams: Vec<SweepTeam> = {
        let conn = state.db.conn();
        let mut stmt = conn.prepare("SELECT id, name, settings, report_recipients FROM teams")?;
        let teams = stmt
            .query_map([], |row| {
                let settings: String = row.get(2)?;
                let recipients: String = row.get(3)?;
                Ok(SweepTeam {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    settings: TeamSettings::from_json(&settings),
                    recipients: serde_json::from_str(&recipients).unwrap_or_default(),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        teams
    };

    for team in &teams {
        if let Err(e) = sweep_team(state, team, now).await {
            tracing::error!("sweep for team {} failed: {e:#}", team.id);
        }
    }

    Ok(())
}

async fn sweep_team(state: &AppState, team: &SweepTeam, now: DateTime<Utc>) -> Result<()> {
    if schedule::reminder_due(&team.settings, now) {
        send_reminders(state, team, now).await?;
    }
    if let Some(kind) = schedule::report_due(&team.settings, now) {
        send_report(state, team, kind, now).await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reminders
// ---------------------------------------------------------------------------

async fn send_reminders(state: &AppState, team: &SweepTeam, now: DateTime<Utc>) -> Result<()> {
    let (members, submitted) = {
        let conn = state.db.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id FROM team_members WHERE team_id = ?1 ORDER BY joined_at ASC",
        )?;
        let members: Vec<String> = stmt
            .query_map([&team.id], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        let midnight = schedule::midnight(now)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT user_id FROM standup_entries
             WHERE team_id = ?1 AND created_at >= ?2",
        )?;
        let submitted: HashSet<String> = stmt
            .query_map(rusqlite::params![&team.id, &midnight], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        (members, submitted)
    };

    let due = schedule::due_members(&members, &submitted);
    if due.is_empty() {
        return Ok(());
    }

    // One batched profile lookup for every due member.
    let profiles = state.adapters.identity.users_by_ids(&due).await?;
    for profile in profiles {
        let reply_to =
            inbound::encode_reply_address(&profile.id, &team.id, &state.config.inbound_domain);
        state
            .adapters
            .mailer
            .send(&OutboundEmail {
                to: vec![profile.email.clone()],
                subject: digest::reminder_subject().to_string(),
                html: digest::reminder_html(&team.name),
                reply_to: Some(reply_to),
            })
            .await?;
        tracing::info!("reminder sent to {} for team {}", profile.email, team.id);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

async fn send_report(
    state: &AppState,
    team: &SweepTeam,
    kind: ReportKind,
    now: DateTime<Utc>,
) -> Result<()> {
    if team.recipients.is_empty() {
        return Ok(());
    }

    let cutoff = (now - kind.lookback()).format("%Y-%m-%d %H:%M:%S").to_string();
    let rows: Vec<(String, String)> = {
        let conn = state.db.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, summary FROM standup_entries
             WHERE team_id = ?1 AND created_at >= ?2
             ORDER BY created_at ASC",
        )?;
        stmt.query_map(rusqlite::params![&team.id, &cutoff], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .filter_map(|r| r.ok())
        .collect()
    };

    let mut author_ids: Vec<String> = Vec::new();
    for (user_id, _) in &rows {
        if !author_ids.contains(user_id) {
            author_ids.push(user_id.clone());
        }
    }
    let names: HashMap<String, String> = state
        .adapters
        .identity
        .users_by_ids(&author_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();

    let entries: Vec<digest::DigestEntry> = rows
        .into_iter()
        .map(|(user_id, summary)| digest::DigestEntry {
            author: names.get(&user_id).cloned().unwrap_or(user_id),
            summary,
        })
        .collect();

    let Some(html) = digest::report_html(&team.name, &entries) else {
        return Ok(());
    };

    state
        .adapters
        .mailer
        .send(&OutboundEmail {
            to: team.recipients.clone(),
            subject: digest::report_subject(kind, now.date_naive()),
            html,
            reply_to: None,
        })
        .await?;
    tracing::info!("{} report sent for team {}", kind.as_str(), team.id);

    Ok(())
}

// ---------------------------------------------------------------------------
// Inbound replies
// ---------------------------------------------------------------------------

/// Turn unread replies into standup entries. Every message is marked read
/// once handled; unresolvable ones are dropped with a warning rather than
/// poisoning the mailbox.
async fn drain_inbox(state: &AppState, inbox: &dyn InboundMailbox) -> Result<()> {
    let messages = inbox.fetch_unread().await?;

    for msg in messages {
        match inbound::parse_reply_address(&msg.to) {
            Some(target) => {
                if let Err(e) = ingest_reply(state, &target, &msg.text).await {
                    tracing::warn!("dropping reply {} from {}: {e:#}", msg.id, msg.from);
                }
            }
            None => {
                tracing::warn!("dropping message {} addressed to {}", msg.id, msg.to);
            }
        }
        inbox.mark_read(&msg.id).await?;
    }

    Ok(())
}

async fn ingest_reply(
    state: &AppState,
    target: &inbound::ReplyTarget,
    text: &str,
) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("empty message body");
    }

    {
        let conn = state.db.conn();
        let member: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM team_members WHERE team_id = ?1 AND user_id = ?2",
                rusqlite::params![&target.team_id, &target.user_id],
                |row| row.get(0),
            )
            .unwrap_or(false);
        if !member {
            anyhow::bail!(
                "user {} is not a member of team {}",
                target.user_id,
                target.team_id
            );
        }
    }

    let summary = summarize_or_placeholder(state.adapters.inference.as_ref(), text).await;

    let conn = state.db.conn();
    conn.execute(
        "INSERT INTO standup_entries (id, team_id, user_id, text, summary)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            Uuid::new_v4().to_string(),
            &target.team_id,
            &target.user_id,
            text,
            &summary
        ],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InboundMessage;
    use crate::routes::auth::AuthUser;
    use crate::routes::teams::{accept_invite, create_team};
    use crate::test_support::{profile, test_state};
    use axum::{Json, extract::State};
    use chrono::TimeZone;

    async fn make_team(state: &AppState, owner: &str, settings_json: &str) -> String {
        let (_, Json(team)) = create_team(
            State(state.clone()),
            AuthUser(profile(owner)),
            Json(remotesync_api::CreateTeamRequest {
                name: "Eng".into(),
                settings: None,
            }),
        )
        .await
        .expect("create team");

        let conn = state.db.conn();
        conn.execute(
            "UPDATE teams SET settings = ?1, report_recipients = ?2 WHERE id = ?3",
            rusqlite::params![settings_json, r#"["lead@x.com"]"#, &team.id],
        )
        .unwrap();
        team.id
    }

    async fn join(state: &AppState, team_id: &str, user: &str) {
        let token: String = {
            let conn = state.db.conn();
            conn.query_row(
                "SELECT invite_token FROM teams WHERE id = ?1",
                [team_id],
                |row| row.get(0),
            )
            .unwrap()
        };
        accept_invite(
            State(state.clone()),
            AuthUser(profile(user)),
            Json(remotesync_api::AcceptInviteRequest { token }),
        )
        .await
        .expect("join");
    }

    fn insert_entry(state: &AppState, team_id: &str, user_id: &str, created_at: &str) {
        let conn = state.db.conn();
        conn.execute(
            "INSERT INTO standup_entries (id, team_id, user_id, text, summary, created_at)
             VALUES (?1, ?2, ?3, 'x', '- Completed: x', ?4)",
            rusqlite::params![Uuid::new_v4().to_string(), team_id, user_id, created_at],
        )
        .unwrap();
    }

    fn at(h: u32) -> DateTime<Utc> {
        // 2026-08-07 is a Friday.
        Utc.with_ymd_and_hms(2026, 8, 7, h, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn reminders_go_only_to_members_without_an_entry_today() {
        let app = test_state();
        let state = app.state.clone();
        let team_id = make_team(&state, "u1", r#"{"reminder_hour": 17}"#).await;
        join(&state, &team_id, "u2").await;

        insert_entry(&state, &team_id, "u1", "2026-08-07 09:00:00");
        // Yesterday's entry does not count as submitted today.
        insert_entry(&state, &team_id, "u2", "2026-08-06 09:00:00");

        sweep_once(&state, at(17)).await.expect("sweep");

        let sent = app.sent_mail();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["u2@example.com"]);
        assert_eq!(sent[0].subject, digest::reminder_subject());
        assert_eq!(
            sent[0].reply_to.as_deref(),
            Some(format!("update-u2-{team_id}@inbound.example.com").as_str())
        );
    }

    #[tokio::test]
    async fn nothing_fires_outside_the_configured_hour() {
        let app = test_state();
        let state = app.state.clone();
        let team_id =
            make_team(&state, "u1", r#"{"reminder_hour": 17, "report_hour": 18}"#).await;
        insert_entry(&state, &team_id, "u1", "2026-08-07 09:00:00");

        sweep_once(&state, at(12)).await.expect("sweep");
        assert!(app.sent_mail().is_empty());
    }

    #[tokio::test]
    async fn daily_report_digests_the_last_24_hours() {
        let app = test_state();
        let state = app.state.clone();
        let team_id = make_team(&state, "u1", r#"{"report_hour": 18}"#).await;

        insert_entry(&state, &team_id, "u1", "2026-08-07 09:00:00");
        // Too old for a daily digest.
        insert_entry(&state, &team_id, "u1", "2026-08-04 09:00:00");

        sweep_once(&state, at(18)).await.expect("sweep");

        let sent = app.sent_mail();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["lead@x.com"]);
        assert_eq!(sent[0].subject, "Daily Standup Report 2026-08-07");
        assert!(sent[0].html.contains("User u1"));
        assert_eq!(sent[0].html.matches("- Completed: x").count(), 1);
    }

    #[tokio::test]
    async fn empty_digest_sends_nothing() {
        let app = test_state();
        let state = app.state.clone();
        make_team(&state, "u1", r#"{"report_hour": 18}"#).await;

        sweep_once(&state, at(18)).await.expect("sweep");
        assert!(app.sent_mail().is_empty());
    }

    #[tokio::test]
    async fn weekly_report_fires_on_its_day_with_a_seven_day_window() {
        let app = test_state();
        let state = app.state.clone();
        let team_id = make_team(
            &state,
            "u1",
            r#"{"report_hour": 18, "weekly_report_day": "fri"}"#,
        )
        .await;
        insert_entry(&state, &team_id, "u1", "2026-08-04 09:00:00");

        // Thursday: the weekly report stays quiet.
        let thursday = Utc.with_ymd_and_hms(2026, 8, 6, 18, 30, 0).unwrap();
        sweep_once(&state, thursday).await.expect("sweep");
        assert!(app.sent_mail().is_empty());

        sweep_once(&state, at(18)).await.expect("sweep");
        let sent = app.sent_mail();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Weekly Standup Report 2026-08-07");
        assert!(sent[0].html.contains("- Completed: x"));
    }

    #[tokio::test]
    async fn inbound_replies_become_entries_and_are_marked_read() {
        let app = test_state();
        let state = app.state.clone();
        let team_id = make_team(&state, "u1", "{}").await;
        join(&state, &team_id, "u2").await;

        {
            let mut unread = app.inbox.unread.lock().unwrap();
            unread.push(InboundMessage {
                id: "m1".into(),
                to: format!("update-u2-{team_id}@inbound.example.com"),
                from: "u2@example.com".into(),
                text: "finished the migration".into(),
            });
            unread.push(InboundMessage {
                id: "m2".into(),
                to: "newsletter@elsewhere.com".into(),
                from: "spam@elsewhere.com".into(),
                text: "hello".into(),
            });
            // Sender is not a member of the team in the address.
            unread.push(InboundMessage {
                id: "m3".into(),
                to: format!("update-u9-{team_id}@inbound.example.com"),
                from: "u9@example.com".into(),
                text: "not mine".into(),
            });
        }

        sweep_once(&state, at(3)).await.expect("sweep");

        {
            let conn = state.db.conn();
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM standup_entries WHERE team_id = ?1 AND user_id = 'u2'",
                    [&team_id],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1);
            let text: String = conn
                .query_row(
                    "SELECT text FROM standup_entries WHERE team_id = ?1 AND user_id = 'u2'",
                    [&team_id],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(text, "finished the migration");
        }

        let read = app.inbox.read.lock().unwrap().clone();
        assert_eq!(read, vec!["m1", "m2", "m3"]);
        assert!(app.inbox.unread.lock().unwrap().is_empty());
    }
}
