use axum::{Json, extract::State};

use remotesync_api::{DashboardResponse, EntryResponse, TeamResponse};

use crate::AppState;
use crate::error::ApiErr;
use crate::routes::auth::AuthUser;
use crate::storage::{TEAM_COLUMNS, entry_from_row, team_from_row};

/// Entries older than this never appear on the dashboard.
const LOOKBACK_DAYS: i64 = 7;

/// GET /api/dashboard — the caller's teams and their entries from the last
/// seven days.
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DashboardResponse>, ApiErr> {
    let conn = state.db.conn();

    let teams_sql = format!(
        "SELECT {TEAM_COLUMNS} FROM teams
         INNER JOIN team_members m ON m.team_id = teams.id
         WHERE m.user_id = ?1
         ORDER BY teams.created_at DESC"
    );
    let mut stmt = conn
        .prepare(&teams_sql)
        .map_err(ApiErr::from_db("prepare dashboard teams"))?;
    let teams: Vec<TeamResponse> = stmt
        .query_map([&user.0.id], team_from_row)
        .map_err(ApiErr::from_db("list dashboard teams"))?
        .filter_map(|r| r.ok())
        .collect();

    let cutoff = (chrono::Utc::now() - chrono::Duration::days(LOOKBACK_DAYS))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    let mut stmt = conn
        .prepare(
            "SELECT e.id, e.team_id, e.user_id, e.text, e.summary, e.audio_url, e.created_at
             FROM standup_entries e
             INNER JOIN team_members m ON m.team_id = e.team_id
             WHERE m.user_id = ?1 AND e.created_at >= ?2
             ORDER BY e.created_at DESC",
        )
        .map_err(ApiErr::from_db("prepare dashboard entries"))?;
    let entries: Vec<EntryResponse> = stmt
        .query_map(rusqlite::params![&user.0.id, &cutoff], entry_from_row)
        .map_err(ApiErr::from_db("list dashboard entries"))?
        .filter_map(|r| r.ok())
        .collect();

    Ok(Json(DashboardResponse { teams, entries }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::auth::AuthUser;
    use crate::routes::teams::{accept_invite, create_team};
    use crate::test_support::{profile, test_state};

    async fn make_team(state: &AppState, owner: &str, name: &str) -> remotesync_api::TeamResponse {
        let (_, Json(team)) = create_team(
            State(state.clone()),
            AuthUser(profile(owner)),
            Json(remotesync_api::CreateTeamRequest {
                name: name.into(),
                settings: None,
            }),
        )
        .await
        .expect("create team");
        team
    }

    fn insert_entry(state: &AppState, team_id: &str, user_id: &str, created_at: &str) {
        let conn = state.db.conn();
        conn.execute(
            "INSERT INTO standup_entries (id, team_id, user_id, text, summary, created_at)
             VALUES (?1, ?2, ?3, 'x', 's', ?4)",
            rusqlite::params![
                uuid::Uuid::new_v4().to_string(),
                team_id,
                user_id,
                created_at
            ],
        )
        .unwrap();
    }

    fn days_ago(days: i64) -> String {
        (chrono::Utc::now() - chrono::Duration::days(days))
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }

    #[tokio::test]
    async fn only_member_teams_and_recent_entries() {
        let app = test_state();
        let state = app.state.clone();

        let mine = make_team(&state, "u1", "Mine").await;
        let other = make_team(&state, "u2", "Theirs").await;

        insert_entry(&state, &mine.id, "u1", &days_ago(1));
        insert_entry(&state, &mine.id, "u1", &days_ago(8)); // outside the window
        insert_entry(&state, &other.id, "u2", &days_ago(1)); // someone else's team

        let Json(resp) = dashboard(State(state.clone()), AuthUser(profile("u1")))
            .await
            .expect("dashboard");

        assert_eq!(resp.teams.len(), 1);
        assert_eq!(resp.teams[0].id, mine.id);
        assert_eq!(resp.entries.len(), 1);
        assert_eq!(resp.entries[0].team_id, mine.id);
    }

    #[tokio::test]
    async fn joined_teams_contribute_entries() {
        let app = test_state();
        let state = app.state.clone();

        let team = make_team(&state, "u1", "Eng").await;
        accept_invite(
            State(state.clone()),
            AuthUser(profile("u2")),
            Json(remotesync_api::AcceptInviteRequest {
                token: team.invite_token.clone(),
            }),
        )
        .await
        .expect("join");

        insert_entry(&state, &team.id, "u1", &days_ago(2));

        let Json(resp) = dashboard(State(state.clone()), AuthUser(profile("u2")))
            .await
            .expect("dashboard");
        assert_eq!(resp.teams.len(), 1);
        assert_eq!(resp.entries.len(), 1);
        assert_eq!(resp.entries[0].user_id, "u1");
    }
}
