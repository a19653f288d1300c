use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use remotesync_api::{
    AcceptInviteRequest, AcceptInviteResponse, CreateTeamRequest, InviteRequest,
    InviteSendResponse, InviteStatus, ListMembersResponse, MemberResponse, TeamResponse, TeamRole,
    UpdateSettingsRequest, service,
};
use remotesync_core::{TeamSettings, digest};

use crate::AppState;
use crate::clients::OutboundEmail;
use crate::error::ApiErr;
use crate::routes::auth::AuthUser;
use crate::storage::{TEAM_COLUMNS, team_from_row};

// ---------------------------------------------------------------------------
// Shared lookups
// ---------------------------------------------------------------------------

fn load_team(conn: &rusqlite::Connection, team_id: &str) -> Result<TeamResponse, ApiErr> {
    conn.query_row(
        &format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = ?1"),
        [team_id],
        team_from_row,
    )
    .map_err(|_| ApiErr::not_found("team not found"))
}

fn member_role(conn: &rusqlite::Connection, team_id: &str, user_id: &str) -> Option<String> {
    conn.query_row(
        "SELECT role FROM team_members WHERE team_id = ?1 AND user_id = ?2",
        rusqlite::params![team_id, user_id],
        |row| row.get(0),
    )
    .ok()
}

// ---------------------------------------------------------------------------
// Create team
// ---------------------------------------------------------------------------

/// POST /api/teams — create a team. The creator becomes its owner and first
/// member in the same transaction.
pub async fn create_team(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateTeamRequest>,
) -> Result<(StatusCode, Json<TeamResponse>), ApiErr> {
    let name = service::validate_team_name(&req.name)?;
    let settings = match &req.settings {
        Some(patch) => TeamSettings::default().merge_patch(patch)?,
        None => TeamSettings::default(),
    };

    // Hyphen-free id: reply-to addresses embed it after a hyphen separator.
    let team_id = Uuid::new_v4().simple().to_string();
    let invite_token = format!("inv_{}", Uuid::new_v4().simple());

    let conn = state.db.conn();
    let tx = conn
        .unchecked_transaction()
        .map_err(ApiErr::from_db("begin create team"))?;
    tx.execute(
        "INSERT INTO teams (id, name, owner_id, settings, invite_token) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![&team_id, &name, &user.0.id, settings.to_json(), &invite_token],
    )
    .map_err(ApiErr::from_db("create team"))?;
    tx.execute(
        "INSERT INTO team_members (team_id, user_id, role) VALUES (?1, ?2, ?3)",
        rusqlite::params![&team_id, &user.0.id, TeamRole::Owner.as_str()],
    )
    .map_err(ApiErr::from_db("add owner as member"))?;
    tx.commit().map_err(ApiErr::from_db("commit create team"))?;

    let team = load_team(&conn, &team_id)?;
    Ok((StatusCode::CREATED, Json(team)))
}

// ---------------------------------------------------------------------------
// Update settings (owner only)
// ---------------------------------------------------------------------------

/// PUT /api/teams/:id/settings — merge-patch the settings object and/or
/// replace the report recipient list. Owner only.
pub async fn update_settings(
    State(state): State<AppState>,
    user: AuthUser,
    Path(team_id): Path<String>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<TeamResponse>, ApiErr> {
    let conn = state.db.conn();
    let team = load_team(&conn, &team_id)?;

    if team.owner_id != user.0.id {
        return Err(ApiErr::forbidden("only the team owner can update settings"));
    }

    let settings = match &req.settings {
        Some(patch) => team.settings.merge_patch(patch)?,
        None => team.settings.clone(),
    };
    let recipients = match &req.report_recipients {
        Some(list) => list
            .iter()
            .map(|e| service::validate_email(e))
            .collect::<Result<Vec<_>, _>>()?,
        None => team.report_recipients.clone(),
    };

    conn.execute(
        "UPDATE teams SET settings = ?1, report_recipients = ?2 WHERE id = ?3",
        rusqlite::params![
            settings.to_json(),
            serde_json::to_string(&recipients).unwrap_or_else(|_| "[]".into()),
            &team_id
        ],
    )
    .map_err(ApiErr::from_db("update settings"))?;

    load_team(&conn, &team_id).map(Json)
}

// ---------------------------------------------------------------------------
// List members
// ---------------------------------------------------------------------------

/// GET /api/teams/:id/members — membership rows joined with identity
/// profiles, fetched in one batched query.
pub async fn list_members(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(team_id): Path<String>,
) -> Result<Json<ListMembersResponse>, ApiErr> {
    let rows: Vec<(String, String, String)> = {
        let conn = state.db.conn();
        load_team(&conn, &team_id)?;

        let mut stmt = conn
            .prepare(
                "SELECT user_id, role, joined_at FROM team_members
                 WHERE team_id = ?1 ORDER BY joined_at ASC",
            )
            .map_err(ApiErr::from_db("prepare members"))?;
        stmt.query_map([&team_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .map_err(ApiErr::from_db("list members"))?
        .filter_map(|r| r.ok())
        .collect()
    };

    let ids: Vec<String> = rows.iter().map(|(id, _, _)| id.clone()).collect();
    let profiles = state.adapters.identity.users_by_ids(&ids).await?;
    let by_id: std::collections::HashMap<String, _> =
        profiles.into_iter().map(|p| (p.id.clone(), p)).collect();

    let members = rows
        .into_iter()
        .map(|(user_id, role, joined_at)| {
            let profile = by_id.get(&user_id);
            MemberResponse {
                name: profile.map(|p| p.name.clone()).unwrap_or_default(),
                email: profile.map(|p| p.email.clone()).unwrap_or_default(),
                avatar_url: profile.and_then(|p| p.avatar_url.clone()),
                user_id,
                role,
                joined_at,
            }
        })
        .collect();

    Ok(Json(ListMembersResponse { members }))
}

// ---------------------------------------------------------------------------
// Remove member (owner only)
// ---------------------------------------------------------------------------

/// DELETE /api/teams/:id/members/:user_id — remove a member. Owner only;
/// the owner itself can never be removed.
pub async fn remove_member(
    State(state): State<AppState>,
    user: AuthUser,
    Path((team_id, member_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiErr> {
    let conn = state.db.conn();
    let team = load_team(&conn, &team_id)?;

    if team.owner_id != user.0.id {
        return Err(ApiErr::forbidden("only the team owner can remove members"));
    }
    if member_id == team.owner_id {
        return Err(ApiErr::bad_request("owner cannot be removed"));
    }

    let affected = conn
        .execute(
            "DELETE FROM team_members WHERE team_id = ?1 AND user_id = ?2",
            rusqlite::params![&team_id, &member_id],
        )
        .map_err(ApiErr::from_db("remove member"))?;

    if affected == 0 {
        return Err(ApiErr::not_found("member not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Delete team (owner only)
// ---------------------------------------------------------------------------

/// DELETE /api/teams/:id — delete the team and everything it owns
/// (members, invites, entries). Owner only.
pub async fn delete_team(
    State(state): State<AppState>,
    user: AuthUser,
    Path(team_id): Path<String>,
) -> Result<StatusCode, ApiErr> {
    {
        let conn = state.db.conn();
        let team = load_team(&conn, &team_id)?;
        if team.owner_id != user.0.id {
            return Err(ApiErr::forbidden("only the team owner can delete the team"));
        }
    }

    state
        .db
        .delete_team(&team_id)
        .map_err(ApiErr::from_db("delete team"))?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Invite members
// ---------------------------------------------------------------------------

/// POST /api/teams/:id/invite — record pending invites and email each
/// address a join link carrying the team's reusable invite token.
pub async fn invite_members(
    State(state): State<AppState>,
    user: AuthUser,
    Path(team_id): Path<String>,
    Json(req): Json<InviteRequest>,
) -> Result<Json<InviteSendResponse>, ApiErr> {
    let emails = service::validate_emails(&req.emails)?;

    let (team, join_url) = {
        let conn = state.db.conn();
        let team = load_team(&conn, &team_id)?;

        let can_invite = matches!(
            member_role(&conn, &team_id, &user.0.id).as_deref(),
            Some("owner") | Some("admin")
        );
        if !can_invite {
            return Err(ApiErr::forbidden("only team owners or admins can invite"));
        }

        for email in &emails {
            conn.execute(
                "INSERT INTO invites (id, team_id, email) VALUES (?1, ?2, ?3)",
                rusqlite::params![Uuid::new_v4().to_string(), &team_id, email],
            )
            .map_err(ApiErr::from_db("create invite"))?;
        }

        let join_url = format!(
            "{}/join?token={}",
            state.config.join_link_base(),
            team.invite_token
        );
        (team, join_url)
    };

    for email in &emails {
        state
            .adapters
            .mailer
            .send(&OutboundEmail {
                to: vec![email.clone()],
                subject: digest::invite_subject(&team.name),
                html: digest::invite_html(&team.name, &join_url),
                reply_to: None,
            })
            .await?;
    }

    Ok(Json(InviteSendResponse {
        status: "invites sent successfully".into(),
    }))
}

// ---------------------------------------------------------------------------
// Accept invite
// ---------------------------------------------------------------------------

/// POST /api/invites/accept — join the team behind the token. Accepting
/// twice is idempotent: the existing membership is returned unchanged.
pub async fn accept_invite(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<AcceptInviteRequest>,
) -> Result<Json<AcceptInviteResponse>, ApiErr> {
    let conn = state.db.conn();

    let team_id: String = conn
        .query_row(
            "SELECT id FROM teams WHERE invite_token = ?1",
            [&req.token],
            |row| row.get(0),
        )
        .map_err(|_| ApiErr::bad_request("invalid invite token"))?;

    if let Some(role) = member_role(&conn, &team_id, &user.0.id) {
        return Ok(Json(AcceptInviteResponse { team_id, role }));
    }

    conn.execute(
        "INSERT INTO team_members (team_id, user_id, role) VALUES (?1, ?2, ?3)",
        rusqlite::params![&team_id, &user.0.id, TeamRole::Member.as_str()],
    )
    .map_err(ApiErr::from_db("join team"))?;

    // Settle any invite rows addressed to this email.
    conn.execute(
        "UPDATE invites SET status = ?1 WHERE team_id = ?2 AND email = ?3 AND status = ?4",
        rusqlite::params![
            InviteStatus::Accepted.as_str(),
            &team_id,
            user.0.email.to_lowercase(),
            InviteStatus::Pending.as_str()
        ],
    )
    .ok();

    Ok(Json(AcceptInviteResponse {
        team_id,
        role: TeamRole::Member.as_str().to_string(),
    }))
}
