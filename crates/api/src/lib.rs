//! Shared API types for RemoteSync.
//!
//! This crate is the single source of truth for all request/response
//! shapes exchanged between the server and its clients.

use serde::{Deserialize, Serialize};

use remotesync_core::TeamSettings;

pub mod service;

// ─── Shared Enums ────────────────────────────────────────────────────────────

/// Role within a team.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    Owner,
    Admin,
    Member,
}

impl TeamRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl std::fmt::Display for TeamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a pending invite row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Pending,
    Accepted,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
        }
    }
}

impl std::fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Teams ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    /// Initial settings patch; same shape and validation as the settings
    /// endpoint.
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TeamResponse {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub settings: TeamSettings,
    pub report_recipients: Vec<String>,
    pub invite_token: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    /// Merge-patch over the team settings object.
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
    /// Whole-list replacement of the digest recipients.
    #[serde(default)]
    pub report_recipients: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemberResponse {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub role: String,
    pub joined_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListMembersResponse {
    pub members: Vec<MemberResponse>,
}

// ─── Invites ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub emails: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InviteSendResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInviteRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptInviteResponse {
    pub team_id: String,
    pub role: String,
}

// ─── Entries ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct EntryResponse {
    pub id: String,
    pub team_id: String,
    pub user_id: String,
    pub text: Option<String>,
    pub summary: String,
    pub audio_url: Option<String>,
    pub created_at: String,
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub teams: Vec<TeamResponse>,
    pub entries: Vec<EntryResponse>,
}

// ─── Error (JSON shape) ──────────────────────────────────────────────────────

/// JSON error shape `{ "error": "..." }` returned by all error responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}
