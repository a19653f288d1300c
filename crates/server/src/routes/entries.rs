use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};
use uuid::Uuid;

use remotesync_api::EntryResponse;
use remotesync_core::summary;

use crate::AppState;
use crate::clients::{Inference, UserProfile};
use crate::error::ApiErr;
use crate::routes::auth::AuthUser;
use crate::storage::{ENTRY_COLUMNS, entry_from_row};

// ---------------------------------------------------------------------------
// Submit entry
// ---------------------------------------------------------------------------

/// POST /api/entry — multipart form with `team_id`, optional `text`, and an
/// optional `audio` file. At least one of text/audio is required.
pub async fn submit_entry(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<EntryResponse>), ApiErr> {
    let form = read_form(multipart).await?;
    let entry = handle_submission(&state, &user.0, form).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(Default)]
pub(crate) struct SubmitForm {
    pub team_id: Option<String>,
    pub text: Option<String>,
    pub audio: Option<Vec<u8>>,
}

async fn read_form(mut multipart: Multipart) -> Result<SubmitForm, ApiErr> {
    let mut form = SubmitForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiErr::bad_request(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("team_id") => {
                form.team_id = Some(field.text().await.map_err(|e| {
                    ApiErr::bad_request(format!("unreadable team_id field: {e}"))
                })?);
            }
            Some("text") => {
                form.text = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiErr::bad_request(format!("unreadable text field: {e}")))?,
                );
            }
            Some("audio") => {
                form.audio = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiErr::bad_request(format!("unreadable audio field: {e}")))?
                        .to_vec(),
                );
            }
            _ => {}
        }
    }
    Ok(form)
}

/// The submission pipeline: validate, (transcribe if audio), summarize,
/// persist. Only summarization may fail without failing the request.
pub(crate) async fn handle_submission(
    state: &AppState,
    user: &UserProfile,
    form: SubmitForm,
) -> Result<EntryResponse, ApiErr> {
    let team_id = form
        .team_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiErr::bad_request("team_id is required"))?
        .to_string();
    let text = form
        .text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    let audio = form.audio.filter(|b| !b.is_empty());

    if text.is_none() && audio.is_none() {
        return Err(ApiErr::bad_request(
            "either text or an audio file is required",
        ));
    }

    {
        let conn = state.db.conn();
        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM teams WHERE id = ?1",
                [&team_id],
                |row| row.get(0),
            )
            .unwrap_or(false);
        if !exists {
            return Err(ApiErr::not_found("team not found"));
        }

        let member: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM team_members WHERE team_id = ?1 AND user_id = ?2",
                rusqlite::params![&team_id, &user.id],
                |row| row.get(0),
            )
            .unwrap_or(false);
        if !member {
            return Err(ApiErr::forbidden("not a member of this team"));
        }
    }

    // Audio takes precedence: the stored text becomes its transcript.
    let (content, audio_url) = if let Some(bytes) = audio {
        let key = format!(
            "{}_{}_{}.wav",
            user.id,
            team_id,
            chrono::Utc::now().timestamp()
        );
        let url = state
            .adapters
            .store
            .put(&key, bytes.clone(), "audio/wav")
            .await?;
        let transcript = state.adapters.inference.transcribe(bytes).await?;
        (transcript, Some(url))
    } else {
        (text.unwrap_or_default(), None)
    };

    let summary = summarize_or_placeholder(state.adapters.inference.as_ref(), &content).await;

    let entry_id = Uuid::new_v4().to_string();
    let conn = state.db.conn();
    conn.execute(
        "INSERT INTO standup_entries (id, team_id, user_id, text, summary, audio_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![&entry_id, &team_id, &user.id, &content, &summary, &audio_url],
    )
    .map_err(ApiErr::from_db("persist entry"))?;

    conn.query_row(
        &format!("SELECT {ENTRY_COLUMNS} FROM standup_entries WHERE id = ?1"),
        [&entry_id],
        entry_from_row,
    )
    .map_err(ApiErr::from_db("read entry back"))
}

/// Summarize, degrading to the fixed placeholder instead of failing.
pub(crate) async fn summarize_or_placeholder(inference: &dyn Inference, content: &str) -> String {
    match inference.summarize(content).await {
        Ok(s) if !s.trim().is_empty() => s,
        Ok(_) => summary::SUMMARY_PLACEHOLDER.to_string(),
        Err(e) => {
            tracing::warn!("summarization failed, storing placeholder: {e}");
            summary::SUMMARY_PLACEHOLDER.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::teams::create_team;
    use crate::test_support::{profile, test_state};

    fn form(team_id: &str, text: Option<&str>, audio: Option<&[u8]>) -> SubmitForm {
        SubmitForm {
            team_id: Some(team_id.to_string()),
            text: text.map(String::from),
            audio: audio.map(Vec::from),
        }
    }

    async fn make_team(state: &AppState, owner: &str) -> remotesync_api::TeamResponse {
        let (_, Json(team)) = create_team(
            State(state.clone()),
            crate::routes::auth::AuthUser(profile(owner)),
            Json(remotesync_api::CreateTeamRequest {
                name: "Eng".into(),
                settings: None,
            }),
        )
        .await
        .expect("create team");
        team
    }

    #[tokio::test]
    async fn rejects_empty_submission_without_persisting() {
        let app = test_state();
        let state = app.state.clone();
        let team = make_team(&state, "u1").await;

        let err = handle_submission(&state, &profile("u1"), form(&team.id, None, None))
            .await
            .err()
            .expect("empty submission rejected");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        // Whitespace-only text counts as absent.
        let err = handle_submission(&state, &profile("u1"), form(&team.id, Some("   "), None))
            .await
            .err()
            .expect("blank text rejected");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let conn = state.db.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM standup_entries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn text_submission_is_summarized_and_persisted() {
        let app = test_state();
        let state = app.state.clone();
        let team = make_team(&state, "u1").await;

        let entry = handle_submission(&state, &profile("u1"), form(&team.id, Some("done X"), None))
            .await
            .expect("submission");

        assert_eq!(entry.team_id, team.id);
        assert_eq!(entry.user_id, "u1");
        assert_eq!(entry.text.as_deref(), Some("done X"));
        assert_eq!(entry.summary, "- Completed: done X");
        assert_eq!(entry.audio_url, None);
    }

    #[tokio::test]
    async fn audio_submission_uploads_then_transcribes() {
        let app = test_state();
        let state = app.state.clone();
        let team = make_team(&state, "u1").await;

        let entry = handle_submission(
            &state,
            &profile("u1"),
            form(&team.id, None, Some(b"RIFFdata".as_slice())),
        )
        .await
        .expect("submission");

        let url = entry.audio_url.expect("audio url");
        assert!(url.starts_with("https://files.test/audio/u1_"));
        assert!(url.ends_with(".wav"));
        assert_eq!(entry.text.as_deref(), Some("transcribed update"));
        assert_eq!(entry.summary, "- Completed: transcribed update");
    }

    #[tokio::test]
    async fn summarizer_failure_degrades_to_placeholder() {
        let app = test_state();
        let state = app.state.clone();
        let team = make_team(&state, "u1").await;
        app.fail_summary.store(true, std::sync::atomic::Ordering::SeqCst);

        let entry = handle_submission(&state, &profile("u1"), form(&team.id, Some("done X"), None))
            .await
            .expect("submission still succeeds");
        assert_eq!(entry.summary, summary::SUMMARY_PLACEHOLDER);
    }

    #[tokio::test]
    async fn submission_requires_membership() {
        let app = test_state();
        let state = app.state.clone();
        let team = make_team(&state, "u1").await;

        let err = handle_submission(&state, &profile("u9"), form(&team.id, Some("hi"), None))
            .await
            .err()
            .expect("non-member rejected");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = handle_submission(&state, &profile("u1"), form("missing", Some("hi"), None))
            .await
            .err()
            .expect("unknown team rejected");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
